//! Scenario planning and execution
//!
//! - `plan` materializes a scenario's objects and resolves its seed and
//!   benchmark phases into per-node tasks
//! - `PlanExecutor` runs a finished plan against the cluster, with
//!   `ScenarioRunner` as the task-dispatching implementation

mod plan;
mod run;


pub use plan::plan;
pub use run::ScenarioRunner;

use crate::error::Result;
use crate::models::{Execution, ScenarioPlan};
use crate::nodes::NodeRef;
use crate::query::LabeledSet;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Runs a scenario plan to completion
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    /// Execute the seed tasks, then the timed benchmark tasks
    ///
    /// `publisher_addrs` are the dial strings seeding nodes use to reach the
    /// publisher holding the scenario's objects.
    async fn run(
        &self,
        nodes: &LabeledSet<NodeRef>,
        plan: &ScenarioPlan,
        publisher_addrs: &[String],
        cancel: &CancellationToken,
    ) -> Result<Execution>;
}
