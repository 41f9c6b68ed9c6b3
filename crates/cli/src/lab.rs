//! Wiring of the orchestrator from configuration

use crate::config::LabConfig;
use anyhow::{Context, Result};
use lab_lib::metadata::MemoryStore;
use lab_lib::nodes::{HttpNodeDialer, TaskProvisioner};
use lab_lib::peer::LocalPublisher;
use lab_lib::scenarios::ScenarioRunner;
use lab_lib::transformers::Transformers;
use lab_lib::{Orchestrator, OrchestratorConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Store plus an orchestrator over it
pub struct Lab {
    pub store: Arc<MemoryStore>,
    pub orchestrator: Orchestrator,
}

impl Lab {
    pub async fn open(config: &LabConfig) -> Result<Self> {
        let store = Arc::new(
            MemoryStore::open(&config.state_path)
                .await
                .with_context(|| format!("Failed to open lab state {:?}", config.state_path))?,
        );
        debug!(path = %config.state_path.display(), "Opened lab state");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let publisher =
            LocalPublisher::new(config.seeder_peer_id.clone(), config.seeder_addrs.clone());
        let provisioner =
            TaskProvisioner::new(config.update_revision.clone()).with_max_fanout(config.max_fanout);
        let runner = ScenarioRunner::new().with_max_fanout(config.max_fanout);

        let orchestrator = Orchestrator::new(
            store.clone(),
            Arc::new(HttpNodeDialer::new(client.clone(), config.agent_port)),
            Transformers::with_defaults(client),
            Arc::new(publisher),
            Arc::new(provisioner),
            Arc::new(runner),
        )
        .with_config(OrchestratorConfig {
            trace_ui: config.trace_ui.clone(),
            max_fanout: config.max_fanout,
        });

        Ok(Self {
            store,
            orchestrator,
        })
    }
}
