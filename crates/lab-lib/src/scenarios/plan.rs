use crate::actions;
use crate::error::Result;
use crate::group::TaskGroup;
use crate::models::{ContentId, ScenarioDefinition, ScenarioPlan, Task};
use crate::nodes::NodeRef;
use crate::peer::Publisher;
use crate::query::{self, LabeledSet};
use crate::transformers::{AddOptions, Transformers};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Resolve a scenario against the nodes of a cluster
///
/// Returns the plan together with the benchmark audit map, which records the
/// canonical form of every benchmark query and the node ids it matched.
/// Each phase entry replaces the task map of the entry before it.
pub async fn plan(
    def: &ScenarioDefinition,
    transformers: &Transformers,
    publisher: Arc<dyn Publisher>,
    nodes: &LabeledSet<NodeRef>,
    cancel: &CancellationToken,
) -> Result<(ScenarioPlan, BTreeMap<String, Vec<String>>)> {
    let objects = transform_objects(def, transformers, publisher, cancel).await?;

    info!("Planning scenario seed");
    let mut seed = BTreeMap::new();
    for (q, a) in &def.seed {
        seed = plan_entry(q, a, &objects, nodes, None)?;
    }

    info!("Planning scenario benchmark");
    let mut queries = BTreeMap::new();
    let mut benchmark = BTreeMap::new();
    for (q, a) in &def.benchmark {
        benchmark = plan_entry(q, a, &objects, nodes, Some(&mut queries))?;
    }

    Ok((
        ScenarioPlan {
            objects,
            seed,
            benchmark,
        },
        queries,
    ))
}

async fn transform_objects(
    def: &ScenarioDefinition,
    transformers: &Transformers,
    publisher: Arc<dyn Publisher>,
    cancel: &CancellationToken,
) -> Result<BTreeMap<String, ContentId>> {
    info!(objects = def.objects.len(), "Transforming objects into content-addressed DAGs");

    let objects = Arc::new(Mutex::new(BTreeMap::new()));
    let mut group = TaskGroup::new(cancel);
    for (name, odef) in &def.objects {
        let transformer = transformers.get(&odef.object_type);
        let opts = AddOptions::from_definition(odef);
        let name = name.clone();
        let object_type = odef.object_type.clone();
        let source = odef.source.clone();
        let publisher = publisher.clone();
        let objects = objects.clone();

        group.spawn(move |token| async move {
            let cid = transformer?
                .transform(publisher.as_ref(), &source, &opts, &token)
                .await?;
            debug!(object_type = %object_type, source = %source, cid = %cid, "Transformed object");
            objects.lock().await.insert(name, cid);
            Ok(())
        });
    }
    group.wait().await?;

    let mut objects = objects.lock().await;
    Ok(std::mem::take(&mut *objects))
}

fn plan_entry(
    q: &str,
    a: &str,
    objects: &BTreeMap<String, ContentId>,
    nodes: &LabeledSet<NodeRef>,
    audit: Option<&mut BTreeMap<String, Vec<String>>>,
) -> Result<BTreeMap<String, Task>> {
    let query = query::parse(q)?;
    let matched = query.match_set(nodes)?;

    let ids = matched.ids();
    debug!(query = %query, ids = ?ids, "Matched query");
    if let Some(audit) = audit {
        audit.insert(query.to_string(), ids);
    }

    let action = actions::parse(objects, a)?;
    action.tasks(matched.slice())
}
