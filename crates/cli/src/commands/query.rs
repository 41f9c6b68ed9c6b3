//! Node query command

use anyhow::{Context, Result};
use lab_lib::metadata::MetadataStore;
use lab_lib::query::{self, LabeledSet};
use tabled::Tabled;

use crate::lab::Lab;
use crate::output::{print_json, print_rows, OutputFormat};

/// Row for nodes table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Labels")]
    labels: String,
}

/// List the nodes of `cluster` matched by the query `expr`
pub async fn query_nodes(lab: &Lab, cluster: &str, expr: &str, format: OutputFormat) -> Result<()> {
    let nodes: LabeledSet<_> = lab
        .store
        .list_nodes(cluster)
        .await
        .with_context(|| format!("Failed to list nodes of cluster {:?}", cluster))?
        .into_iter()
        .collect();

    let matched = query::execute(&nodes, expr).context("Failed to evaluate query")?;

    match format {
        OutputFormat::Json => print_json(matched.slice())?,
        OutputFormat::Table => {
            let rows: Vec<NodeRow> = matched
                .slice()
                .iter()
                .map(|n| NodeRow {
                    id: n.id.clone(),
                    address: match n.agent_port {
                        Some(port) => format!("{}:{}", n.address, port),
                        None => n.address.clone(),
                    },
                    labels: n.labels.join(","),
                })
                .collect();
            let total = rows.len();
            print_rows(rows, "No nodes matched");
            if total > 0 {
                println!("\nTotal: {} of {} nodes", total, nodes.len());
            }
        }
    }

    Ok(())
}
