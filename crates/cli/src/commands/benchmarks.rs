//! Benchmark commands

use anyhow::{Context, Result};
use colored::Colorize;
use lab_lib::models::{Benchmark, Report};
use lab_lib::BenchmarkRequest;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use crate::lab::Lab;
use crate::output::{
    color_status, format_bytes, format_millis, print_info, print_json, print_rows, print_success,
    print_warning, OutputFormat,
};

/// Row for benchmarks table
#[derive(Tabled)]
struct BenchmarkRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Scenario")]
    scenario: String,
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Created")]
    created_at: String,
}

impl From<&Benchmark> for BenchmarkRow {
    fn from(b: &Benchmark) -> Self {
        Self {
            id: b.id.clone(),
            status: color_status(&b.status.to_string()),
            cluster: b.cluster.id.clone(),
            scenario: b.scenario.id.clone(),
            labels: b.labels.join(","),
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Row for per-node report table
#[derive(Tabled)]
struct NodeReportRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Time")]
    elapsed: String,
    #[tabled(rename = "Blocks Recv")]
    blocks_received: u64,
    #[tabled(rename = "Data Recv")]
    data_received: String,
    #[tabled(rename = "Dup Blocks")]
    dup_blocks: u64,
    #[tabled(rename = "Data Sent")]
    data_sent: String,
}

/// Row for planned tasks
#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Phase")]
    phase: &'static str,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Subject")]
    subject: String,
}

fn print_benchmarks(benchmarks: &[Benchmark], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(benchmarks),
        OutputFormat::Table => {
            let rows: Vec<BenchmarkRow> = benchmarks.iter().map(BenchmarkRow::from).collect();
            print_rows(rows, "No benchmarks found");
            Ok(())
        }
    }
}

/// Run a scenario on a cluster
pub async fn create_benchmark(
    lab: &Lab,
    request: BenchmarkRequest,
    cancel: &CancellationToken,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Table {
        print_info(&format!(
            "Running scenario {} on cluster {}",
            request.scenario_id.bold(),
            request.cluster_id.bold()
        ));
    }

    let benchmark = lab
        .orchestrator
        .create_benchmark(&request, cancel)
        .await
        .context("Failed to create benchmark")?;

    match format {
        OutputFormat::Json => print_json(&benchmark)?,
        OutputFormat::Table => {
            print_success(&format!("Benchmark {} finished", benchmark.id));
            print_benchmarks(std::slice::from_ref(&benchmark), format)?;
        }
    }
    Ok(())
}

/// List benchmarks, optionally filtered by a label query
pub async fn list_benchmarks(lab: &Lab, query: Option<&str>, format: OutputFormat) -> Result<()> {
    let benchmarks = match query {
        Some(expr) => lab
            .orchestrator
            .match_benchmarks(expr)
            .await
            .context("Failed to match benchmarks")?,
        None => lab
            .orchestrator
            .list_benchmarks()
            .await
            .context("Failed to list benchmarks")?,
    };

    print_benchmarks(&benchmarks, format)?;
    if format == OutputFormat::Table && !benchmarks.is_empty() {
        println!("\nTotal: {} benchmarks", benchmarks.len());
    }
    Ok(())
}

/// Show a benchmark and its plan
pub async fn inspect_benchmark(lab: &Lab, id: &str, format: OutputFormat) -> Result<()> {
    let benchmark = lab
        .orchestrator
        .get_benchmark(id)
        .await
        .with_context(|| format!("Failed to get benchmark {:?}", id))?;

    if format == OutputFormat::Json {
        return print_json(&benchmark);
    }

    print_benchmarks(std::slice::from_ref(&benchmark), format)?;

    println!("\n{}", "Objects".bold());
    for (name, cid) in &benchmark.plan.objects {
        println!("  {} {}", name, cid.as_str().dimmed());
    }

    let rows: Vec<TaskRow> = benchmark
        .plan
        .seed
        .iter()
        .map(|(node, task)| ("seed", node, task))
        .chain(
            benchmark
                .plan
                .benchmark
                .iter()
                .map(|(node, task)| ("benchmark", node, task)),
        )
        .map(|(phase, node, task)| TaskRow {
            phase,
            node: node.clone(),
            task: task.task_type.to_string(),
            subject: task.subject.clone(),
        })
        .collect();
    println!("\n{}", "Plan".bold());
    print_rows(rows, "Plan has no tasks");
    Ok(())
}

fn print_report(report: &Report) {
    println!("{}", "Summary".bold());
    println!("  Total time:   {}", format_millis(report.summary.total_time_ms));
    if let Some(trace) = &report.summary.trace {
        println!("  Trace:        {}", trace.underline());
    }

    let agg = &report.aggregates;
    println!("  Nodes:        {}", agg.node_count);
    println!(
        "  Task time:    avg {} / min {} / max {}",
        format_millis(agg.average_elapsed_ms.round() as u64),
        format_millis(agg.min_elapsed_ms),
        format_millis(agg.max_elapsed_ms)
    );
    println!("  Data recv:    {}", format_bytes(agg.totals.data_received));
    println!("  Dup ratio:    {:.1}%", agg.dup_block_ratio * 100.0);

    let rows: Vec<NodeReportRow> = report
        .nodes
        .iter()
        .map(|(node, r)| NodeReportRow {
            node: node.clone(),
            task: r.task.task_type.to_string(),
            elapsed: format_millis(r.elapsed_ms),
            blocks_received: r.transfer.blocks_received,
            data_received: format_bytes(r.transfer.data_received),
            dup_blocks: r.transfer.dup_blocks_received,
            data_sent: format_bytes(r.transfer.data_sent),
        })
        .collect();
    println!("\n{}", "Nodes".bold());
    print_rows(rows, "Report has no node results");

    if !report.queries.is_empty() {
        println!("\n{}", "Queries".bold());
        for (query, ids) in &report.queries {
            println!("  {} -> {}", query, ids.join(","));
        }
    }
}

/// Show the report of a finished benchmark
pub async fn show_report(lab: &Lab, id: &str, format: OutputFormat) -> Result<()> {
    let report = lab
        .orchestrator
        .get_report(id)
        .await
        .with_context(|| format!("Failed to get report of benchmark {:?}", id))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

/// Add and remove benchmark labels
pub async fn label_benchmarks(
    lab: &Lab,
    ids: &[String],
    adds: &[String],
    removes: &[String],
    format: OutputFormat,
) -> Result<()> {
    let benchmarks = lab
        .orchestrator
        .label_benchmarks(ids, adds, removes)
        .await
        .context("Failed to label benchmarks")?;

    if format == OutputFormat::Table && benchmarks.is_empty() {
        print_warning("No labels to change");
        return Ok(());
    }
    print_benchmarks(&benchmarks, format)
}

/// Delete benchmarks and their reports
pub async fn delete_benchmarks(lab: &Lab, ids: &[String], format: OutputFormat) -> Result<()> {
    lab.orchestrator
        .delete_benchmarks(ids)
        .await
        .context("Failed to delete benchmarks")?;

    match format {
        OutputFormat::Json => print_json(ids)?,
        OutputFormat::Table => print_success(&format!("Deleted {} benchmarks", ids.len())),
    }
    Ok(())
}
