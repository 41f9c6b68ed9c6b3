//! Configuration management for the CLI
//!
//! Values are layered: built-in defaults, then the JSON config file, then
//! `LAB_*` environment variables.

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabConfig {
    /// Lab state snapshot (clusters, nodes, scenarios, benchmarks)
    pub state_path: PathBuf,
    /// Node agent port used when a node does not record one
    pub agent_port: u16,
    /// Timeout for node agent and source requests
    pub request_timeout_secs: u64,
    /// Viewer base URL linked from reports as `{trace_ui}/trace/{trace_id}`, where
    /// `trace_id` is the field logged on the benchmark execution span
    pub trace_ui: Option<String>,
    /// Cap on concurrent node calls, 0 is unbounded
    pub max_fanout: usize,
    /// Agent revision nodes are updated to before a benchmark
    pub update_revision: String,
    pub seeder_peer_id: String,
    pub seeder_addrs: Vec<String>,
}

impl Default for LabConfig {
    fn default() -> Self {
        let data_dir = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            state_path: data_dir.join("labctl").join("state.json"),
            agent_port: lab_lib::nodes::DEFAULT_AGENT_PORT,
            request_timeout_secs: 300,
            trace_ui: None,
            max_fanout: 0,
            update_revision: "latest".to_string(),
            seeder_peer_id: "QmLabSeeder".to_string(),
            seeder_addrs: vec!["/ip4/127.0.0.1/tcp/4001".to_string()],
        }
    }
}

impl LabConfig {
    /// Load configuration; an explicit `path` must exist, the default one may not
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .context("Failed to build default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);
        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).format(FileFormat::Json));
            }
            None => {
                if let Some(path) = Self::config_path() {
                    builder = builder
                        .add_source(File::from(path).format(FileFormat::Json).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix("LAB")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("seeder_addrs"),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    pub fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("labctl").join("config.json"))
    }
}
