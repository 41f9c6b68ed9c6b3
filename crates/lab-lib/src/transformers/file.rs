//! Local file transformer

use super::{materialize, AddOptions, Transformer};
use crate::error::{Error, Result};
use crate::models::ContentId;
use crate::peer::Publisher;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Reads object sources from the local filesystem
///
/// Relative sources resolve against `root` when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileTransformer {
    root: Option<PathBuf>,
}

impl FileTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve_path(&self, source: &str) -> PathBuf {
        let path = PathBuf::from(source);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl Transformer for FileTransformer {
    async fn transform(
        &self,
        publisher: &dyn Publisher,
        source: &str,
        opts: &AddOptions,
        cancel: &CancellationToken,
    ) -> Result<ContentId> {
        let path = self.resolve_path(source);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Transform(format!("failed to read {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), bytes = data.len(), "Read object source");
        materialize(publisher, opts, data, cancel).await
    }
}
