//! Object transformers
//!
//! A transformer reads an object's source and materializes it on the
//! publisher under a content id. Content ids are a digest over the
//! effective add options and the object bytes, so the same definition
//! always resolves to the same id.

mod file;
mod http;

pub use file::FileTransformer;
pub use http::HttpTransformer;

use crate::error::{Error, Result};
use crate::models::{ContentId, ObjectDefinition};
use crate::peer::Publisher;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_LAYOUT: &str = "balanced";
pub const DEFAULT_CHUNKER: &str = "size-262144";
pub const DEFAULT_HASH_FUNC: &str = "sha2-256";

/// Add options explicitly set on an object definition
///
/// Unset fields stay `None` so the transformer's defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    pub layout: Option<String>,
    pub chunker: Option<String>,
    pub raw_leaves: Option<bool>,
    pub hash_func: Option<String>,
}

impl AddOptions {
    pub fn from_definition(odef: &ObjectDefinition) -> Self {
        let set = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Self {
            layout: set(&odef.layout),
            chunker: set(&odef.chunker),
            raw_leaves: odef.raw_leaves.then_some(true),
            hash_func: set(&odef.hash_func),
        }
    }

    /// Fill in defaults and validate the result
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        let layout = self.layout.as_deref().unwrap_or(DEFAULT_LAYOUT);
        if !matches!(layout, "balanced" | "trickle") {
            return Err(Error::Transform(format!("unknown layout {:?}", layout)));
        }

        let chunker = self.chunker.as_deref().unwrap_or(DEFAULT_CHUNKER);
        validate_chunker(chunker)?;

        let hash_func = self.hash_func.as_deref().unwrap_or(DEFAULT_HASH_FUNC);
        if hash_func != DEFAULT_HASH_FUNC {
            return Err(Error::Transform(format!(
                "unsupported hash function {:?}",
                hash_func
            )));
        }

        Ok(ResolvedOptions {
            layout: layout.to_string(),
            chunker: chunker.to_string(),
            raw_leaves: self.raw_leaves.unwrap_or(false),
            hash_func: hash_func.to_string(),
        })
    }
}

fn validate_chunker(chunker: &str) -> Result<()> {
    if chunker == "rabin" {
        return Ok(());
    }
    let size = chunker
        .strip_prefix("size-")
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0);
    match size {
        Some(_) => Ok(()),
        None => Err(Error::Transform(format!("invalid chunker {:?}", chunker))),
    }
}

/// Add options with every default applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub layout: String,
    pub chunker: String,
    pub raw_leaves: bool,
    pub hash_func: String,
}

impl ResolvedOptions {
    pub fn content_id(&self, data: &[u8]) -> ContentId {
        let mut hasher = Sha256::new();
        hasher.update(self.layout.as_bytes());
        hasher.update([0]);
        hasher.update(self.chunker.as_bytes());
        hasher.update([0, self.raw_leaves as u8, 0]);
        hasher.update(data);
        ContentId::new(format!("{}:{}", self.hash_func, hex::encode(hasher.finalize())))
    }
}

/// Compute the content id of `data` and hand it to the publisher
pub(crate) async fn materialize(
    publisher: &dyn Publisher,
    opts: &AddOptions,
    data: Vec<u8>,
    cancel: &CancellationToken,
) -> Result<ContentId> {
    let resolved = opts.resolve()?;
    let cid = resolved.content_id(&data);
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    publisher.publish(&cid, data).await?;
    Ok(cid)
}

/// Turns a source into a content-addressed object on the publisher
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(
        &self,
        publisher: &dyn Publisher,
        source: &str,
        opts: &AddOptions,
        cancel: &CancellationToken,
    ) -> Result<ContentId>;
}

/// Registry of transformers keyed by object type
#[derive(Clone, Default)]
pub struct Transformers {
    registry: HashMap<String, Arc<dyn Transformer>>,
}

impl Transformers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `file` and `http` transformers
    pub fn with_defaults(client: reqwest::Client) -> Self {
        let mut ts = Self::new();
        ts.register("file", Arc::new(FileTransformer::new()));
        ts.register("http", Arc::new(HttpTransformer::new(client)));
        ts
    }

    pub fn register(&mut self, object_type: impl Into<String>, transformer: Arc<dyn Transformer>) {
        let object_type = object_type.into();
        debug!(object_type = %object_type, "Registering transformer");
        self.registry.insert(object_type, transformer);
    }

    pub fn get(&self, object_type: &str) -> Result<Arc<dyn Transformer>> {
        self.registry.get(object_type).cloned().ok_or_else(|| {
            Error::InvalidArgument(format!("unrecognized transformer type {:?}", object_type))
        })
    }
}
