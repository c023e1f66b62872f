//! Endpoint scripting configuration
//!
//! Each gateway endpoint (or backend) may carry a scripting block inside
//! its extra-config JSON, keyed by a namespace owned by the caller. The
//! block names the source files to load, optional inline pre/post code and
//! optional content checksums. Source text itself is plain text; how the
//! pipeline wires pre/post around its own stage is the caller's business.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Result, ScriptError};

/// Provider of script source text by configured name
pub trait SourceLoader: Send + Sync + fmt::Debug {
    /// Source text registered under `key`, if any
    fn get(&self, key: &str) -> Option<String>;
}

/// Loader over sources read once at configuration time
#[derive(Debug, Clone, Default)]
pub struct OnceLoader {
    sources: HashMap<String, String>,
}

impl OnceLoader {
    /// Build a loader from already-loaded sources
    pub fn from_map(sources: HashMap<String, String>) -> Self {
        Self { sources }
    }

    /// Build a loader by reading each path from disk
    ///
    /// Unreadable files are logged and skipped; a missing source then
    /// surfaces later as [`ScriptError::UnknownSource`] when a session
    /// asks for it.
    pub fn from_files(paths: &[String]) -> Self {
        let mut sources = HashMap::new();
        for path in paths {
            match std::fs::read_to_string(Path::new(path)) {
                Ok(content) => {
                    sources.insert(path.clone(), content);
                }
                Err(e) => {
                    warn!(source = %path, error = %e, "unable to open script source");
                }
            }
        }
        Self { sources }
    }
}

impl SourceLoader for OnceLoader {
    fn get(&self, key: &str) -> Option<String> {
        self.sources.get(key).cloned()
    }
}

/// Loader that re-reads sources from disk on every request
///
/// Meant for local development; it trades performance and checksum
/// verification for editability.
#[derive(Debug, Clone, Default)]
pub struct LiveLoader;

impl SourceLoader for LiveLoader {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(Path::new(key)).ok()
    }
}

/// Scripting block of one endpoint's extra-config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptConfig {
    /// Ordered list of source names to load into each session
    #[serde(default)]
    pub sources: Vec<String>,
    /// Inline code executed before the pipeline's own stage
    #[serde(default)]
    pub pre: String,
    /// Inline code executed after the pipeline's own stage
    #[serde(default)]
    pub post: String,
    /// Skip the wrapped pipeline stage entirely
    #[serde(default)]
    pub skip_next: bool,
    /// Re-read sources from disk on every request
    #[serde(default)]
    pub live: bool,
    /// Expected SHA-256 checksums by source name
    #[serde(default)]
    pub sha256: HashMap<String, String>,

    #[serde(skip)]
    loader: Option<Arc<dyn SourceLoader>>,
}

impl ScriptConfig {
    /// Parse the scripting block under `namespace` out of an extra-config
    /// value and prepare its source loader
    ///
    /// Returns [`ScriptError::NoScriptConfig`] when the namespace is
    /// absent so callers can cheaply skip endpoints without scripting.
    pub fn parse(extra: &serde_json::Value, namespace: &str) -> Result<Self> {
        let block = extra.get(namespace).ok_or(ScriptError::NoScriptConfig)?;
        let mut cfg: ScriptConfig = serde_json::from_value(block.clone())
            .map_err(|e| ScriptError::WrongScriptConfig(e.to_string()))?;

        if cfg.live {
            cfg.loader = Some(Arc::new(LiveLoader));
            debug!(sources = cfg.sources.len(), "scripting config ready (live sources)");
            return Ok(cfg);
        }

        let loader = OnceLoader::from_files(&cfg.sources);
        cfg.verify_checksums(&loader)?;
        debug!(sources = cfg.sources.len(), "scripting config ready");
        cfg.loader = Some(Arc::new(loader));
        Ok(cfg)
    }

    /// Replace the source loader, e.g. with an in-memory one
    pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Source text for `key` through the configured loader
    pub fn get(&self, key: &str) -> Option<String> {
        self.loader.as_ref().and_then(|l| l.get(key))
    }

    fn verify_checksums(&self, loader: &OnceLoader) -> Result<()> {
        for (source, expected) in &self.sha256 {
            let content = loader.get(source).unwrap_or_default();
            let actual = hex::encode(Sha256::digest(content.as_bytes()));
            if &actual != expected {
                return Err(ScriptError::ChecksumMismatch {
                    name: source.clone(),
                    actual,
                    expected: expected.clone(),
                });
            }
        }
        Ok(())
    }
}
