//! Session cache of replacement decode outcomes
//!
//! Each model name is looked up at most once per session. The outcome is
//! remembered whether the replacement decoded, did not exist, or failed, so a
//! broken file is reported once and never retried until [`ReplacementCache::clear`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::{debug, error};

use crate::decode::load_replacement;
use crate::model::ModelReplacement;
use meshlet_common::replacement_path;

/// Outcome of looking up one model.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Present(Arc<ModelReplacement>),
    /// No replacement file; the original geometry is used.
    Absent,
    /// A replacement file exists but did not decode.
    Failed(String),
}

impl CacheEntry {
    pub fn replacement(&self) -> Option<&Arc<ModelReplacement>> {
        match self {
            Self::Present(model) => Some(model),
            Self::Absent | Self::Failed(_) => None,
        }
    }
}

/// Replacement lookups for one session, rooted at a replacement directory.
#[derive(Debug)]
pub struct ReplacementCache {
    dir: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl ReplacementCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up `model`, decoding `<dir>/<model>.replacement.gltf` on first use.
    pub fn get_or_load(&mut self, model: &str) -> &CacheEntry {
        let dir = &self.dir;
        self.entries
            .entry_ref(model)
            .or_insert_with(|| load_entry(dir, model))
    }

    /// Cached outcome, without loading.
    pub fn get(&self, model: &str) -> Option<&CacheEntry> {
        self.entries.get(model)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every outcome (scene teardown).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn load_entry(dir: &Path, model: &str) -> CacheEntry {
    let path = replacement_path(dir, model);
    if !path.is_file() {
        debug!("No replacement for {} at {:?}", model, path);
        return CacheEntry::Absent;
    }
    match load_replacement(&path, model) {
        Ok(replacement) => CacheEntry::Present(Arc::new(replacement)),
        Err(e) => {
            error!("Failed to load replacement {:?}: {}", path, e);
            CacheEntry::Failed(e.to_string())
        }
    }
}
