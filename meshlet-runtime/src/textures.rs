//! Texture name table and replacement PNG loading

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use tracing::{debug, warn};

/// Texture name → GPU texture index, in registration order.
///
/// Populated before any decoded model is consumed.
#[derive(Debug, Default, Clone)]
pub struct TextureTable {
    names: Vec<String>,
    indices: HashMap<String, u32>,
}

impl TextureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, returning its index. Registering twice returns the
    /// first index.
    pub fn register(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.indices.get(name) {
            return index;
        }
        let index = self.names.len() as u32;
        self.names.push(name.to_string());
        self.indices.insert(name.to_string(), index);
        index
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.indices.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Decoded replacement texture (RGBA8).
#[derive(Debug, Clone)]
pub struct TextureReplacement {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to load texture replacement {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Load the replacement PNG at `path`, if there is one.
pub fn load_texture_replacement(path: &Path) -> Result<Option<TextureReplacement>, TextureError> {
    if !path.is_file() {
        debug!("No texture replacement at {:?}", path);
        return Ok(None);
    }

    let img = image::open(path)
        .map_err(|source| {
            warn!("Texture replacement {:?} is unreadable", path);
            TextureError::Image {
                path: path.to_path_buf(),
                source,
            }
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();

    Ok(Some(TextureReplacement {
        width,
        height,
        data: img.into_raw(),
    }))
}
