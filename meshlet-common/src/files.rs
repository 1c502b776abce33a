//! File roles
//!
//! - `<model>.gltf` - plain export, no extension, for inspection and as encoder input
//! - `<model>.replacement.gltf` - carries the meshlet extension, consumed at runtime
//! - `<texture>.png` beside the replacement file - texture replacement

use std::path::{Path, PathBuf};

pub const PLAIN_EXPORT_EXT: &str = "gltf";
pub const REPLACEMENT_EXT: &str = "replacement.gltf";
pub const TEXTURE_REPLACEMENT_EXT: &str = "png";

/// `<dir>/<model>.gltf`
pub fn plain_export_path(dir: &Path, model: &str) -> PathBuf {
    dir.join(format!("{model}.{PLAIN_EXPORT_EXT}"))
}

/// `<dir>/<model>.replacement.gltf`
pub fn replacement_path(dir: &Path, model: &str) -> PathBuf {
    dir.join(format!("{model}.{REPLACEMENT_EXT}"))
}

/// Same-named `.png` beside the replacement file.
pub fn texture_replacement_path(replacement: &Path, texture: &str) -> PathBuf {
    replacement.with_file_name(format!("{texture}.{TEXTURE_REPLACEMENT_EXT}"))
}
