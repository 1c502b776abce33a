//! Shared types and utilities for the meshlet replacement pipeline
//!
//! This crate provides the pieces shared between:
//! - `meshlet-export` (offline encoder)
//! - `meshlet-runtime` (load-time decoder and consumer)
//!
//! # Modules
//!
//! - [`format`] - Extension constants, vertex/meshlet records and limits
//! - [`accessor`] - Bounds- and alignment-checked strided views over glTF buffers
//! - [`coords`] - Engine ↔ disk coordinate convention
//! - [`files`] - File roles (plain export, replacement, texture replacement)

pub mod accessor;
pub mod coords;
pub mod files;
pub mod format;

pub use accessor::{
    read_index_buffer, resolve_buffer, AccessorError, AccessorLayout, Component, StridedView,
    ViewLayout,
};
pub use coords::{disk_to_engine, engine_to_disk};
pub use files::{plain_export_path, replacement_path, texture_replacement_path};
pub use format::{
    padded_local_index_len, Meshlet, MeshletLimits, MeshletVertex, PrimitiveExtension,
    ATTRIBUTE_NORMAL, ATTRIBUTE_POSITION, ATTRIBUTE_TEXCOORD_0, DEFAULT_MAX_TRIANGLES,
    DEFAULT_MAX_VERTICES, EXTENSION_NAME,
};
