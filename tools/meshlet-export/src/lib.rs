//! meshlet-export library
//!
//! Offline half of the meshlet replacement pipeline: partitions glTF triangle
//! meshes into meshlets and serializes them with the
//! `NONE_deus_ex_vk_render_mesh` extension.

pub mod builder;
pub mod cluster;
pub mod config;
pub mod dedup;
pub mod encoder;
pub mod plain;

// Re-export the shared format so callers need a single dependency
pub use meshlet_common::{
    Meshlet, MeshletLimits, MeshletVertex, PrimitiveExtension, EXTENSION_NAME,
};

pub use builder::{BuiltMeshlets, MeshletBuilder, PrimitiveGeometry};
pub use cluster::{Clusterizer, GreedyClusterizer, MeshoptClusterizer, RawClusters, RawMeshlet};
pub use config::{ClusterizerKind, ExportConfig};
pub use dedup::VertexDedupMap;
pub use encoder::{convert_gltf, encode_document, EncodeSummary};
pub use plain::{export_plain, write_plain_gltf, PlainModel, TextureGroup};
