//! meshlet-runtime
//!
//! Load-time half of the meshlet replacement pipeline:
//!
//! - [`decode`] - validate a `.replacement.gltf` and decode it into a [`ModelReplacement`]
//! - [`cache`] - per-session cache of decode outcomes, keyed by model name
//! - [`textures`] - texture name table and replacement PNG loading
//! - [`consume`] - rebasing decoded models into shared GPU arrays and indirect draws

pub mod cache;
pub mod consume;
pub mod decode;
pub mod model;
pub mod textures;

pub use cache::{CacheEntry, ReplacementCache};
pub use consume::{ConsumeError, DrawIndirectCommand, GeometryArena, ModelRange};
pub use decode::{decode_replacement, load_replacement, DecodeError, MeshletBufferKind, NodeFeature};
pub use model::ModelReplacement;
pub use textures::{load_texture_replacement, TextureError, TextureReplacement, TextureTable};
