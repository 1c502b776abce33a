//! Meshlet replacement format (`NONE_deus_ex_vk_render_mesh` glTF extension)
//!
//! A replacement file is an ordinary glTF 2.0 document whose geometry has been
//! split into meshlets. The extension adds two small JSON objects:
//!
//! ```text
//! document.extensions[EXT]  = { "max_vertices": u32, "max_triangles": u32 }
//! primitive.extensions[EXT] = { "meshlet_vertex_indices": accessor,
//!                               "meshlet_local_indices":  accessor }
//! ```
//!
//! # Buffers
//! ```text
//! 0: interleaved MeshletVertex records (byteStride 32)
//! 1: unpacked u32 triangle indices (third-party viewers only)
//! 2: meshlet vertex indices, u32 (meshlet-local vertex -> vertex id)
//! 3: meshlet local indices, u8 (3 per triangle, padded to 4 bytes per meshlet)
//! ```
//!
//! Every accessor byte offset is relative to the start of its own buffer view.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Name of the private glTF extension carrying meshlet data.
pub const EXTENSION_NAME: &str = "NONE_deus_ex_vk_render_mesh";

/// Default maximum number of distinct vertices referenced by one meshlet.
pub const DEFAULT_MAX_VERTICES: u32 = 64;
/// Default maximum number of triangles in one meshlet.
pub const DEFAULT_MAX_TRIANGLES: u32 = 124;

pub const ATTRIBUTE_POSITION: &str = "POSITION";
pub const ATTRIBUTE_NORMAL: &str = "NORMAL";
pub const ATTRIBUTE_TEXCOORD_0: &str = "TEXCOORD_0";

/// Document-level extension object: the limits the meshlets were built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshletLimits {
    pub max_vertices: u32,
    pub max_triangles: u32,
}

impl Default for MeshletLimits {
    fn default() -> Self {
        Self {
            max_vertices: DEFAULT_MAX_VERTICES,
            max_triangles: DEFAULT_MAX_TRIANGLES,
        }
    }
}

/// Primitive-level extension object: accessor indices of one meshlet's
/// vertex-index and local-index ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveExtension {
    pub meshlet_vertex_indices: u32,
    pub meshlet_local_indices: u32,
}

/// Canonical deduplicated vertex record (32 bytes, interleaved).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct MeshletVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshletVertex {
    pub const SIZE: usize = std::mem::size_of::<Self>();
    pub const POSITION_OFFSET: usize = std::mem::offset_of!(Self, position);
    pub const NORMAL_OFFSET: usize = std::mem::offset_of!(Self, normal);
    pub const UV_OFFSET: usize = std::mem::offset_of!(Self, uv);

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// IEEE-754 bit patterns of all eight components.
    ///
    /// This is the vertex identity used for deduplication: two records are the
    /// same vertex iff these arrays are equal. `+0.0` and `-0.0` differ, and a
    /// NaN only matches a NaN with the same payload.
    pub fn bits(&self) -> [u32; 8] {
        let [px, py, pz] = self.position;
        let [nx, ny, nz] = self.normal;
        let [u, v] = self.uv;
        [px, py, pz, nx, ny, nz, u, v].map(f32::to_bits)
    }
}

const _: () = assert!(MeshletVertex::SIZE == 32);

/// GPU meshlet record.
///
/// `vert_offset` indexes the vertex-index buffer, `local_offset` indexes the
/// local-index buffer (bytes), `tex_idx` selects the texture.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Meshlet {
    pub vert_offset: u32,
    pub vert_count: u32,
    pub local_offset: u32,
    pub tri_count: u32,
    pub tex_idx: u32,
}

impl Meshlet {
    /// Number of local indices (3 per triangle).
    pub fn index_count(&self) -> u32 {
        self.tri_count * 3
    }
}

/// Byte length of a meshlet's local-index range once padded to 4 bytes.
#[inline]
pub const fn padded_local_index_len(tri_count: usize) -> usize {
    (tri_count * 3 + 3) & !3
}
