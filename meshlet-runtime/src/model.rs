//! Decoded replacement model

use meshlet_common::{Meshlet, MeshletVertex};

/// One model's meshlet geometry, ready to append to GPU arrays.
///
/// Immutable once decoded; shared through the session cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReplacement {
    pub name: String,
    /// `vert_offset` indexes `indices`, `local_offset` indexes `local_indices`,
    /// `tex_idx` indexes `texture_file_names`.
    pub meshlets: Vec<Meshlet>,
    /// Engine-space vertices
    pub verts: Vec<MeshletVertex>,
    /// Meshlet vertex indices, each < `verts.len()`
    pub indices: Vec<u32>,
    /// Local triangle corners
    pub local_indices: Vec<u8>,
    /// Replacement PNG path per material slot
    pub texture_file_names: Vec<String>,
}

impl ModelReplacement {
    pub fn triangle_count(&self) -> usize {
        self.meshlets.iter().map(|m| m.tri_count as usize).sum()
    }

    /// Vertex of local corner `corner` (0..tri_count*3) of meshlet `meshlet`.
    pub fn corner_vertex(&self, meshlet: usize, corner: usize) -> Option<&MeshletVertex> {
        let m = self.meshlets.get(meshlet)?;
        if corner >= m.index_count() as usize {
            return None;
        }
        let local = *self.local_indices.get(m.local_offset as usize + corner)?;
        let index = *self.indices.get(m.vert_offset as usize + local as usize)?;
        self.verts.get(index as usize)
    }
}
