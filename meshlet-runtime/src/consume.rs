//! Model-spanning GPU arrays
//!
//! [`GeometryArena`] appends decoded models into four shared arrays (vertices,
//! meshlet vertex indices, local indices, meshlets) and records one indirect
//! draw per meshlet. A vertex shader then finds its vertex from the built-in
//! indices alone:
//!
//! ```text
//! meshlet = meshlets[instance_index]
//! local   = local_indices[vertex_index]
//! vertex  = verts[indices[meshlet.vert_offset + local]]
//! ```
//!
//! [`GeometryArena::resolve_vertex`] performs the same lookup on the CPU.

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::model::ModelReplacement;
use crate::textures::TextureTable;
use meshlet_common::{Meshlet, MeshletVertex};

/// Non-indexed indirect draw (`VkDrawIndirectCommand` layout).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawIndirectCommand {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConsumeError {
    #[error("texture {0:?} is not registered")]
    UnregisteredTexture(String),

    #[error("meshlet {meshlet} uses texture slot {slot}, but the model has {slots}")]
    TextureSlotOutOfRange {
        meshlet: usize,
        slot: u32,
        slots: usize,
    },

    #[error("combined geometry no longer fits 32-bit offsets")]
    Overflow,
}

/// Where one appended model landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelRange {
    pub first_meshlet: u32,
    pub meshlet_count: u32,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

#[derive(Debug, Default)]
pub struct GeometryArena {
    verts: Vec<MeshletVertex>,
    indices: Vec<u32>,
    local_indices: Vec<u8>,
    /// `tex_idx` holds GPU texture indices here
    meshlets: Vec<Meshlet>,
    commands: Vec<DrawIndirectCommand>,
}

impl GeometryArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `model`, rebasing its offsets onto the current array lengths.
    ///
    /// Textures are resolved and offsets rebased before anything is appended,
    /// so a failed append leaves the arena unchanged.
    pub fn append(
        &mut self,
        model: &ModelReplacement,
        textures: &TextureTable,
    ) -> Result<ModelRange, ConsumeError> {
        let gpu_textures = model
            .meshlets
            .iter()
            .enumerate()
            .map(|(n, m)| {
                let name = model.texture_file_names.get(m.tex_idx as usize).ok_or(
                    ConsumeError::TextureSlotOutOfRange {
                        meshlet: n,
                        slot: m.tex_idx,
                        slots: model.texture_file_names.len(),
                    },
                )?;
                textures
                    .get(name)
                    .ok_or_else(|| ConsumeError::UnregisteredTexture(name.clone()))
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let vertex_base = checked_len(self.verts.len(), model.verts.len())?;
        let index_base = checked_len(self.indices.len(), model.indices.len())?;
        let local_base = checked_len(self.local_indices.len(), model.local_indices.len())?;
        let meshlet_base = checked_len(self.meshlets.len(), model.meshlets.len())?;

        let indices = model
            .indices
            .iter()
            .map(|&i| i.checked_add(vertex_base).ok_or(ConsumeError::Overflow))
            .collect::<Result<Vec<u32>, _>>()?;
        let meshlets = model
            .meshlets
            .iter()
            .zip(gpu_textures)
            .map(|(m, tex_idx)| {
                Ok(Meshlet {
                    vert_offset: m
                        .vert_offset
                        .checked_add(index_base)
                        .ok_or(ConsumeError::Overflow)?,
                    vert_count: m.vert_count,
                    local_offset: m
                        .local_offset
                        .checked_add(local_base)
                        .ok_or(ConsumeError::Overflow)?,
                    tri_count: m.tri_count,
                    tex_idx,
                })
            })
            .collect::<Result<Vec<Meshlet>, ConsumeError>>()?;

        self.verts.extend_from_slice(&model.verts);
        self.indices.extend(indices);
        self.local_indices.extend_from_slice(&model.local_indices);

        for (n, m) in meshlets.into_iter().enumerate() {
            self.commands.push(DrawIndirectCommand {
                vertex_count: m.index_count(),
                instance_count: 1,
                first_vertex: m.local_offset,
                first_instance: meshlet_base + n as u32,
            });
            self.meshlets.push(m);
        }

        debug!(
            "Appended {}: {} meshlets at {}, {} vertices at {}",
            model.name,
            model.meshlets.len(),
            meshlet_base,
            model.verts.len(),
            vertex_base
        );

        Ok(ModelRange {
            first_meshlet: meshlet_base,
            meshlet_count: model.meshlets.len() as u32,
            first_vertex: vertex_base,
            vertex_count: model.verts.len() as u32,
        })
    }

    pub fn verts(&self) -> &[MeshletVertex] {
        &self.verts
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn local_indices(&self) -> &[u8] {
        &self.local_indices
    }

    pub fn meshlets(&self) -> &[Meshlet] {
        &self.meshlets
    }

    pub fn commands(&self) -> &[DrawIndirectCommand] {
        &self.commands
    }

    /// Indirect buffer contents.
    pub fn command_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.commands)
    }

    /// The vertex a draw invocation reads, from its built-in indices.
    pub fn resolve_vertex(&self, vertex_index: u32, instance_index: u32) -> Option<&MeshletVertex> {
        let meshlet = self.meshlets.get(instance_index as usize)?;
        let local = *self.local_indices.get(vertex_index as usize)?;
        let index = *self
            .indices
            .get(meshlet.vert_offset as usize + local as usize)?;
        self.verts.get(index as usize)
    }

    pub fn clear(&mut self) {
        self.verts.clear();
        self.indices.clear();
        self.local_indices.clear();
        self.meshlets.clear();
        self.commands.clear();
    }
}

/// Current length as a base offset, provided `len + added` still fits `u32`.
fn checked_len(len: usize, added: usize) -> Result<u32, ConsumeError> {
    len.checked_add(added)
        .filter(|&end| u32::try_from(end).is_ok())
        .map(|_| len as u32)
        .ok_or(ConsumeError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> MeshletVertex {
        MeshletVertex::new([x, 0.0, 0.0], [0.0, 0.0, 1.0], [x, 0.0])
    }

    /// Two triangles sharing an edge, one meshlet.
    fn quad(name: &str, texture: &str, base: f32) -> ModelReplacement {
        ModelReplacement {
            name: name.to_string(),
            meshlets: vec![Meshlet {
                vert_offset: 0,
                vert_count: 4,
                local_offset: 0,
                tri_count: 2,
                tex_idx: 0,
            }],
            verts: (0..4).map(|i| vertex(base + i as f32)).collect(),
            indices: vec![0, 1, 2, 3],
            local_indices: vec![0, 1, 2, 2, 1, 3, 0, 0],
            texture_file_names: vec![texture.to_string()],
        }
    }

    #[test]
    fn test_append_rebases_offsets() {
        let mut textures = TextureTable::new();
        textures.register("Metal.png");
        textures.register("Wood.png");

        let mut arena = GeometryArena::new();
        let first = arena
            .append(&quad("A", "Wood.png", 0.0), &textures)
            .unwrap();
        let second = arena
            .append(&quad("B", "Metal.png", 10.0), &textures)
            .unwrap();

        assert_eq!(first.first_meshlet, 0);
        assert_eq!(second.first_meshlet, 1);
        assert_eq!(second.first_vertex, 4);

        assert_eq!(arena.indices(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        let m = arena.meshlets()[1];
        assert_eq!(m.vert_offset, 4);
        assert_eq!(m.local_offset, 8);
        assert_eq!(arena.meshlets()[0].tex_idx, 1);
        assert_eq!(m.tex_idx, 0);

        assert_eq!(
            arena.commands()[1],
            DrawIndirectCommand {
                vertex_count: 6,
                instance_count: 1,
                first_vertex: 8,
                first_instance: 1,
            }
        );
        assert_eq!(arena.command_bytes().len(), 2 * 16);
    }

    #[test]
    fn test_resolve_vertex_matches_model() {
        let mut textures = TextureTable::new();
        textures.register("Wood.png");
        let models = [quad("A", "Wood.png", 0.0), quad("B", "Wood.png", 10.0)];

        let mut arena = GeometryArena::new();
        for model in &models {
            arena.append(model, &textures).unwrap();
        }

        for (n, model) in models.iter().enumerate() {
            let command = arena.commands()[n];
            for corner in 0..command.vertex_count {
                assert_eq!(
                    arena.resolve_vertex(command.first_vertex + corner, command.first_instance),
                    model.corner_vertex(0, corner as usize)
                );
            }
        }
    }

    #[test]
    fn test_unregistered_texture() {
        let textures = TextureTable::new();
        let mut arena = GeometryArena::new();
        let err = arena
            .append(&quad("A", "Wood.png", 0.0), &textures)
            .unwrap_err();
        assert_eq!(err, ConsumeError::UnregisteredTexture("Wood.png".to_string()));
        assert!(arena.meshlets().is_empty());
        assert!(arena.verts().is_empty());
    }

    #[test]
    fn test_texture_slot_out_of_range() {
        let mut textures = TextureTable::new();
        textures.register("Wood.png");
        let mut model = quad("A", "Wood.png", 0.0);
        model.meshlets[0].tex_idx = 3;

        let err = GeometryArena::new().append(&model, &textures).unwrap_err();
        assert_eq!(
            err,
            ConsumeError::TextureSlotOutOfRange {
                meshlet: 0,
                slot: 3,
                slots: 1
            }
        );
    }

    #[test]
    fn test_rebase_overflow_leaves_arena_unchanged() {
        let mut textures = TextureTable::new();
        textures.register("Wood.png");
        let mut arena = GeometryArena::new();
        arena.append(&quad("A", "Wood.png", 0.0), &textures).unwrap();

        let mut model = quad("B", "Wood.png", 10.0);
        model.indices[3] = u32::MAX;
        assert_eq!(arena.append(&model, &textures), Err(ConsumeError::Overflow));

        let mut model = quad("C", "Wood.png", 20.0);
        model.meshlets[0].local_offset = u32::MAX - 4;
        assert_eq!(arena.append(&model, &textures), Err(ConsumeError::Overflow));

        assert_eq!(arena.verts().len(), 4);
        assert_eq!(arena.indices(), &[0, 1, 2, 3]);
        assert_eq!(arena.local_indices().len(), 8);
        assert_eq!(arena.meshlets().len(), 1);
        assert_eq!(arena.commands().len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut textures = TextureTable::new();
        textures.register("Wood.png");
        let mut arena = GeometryArena::new();
        arena.append(&quad("A", "Wood.png", 0.0), &textures).unwrap();
        arena.clear();
        assert!(arena.commands().is_empty());
        assert_eq!(arena.resolve_vertex(0, 0), None);
    }
}
