//! Meshlet builder
//!
//! Turns one triangle-list primitive into meshlets: clusters the triangles,
//! trims the backend's scratch space, checks every structural guarantee the
//! backend claims, and rewrites source vertex ids into deduplicated ids.

use anyhow::{bail, Context, Result};
use meshlet_common::{padded_local_index_len, Meshlet, MeshletLimits, MeshletVertex, StridedView};
use tracing::debug;

use crate::cluster::{Clusterizer, RawClusters};
use crate::dedup::VertexDedupMap;

/// Source data for one primitive.
pub struct PrimitiveGeometry<'a> {
    /// Triangle list, already widened to `u32`
    pub indices: &'a [u32],
    pub positions: StridedView<'a, f32>,
    pub normals: StridedView<'a, f32>,
    pub uvs: StridedView<'a, f32>,
}

/// One primitive's meshlets, in primitive-local id space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltMeshlets {
    pub meshlets: Vec<Meshlet>,
    /// Deduplicated vertices
    pub vertices: Vec<MeshletVertex>,
    /// Meshlet vertex slot -> index into `vertices`
    pub vertex_indices: Vec<u32>,
    /// Local triangle corners, padded per meshlet to 4 bytes
    pub local_indices: Vec<u8>,
    /// Every meshlet's triangles as indices into `vertices`, in meshlet order
    pub unpacked_indices: Vec<u32>,
}

impl BuiltMeshlets {
    pub fn triangle_count(&self) -> usize {
        self.meshlets.iter().map(|m| m.tri_count as usize).sum()
    }
}

pub struct MeshletBuilder<'c> {
    limits: MeshletLimits,
    cone_weight: f32,
    clusterizer: &'c dyn Clusterizer,
}

impl<'c> MeshletBuilder<'c> {
    pub fn new(limits: MeshletLimits, cone_weight: f32, clusterizer: &'c dyn Clusterizer) -> Self {
        Self {
            limits,
            cone_weight,
            clusterizer,
        }
    }

    pub fn limits(&self) -> MeshletLimits {
        self.limits
    }

    pub fn build(&self, geometry: &PrimitiveGeometry<'_>) -> Result<BuiltMeshlets> {
        let indices = geometry.indices;
        if indices.is_empty() {
            bail!("Primitive has no triangles");
        }
        if indices.len() % 3 != 0 {
            bail!(
                "Index count {} is not a multiple of 3, not a triangle list",
                indices.len()
            );
        }
        let vertex_count = geometry.positions.len();
        if let Some((at, index)) = indices
            .iter()
            .enumerate()
            .find(|&(_, &index)| index as usize >= vertex_count)
        {
            bail!(
                "Index {} at position {} is out of range for {} vertices",
                index,
                at,
                vertex_count
            );
        }

        let positions: Vec<[f32; 3]> = geometry
            .positions
            .iter::<3>()
            .context("Invalid POSITION data")?
            .collect();

        let bound = self.clusterizer.meshlet_bound(indices.len(), self.limits);
        let raw = self
            .clusterizer
            .build(indices, &positions, self.limits, self.cone_weight)
            .with_context(|| format!("{} clusterizer failed", self.clusterizer.name()))?;
        if raw.meshlets.is_empty() {
            bail!("Clusterizer returned no meshlets");
        }
        if raw.meshlets.len() > bound {
            bail!(
                "Clusterizer returned {} meshlets, more than its bound of {}",
                raw.meshlets.len(),
                bound
            );
        }
        let raw = trim(raw)?;

        // Remap meshlet vertex slots from source ids to deduplicated ids
        let mut dedup = VertexDedupMap::with_capacity(raw.vertices.len());
        let vertex_indices = raw
            .vertices
            .iter()
            .map(|&source| {
                let vertex = source_vertex(geometry, source as usize)?;
                Ok(dedup.lookup_or_insert(vertex))
            })
            .collect::<Result<Vec<u32>>>()?;

        let mut meshlets = Vec::with_capacity(raw.meshlets.len());
        let mut unpacked_indices = Vec::with_capacity(indices.len());
        for (n, m) in raw.meshlets.iter().enumerate() {
            if m.vertex_count == 0 || m.triangle_count == 0 {
                bail!("Meshlet {} is empty", n);
            }
            if m.vertex_count > self.limits.max_vertices
                || m.triangle_count > self.limits.max_triangles
            {
                bail!(
                    "Meshlet {} has {} vertices and {} triangles, over the limits of {} and {}",
                    n,
                    m.vertex_count,
                    m.triangle_count,
                    self.limits.max_vertices,
                    self.limits.max_triangles
                );
            }
            if m.triangle_offset % 4 != 0 {
                bail!(
                    "Meshlet {} local indices start at unaligned offset {}",
                    n,
                    m.triangle_offset
                );
            }

            let vertex_start = m.vertex_offset as usize;
            let slots = vertex_indices
                .get(vertex_start..vertex_start + m.vertex_count as usize)
                .with_context(|| format!("Meshlet {} vertex range is out of bounds", n))?;
            let corner_start = m.triangle_offset as usize;
            let corners = raw
                .triangles
                .get(corner_start..corner_start + m.triangle_count as usize * 3)
                .with_context(|| format!("Meshlet {} triangle range is out of bounds", n))?;

            for &local in corners {
                let slot = slots.get(local as usize).with_context(|| {
                    format!(
                        "Meshlet {} local index {} is out of range for {} vertices",
                        n, local, m.vertex_count
                    )
                })?;
                unpacked_indices.push(*slot);
            }

            meshlets.push(Meshlet {
                vert_offset: m.vertex_offset,
                vert_count: m.vertex_count,
                local_offset: m.triangle_offset,
                tri_count: m.triangle_count,
                tex_idx: 0,
            });
        }

        if unpacked_indices.len() != indices.len() {
            bail!(
                "Meshlets cover {} triangles, the primitive has {}",
                unpacked_indices.len() / 3,
                indices.len() / 3
            );
        }

        debug!(
            "Built {} meshlets from {} triangles ({} -> {} vertices)",
            meshlets.len(),
            indices.len() / 3,
            vertex_count,
            dedup.len()
        );

        Ok(BuiltMeshlets {
            meshlets,
            vertices: dedup.into_vertices(),
            vertex_indices,
            local_indices: raw.triangles,
            unpacked_indices,
        })
    }
}

/// Drop backend scratch space past the last meshlet.
fn trim(mut raw: RawClusters) -> Result<RawClusters> {
    let Some(last) = raw.meshlets.last().copied() else {
        return Ok(raw);
    };
    let vertex_end = last.vertex_offset as usize + last.vertex_count as usize;
    let local_end = last.triangle_offset as usize + padded_local_index_len(last.triangle_count as usize);
    if vertex_end > raw.vertices.len() || local_end > raw.triangles.len() {
        bail!(
            "Clusterizer output is shorter than its last meshlet ({} of {} vertices, {} of {} local indices)",
            raw.vertices.len(),
            vertex_end,
            raw.triangles.len(),
            local_end
        );
    }
    raw.vertices.truncate(vertex_end);
    raw.triangles.truncate(local_end);
    Ok(raw)
}

fn source_vertex(geometry: &PrimitiveGeometry<'_>, index: usize) -> Result<MeshletVertex> {
    let position = geometry
        .positions
        .get::<3>(index)
        .with_context(|| format!("POSITION has no element {}", index))?;
    let normal = geometry
        .normals
        .get::<3>(index)
        .with_context(|| format!("NORMAL has no element {}", index))?;
    let uv = geometry
        .uvs
        .get::<2>(index)
        .with_context(|| format!("TEXCOORD_0 has no element {}", index))?;
    Ok(MeshletVertex::new(position, normal, uv))
}
