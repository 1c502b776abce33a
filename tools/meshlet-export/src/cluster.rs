//! Clustering backends
//!
//! A backend partitions an indexed triangle list into meshlets and reports
//! them in the meshoptimizer layout: per meshlet an offset into a flat
//! vertex-id array and an offset into a flat byte array of local triangle
//! corners, each meshlet's corner run padded to a multiple of 4 bytes.
//! The builder treats backends as black boxes and re-validates everything
//! they return.

use anyhow::{anyhow, Result};
use meshlet_common::MeshletLimits;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawMeshlet {
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub triangle_offset: u32,
    pub triangle_count: u32,
}

/// Backend output. Arrays may carry trailing scratch space past the last meshlet.
#[derive(Debug, Clone, Default)]
pub struct RawClusters {
    pub meshlets: Vec<RawMeshlet>,
    /// Meshlet vertex slot -> source vertex id
    pub vertices: Vec<u32>,
    /// Local triangle corners, each < the owning meshlet's vertex count
    pub triangles: Vec<u8>,
}

pub trait Clusterizer {
    fn name(&self) -> &'static str;

    /// Upper bound on the number of meshlets `build` may return.
    fn meshlet_bound(&self, index_count: usize, limits: MeshletLimits) -> usize {
        meshlet_bound(index_count, limits)
    }

    fn build(
        &self,
        indices: &[u32],
        positions: &[[f32; 3]],
        limits: MeshletLimits,
        cone_weight: f32,
    ) -> Result<RawClusters>;
}

/// Conservative meshlet count bound, identical to `meshopt_buildMeshletsBound`.
pub fn meshlet_bound(index_count: usize, limits: MeshletLimits) -> usize {
    let max_vertices = (limits.max_vertices as usize).saturating_sub(2).max(1);
    let max_triangles = (limits.max_triangles as usize).max(1);
    let by_vertices = index_count.div_ceil(max_vertices);
    let by_triangles = (index_count / 3).div_ceil(max_triangles);
    by_vertices.max(by_triangles)
}

/// meshoptimizer's spatially aware builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshoptClusterizer;

impl Clusterizer for MeshoptClusterizer {
    fn name(&self) -> &'static str {
        "meshopt"
    }

    fn build(
        &self,
        indices: &[u32],
        positions: &[[f32; 3]],
        limits: MeshletLimits,
        cone_weight: f32,
    ) -> Result<RawClusters> {
        let adapter = meshopt::VertexDataAdapter::new(
            bytemuck::cast_slice(positions),
            std::mem::size_of::<[f32; 3]>(),
            0,
        )
        .map_err(|e| anyhow!("Failed to wrap vertex positions: {:?}", e))?;

        let built = meshopt::build_meshlets(
            indices,
            &adapter,
            limits.max_vertices as usize,
            limits.max_triangles as usize,
            cone_weight,
        );
        debug!("meshopt produced {} meshlets", built.meshlets.len());

        Ok(RawClusters {
            meshlets: built
                .meshlets
                .iter()
                .map(|m| RawMeshlet {
                    vertex_offset: m.vertex_offset,
                    vertex_count: m.vertex_count,
                    triangle_offset: m.triangle_offset,
                    triangle_count: m.triangle_count,
                })
                .collect(),
            vertices: built.vertices,
            triangles: built.triangles,
        })
    }
}

/// Order-preserving greedy builder.
///
/// Walks the triangles in index order and starts a new meshlet whenever the
/// next triangle would exceed either limit. Ignores positions and cone weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyClusterizer;

impl Clusterizer for GreedyClusterizer {
    fn name(&self) -> &'static str {
        "greedy"
    }

    /// Every closed meshlet is full in vertices (at least `max_vertices - 2`
    /// corners) or in triangles, plus one trailing partial meshlet.
    fn meshlet_bound(&self, index_count: usize, limits: MeshletLimits) -> usize {
        let max_vertices = (limits.max_vertices as usize).saturating_sub(2).max(1);
        let max_triangles = (limits.max_triangles as usize).max(1);
        index_count / max_vertices + (index_count / 3) / max_triangles + 1
    }

    fn build(
        &self,
        indices: &[u32],
        _positions: &[[f32; 3]],
        limits: MeshletLimits,
        _cone_weight: f32,
    ) -> Result<RawClusters> {
        let max_vertices = limits.max_vertices as usize;
        let max_triangles = limits.max_triangles as usize;
        if !(3..=256).contains(&max_vertices) || max_triangles == 0 {
            return Err(anyhow!("Meshlet limits too small: {:?}", limits));
        }

        let mut out = RawClusters::default();
        let mut current = OpenMeshlet::default();

        for triangle in indices.chunks_exact(3) {
            let new_vertices = triangle
                .iter()
                .enumerate()
                .filter(|&(k, v)| !triangle[..k].contains(v) && !current.vertices.contains(v))
                .count();
            if current.vertices.len() + new_vertices > max_vertices
                || current.triangle_count + 1 > max_triangles
            {
                current.flush(&mut out);
            }
            for &vertex in triangle {
                let local = current.local(vertex);
                current.corners.push(local);
            }
            current.triangle_count += 1;
        }
        current.flush(&mut out);

        debug!("greedy produced {} meshlets", out.meshlets.len());
        Ok(out)
    }
}

#[derive(Default)]
struct OpenMeshlet {
    vertices: Vec<u32>,
    corners: Vec<u8>,
    triangle_count: usize,
}

impl OpenMeshlet {
    /// Slot of `vertex`, appending it if new. Callers keep the slot count <= 256.
    fn local(&mut self, vertex: u32) -> u8 {
        let slot = match self.vertices.iter().position(|&v| v == vertex) {
            Some(slot) => slot,
            None => {
                self.vertices.push(vertex);
                self.vertices.len() - 1
            }
        };
        slot as u8
    }

    fn flush(&mut self, out: &mut RawClusters) {
        if self.triangle_count == 0 {
            return;
        }
        out.meshlets.push(RawMeshlet {
            vertex_offset: out.vertices.len() as u32,
            vertex_count: self.vertices.len() as u32,
            triangle_offset: out.triangles.len() as u32,
            triangle_count: self.triangle_count as u32,
        });
        out.vertices.append(&mut self.vertices);
        out.triangles.append(&mut self.corners);
        let padded = out.triangles.len().next_multiple_of(4);
        out.triangles.resize(padded, 0);
        self.triangle_count = 0;
    }
}
