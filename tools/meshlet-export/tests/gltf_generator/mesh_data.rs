//! Test mesh shapes.

/// Separate attribute arrays plus a u32 index list
#[derive(Debug, Clone)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// One triangle, three unique vertices
pub fn create_triangle() -> MeshData {
    MeshData {
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        normals: vec![[0.0, 1.0, 0.0]; 3],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        indices: vec![0, 1, 2],
    }
}

/// Two triangles sharing an edge, written as six unshared vertices.
///
/// Only four distinct attribute tuples exist.
pub fn create_split_quad() -> MeshData {
    let corners = [
        ([0.0, 0.0, 0.0], [0.0, 0.0]),
        ([1.0, 0.0, 0.0], [1.0, 0.0]),
        ([1.0, 0.0, 1.0], [1.0, 1.0]),
        ([0.0, 0.0, 1.0], [0.0, 1.0]),
    ];
    let order = [0, 1, 2, 0, 2, 3];
    MeshData {
        positions: order.iter().map(|&c| corners[c].0).collect(),
        normals: vec![[0.0, 1.0, 0.0]; order.len()],
        uvs: order.iter().map(|&c| corners[c].1).collect(),
        indices: (0..order.len() as u32).collect(),
    }
}

/// `cells × cells` grid of quads over shared vertices.
///
/// Up to 15 cells keeps every index within a u8.
pub fn create_grid(cells: u32) -> MeshData {
    let side = cells + 1;
    let mut mesh = MeshData {
        positions: Vec::new(),
        normals: Vec::new(),
        uvs: Vec::new(),
        indices: Vec::new(),
    };

    for z in 0..side {
        for x in 0..side {
            let (u, v) = (x as f32 / cells as f32, z as f32 / cells as f32);
            // A gentle bump so positions are not coplanar
            let y = ((x as f32 * 0.7).sin() + (z as f32 * 0.4).cos()) * 0.25;
            mesh.positions.push([u * 4.0, y, v * 4.0]);
            mesh.normals.push([0.0, 1.0, 0.0]);
            mesh.uvs.push([u, v]);
        }
    }

    for z in 0..cells {
        for x in 0..cells {
            let i = z * side + x;
            mesh.indices
                .extend_from_slice(&[i, i + side, i + 1, i + 1, i + side, i + side + 1]);
        }
    }

    mesh
}

/// Compute bounding box for positions
pub fn compute_bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in positions {
        for i in 0..3 {
            min[i] = min[i].min(p[i]);
            max[i] = max[i].max(p[i]);
        }
    }
    (min, max)
}
