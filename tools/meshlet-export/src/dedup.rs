//! Vertex deduplication map
//!
//! Canonicalizes vertex attribute tuples to dense ids in insertion order.
//! Equality is bit-exact over all eight floats (see [`MeshletVertex::bits`]):
//! no epsilon, no signed-zero or NaN normalization. A map lives for one
//! primitive's clustering pass.

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use meshlet_common::MeshletVertex;

#[derive(Debug, Default)]
pub struct VertexDedupMap {
    ids: HashMap<[u32; 8], u32>,
    vertices: Vec<MeshletVertex>,
}

impl VertexDedupMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashMap::with_capacity(capacity),
            vertices: Vec::with_capacity(capacity),
        }
    }

    /// Id of an identical vertex seen earlier, or a new id appended at the end.
    pub fn lookup_or_insert(&mut self, vertex: MeshletVertex) -> u32 {
        match self.ids.entry(vertex.bits()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.vertices.len() as u32;
                entry.insert(id);
                self.vertices.push(vertex);
                id
            }
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Unique vertices, indexed by id.
    pub fn vertices(&self) -> &[MeshletVertex] {
        &self.vertices
    }

    pub fn into_vertices(self) -> Vec<MeshletVertex> {
        self.vertices
    }
}
