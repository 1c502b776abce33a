//! Programmatic glTF generation for integration tests.
//!
//! Generates plain (extension-free) textured triangle meshes with:
//! - POSITION (with min/max), NORMAL and TEXCOORD_0 attributes
//! - interleaved or separate attribute layouts
//! - u8, u16 or u32 indices

#![allow(dead_code)]

mod binary_packing;
mod glb_assembly;
mod gltf_json;
mod mesh_data;

pub use binary_packing::{INDEX_ACCESSOR, NORMAL_ACCESSOR, POSITION_ACCESSOR, TEXCOORD_ACCESSOR};
pub use glb_assembly::assemble_glb;
pub use self::gltf_json::TEXTURE_NAME;
pub use mesh_data::{create_grid, create_split_quad, create_triangle, MeshData};

/// Storage width of the index accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

/// How vertex attributes are laid out in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    /// One view, stride 32
    Interleaved,
    /// One tightly packed view per attribute
    Separate,
}

/// JSON root and binary buffer, for tests that edit the document before
/// assembling it.
pub fn generate_parts(
    name: &str,
    mesh: &MeshData,
    layout: VertexLayout,
    index_width: IndexWidth,
) -> (::gltf_json::Root, Vec<u8>) {
    let (buffer_data, buffer_views, accessors) =
        binary_packing::pack_binary_data(mesh, layout, index_width);
    let root = gltf_json::build_gltf_json(name, &buffer_views, &accessors);
    (root, buffer_data)
}

/// Generate a complete GLB.
pub fn generate_glb(
    name: &str,
    mesh: &MeshData,
    layout: VertexLayout,
    index_width: IndexWidth,
) -> Vec<u8> {
    let (root, buffer_data) = generate_parts(name, mesh, layout, index_width);
    assemble_glb(&root, &buffer_data)
}
