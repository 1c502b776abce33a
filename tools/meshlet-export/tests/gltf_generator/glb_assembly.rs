//! GLB container assembly.

use gltf_json as json;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F534A;
const CHUNK_BIN: u32 = 0x004E4942;

/// Wrap a JSON root and its single binary buffer into a GLB file.
pub fn assemble_glb(root: &json::Root, buffer_data: &[u8]) -> Vec<u8> {
    let mut root = root.clone();
    root.buffers[0].byte_length = buffer_data.len().into();

    let json_string = json::serialize::to_string(&root).expect("Failed to serialize JSON");
    let json_chunk = padded(json_string.as_bytes(), b' ');
    let bin_chunk = padded(buffer_data, 0);

    let total_length = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut glb = Vec::with_capacity(total_length);

    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    for (chunk_type, chunk) in [(CHUNK_JSON, json_chunk), (CHUNK_BIN, bin_chunk)] {
        glb.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        glb.extend_from_slice(&chunk_type.to_le_bytes());
        glb.extend_from_slice(&chunk);
    }

    glb
}

/// Chunks are 4-byte aligned
fn padded(bytes: &[u8], fill: u8) -> Vec<u8> {
    let mut out = bytes.to_vec();
    while !out.len().is_multiple_of(4) {
        out.push(fill);
    }
    out
}
