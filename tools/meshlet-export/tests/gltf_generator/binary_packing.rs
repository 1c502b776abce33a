//! Binary data packing for glTF buffers.

use super::mesh_data::{compute_bounds, MeshData};
use super::{IndexWidth, VertexLayout};
use gltf_json as json;
use json::validation::Checked::Valid;

/// Accessor indices (fixed order)
pub const POSITION_ACCESSOR: u32 = 0;
pub const NORMAL_ACCESSOR: u32 = 1;
pub const TEXCOORD_ACCESSOR: u32 = 2;
pub const INDEX_ACCESSOR: u32 = 3;

/// Pack all binary data into a single buffer
pub(crate) fn pack_binary_data(
    mesh: &MeshData,
    layout: VertexLayout,
    index_width: IndexWidth,
) -> (Vec<u8>, Vec<json::buffer::View>, Vec<json::Accessor>) {
    let mut buffer = Vec::new();
    let mut views = Vec::new();
    let mut accessors = Vec::new();

    // Helper to align buffer to 4 bytes
    fn align_buffer(buffer: &mut Vec<u8>) {
        while !buffer.len().is_multiple_of(4) {
            buffer.push(0);
        }
    }

    let count = mesh.vertex_count();
    let (min, max) = compute_bounds(&mesh.positions);
    let bounds = Some((min, max));

    match layout {
        VertexLayout::Interleaved => {
            let offset = buffer.len();
            for i in 0..count {
                buffer.extend_from_slice(bytemuck::cast_slice(&mesh.positions[i]));
                buffer.extend_from_slice(bytemuck::cast_slice(&mesh.normals[i]));
                buffer.extend_from_slice(bytemuck::cast_slice(&mesh.uvs[i]));
            }
            views.push(view(
                offset,
                buffer.len() - offset,
                Some(32),
                Some(json::buffer::Target::ArrayBuffer),
            ));
            let v = views.len() as u32 - 1;
            accessors.push(float_accessor(v, 0, count, json::accessor::Type::Vec3, bounds));
            accessors.push(float_accessor(v, 12, count, json::accessor::Type::Vec3, None));
            accessors.push(float_accessor(v, 24, count, json::accessor::Type::Vec2, None));
        }
        VertexLayout::Separate => {
            let offset = buffer.len();
            buffer.extend_from_slice(bytemuck::cast_slice(&mesh.positions));
            views.push(array_view(offset, buffer.len() - offset));
            accessors.push(float_accessor(
                views.len() as u32 - 1,
                0,
                count,
                json::accessor::Type::Vec3,
                bounds,
            ));

            let offset = buffer.len();
            buffer.extend_from_slice(bytemuck::cast_slice(&mesh.normals));
            views.push(array_view(offset, buffer.len() - offset));
            accessors.push(float_accessor(
                views.len() as u32 - 1,
                0,
                count,
                json::accessor::Type::Vec3,
                None,
            ));

            let offset = buffer.len();
            buffer.extend_from_slice(bytemuck::cast_slice(&mesh.uvs));
            views.push(array_view(offset, buffer.len() - offset));
            accessors.push(float_accessor(
                views.len() as u32 - 1,
                0,
                count,
                json::accessor::Type::Vec2,
                None,
            ));
        }
    }
    align_buffer(&mut buffer);

    // Indices, stored at the requested width
    let offset = buffer.len();
    let component_type = match index_width {
        IndexWidth::U8 => {
            buffer.extend(
                mesh.indices
                    .iter()
                    .map(|&i| u8::try_from(i).expect("index fits u8")),
            );
            json::accessor::ComponentType::U8
        }
        IndexWidth::U16 => {
            for &i in &mesh.indices {
                let i = u16::try_from(i).expect("index fits u16");
                buffer.extend_from_slice(&i.to_le_bytes());
            }
            json::accessor::ComponentType::U16
        }
        IndexWidth::U32 => {
            for &i in &mesh.indices {
                buffer.extend_from_slice(&i.to_le_bytes());
            }
            json::accessor::ComponentType::U32
        }
    };
    views.push(view(
        offset,
        buffer.len() - offset,
        None,
        Some(json::buffer::Target::ElementArrayBuffer),
    ));
    accessors.push(json::Accessor {
        buffer_view: Some(json::Index::new(views.len() as u32 - 1)),
        byte_offset: Some(0u64.into()),
        count: mesh.indices.len().into(),
        component_type: Valid(json::accessor::GenericComponentType(component_type)),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Scalar),
        min: None,
        max: None,
        name: None,
        normalized: false,
        sparse: None,
    });
    align_buffer(&mut buffer);

    (buffer, views, accessors)
}

fn view(
    offset: usize,
    length: usize,
    stride: Option<usize>,
    target: Option<json::buffer::Target>,
) -> json::buffer::View {
    json::buffer::View {
        buffer: json::Index::new(0),
        byte_length: length.into(),
        byte_offset: Some(offset.into()),
        byte_stride: stride.map(json::buffer::Stride),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: target.map(Valid),
    }
}

fn array_view(offset: usize, length: usize) -> json::buffer::View {
    view(
        offset,
        length,
        None,
        Some(json::buffer::Target::ArrayBuffer),
    )
}

fn float_accessor(
    view: u32,
    offset: usize,
    count: usize,
    type_: json::accessor::Type,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> json::Accessor {
    let to_value = |v: [f32; 3]| json::Value::Array(v.into_iter().map(json::Value::from).collect());
    json::Accessor {
        buffer_view: Some(json::Index::new(view)),
        byte_offset: Some(offset.into()),
        count: count.into(),
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::F32,
        )),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(type_),
        min: bounds.map(|(min, _)| to_value(min)),
        max: bounds.map(|(_, max)| to_value(max)),
        name: None,
        normalized: false,
        sparse: None,
    }
}
