//! glTF JSON structure building.

use super::binary_packing::{INDEX_ACCESSOR, NORMAL_ACCESSOR, POSITION_ACCESSOR, TEXCOORD_ACCESSOR};
use gltf_json as json;
use json::validation::Checked::Valid;
use std::collections::BTreeMap;

/// Texture every generated mesh is drawn with
pub const TEXTURE_NAME: &str = "Checker";

/// Build the glTF JSON structure: one textured mesh under one node.
pub(crate) fn build_gltf_json(
    name: &str,
    buffer_views: &[json::buffer::View],
    accessors: &[json::Accessor],
) -> json::Root {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        Valid(json::mesh::Semantic::Positions),
        json::Index::new(POSITION_ACCESSOR),
    );
    attributes.insert(
        Valid(json::mesh::Semantic::Normals),
        json::Index::new(NORMAL_ACCESSOR),
    );
    attributes.insert(
        Valid(json::mesh::Semantic::TexCoords(0)),
        json::Index::new(TEXCOORD_ACCESSOR),
    );

    json::Root {
        accessors: accessors.to_vec(),
        asset: json::Asset {
            copyright: None,
            extensions: Default::default(),
            extras: Default::default(),
            generator: Some("meshlet-export tests".to_string()),
            min_version: None,
            version: "2.0".to_string(),
        },
        buffers: vec![json::Buffer {
            byte_length: 0usize.into(), // Updated by assemble_glb
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            uri: None,
        }],
        buffer_views: buffer_views.to_vec(),
        images: vec![json::Image {
            buffer_view: None,
            mime_type: None,
            name: None,
            uri: Some(format!("textures/{}.png", TEXTURE_NAME)),
            extensions: Default::default(),
            extras: Default::default(),
        }],
        materials: vec![json::Material {
            name: Some(TEXTURE_NAME.to_string()),
            pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                base_color_texture: Some(json::texture::Info {
                    index: json::Index::new(0),
                    tex_coord: 0,
                    extensions: Default::default(),
                    extras: Default::default(),
                }),
                ..Default::default()
            },
            ..Default::default()
        }],
        meshes: vec![json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name.to_string()),
            primitives: vec![json::mesh::Primitive {
                attributes,
                extensions: Default::default(),
                extras: Default::default(),
                indices: Some(json::Index::new(INDEX_ACCESSOR)),
                material: Some(json::Index::new(0)),
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
            }],
            weights: None,
        }],
        nodes: vec![json::Node {
            camera: None,
            children: None,
            extensions: Default::default(),
            extras: Default::default(),
            matrix: None,
            mesh: Some(json::Index::new(0)),
            name: Some(name.to_string()),
            rotation: None,
            scale: None,
            translation: None,
            skin: None,
            weights: None,
        }],
        samplers: vec![json::texture::Sampler {
            mag_filter: Some(Valid(json::texture::MagFilter::Nearest)),
            min_filter: Some(Valid(json::texture::MinFilter::Nearest)),
            ..Default::default()
        }],
        scene: Some(json::Index::new(0)),
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            nodes: vec![json::Index::new(0)],
        }],
        textures: vec![json::Texture {
            name: None,
            sampler: Some(json::Index::new(0)),
            source: json::Index::new(0),
            extensions: Default::default(),
            extras: Default::default(),
        }],
        ..Default::default()
    }
}
