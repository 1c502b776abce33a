//! Plain glTF export
//!
//! Writes an engine model as an ordinary glTF document: one primitive per
//! texture, convex polygons fan-triangulated, positions and normals moved
//! into glTF space. The result carries no extension and is the encoder's
//! usual input.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use gltf::json;
use json::validation::Checked::Valid;
use tracing::{debug, info};

use meshlet_common::{engine_to_disk, plain_export_path, MeshletVertex};

/// An engine model grouped by texture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlainModel {
    pub name: String,
    pub groups: Vec<TextureGroup>,
}

/// Convex polygons sharing one texture, vertices in engine space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureGroup {
    pub texture: String,
    pub polygons: Vec<Vec<MeshletVertex>>,
}

/// Build the plain glTF document for `model`.
pub fn export_plain(model: &PlainModel) -> Result<json::Root> {
    let mut vertices: Vec<MeshletVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut images = Vec::new();
    let mut textures = Vec::new();
    let mut materials = Vec::new();
    let mut primitives = Vec::new();
    // POSITION, NORMAL, TEXCOORD_0 come first; index accessors follow
    let mut index_accessors = Vec::new();

    for group in &model.groups {
        let first_index = indices.len();
        for polygon in &group.polygons {
            if polygon.len() < 3 {
                continue;
            }
            let first = u32::try_from(vertices.len()).context("Too many vertices")?;
            vertices.extend(polygon.iter().map(|v| {
                MeshletVertex::new(engine_to_disk(v.position), engine_to_disk(v.normal), v.uv)
            }));
            // Swapping Y and Z mirrors the model, so the fan winds backwards
            for j in 2..polygon.len() as u32 {
                indices.extend([first, first + j, first + j - 1]);
            }
        }
        let count = indices.len() - first_index;
        if count == 0 {
            debug!("Skipping texture group {} without polygons", group.texture);
            continue;
        }

        let image = images.len() as u32;
        images.push(json::Image {
            buffer_view: None,
            mime_type: Some(json::image::MimeType("image/png".to_string())),
            name: Some(group.texture.clone()),
            uri: Some(format!("{}.png", group.texture)),
            extensions: Default::default(),
            extras: Default::default(),
        });
        let texture = textures.len() as u32;
        textures.push(json::Texture {
            name: None,
            sampler: Some(json::Index::new(0)),
            source: json::Index::new(image),
            extensions: Default::default(),
            extras: Default::default(),
        });
        let material = materials.len() as u32;
        materials.push(json::Material {
            name: Some(group.texture.clone()),
            pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                base_color_texture: Some(json::texture::Info {
                    index: json::Index::new(texture),
                    tex_coord: 0,
                    extensions: Default::default(),
                    extras: Default::default(),
                }),
                ..Default::default()
            },
            ..Default::default()
        });

        let accessor = 3 + index_accessors.len() as u32;
        index_accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(1)),
            byte_offset: Some((first_index * 4).into()),
            count: count.into(),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::U32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(json::accessor::Type::Scalar),
            min: None,
            max: None,
            name: None,
            normalized: false,
            sparse: None,
        });

        let mut attributes = BTreeMap::new();
        attributes.insert(Valid(json::mesh::Semantic::Positions), json::Index::new(0));
        attributes.insert(Valid(json::mesh::Semantic::Normals), json::Index::new(1));
        attributes.insert(Valid(json::mesh::Semantic::TexCoords(0)), json::Index::new(2));
        primitives.push(json::mesh::Primitive {
            attributes,
            extensions: Default::default(),
            extras: Default::default(),
            indices: Some(json::Index::new(accessor)),
            material: Some(json::Index::new(material)),
            mode: Valid(json::mesh::Mode::Triangles),
            targets: None,
        });
    }

    if primitives.is_empty() {
        bail!("Model {} has no drawable polygons", model.name);
    }

    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for v in &vertices {
        for i in 0..3 {
            min[i] = min[i].min(v.position[i]);
            max[i] = max[i].max(v.position[i]);
        }
    }

    let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);

    let attribute = |offset: usize, type_, bounds: Option<([f32; 3], [f32; 3])>| {
        let to_value =
            |v: [f32; 3]| json::Value::Array(v.into_iter().map(json::Value::from).collect());
        json::Accessor {
            buffer_view: Some(json::Index::new(0)),
            byte_offset: Some(offset.into()),
            count: vertices.len().into(),
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
    };
    let mut accessors = vec![
        attribute(
            MeshletVertex::POSITION_OFFSET,
            json::accessor::Type::Vec3,
            Some((min, max)),
        ),
        attribute(MeshletVertex::NORMAL_OFFSET, json::accessor::Type::Vec3, None),
        attribute(MeshletVertex::UV_OFFSET, json::accessor::Type::Vec2, None),
    ];
    accessors.extend(index_accessors);

    let buffer = |bytes: &[u8]| json::Buffer {
        byte_length: bytes.len().into(),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: Some(format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )),
    };
    let view = |buffer: u32, bytes: &[u8], stride: Option<usize>, target| json::buffer::View {
        buffer: json::Index::new(buffer),
        byte_length: bytes.len().into(),
        byte_offset: Some(0u64.into()),
        byte_stride: stride.map(json::buffer::Stride),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(target)),
    };

    Ok(json::Root {
        accessors,
        asset: json::Asset {
            copyright: None,
            extensions: Default::default(),
            extras: Default::default(),
            generator: Some("meshlet-export".to_string()),
            min_version: None,
            version: "2.0".to_string(),
        },
        buffers: vec![buffer(vertex_bytes), buffer(index_bytes)],
        buffer_views: vec![
            view(
                0,
                vertex_bytes,
                Some(MeshletVertex::SIZE),
                json::buffer::Target::ArrayBuffer,
            ),
            view(1, index_bytes, None, json::buffer::Target::ElementArrayBuffer),
        ],
        images,
        materials,
        meshes: vec![json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(model.name.clone()),
            primitives,
            weights: None,
        }],
        nodes: vec![json::Node {
            camera: None,
            children: None,
            extensions: Default::default(),
            extras: Default::default(),
            matrix: None,
            mesh: Some(json::Index::new(0)),
            name: Some(model.name.clone()),
            rotation: None,
            scale: None,
            translation: None,
            skin: None,
            weights: None,
        }],
        samplers: vec![json::texture::Sampler {
            mag_filter: Some(Valid(json::texture::MagFilter::Linear)),
            min_filter: Some(Valid(json::texture::MinFilter::Linear)),
            ..Default::default()
        }],
        scene: Some(json::Index::new(0)),
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(model.name.clone()),
            nodes: vec![json::Index::new(0)],
        }],
        textures,
        ..Default::default()
    })
}

/// Export `model` to `<dir>/<model>.gltf`.
pub fn write_plain_gltf(model: &PlainModel, dir: &Path) -> Result<PathBuf> {
    let root = export_plain(model)?;
    let path = plain_export_path(dir, &model.name);
    let text = serde_json::to_string_pretty(&root).context("Failed to serialize glTF")?;
    std::fs::write(&path, text).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Exported {} to {:?}", model.name, path);
    Ok(path)
}
