//! Extension encoder
//!
//! Rewrites a plain glTF document so every mesh primitive becomes a run of
//! meshlet primitives carrying `NONE_deus_ex_vk_render_mesh`.
//!
//! Output layout, four buffers embedded as base64 data URIs:
//!
//! | buffer | view                          | contents                               |
//! |--------|-------------------------------|----------------------------------------|
//! | 0      | `vertex buffer`               | interleaved vertices, stride 32        |
//! | 1      | `index buffer`                | unpacked u32 triangle indices          |
//! | 2      | `meshlet vertex index buffer` | u32 meshlet vertex slot -> vertex      |
//! | 3      | `meshlet local index buffer`  | u8 triangle corners, 4-byte padded     |
//!
//! Accessors 0..3 are POSITION, NORMAL and TEXCOORD_0 over the vertex
//! buffer. Each meshlet adds three accessors: unpacked indices, vertex
//! indices and local indices. Vertex values are copied bit-exactly.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use gltf::json;
use gltf::mesh::Semantic;
use json::validation::Checked::Valid;
use tracing::{debug, info};

use crate::builder::{BuiltMeshlets, MeshletBuilder, PrimitiveGeometry};
use crate::cluster::Clusterizer;
use crate::config::ExportConfig;
use meshlet_common::{
    read_index_buffer, resolve_buffer, AccessorLayout, MeshletVertex, PrimitiveExtension,
    StridedView, ATTRIBUTE_NORMAL, ATTRIBUTE_POSITION, ATTRIBUTE_TEXCOORD_0, EXTENSION_NAME,
};

const VERTEX_VIEW: u32 = 0;
const INDEX_VIEW: u32 = 1;
const MESHLET_VERTEX_INDEX_VIEW: u32 = 2;
const MESHLET_LOCAL_INDEX_VIEW: u32 = 3;

const POSITION_ACCESSOR: u32 = 0;
const NORMAL_ACCESSOR: u32 = 1;
const TEXCOORD_ACCESSOR: u32 = 2;
const VERTEX_ACCESSOR_COUNT: u32 = 3;

/// Counts reported after a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    pub meshes: usize,
    pub source_primitives: usize,
    pub meshlets: usize,
    pub vertices: usize,
    pub triangles: usize,
}

/// Convert a plain glTF/GLB file into a meshlet replacement file.
pub fn convert_gltf(input: &Path, output: &Path, config: &ExportConfig) -> Result<EncodeSummary> {
    info!("Converting glTF: {:?} -> {:?}", input, output);

    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(input).with_context(|| format!("Failed to load glTF: {:?}", input))?;
    let buffers = gltf::import_buffers(&document, input.parent(), blob)
        .with_context(|| format!("Failed to load buffers of {:?}", input))?;

    let clusterizer = config.clusterizer();
    let (root, summary) = encode_document(&document, &buffers, config, clusterizer.as_ref())
        .with_context(|| format!("Failed to convert {:?}", input))?;

    let text = serde_json::to_string_pretty(&root).context("Failed to serialize glTF")?;
    std::fs::write(output, text).with_context(|| format!("Failed to write {:?}", output))?;

    info!(
        "  {} meshes, {} primitives -> {} meshlets, {} vertices, {} triangles",
        summary.meshes,
        summary.source_primitives,
        summary.meshlets,
        summary.vertices,
        summary.triangles
    );
    Ok(summary)
}

/// Build the extension-carrying document from a loaded plain document.
///
/// Deterministic: identical input and settings produce an identical root.
pub fn encode_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    config: &ExportConfig,
    clusterizer: &dyn Clusterizer,
) -> Result<(json::Root, EncodeSummary)> {
    config.validate()?;
    let source = document.as_json();

    if source.extensions_used.iter().any(|e| e == EXTENSION_NAME)
        || source.extensions_required.iter().any(|e| e == EXTENSION_NAME)
    {
        bail!(
            "Model already uses {}; converting it again would discard its meshlets",
            EXTENSION_NAME
        );
    }
    if let Some(image) = document
        .images()
        .find(|image| matches!(image.source(), gltf::image::Source::View { .. }))
    {
        bail!(
            "Image {} is stored in a buffer view, which the buffer rewrite would orphan",
            image.index()
        );
    }
    // Both address accessors by index, and the accessor table is replaced
    if !source.animations.is_empty() {
        bail!("Model has {} animations", source.animations.len());
    }
    if !source.skins.is_empty() {
        bail!("Model has {} skins", source.skins.len());
    }

    let limits = config.limits();
    let builder = MeshletBuilder::new(limits, config.cone_weight, clusterizer);
    let mut state = EncodeState::default();
    let mut meshes = Vec::with_capacity(source.meshes.len());
    let mut summary = EncodeSummary::default();

    for mesh in document.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let built = build_primitive(&builder, &primitive, buffers).with_context(|| {
                format!(
                    "Mesh {} ({}) primitive {}",
                    mesh.index(),
                    mesh.name().unwrap_or("unnamed"),
                    primitive.index()
                )
            })?;
            debug!(
                "Mesh {} primitive {}: {} meshlets",
                mesh.index(),
                primitive.index(),
                built.meshlets.len()
            );
            primitives.extend(state.append(built, primitive.material().index())?);
            summary.source_primitives += 1;
        }

        let source_mesh = &source.meshes[mesh.index()];
        meshes.push(json::Mesh {
            extensions: source_mesh.extensions.clone(),
            extras: source_mesh.extras.clone(),
            name: source_mesh.name.clone(),
            primitives,
            weights: None,
        });
    }

    if state.meshlets == 0 {
        bail!("Model has no mesh primitives");
    }

    summary.meshes = meshes.len();
    summary.meshlets = state.meshlets;
    summary.vertices = state.vertices.len();
    summary.triangles = state.unpacked_indices.len() / 3;

    let mut root = source.clone();
    root.meshes = meshes;
    state.finish(&mut root)?;

    root.extensions_used.push(EXTENSION_NAME.to_string());
    let mut extensions = root.extensions.take().unwrap_or_default();
    extensions.others.insert(
        EXTENSION_NAME.to_string(),
        serde_json::to_value(limits).context("Failed to serialize meshlet limits")?,
    );
    root.extensions = Some(extensions);

    Ok((root, summary))
}

fn build_primitive(
    builder: &MeshletBuilder<'_>,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<BuiltMeshlets> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        bail!("Primitive is not a triangle list (mode {:?})", primitive.mode());
    }
    if primitive.morph_targets().next().is_some() {
        bail!("Primitive has morph targets");
    }
    let indices = primitive.indices().context("Primitive has no indices")?;

    let positions = attribute_view(
        primitive,
        Semantic::Positions,
        ATTRIBUTE_POSITION,
        gltf::accessor::Dimensions::Vec3,
        buffers,
    )?;
    let normals = attribute_view(
        primitive,
        Semantic::Normals,
        ATTRIBUTE_NORMAL,
        gltf::accessor::Dimensions::Vec3,
        buffers,
    )?;
    let uvs = attribute_view(
        primitive,
        Semantic::TexCoords(0),
        ATTRIBUTE_TEXCOORD_0,
        gltf::accessor::Dimensions::Vec2,
        buffers,
    )?;

    let layout = AccessorLayout::from_gltf(&indices).context("Invalid index accessor")?;
    let buffer = resolve_buffer(&layout, buffers).context("Invalid index accessor")?;
    let indices = read_index_buffer(&layout, buffer).context("Invalid index accessor")?;

    builder.build(&PrimitiveGeometry {
        indices: &indices,
        positions,
        normals,
        uvs,
    })
}

fn attribute_view<'a>(
    primitive: &gltf::Primitive<'_>,
    semantic: Semantic,
    name: &str,
    dimensions: gltf::accessor::Dimensions,
    buffers: &'a [gltf::buffer::Data],
) -> Result<StridedView<'a, f32>> {
    let accessor = primitive
        .get(&semantic)
        .with_context(|| format!("Primitive has no {} attribute", name))?;
    if accessor.dimensions() != dimensions {
        bail!(
            "{} attribute is {:?}, expected {:?}",
            name,
            accessor.dimensions(),
            dimensions
        );
    }
    let layout =
        AccessorLayout::from_gltf(&accessor).with_context(|| format!("Invalid {} accessor", name))?;
    let buffer =
        resolve_buffer(&layout, buffers).with_context(|| format!("Invalid {} accessor", name))?;
    StridedView::new(&layout, buffer).with_context(|| format!("Invalid {} accessor", name))
}

/// Buffers and per-meshlet accessors accumulated across primitives.
#[derive(Default)]
struct EncodeState {
    vertices: Vec<MeshletVertex>,
    unpacked_indices: Vec<u32>,
    meshlet_vertex_indices: Vec<u32>,
    meshlet_local_indices: Vec<u8>,
    accessors: Vec<json::Accessor>,
    meshlets: usize,
}

impl EncodeState {
    /// Rebase one primitive's meshlets into the shared buffers and emit one
    /// output primitive per meshlet.
    fn append(
        &mut self,
        built: BuiltMeshlets,
        material: Option<usize>,
    ) -> Result<Vec<json::mesh::Primitive>> {
        let vertex_base = u32::try_from(self.vertices.len()).context("Too many vertices")?;
        let vertex_index_base = self.meshlet_vertex_indices.len();
        let local_base = self.meshlet_local_indices.len();

        self.vertices.extend_from_slice(&built.vertices);
        self.meshlet_vertex_indices
            .extend(built.vertex_indices.iter().map(|&v| v + vertex_base));
        self.meshlet_local_indices
            .extend_from_slice(&built.local_indices);

        let mut unpacked = built.unpacked_indices.chunks(3);
        let mut primitives = Vec::with_capacity(built.meshlets.len());
        for meshlet in &built.meshlets {
            let start = self.unpacked_indices.len();
            for triangle in unpacked.by_ref().take(meshlet.tri_count as usize) {
                self.unpacked_indices
                    .extend(triangle.iter().map(|&v| v + vertex_base));
            }

            let indices = self.push_accessor(
                INDEX_VIEW,
                json::accessor::ComponentType::U32,
                meshlet.index_count() as usize,
                start * 4,
            );
            let vertex_indices = self.push_accessor(
                MESHLET_VERTEX_INDEX_VIEW,
                json::accessor::ComponentType::U32,
                meshlet.vert_count as usize,
                (vertex_index_base + meshlet.vert_offset as usize) * 4,
            );
            let local_indices = self.push_accessor(
                MESHLET_LOCAL_INDEX_VIEW,
                json::accessor::ComponentType::U8,
                meshlet.index_count() as usize,
                local_base + meshlet.local_offset as usize,
            );

            primitives.push(meshlet_primitive(
                indices,
                PrimitiveExtension {
                    meshlet_vertex_indices: vertex_indices,
                    meshlet_local_indices: local_indices,
                },
                material,
            )?);
            self.meshlets += 1;
        }
        Ok(primitives)
    }

    fn push_accessor(
        &mut self,
        view: u32,
        component_type: json::accessor::ComponentType,
        count: usize,
        byte_offset: usize,
    ) -> u32 {
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(view)),
            byte_offset: Some(byte_offset.into()),
            count: count.into(),
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
        VERTEX_ACCESSOR_COUNT + self.accessors.len() as u32 - 1
    }

    /// Replace the document's buffers, views and accessors.
    fn finish(self, root: &mut json::Root) -> Result<()> {
        let (min, max) = position_bounds(&self.vertices);
        let mut accessors = vec![
            vertex_accessor(
                MeshletVertex::POSITION_OFFSET,
                json::accessor::Type::Vec3,
                self.vertices.len(),
                Some((min, max)),
            ),
            vertex_accessor(
                MeshletVertex::NORMAL_OFFSET,
                json::accessor::Type::Vec3,
                self.vertices.len(),
                None,
            ),
            vertex_accessor(
                MeshletVertex::UV_OFFSET,
                json::accessor::Type::Vec2,
                self.vertices.len(),
                None,
            ),
        ];
        accessors.extend(self.accessors);

        let buffers: [(&str, &[u8], Option<usize>, Option<json::buffer::Target>); 4] = [
            (
                "vertex buffer",
                bytemuck::cast_slice(&self.vertices),
                Some(MeshletVertex::SIZE),
                Some(json::buffer::Target::ArrayBuffer),
            ),
            (
                "index buffer",
                bytemuck::cast_slice(&self.unpacked_indices),
                None,
                Some(json::buffer::Target::ElementArrayBuffer),
            ),
            (
                "meshlet vertex index buffer",
                bytemuck::cast_slice(&self.meshlet_vertex_indices),
                None,
                None,
            ),
            (
                "meshlet local index buffer",
                self.meshlet_local_indices.as_slice(),
                None,
                None,
            ),
        ];

        root.buffers.clear();
        root.buffer_views.clear();
        for (index, (name, bytes, stride, target)) in buffers.into_iter().enumerate() {
            root.buffers.push(json::Buffer {
                byte_length: bytes.len().into(),
                extensions: Default::default(),
                extras: Default::default(),
                name: Some(name.to_string()),
                uri: Some(data_uri(bytes)),
            });
            root.buffer_views.push(json::buffer::View {
                buffer: json::Index::new(index as u32),
                byte_length: bytes.len().into(),
                byte_offset: Some(0u64.into()),
                byte_stride: stride.map(json::buffer::Stride),
                extensions: Default::default(),
                extras: Default::default(),
                name: Some(name.to_string()),
                target: target.map(Valid),
            });
        }
        root.accessors = accessors;
        Ok(())
    }
}

fn vertex_accessor(
    offset: usize,
    type_: json::accessor::Type,
    count: usize,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> json::Accessor {
    let to_value = |v: [f32; 3]| json::Value::Array(v.into_iter().map(json::Value::from).collect());
    json::Accessor {
        buffer_view: Some(json::Index::new(VERTEX_VIEW)),
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

fn meshlet_primitive(
    indices: u32,
    extension: PrimitiveExtension,
    material: Option<usize>,
) -> Result<json::mesh::Primitive> {
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

    let mut extensions = json::extensions::mesh::Primitive::default();
    extensions.others.insert(
        EXTENSION_NAME.to_string(),
        serde_json::to_value(extension).context("Failed to serialize primitive extension")?,
    );

    Ok(json::mesh::Primitive {
        attributes,
        extensions: Some(extensions),
        extras: Default::default(),
        indices: Some(json::Index::new(indices)),
        material: material.map(|m| json::Index::new(m as u32)),
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    })
}

fn position_bounds(vertices: &[MeshletVertex]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for v in vertices {
        for i in 0..3 {
            min[i] = min[i].min(v.position[i]);
            max[i] = max[i].max(v.position[i]);
        }
    }
    (min, max)
}

fn data_uri(bytes: &[u8]) -> String {
    format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plain::{export_plain, PlainModel, TextureGroup};

    fn square() -> PlainModel {
        let corner = |x: f32, y: f32| {
            MeshletVertex::new([x * 64.0, y * 64.0, 0.0], [0.0, 0.0, 1.0], [x, y])
        };
        PlainModel {
            name: "Square".to_string(),
            groups: vec![TextureGroup {
                texture: "Tile".to_string(),
                polygons: vec![vec![
                    corner(0.0, 0.0),
                    corner(1.0, 0.0),
                    corner(1.0, 1.0),
                    corner(0.0, 1.0),
                ]],
            }],
        }
    }

    fn load(root: &json::Root) -> (gltf::Document, Vec<gltf::buffer::Data>) {
        let bytes = serde_json::to_vec(root).unwrap();
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(&bytes).unwrap();
        let buffers = gltf::import_buffers(&document, None, blob).unwrap();
        (document, buffers)
    }

    #[test]
    fn test_encode_square() {
        let (document, buffers) = load(&export_plain(&square()).unwrap());
        let config = ExportConfig::default();
        let (root, summary) =
            encode_document(&document, &buffers, &config, config.clusterizer().as_ref()).unwrap();

        assert_eq!(summary.meshlets, 1);
        assert_eq!(summary.vertices, 4);
        assert_eq!(summary.triangles, 2);
        assert_eq!(root.extensions_used, vec![EXTENSION_NAME.to_string()]);
        assert!(root.extensions_required.is_empty());
        assert_eq!(root.buffers.len(), 4);
        assert_eq!(root.buffer_views[0].byte_stride.map(|s| s.0), Some(32));
        assert_eq!(root.accessors.len(), 6);

        let limits = &root.extensions.as_ref().unwrap().others[EXTENSION_NAME];
        assert_eq!(limits["max_vertices"], 64);
        assert_eq!(limits["max_triangles"], 124);

        let primitive = &root.meshes[0].primitives[0];
        let extension = &primitive.extensions.as_ref().unwrap().others[EXTENSION_NAME];
        assert_eq!(extension["meshlet_vertex_indices"], 4);
        assert_eq!(extension["meshlet_local_indices"], 5);
        assert_eq!(primitive.material.map(|m| m.value()), Some(0));
        // Textures and materials survive untouched
        assert_eq!(root.images.len(), 1);
    }

    #[test]
    fn test_rejects_double_conversion() {
        let (document, buffers) = load(&export_plain(&square()).unwrap());
        let config = ExportConfig::default();
        let (root, _) =
            encode_document(&document, &buffers, &config, config.clusterizer().as_ref()).unwrap();

        let (document, buffers) = load(&root);
        let err = encode_document(&document, &buffers, &config, config.clusterizer().as_ref())
            .unwrap_err();
        assert!(err.to_string().contains("already uses"));
    }

    #[test]
    fn test_rejects_skins_and_animations() {
        let config = ExportConfig::default();
        let plain = export_plain(&square()).unwrap();

        let mut skinned = plain.clone();
        skinned
            .skins
            .push(serde_json::from_str(r#"{"inverseBindMatrices": 0, "joints": [0]}"#).unwrap());
        let (document, buffers) = load(&skinned);
        let err = encode_document(&document, &buffers, &config, config.clusterizer().as_ref())
            .unwrap_err();
        assert!(err.to_string().contains("skins"));

        let mut animated = plain;
        animated.animations.push(
            serde_json::from_str(
                r#"{"channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
                    "samplers": [{"input": 0, "output": 0}]}"#,
            )
            .unwrap(),
        );
        let (document, buffers) = load(&animated);
        let err = encode_document(&document, &buffers, &config, config.clusterizer().as_ref())
            .unwrap_err();
        assert!(err.to_string().contains("animations"));
    }

    #[test]
    fn test_position_bounds() {
        let (min, max) = position_bounds(&[
            MeshletVertex::new([1.0, -2.0, 3.0], [0.0; 3], [0.0; 2]),
            MeshletVertex::new([-1.0, 2.0, 0.0], [0.0; 3], [0.0; 2]),
        ]);
        assert_eq!(min, [-1.0, -2.0, 0.0]);
        assert_eq!(max, [1.0, 2.0, 3.0]);
    }
}
