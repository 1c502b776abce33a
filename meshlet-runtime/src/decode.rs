//! Replacement decoder and validator
//!
//! Decodes a `.replacement.gltf` into a [`ModelReplacement`]. Nothing in the
//! file is trusted: every layout promise the encoder makes is checked again,
//! and each failed check is its own [`DecodeError`] variant.

use std::fmt;
use std::mem::size_of;
use std::path::{Path, PathBuf};

use gltf::accessor::{DataType, Dimensions};
use gltf::json;
use gltf::mesh::Semantic;
use tracing::{debug, info};

use crate::model::ModelReplacement;
use meshlet_common::{
    disk_to_engine, resolve_buffer, texture_replacement_path, AccessorError, AccessorLayout,
    Component, Meshlet, MeshletLimits, MeshletVertex, PrimitiveExtension, StridedView, ViewLayout,
    ATTRIBUTE_NORMAL, ATTRIBUTE_POSITION, ATTRIBUTE_TEXCOORD_0, EXTENSION_NAME,
};

/// Scene-node features a replacement may not use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFeature {
    Skin,
    Light,
    Camera,
    Children,
    Transform,
    MorphWeights,
}

impl fmt::Display for NodeFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skin => "skin",
            Self::Light => "light",
            Self::Camera => "camera",
            Self::Children => "child nodes",
            Self::Transform => "non-identity transform",
            Self::MorphWeights => "morph weights",
        })
    }
}

/// The two per-meshlet index buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshletBufferKind {
    VertexIndices,
    LocalIndices,
}

impl fmt::Display for MeshletBufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VertexIndices => "meshlet vertex index",
            Self::LocalIndices => "meshlet local index",
        })
    }
}

/// Location of a primitive in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRef {
    pub mesh: usize,
    pub primitive: usize,
}

impl fmt::Display for PrimitiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh {} primitive {}", self.mesh, self.primitive)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("{EXTENSION_NAME} is not declared in extensionsUsed")]
    ExtensionNotDeclared,

    #[error("document has no {EXTENSION_NAME} object")]
    MissingDocumentExtension,

    #[error("document {EXTENSION_NAME} object is malformed: {0}")]
    MalformedDocumentExtension(String),

    #[error("expected exactly one scene, found {0}")]
    SceneCount(usize),

    #[error("scene has no nodes")]
    EmptyScene,

    #[error("node {node} uses an unsupported feature: {feature}")]
    UnsupportedNodeFeature { node: usize, feature: NodeFeature },

    #[error("node {0} has no mesh")]
    NodeWithoutMesh(usize),

    #[error("scene has no mesh primitives")]
    NoPrimitives,

    #[error("{0} is not a triangle list")]
    NotTriangles(PrimitiveRef),

    #[error("{primitive} has no {attribute} attribute")]
    MissingAttribute {
        primitive: PrimitiveRef,
        attribute: &'static str,
    },

    #[error("{primitive} uses a different {attribute} accessor than the first primitive")]
    AttributeNotShared {
        primitive: PrimitiveRef,
        attribute: &'static str,
    },

    #[error("POSITION, NORMAL and TEXCOORD_0 do not share one buffer view")]
    VertexViewNotShared,

    #[error("{attribute} has component type {found:?}, expected F32")]
    AttributeComponentType {
        attribute: &'static str,
        found: DataType,
    },

    #[error("{attribute} has type {found:?}, expected {expected:?}")]
    AttributeType {
        attribute: &'static str,
        expected: Dimensions,
        found: Dimensions,
    },

    #[error(
        "vertex attribute counts differ (POSITION {positions}, NORMAL {normals}, TEXCOORD_0 {uvs})"
    )]
    AttributeCountMismatch {
        positions: usize,
        normals: usize,
        uvs: usize,
    },

    #[error("vertex buffer view stride is {found:?}, expected {expected}")]
    VertexStride {
        expected: usize,
        found: Option<usize>,
    },

    #[error("vertex buffer view is {found} bytes, expected {expected}")]
    VertexViewLength { expected: usize, found: usize },

    #[error("vertex count {0} does not fit in a buffer")]
    VertexCountOverflow(usize),

    #[error("{attribute} starts at byte {found} of the vertex record, expected {expected}")]
    AttributeOffset {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{0} has no {EXTENSION_NAME} object")]
    MissingPrimitiveExtension(PrimitiveRef),

    #[error("{primitive} {EXTENSION_NAME} object is malformed: {message}")]
    MalformedPrimitiveExtension {
        primitive: PrimitiveRef,
        message: String,
    },

    #[error("{primitive} references accessor {accessor}, which does not exist")]
    AccessorOutOfRange {
        primitive: PrimitiveRef,
        accessor: usize,
    },

    #[error("{kind} accessors do not share one buffer view")]
    MeshletViewNotShared { kind: MeshletBufferKind },

    #[error("{kind} accessor {accessor} has component type {found:?}, expected {expected:?}")]
    MeshletComponentType {
        kind: MeshletBufferKind,
        accessor: usize,
        expected: DataType,
        found: DataType,
    },

    #[error("{kind} accessor {accessor} has type {found:?}, expected Scalar")]
    MeshletAccessorType {
        kind: MeshletBufferKind,
        accessor: usize,
        found: Dimensions,
    },

    #[error("meshlet vertex index accessor {accessor} starts at unaligned byte {offset}")]
    VertexIndexAlignment { accessor: usize, offset: usize },

    #[error("meshlet local index accessor {accessor} count {count} is not a multiple of 3")]
    LocalIndexCount { accessor: usize, count: usize },

    #[error(
        "{primitive} meshlet has {vertices} vertices and {triangles} triangles, over the declared limits {limits:?}"
    )]
    MeshletLimitExceeded {
        primitive: PrimitiveRef,
        vertices: u32,
        triangles: u32,
        limits: MeshletLimits,
    },

    #[error("{0} has no material")]
    MissingMaterial(PrimitiveRef),

    #[error("{primitive} references material {material}, but only {available} exist")]
    MaterialOutOfRange {
        primitive: PrimitiveRef,
        material: usize,
        available: usize,
    },

    #[error("material {0} has no base color texture")]
    MaterialWithoutTexture(usize),

    #[error("material {material} references texture {texture}, which does not exist")]
    TextureOutOfRange { material: usize, texture: usize },

    #[error("texture {texture} references image {image}, which does not exist")]
    ImageOutOfRange { texture: usize, image: usize },

    #[error("meshlet {meshlet} local index {value} is out of range for {vert_count} vertices")]
    LocalIndexOutOfRange {
        meshlet: usize,
        value: u8,
        vert_count: u32,
    },

    #[error("meshlet {meshlet} vertex index {value} is out of range for {vertex_count} vertices")]
    VertexIndexOutOfRange {
        meshlet: usize,
        value: u32,
        vertex_count: usize,
    },

    #[error(
        "meshlet vertex index slot {slot} holds {value}, out of range for {vertex_count} vertices"
    )]
    VertexSlotOutOfRange {
        slot: usize,
        value: u32,
        vertex_count: usize,
    },

    #[error("offset {0} does not fit in 32 bits")]
    OffsetOverflow(usize),

    #[error(transparent)]
    Accessor(#[from] AccessorError),
}

/// Read and decode `<path>`; `name` identifies the model.
pub fn load_replacement(path: &Path, name: &str) -> Result<ModelReplacement, DecodeError> {
    let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_replacement(name, &bytes, path)
}

/// Decode an in-memory replacement document.
///
/// `path` locates external buffers and texture replacements; it is not read.
pub fn decode_replacement(
    name: &str,
    bytes: &[u8],
    path: &Path,
) -> Result<ModelReplacement, DecodeError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let root = document.as_json();

    if !root.extensions_used.iter().any(|e| e == EXTENSION_NAME) {
        return Err(DecodeError::ExtensionNotDeclared);
    }
    let limits = document_limits(root)?;

    let buffers = gltf::import_buffers(&document, path.parent(), blob)?;
    let primitives = scene_primitives(&document)?;
    let accessors: Vec<gltf::Accessor<'_>> = document.accessors().collect();

    let verts = decode_vertices(&primitives, &buffers)?;
    let decoded = decode_meshlets(&primitives, &accessors, &buffers, limits, root.materials.len())?;
    let indices: Vec<u32> = read_view(&decoded.vertex_index_view, &buffers)?;
    let local_indices: Vec<u8> = read_view(&decoded.local_index_view, &buffers)?;
    validate_contents(&decoded.meshlets, &indices, &local_indices, verts.len())?;
    let texture_file_names = texture_file_names(root, path)?;

    info!(
        "Decoded replacement {}: {} meshlets, {} vertices, {} textures",
        name,
        decoded.meshlets.len(),
        verts.len(),
        texture_file_names.len()
    );

    Ok(ModelReplacement {
        name: name.to_string(),
        meshlets: decoded.meshlets,
        verts,
        indices,
        local_indices,
        texture_file_names,
    })
}

fn document_limits(root: &json::Root) -> Result<MeshletLimits, DecodeError> {
    let value = root
        .extensions
        .as_ref()
        .and_then(|extensions| extensions.others.get(EXTENSION_NAME))
        .ok_or(DecodeError::MissingDocumentExtension)?;
    serde_json::from_value(value.clone())
        .map_err(|e| DecodeError::MalformedDocumentExtension(e.to_string()))
}

fn scene_primitives(
    document: &gltf::Document,
) -> Result<Vec<(PrimitiveRef, gltf::Primitive<'_>)>, DecodeError> {
    let scene_count = document.scenes().count();
    let scene = match (scene_count, document.scenes().next()) {
        (1, Some(scene)) => scene,
        _ => return Err(DecodeError::SceneCount(scene_count)),
    };
    if scene.nodes().next().is_none() {
        return Err(DecodeError::EmptyScene);
    }

    let mut primitives = Vec::new();
    for node in scene.nodes() {
        check_node(&node)?;
        let mesh = node
            .mesh()
            .ok_or(DecodeError::NodeWithoutMesh(node.index()))?;
        for primitive in mesh.primitives() {
            let at = PrimitiveRef {
                mesh: mesh.index(),
                primitive: primitive.index(),
            };
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(DecodeError::NotTriangles(at));
            }
            primitives.push((at, primitive));
        }
    }
    if primitives.is_empty() {
        return Err(DecodeError::NoPrimitives);
    }
    Ok(primitives)
}

/// Replacement scenes are flat: one static mesh per node.
fn check_node(node: &gltf::Node<'_>) -> Result<(), DecodeError> {
    let feature = if node.skin().is_some() {
        Some(NodeFeature::Skin)
    } else if node.light().is_some() {
        Some(NodeFeature::Light)
    } else if node.camera().is_some() {
        Some(NodeFeature::Camera)
    } else if node.children().next().is_some() {
        Some(NodeFeature::Children)
    } else if node.weights().is_some() {
        Some(NodeFeature::MorphWeights)
    } else if !is_identity(node.transform()) {
        Some(NodeFeature::Transform)
    } else {
        None
    };
    match feature {
        Some(feature) => Err(DecodeError::UnsupportedNodeFeature {
            node: node.index(),
            feature,
        }),
        None => Ok(()),
    }
}

fn is_identity(transform: gltf::scene::Transform) -> bool {
    const IDENTITY: [[f32; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    match transform {
        gltf::scene::Transform::Matrix { matrix } => matrix == IDENTITY,
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => translation == [0.0; 3] && rotation == [0.0, 0.0, 0.0, 1.0] && scale == [1.0; 3],
    }
}

const VERTEX_ATTRIBUTES: [(&str, Dimensions, usize); 3] = [
    (
        ATTRIBUTE_POSITION,
        Dimensions::Vec3,
        MeshletVertex::POSITION_OFFSET,
    ),
    (ATTRIBUTE_NORMAL, Dimensions::Vec3, MeshletVertex::NORMAL_OFFSET),
    (ATTRIBUTE_TEXCOORD_0, Dimensions::Vec2, MeshletVertex::UV_OFFSET),
];

fn semantic(attribute: &str) -> Semantic {
    match attribute {
        ATTRIBUTE_POSITION => Semantic::Positions,
        ATTRIBUTE_NORMAL => Semantic::Normals,
        _ => Semantic::TexCoords(0),
    }
}

fn decode_vertices(
    primitives: &[(PrimitiveRef, gltf::Primitive<'_>)],
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<MeshletVertex>, DecodeError> {
    let Some((first_ref, first)) = primitives.first() else {
        return Err(DecodeError::NoPrimitives);
    };

    // Every primitive shares the first primitive's attribute accessors
    let mut attributes = Vec::with_capacity(VERTEX_ATTRIBUTES.len());
    for (attribute, _, _) in VERTEX_ATTRIBUTES {
        let accessor = first
            .get(&semantic(attribute))
            .ok_or(DecodeError::MissingAttribute {
                primitive: *first_ref,
                attribute,
            })?;
        for (at, primitive) in &primitives[1..] {
            let same = primitive
                .get(&semantic(attribute))
                .is_some_and(|other| other.index() == accessor.index());
            if !same {
                return Err(DecodeError::AttributeNotShared {
                    primitive: *at,
                    attribute,
                });
            }
        }
        attributes.push(accessor);
    }
    let [position, normal, uv] = [&attributes[0], &attributes[1], &attributes[2]];

    let views = [position.view(), normal.view(), uv.view()];
    let view_index = match &views {
        [Some(a), Some(b), Some(c)] if a.index() == b.index() && b.index() == c.index() => {
            a.index()
        }
        [Some(_), Some(_), Some(_)] => return Err(DecodeError::VertexViewNotShared),
        _ => return Err(AccessorError::MissingBufferView.into()),
    };

    for (accessor, (attribute, dimensions, _)) in attributes.iter().zip(VERTEX_ATTRIBUTES) {
        if accessor.data_type() != DataType::F32 {
            return Err(DecodeError::AttributeComponentType {
                attribute,
                found: accessor.data_type(),
            });
        }
        if accessor.dimensions() != dimensions {
            return Err(DecodeError::AttributeType {
                attribute,
                expected: dimensions,
                found: accessor.dimensions(),
            });
        }
    }

    let count = position.count();
    if normal.count() != count || uv.count() != count {
        return Err(DecodeError::AttributeCountMismatch {
            positions: count,
            normals: normal.count(),
            uvs: uv.count(),
        });
    }

    let view = views[0]
        .as_ref()
        .filter(|view| view.index() == view_index)
        .ok_or(AccessorError::MissingBufferView)?;
    if view.stride() != Some(MeshletVertex::SIZE) {
        return Err(DecodeError::VertexStride {
            expected: MeshletVertex::SIZE,
            found: view.stride(),
        });
    }
    let expected_length = MeshletVertex::SIZE
        .checked_mul(count)
        .ok_or(DecodeError::VertexCountOverflow(count))?;
    if view.length() != expected_length {
        return Err(DecodeError::VertexViewLength {
            expected: expected_length,
            found: view.length(),
        });
    }
    for (accessor, (attribute, _, offset)) in attributes.iter().zip(VERTEX_ATTRIBUTES) {
        if accessor.offset() != offset {
            return Err(DecodeError::AttributeOffset {
                attribute,
                expected: offset,
                found: accessor.offset(),
            });
        }
    }

    let positions = float_view(position, buffers)?.iter::<3>()?;
    let normals = float_view(normal, buffers)?.iter::<3>()?;
    let uvs = float_view(uv, buffers)?.iter::<2>()?;

    Ok(positions
        .zip(normals)
        .zip(uvs)
        .map(|((position, normal), uv)| {
            MeshletVertex::new(disk_to_engine(position), disk_to_engine(normal), uv)
        })
        .collect())
}

fn float_view<'b>(
    accessor: &gltf::Accessor<'_>,
    buffers: &'b [gltf::buffer::Data],
) -> Result<StridedView<'b, f32>, DecodeError> {
    let layout = AccessorLayout::from_gltf(accessor)?;
    Ok(StridedView::new(&layout, resolve_buffer(&layout, buffers)?)?)
}

struct DecodedMeshlets<'a> {
    meshlets: Vec<Meshlet>,
    vertex_index_view: gltf::buffer::View<'a>,
    local_index_view: gltf::buffer::View<'a>,
}

fn decode_meshlets<'a>(
    primitives: &[(PrimitiveRef, gltf::Primitive<'a>)],
    accessors: &[gltf::Accessor<'a>],
    buffers: &[gltf::buffer::Data],
    limits: MeshletLimits,
    material_count: usize,
) -> Result<DecodedMeshlets<'a>, DecodeError> {
    let mut vertex_index_view: Option<gltf::buffer::View<'a>> = None;
    let mut local_index_view: Option<gltf::buffer::View<'a>> = None;
    let mut meshlets = Vec::with_capacity(primitives.len());

    for (at, primitive) in primitives {
        let at = *at;
        let extension = primitive_extension(at, primitive)?;
        let lookup = |accessor: u32| {
            accessors
                .get(accessor as usize)
                .ok_or(DecodeError::AccessorOutOfRange {
                    primitive: at,
                    accessor: accessor as usize,
                })
        };
        let vertex_indices = lookup(extension.meshlet_vertex_indices)?;
        let local_indices = lookup(extension.meshlet_local_indices)?;

        share_view(
            &mut vertex_index_view,
            vertex_indices,
            MeshletBufferKind::VertexIndices,
        )?;
        share_view(
            &mut local_index_view,
            local_indices,
            MeshletBufferKind::LocalIndices,
        )?;
        check_scalar::<u32>(vertex_indices, MeshletBufferKind::VertexIndices)?;
        check_scalar::<u8>(local_indices, MeshletBufferKind::LocalIndices)?;

        if vertex_indices.offset() % size_of::<u32>() != 0 {
            return Err(DecodeError::VertexIndexAlignment {
                accessor: vertex_indices.index(),
                offset: vertex_indices.offset(),
            });
        }
        if local_indices.count() % 3 != 0 {
            return Err(DecodeError::LocalIndexCount {
                accessor: local_indices.index(),
                count: local_indices.count(),
            });
        }

        // Ranges must lie within their views and buffers
        let layout = AccessorLayout::from_gltf(vertex_indices)?;
        StridedView::<u32>::packed(&layout, resolve_buffer(&layout, buffers)?)?;
        let layout = AccessorLayout::from_gltf(local_indices)?;
        StridedView::<u8>::packed(&layout, resolve_buffer(&layout, buffers)?)?;

        let material = primitive
            .material()
            .index()
            .ok_or(DecodeError::MissingMaterial(at))?;
        if material >= material_count {
            return Err(DecodeError::MaterialOutOfRange {
                primitive: at,
                material,
                available: material_count,
            });
        }

        let meshlet = Meshlet {
            vert_offset: to_u32(vertex_indices.offset() / size_of::<u32>())?,
            vert_count: to_u32(vertex_indices.count())?,
            local_offset: to_u32(local_indices.offset())?,
            tri_count: to_u32(local_indices.count() / 3)?,
            tex_idx: to_u32(material)?,
        };
        if meshlet.vert_count > limits.max_vertices || meshlet.tri_count > limits.max_triangles {
            return Err(DecodeError::MeshletLimitExceeded {
                primitive: at,
                vertices: meshlet.vert_count,
                triangles: meshlet.tri_count,
                limits,
            });
        }
        meshlets.push(meshlet);
    }

    match (vertex_index_view, local_index_view) {
        (Some(vertex_index_view), Some(local_index_view)) => Ok(DecodedMeshlets {
            meshlets,
            vertex_index_view,
            local_index_view,
        }),
        _ => Err(DecodeError::NoPrimitives),
    }
}

fn primitive_extension(
    at: PrimitiveRef,
    primitive: &gltf::Primitive<'_>,
) -> Result<PrimitiveExtension, DecodeError> {
    let value = primitive
        .extensions()
        .and_then(|extensions| extensions.get(EXTENSION_NAME))
        .ok_or(DecodeError::MissingPrimitiveExtension(at))?;
    serde_json::from_value(value.clone()).map_err(|e| DecodeError::MalformedPrimitiveExtension {
        primitive: at,
        message: e.to_string(),
    })
}

fn share_view<'a>(
    slot: &mut Option<gltf::buffer::View<'a>>,
    accessor: &gltf::Accessor<'a>,
    kind: MeshletBufferKind,
) -> Result<(), DecodeError> {
    let view = accessor.view().ok_or(AccessorError::MissingBufferView)?;
    match slot {
        Some(shared) if shared.index() != view.index() => {
            Err(DecodeError::MeshletViewNotShared { kind })
        }
        Some(_) => Ok(()),
        None => {
            *slot = Some(view);
            Ok(())
        }
    }
}

fn check_scalar<T: Component>(
    accessor: &gltf::Accessor<'_>,
    kind: MeshletBufferKind,
) -> Result<(), DecodeError> {
    if accessor.data_type() != T::DATA_TYPE {
        return Err(DecodeError::MeshletComponentType {
            kind,
            accessor: accessor.index(),
            expected: T::DATA_TYPE,
            found: accessor.data_type(),
        });
    }
    if accessor.dimensions() != Dimensions::Scalar {
        return Err(DecodeError::MeshletAccessorType {
            kind,
            accessor: accessor.index(),
            found: accessor.dimensions(),
        });
    }
    Ok(())
}

/// Whole contents of a tightly packed view.
fn read_view<T: Component>(
    view: &gltf::buffer::View<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<T>, DecodeError> {
    let layout = AccessorLayout::whole_view(ViewLayout::from_gltf(view), T::DATA_TYPE);
    let data = StridedView::<T>::packed(&layout, resolve_buffer(&layout, buffers)?)?.to_packed()?;
    Ok(data.into_owned())
}

fn validate_contents(
    meshlets: &[Meshlet],
    indices: &[u32],
    local_indices: &[u8],
    vertex_count: usize,
) -> Result<(), DecodeError> {
    for (n, m) in meshlets.iter().enumerate() {
        let corner_start = m.local_offset as usize;
        let corner_end = corner_start + m.index_count() as usize;
        let corners = local_indices
            .get(corner_start..corner_end)
            .ok_or(AccessorError::OutOfViewBounds {
                end: corner_end,
                view_length: local_indices.len(),
            })?;
        if let Some(&value) = corners.iter().find(|&&c| u32::from(c) >= m.vert_count) {
            return Err(DecodeError::LocalIndexOutOfRange {
                meshlet: n,
                value,
                vert_count: m.vert_count,
            });
        }

        let slot_start = m.vert_offset as usize;
        let slot_end = slot_start + m.vert_count as usize;
        let slots = indices
            .get(slot_start..slot_end)
            .ok_or(AccessorError::OutOfViewBounds {
                end: slot_end * size_of::<u32>(),
                view_length: indices.len() * size_of::<u32>(),
            })?;
        if let Some(&value) = slots.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(DecodeError::VertexIndexOutOfRange {
                meshlet: n,
                value,
                vertex_count,
            });
        }
    }
    // Slots no meshlet references are uploaded too
    if let Some((slot, &value)) = indices
        .iter()
        .enumerate()
        .find(|&(_, &v)| v as usize >= vertex_count)
    {
        return Err(DecodeError::VertexSlotOutOfRange {
            slot,
            value,
            vertex_count,
        });
    }
    debug!("Validated {} meshlets", meshlets.len());
    Ok(())
}

/// Replacement PNG path per material, from each material's base color image.
fn texture_file_names(root: &json::Root, path: &Path) -> Result<Vec<String>, DecodeError> {
    root.materials
        .iter()
        .enumerate()
        .map(|(material, m)| {
            let info = m
                .pbr_metallic_roughness
                .base_color_texture
                .as_ref()
                .ok_or(DecodeError::MaterialWithoutTexture(material))?;
            let texture = info.index.value();
            let image = root
                .textures
                .get(texture)
                .ok_or(DecodeError::TextureOutOfRange { material, texture })?
                .source
                .value();
            let stem = image_stem(
                root.images
                    .get(image)
                    .ok_or(DecodeError::ImageOutOfRange { texture, image })?,
                image,
            );
            Ok(texture_replacement_path(path, &stem)
                .to_string_lossy()
                .into_owned())
        })
        .collect()
}

fn image_stem(image: &json::Image, index: usize) -> String {
    if let Some(name) = &image.name {
        return name.clone();
    }
    image
        .uri
        .as_deref()
        .filter(|uri| !uri.starts_with("data:"))
        .and_then(|uri| Path::new(uri).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("image{}", index))
}

fn to_u32(value: usize) -> Result<u32, DecodeError> {
    u32::try_from(value).map_err(|_| DecodeError::OffsetOverflow(value))
}
