//! Strided accessor reader
//!
//! Typed, read-only views over glTF binary buffers. Every view is validated
//! before it is handed out, in this order:
//!
//! 1. component type matches the requested element type `T`
//! 2. stride is `byteStride` when set, else `size_of::<T>() * components`
//! 3. stride is a multiple of `size_of::<T>()`
//! 4. stride (in elements) is at least the number of components
//! 5. `accessor.byteOffset + extent <= bufferView.byteLength`
//! 6. `bufferView.byteOffset + accessor.byteOffset + extent <= buffer.len()`
//! 7. the start offset is aligned to `align_of::<T>()`
//! 8. count is nonzero
//!
//! where `extent = stride * (count - 1) + size_of::<T>() * components`, the
//! glTF 2.0 definition. Data is read as little-endian.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::Pod;
use gltf::accessor::{DataType, Dimensions};

/// Structural accessor errors. Each variant names the check that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessorError {
    #[error("accessor has no buffer view")]
    MissingBufferView,

    #[error("sparse accessors are not supported")]
    Sparse,

    #[error("buffer {index} does not exist ({available} buffers loaded)")]
    MissingBuffer { index: usize, available: usize },

    #[error("accessor has component type {found:?}, expected {expected:?}")]
    ComponentType { expected: DataType, found: DataType },

    #[error("accessor stride {stride} is not a multiple of the component size {component_size}")]
    MisalignedStride { stride: usize, component_size: usize },

    #[error("accessor stride of {stride} components is smaller than its {components} components")]
    StrideTooSmall { stride: usize, components: usize },

    #[error("accessor ends at byte {end}, past the buffer view length {view_length}")]
    OutOfViewBounds { end: usize, view_length: usize },

    #[error("accessor ends at byte {end}, past the buffer length {buffer_length}")]
    OutOfBufferBounds { end: usize, buffer_length: usize },

    #[error("accessor data at byte {offset} is not aligned to {alignment}")]
    Misaligned { offset: usize, alignment: usize },

    #[error("accessor has zero count")]
    ZeroCount,

    #[error("accessor is not packed (stride of {stride} components, {components} components)")]
    NotPacked { stride: usize, components: usize },

    #[error("unsupported component type {0:?} for an index buffer")]
    UnsupportedIndexType(DataType),

    #[error("accessor has {components} components, {requested} requested")]
    TooFewComponents { components: usize, requested: usize },
}

/// Element types a view can be read as.
pub trait Component: Pod {
    const DATA_TYPE: DataType;
}

impl Component for u8 {
    const DATA_TYPE: DataType = DataType::U8;
}

impl Component for u16 {
    const DATA_TYPE: DataType = DataType::U16;
}

impl Component for u32 {
    const DATA_TYPE: DataType = DataType::U32;
}

impl Component for f32 {
    const DATA_TYPE: DataType = DataType::F32;
}

/// Buffer view descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLayout {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
}

impl ViewLayout {
    pub fn from_gltf(view: &gltf::buffer::View<'_>) -> Self {
        Self {
            buffer: view.buffer().index(),
            byte_offset: view.offset(),
            byte_length: view.length(),
            byte_stride: view.stride(),
        }
    }
}

/// Accessor descriptor: everything the reader needs, detached from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorLayout {
    pub component_type: DataType,
    pub dimensions: Dimensions,
    pub count: usize,
    pub byte_offset: usize,
    pub view: ViewLayout,
}

impl AccessorLayout {
    pub fn from_gltf(accessor: &gltf::Accessor<'_>) -> Result<Self, AccessorError> {
        if accessor.sparse().is_some() {
            return Err(AccessorError::Sparse);
        }
        let view = accessor.view().ok_or(AccessorError::MissingBufferView)?;
        Ok(Self {
            component_type: accessor.data_type(),
            dimensions: accessor.dimensions(),
            count: accessor.count(),
            byte_offset: accessor.offset(),
            view: ViewLayout::from_gltf(&view),
        })
    }

    /// Scalar accessor spanning a whole buffer view.
    ///
    /// Used to read a view's complete contents when only sub-ranges of it are
    /// described by accessors.
    pub fn whole_view(view: ViewLayout, component_type: DataType) -> Self {
        Self {
            component_type,
            dimensions: Dimensions::Scalar,
            count: view.byte_length / component_type.size(),
            byte_offset: 0,
            view,
        }
    }
}

/// Look up the buffer a layout points into.
pub fn resolve_buffer<'a>(
    layout: &AccessorLayout,
    buffers: &'a [gltf::buffer::Data],
) -> Result<&'a [u8], AccessorError> {
    buffers
        .get(layout.view.buffer)
        .map(|data| data.0.as_slice())
        .ok_or(AccessorError::MissingBuffer {
            index: layout.view.buffer,
            available: buffers.len(),
        })
}

/// Validated strided view of `count` elements of `components` values of `T`.
#[derive(Debug, Clone, Copy)]
pub struct StridedView<'a, T> {
    bytes: &'a [u8],
    stride: usize,
    components: usize,
    count: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Component> StridedView<'a, T> {
    pub fn new(layout: &AccessorLayout, buffer: &'a [u8]) -> Result<Self, AccessorError> {
        let component_size = size_of::<T>();

        if layout.component_type != T::DATA_TYPE {
            return Err(AccessorError::ComponentType {
                expected: T::DATA_TYPE,
                found: layout.component_type,
            });
        }

        let components = layout.dimensions.multiplicity();
        let byte_stride = match layout.view.byte_stride {
            Some(stride) if stride != 0 => stride,
            _ => component_size * components,
        };
        if byte_stride % component_size != 0 {
            return Err(AccessorError::MisalignedStride {
                stride: byte_stride,
                component_size,
            });
        }
        let stride = byte_stride / component_size;
        if stride < components {
            return Err(AccessorError::StrideTooSmall { stride, components });
        }

        let extent = if layout.count == 0 {
            Some(0)
        } else {
            byte_stride
                .checked_mul(layout.count - 1)
                .and_then(|n| n.checked_add(component_size * components))
        };

        let view_end = extent.and_then(|e| e.checked_add(layout.byte_offset));
        match view_end {
            Some(end) if end <= layout.view.byte_length => {}
            end => {
                return Err(AccessorError::OutOfViewBounds {
                    end: end.unwrap_or(usize::MAX),
                    view_length: layout.view.byte_length,
                })
            }
        }

        let start = layout.view.byte_offset.checked_add(layout.byte_offset);
        let buffer_end = start.zip(extent).and_then(|(s, e)| s.checked_add(e));
        let (start, end) = match (start, buffer_end) {
            (Some(start), Some(end)) if end <= buffer.len() => (start, end),
            (_, end) => {
                return Err(AccessorError::OutOfBufferBounds {
                    end: end.unwrap_or(usize::MAX),
                    buffer_length: buffer.len(),
                })
            }
        };

        if start % align_of::<T>() != 0 {
            return Err(AccessorError::Misaligned {
                offset: start,
                alignment: align_of::<T>(),
            });
        }

        if layout.count == 0 {
            return Err(AccessorError::ZeroCount);
        }

        Ok(Self {
            bytes: &buffer[start..end],
            stride,
            components,
            count: layout.count,
            _marker: PhantomData,
        })
    }

    /// Like [`StridedView::new`], additionally requiring tightly packed data.
    pub fn packed(layout: &AccessorLayout, buffer: &'a [u8]) -> Result<Self, AccessorError> {
        let view = Self::new(layout, buffer)?;
        if view.stride != view.components {
            return Err(AccessorError::NotPacked {
                stride: view.stride,
                components: view.components,
            });
        }
        Ok(view)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Distance between consecutive elements, in units of `T`.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// One component of one element, or `None` when out of range.
    pub fn component(&self, index: usize, component: usize) -> Option<T> {
        if index >= self.count || component >= self.components {
            return None;
        }
        let size = size_of::<T>();
        let at = (index * self.stride + component) * size;
        Some(bytemuck::pod_read_unaligned(&self.bytes[at..at + size]))
    }

    /// The first `N` components of one element, or `None` when out of range.
    pub fn get<const N: usize>(&self, index: usize) -> Option<[T; N]> {
        if N > self.components || index >= self.count {
            return None;
        }
        let mut out = [T::zeroed(); N];
        for (c, slot) in out.iter_mut().enumerate() {
            *slot = self.component(index, c)?;
        }
        Some(out)
    }

    /// Iterate over the first `N` components of every element.
    pub fn iter<const N: usize>(
        self,
    ) -> Result<impl Iterator<Item = [T; N]> + 'a, AccessorError> {
        if N > self.components {
            return Err(AccessorError::TooFewComponents {
                components: self.components,
                requested: N,
            });
        }
        let size = size_of::<T>();
        Ok((0..self.count).map(move |i| {
            std::array::from_fn(|c| {
                let at = (i * self.stride + c) * size;
                bytemuck::pod_read_unaligned(&self.bytes[at..at + size])
            })
        }))
    }

    /// Contiguous elements of a packed view.
    ///
    /// Borrows the buffer when its memory happens to be aligned for `T`,
    /// copies otherwise.
    pub fn to_packed(&self) -> Result<Cow<'a, [T]>, AccessorError> {
        if self.stride != self.components {
            return Err(AccessorError::NotPacked {
                stride: self.stride,
                components: self.components,
            });
        }
        let all: &'a [u8] = self.bytes;
        let bytes = &all[..self.count * self.components * size_of::<T>()];
        Ok(match bytemuck::try_cast_slice(bytes) {
            Ok(slice) => Cow::Borrowed(slice),
            Err(_) => Cow::Owned(
                bytes
                    .chunks_exact(size_of::<T>())
                    .map(bytemuck::pod_read_unaligned)
                    .collect(),
            ),
        })
    }
}

/// Normalize an index accessor to `u32`.
///
/// `u32` data is passed through without copying where possible; `u8` and
/// `u16` data is widened into a new array. Index data must be packed.
pub fn read_index_buffer<'a>(
    layout: &AccessorLayout,
    buffer: &'a [u8],
) -> Result<Cow<'a, [u32]>, AccessorError> {
    match layout.component_type {
        DataType::U32 => StridedView::<u32>::packed(layout, buffer)?.to_packed(),
        DataType::U16 => {
            let view = StridedView::<u16>::packed(layout, buffer)?;
            Ok(Cow::Owned(
                view.to_packed()?.iter().map(|&i| u32::from(i)).collect(),
            ))
        }
        DataType::U8 => {
            let view = StridedView::<u8>::packed(layout, buffer)?;
            Ok(Cow::Owned(
                view.to_packed()?.iter().map(|&i| u32::from(i)).collect(),
            ))
        }
        other => Err(AccessorError::UnsupportedIndexType(other)),
    }
}
