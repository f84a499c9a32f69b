// Copyright 2026 the kiln project developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Structures describing recorded GPU operations.

use std::sync::Arc;

use super::binding::ViewDesc;
use super::format::{Extent3d, Origin3d};
use super::resource::Resource;

/// A viewport transform in framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Near depth bound, usually 0.0.
    pub min_depth: f32,
    /// Far depth bound, usually 1.0.
    pub max_depth: f32,
}

impl Viewport {
    /// A full-target viewport with the default depth range.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// A scissor rectangle in framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    /// Left edge in pixels.
    pub left: u32,
    /// Top edge in pixels.
    pub top: u32,
    /// Right edge in pixels (exclusive).
    pub right: u32,
    /// Bottom edge in pixels (exclusive).
    pub bottom: u32,
}

/// The element width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

/// A buffer-to-buffer copy.
#[derive(Debug, Clone, Copy)]
pub struct BufferCopyRegion {
    /// Byte offset into the source buffer.
    pub src_offset: u64,
    /// Byte offset into the destination buffer.
    pub dst_offset: u64,
    /// Number of bytes to copy.
    pub num_bytes: u64,
}

/// A buffer-to-texture copy targeting one subresource.
#[derive(Debug, Clone, Copy)]
pub struct BufferToTextureCopyRegion {
    /// Byte offset into the source buffer.
    pub buffer_offset: u64,
    /// Byte distance between consecutive rows in the buffer.
    pub buffer_row_pitch: u32,
    /// Destination mip level.
    pub texture_mip_level: u32,
    /// Destination array layer.
    pub texture_array_layer: u32,
    /// Extent of the copied region.
    pub texture_extent: Extent3d,
}

/// A texture-to-texture copy between single subresources.
#[derive(Debug, Clone, Copy)]
pub struct TextureCopyRegion {
    /// Source mip level.
    pub src_mip_level: u32,
    /// Source array layer.
    pub src_array_layer: u32,
    /// Offset into the source subresource.
    pub src_origin: Origin3d,
    /// Destination mip level.
    pub dst_mip_level: u32,
    /// Destination array layer.
    pub dst_array_layer: u32,
    /// Offset into the destination subresource.
    pub dst_origin: Origin3d,
    /// Extent of the copied region.
    pub extent: Extent3d,
}

/// One attachment of a render pass.
#[derive(Debug, Clone)]
pub struct RenderPassAttachment {
    /// The attached resource.
    pub resource: Arc<Resource>,
    /// Which part of the resource is attached.
    pub view: ViewDesc,
}

/// Describes the attachments of a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderPassDesc {
    /// Color attachments, in slot order.
    pub colors: Vec<RenderPassAttachment>,
    /// Optional depth/stencil attachment.
    pub depth_stencil: Option<RenderPassAttachment>,
}

/// Geometry input for a bottom-level acceleration structure build.
#[derive(Debug, Clone)]
pub struct RaytracingGeometryDesc {
    /// Vertex positions.
    pub vertex_buffer: Arc<Resource>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Byte distance between consecutive vertices.
    pub vertex_stride: u32,
    /// Optional index buffer.
    pub index_buffer: Option<Arc<Resource>>,
    /// Number of indices; ignored when `index_buffer` is `None`.
    pub index_count: u32,
    /// Element width of the index buffer.
    pub index_format: IndexFormat,
}

/// One instance referenced by a top-level acceleration structure.
#[derive(Debug, Clone)]
pub struct TopLevelInstance {
    /// The bottom-level structure this instance references.
    pub blas: Arc<Resource>,
    /// Row-major 3x4 object-to-world transform.
    pub transform: [[f32; 4]; 3],
}
