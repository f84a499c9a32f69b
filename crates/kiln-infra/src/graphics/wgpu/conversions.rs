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

//! Conversions from `kiln-core` API types to their `wgpu` counterparts.

use kiln_core::gpu::{BindFlag, Extent3d, Format, IndexFormat, MemoryType, Origin3d, SampleCount};

/// Converts an API type into its `wgpu` equivalent.
pub trait IntoWgpu<T> {
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::TextureFormat> for Format {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            // Unknown never describes a texture; default to the most common
            // color format rather than panicking in a conversion.
            Format::Unknown => wgpu::TextureFormat::Rgba8Unorm,
            Format::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            Format::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Format::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            Format::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            Format::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Format::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            Format::R32Float => wgpu::TextureFormat::R32Float,
            Format::R32Uint => wgpu::TextureFormat::R32Uint,
            Format::Depth32Float => wgpu::TextureFormat::Depth32Float,
            Format::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        }
    }
}

/// The reverse mapping, for wrapping surface textures.
pub fn format_from_wgpu(format: wgpu::TextureFormat) -> Format {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Format::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => Format::Rgba8UnormSrgb,
        wgpu::TextureFormat::Bgra8Unorm => Format::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => Format::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba16Float => Format::Rgba16Float,
        wgpu::TextureFormat::Rgba32Float => Format::Rgba32Float,
        wgpu::TextureFormat::R32Float => Format::R32Float,
        wgpu::TextureFormat::R32Uint => Format::R32Uint,
        wgpu::TextureFormat::Depth32Float => Format::Depth32Float,
        wgpu::TextureFormat::Depth24PlusStencil8 => Format::Depth24PlusStencil8,
        _ => Format::Unknown,
    }
}

impl IntoWgpu<wgpu::Extent3d> for Extent3d {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width as u32,
            height: self.height,
            depth_or_array_layers: self.depth,
        }
    }
}

impl IntoWgpu<wgpu::Origin3d> for Origin3d {
    fn into_wgpu(self) -> wgpu::Origin3d {
        wgpu::Origin3d {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl IntoWgpu<u32> for SampleCount {
    fn into_wgpu(self) -> u32 {
        self.as_u32()
    }
}

/// Buffer usages implied by bind flags and memory type.
pub fn buffer_usages(bind_flags: BindFlag, memory_type: MemoryType) -> wgpu::BufferUsages {
    let mut usages = wgpu::BufferUsages::empty();
    if bind_flags.contains(BindFlag::CONSTANT_BUFFER) {
        usages |= wgpu::BufferUsages::UNIFORM;
    }
    if bind_flags.contains(BindFlag::INDEX_BUFFER) {
        usages |= wgpu::BufferUsages::INDEX;
    }
    if bind_flags.contains(BindFlag::VERTEX_BUFFER) {
        usages |= wgpu::BufferUsages::VERTEX;
    }
    if bind_flags.contains(BindFlag::SHADER_RESOURCE)
        || bind_flags.contains(BindFlag::UNORDERED_ACCESS)
    {
        usages |= wgpu::BufferUsages::STORAGE;
    }
    if bind_flags.contains(BindFlag::COPY_SOURCE) {
        usages |= wgpu::BufferUsages::COPY_SRC;
    }
    if bind_flags.contains(BindFlag::COPY_DEST) {
        usages |= wgpu::BufferUsages::COPY_DST;
    }
    match memory_type {
        // Upload buffers are written through the queue, which needs COPY_DST.
        MemoryType::Upload => usages |= wgpu::BufferUsages::COPY_DST,
        MemoryType::Readback => {
            usages |= wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ
        }
        MemoryType::Default => {}
    }
    usages
}

/// Texture usages implied by bind flags.
pub fn texture_usages(bind_flags: BindFlag) -> wgpu::TextureUsages {
    let mut usages = wgpu::TextureUsages::empty();
    if bind_flags.contains(BindFlag::RENDER_TARGET) || bind_flags.contains(BindFlag::DEPTH_STENCIL)
    {
        usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if bind_flags.contains(BindFlag::SHADER_RESOURCE) {
        usages |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if bind_flags.contains(BindFlag::UNORDERED_ACCESS) {
        usages |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if bind_flags.contains(BindFlag::COPY_SOURCE) {
        usages |= wgpu::TextureUsages::COPY_SRC;
    }
    if bind_flags.contains(BindFlag::COPY_DEST) {
        usages |= wgpu::TextureUsages::COPY_DST;
    }
    usages
}
