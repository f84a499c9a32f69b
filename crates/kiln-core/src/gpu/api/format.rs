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

//! Texel formats and dimension structures.

/// The texel format of a texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Format is irrelevant (buffers, acceleration structures).
    #[default]
    Unknown,
    /// 8-bit RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit RGBA, unsigned normalized, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, unsigned normalized (common swapchain format).
    Bgra8Unorm,
    /// 8-bit BGRA, unsigned normalized, sRGB encoded.
    Bgra8UnormSrgb,
    /// 16-bit float RGBA.
    Rgba16Float,
    /// 32-bit float RGBA.
    Rgba32Float,
    /// Single-channel 32-bit float.
    R32Float,
    /// Single-channel 32-bit unsigned integer.
    R32Uint,
    /// 32-bit float depth.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
}

impl Format {
    /// The number of bytes one texel occupies.
    ///
    /// Depth/stencil formats report their packed storage size; block
    /// compression is not modeled at this layer.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Format::Unknown => 0,
            Format::Rgba8Unorm
            | Format::Rgba8UnormSrgb
            | Format::Bgra8Unorm
            | Format::Bgra8UnormSrgb
            | Format::R32Float
            | Format::R32Uint
            | Format::Depth32Float
            | Format::Depth24PlusStencil8 => 4,
            Format::Rgba16Float => 8,
            Format::Rgba32Float => 16,
        }
    }

    /// Returns `true` if the format carries a depth aspect.
    pub fn has_depth(&self) -> bool {
        matches!(self, Format::Depth32Float | Format::Depth24PlusStencil8)
    }
}

/// The physical size of a texture, or the byte length of a buffer in `width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3d {
    /// Width in texels, or buffer length in bytes.
    pub width: u64,
    /// Height in texels (1 for buffers and 1D textures).
    pub height: u32,
    /// Depth in texels (1 for 2D resources).
    pub depth: u32,
}

impl Extent3d {
    /// A 2D extent with depth 1.
    pub fn new_2d(width: u64, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    /// The extent of mip level `level`, clamped to 1 per axis.
    pub fn mip_level(&self, level: u32) -> Self {
        Self {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth: (self.depth >> level).max(1),
        }
    }
}

/// An offset into a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3d {
    /// X offset in texels.
    pub x: u32,
    /// Y offset in texels.
    pub y: u32,
    /// Z offset in texels.
    pub z: u32,
}

/// The number of samples per pixel for multisampled resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleCount {
    /// 1 sample per pixel (multisampling disabled).
    #[default]
    X1,
    /// 2 samples per pixel.
    X2,
    /// 4 samples per pixel.
    X4,
    /// 8 samples per pixel.
    X8,
    /// 16 samples per pixel.
    X16,
}

impl SampleCount {
    /// The raw sample count.
    pub fn as_u32(&self) -> u32 {
        match self {
            SampleCount::X1 => 1,
            SampleCount::X2 => 2,
            SampleCount::X4 => 4,
            SampleCount::X8 => 8,
            SampleCount::X16 => 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_extent_clamps_to_one() {
        let extent = Extent3d::new_2d(256, 64);
        assert_eq!(extent.mip_level(0), Extent3d::new_2d(256, 64));
        assert_eq!(extent.mip_level(4), Extent3d::new_2d(16, 4));
        assert_eq!(extent.mip_level(10), Extent3d::new_2d(1, 1));
    }

    #[test]
    fn depth_formats_report_depth() {
        assert!(Format::Depth32Float.has_depth());
        assert!(!Format::Rgba8Unorm.has_depth());
    }
}
