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

//! Binding keys, view descriptors, and binding layouts.

use std::sync::Arc;

use super::resource::{Resource, ResourceDesc};
use super::state::SubresourceRange;

/// The shader stage a binding is visible to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Vertex stage.
    Vertex,
    /// Pixel (fragment) stage.
    Pixel,
    /// Compute stage.
    Compute,
    /// Raytracing shader library.
    Library,
}

/// How a resource is viewed when bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Read-only uniform data.
    ConstantBuffer,
    /// Read-only shader access.
    ShaderResource,
    /// Read/write shader access.
    UnorderedAccess,
    /// A sampler object.
    Sampler,
    /// A color render target view.
    RenderTarget,
    /// A depth/stencil view.
    DepthStencil,
}

/// A view over part of a resource.
///
/// `level_count`/`layer_count` of `None` mean "through the last level/layer",
/// resolved against a concrete descriptor by [`ViewDesc::range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewDesc {
    /// How the resource is viewed.
    pub kind: ViewKind,
    /// First visible mip level.
    pub base_mip_level: u32,
    /// Number of visible mip levels, or `None` for all remaining.
    pub level_count: Option<u32>,
    /// First visible array layer.
    pub base_array_layer: u32,
    /// Number of visible layers, or `None` for all remaining.
    pub layer_count: Option<u32>,
}

impl ViewDesc {
    /// A full view of the given kind.
    pub fn full(kind: ViewKind) -> Self {
        Self {
            kind,
            base_mip_level: 0,
            level_count: None,
            base_array_layer: 0,
            layer_count: None,
        }
    }

    /// Resolves the view into a concrete subresource range of `desc`.
    pub fn range(&self, desc: &ResourceDesc) -> SubresourceRange {
        SubresourceRange {
            base_mip_level: self.base_mip_level,
            level_count: self
                .level_count
                .unwrap_or(desc.level_count - self.base_mip_level),
            base_array_layer: self.base_array_layer,
            layer_count: self
                .layer_count
                .unwrap_or(desc.layer_count - self.base_array_layer),
        }
    }
}

/// Identifies one binding slot in the shader interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindKey {
    /// The stage the binding is visible to.
    pub shader: ShaderKind,
    /// The kind of view bound at the slot.
    pub kind: ViewKind,
    /// Register/binding slot within the space.
    pub slot: u32,
    /// Register space / descriptor set index.
    pub space: u32,
}

/// A resource attached at a binding slot.
#[derive(Debug, Clone)]
pub struct BindingDesc {
    /// The slot being filled.
    pub key: BindKey,
    /// The attached resource.
    pub resource: Arc<Resource>,
    /// How the resource is viewed.
    pub view: ViewDesc,
}

/// One slot of a [`BindingLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingLayoutEntry {
    /// The slot this entry declares.
    pub key: BindKey,
    /// Number of descriptors the slot consumes.
    pub count: u32,
}

/// The set of slots a program exposes, in a backend-agnostic form.
#[derive(Debug, Clone, Default)]
pub struct BindingLayout {
    /// The declared slots.
    pub entries: Vec<BindingLayoutEntry>,
}

impl BindingLayout {
    /// Whether `key` is declared by this layout.
    pub fn declares(&self, key: &BindKey) -> bool {
        self.entries.iter().any(|entry| entry.key == *key)
    }

    /// Total descriptor count across all slots.
    pub fn descriptor_count(&self) -> u32 {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}
