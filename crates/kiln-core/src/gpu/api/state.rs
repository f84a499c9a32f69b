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

//! Resource states, subresource ranges, and barrier descriptors.

use std::sync::Arc;

use super::resource::{Resource, ResourceDesc};

/// The access state a resource (or one of its subresources) is in.
///
/// Transitions between states are expressed as barriers. `Unknown` is the
/// record-time placeholder for "first touch by this command list": the
/// actual prior state is only resolved when the list is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    /// Prior state is not yet known; resolved at submission time.
    #[default]
    Unknown,
    /// Neutral state with no specific access semantics.
    Common,
    /// Ready for presentation by a swapchain.
    Present,
    /// Bound as a color render target.
    RenderTarget,
    /// Bound as a depth/stencil target.
    DepthTarget,
    /// Bound for unordered (read/write) shader access.
    UnorderedAccess,
    /// Destination of a copy operation.
    CopyDest,
    /// Source of a copy operation.
    CopySource,
    /// Bound as an index buffer.
    IndexBuffer,
    /// Bound as a vertex or constant buffer.
    VertexAndConstantBuffer,
    /// Bound for read-only shader access.
    ShaderResource,
    /// Holds a built raytracing acceleration structure.
    RaytracingAccelerationStructure,
}

/// A rectangular slice of a resource's mip levels and array layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    /// First mip level in the range.
    pub base_mip_level: u32,
    /// Number of mip levels in the range.
    pub level_count: u32,
    /// First array layer in the range.
    pub base_array_layer: u32,
    /// Number of array layers in the range.
    pub layer_count: u32,
}

impl SubresourceRange {
    /// The range covering every subresource of a resource described by `desc`.
    pub fn whole(desc: &ResourceDesc) -> Self {
        Self {
            base_mip_level: 0,
            level_count: desc.level_count,
            base_array_layer: 0,
            layer_count: desc.layer_count,
        }
    }

    /// A range addressing exactly one (mip, layer) pair.
    pub fn single(mip_level: u32, array_layer: u32) -> Self {
        Self {
            base_mip_level: mip_level,
            level_count: 1,
            base_array_layer: array_layer,
            layer_count: 1,
        }
    }

    /// Whether this range spans every subresource of `desc`.
    pub fn covers(&self, desc: &ResourceDesc) -> bool {
        self.base_mip_level == 0
            && self.level_count == desc.level_count
            && self.base_array_layer == 0
            && self.layer_count == desc.layer_count
    }

    /// Iterates every `(mip_level, array_layer)` pair in the range,
    /// layers-outer, mips-inner.
    pub fn subresources(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let mips = self.base_mip_level..self.base_mip_level + self.level_count;
        (self.base_array_layer..self.base_array_layer + self.layer_count)
            .flat_map(move |layer| mips.clone().map(move |mip| (mip, layer)))
    }
}

/// A fully resolved state transition, ready for a native backend.
///
/// `state_before` is always a concrete state by the time a backend sees one
/// of these; submission-time resolution substitutes `Common` for any state
/// that was never observed.
#[derive(Debug, Clone)]
pub struct ResourceBarrierDesc {
    /// The resource being transitioned.
    pub resource: Arc<Resource>,
    /// The subresources affected.
    pub range: SubresourceRange,
    /// State the subresources are currently in.
    pub state_before: ResourceState,
    /// State the subresources transition into.
    pub state_after: ResourceState,
}

/// A record-time barrier intent; the prior state is left for the tracker.
#[derive(Debug, Clone)]
pub struct LazyResourceBarrierDesc {
    /// The resource being transitioned.
    pub resource: Arc<Resource>,
    /// The subresources affected.
    pub range: SubresourceRange,
    /// State the subresources must be in for the upcoming operation.
    pub state: ResourceState,
}
