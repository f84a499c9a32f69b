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

//! Resource descriptors and the shared [`Resource`] object.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::gpu::tracker::GlobalResourceStateTracker;
use crate::gpu::traits::NativeResource;
use crate::kiln_bitflags;

use super::format::{Extent3d, Format, SampleCount};
use super::state::ResourceState;

kiln_bitflags! {
    /// How a resource may be bound to the pipeline.
    pub struct BindFlag: u32 {
        /// Usable as a color render target.
        const RENDER_TARGET = 1 << 0;
        /// Usable as a depth/stencil target.
        const DEPTH_STENCIL = 1 << 1;
        /// Readable from shaders.
        const SHADER_RESOURCE = 1 << 2;
        /// Read/write accessible from shaders.
        const UNORDERED_ACCESS = 1 << 3;
        /// Usable as a constant buffer.
        const CONSTANT_BUFFER = 1 << 4;
        /// Usable as an index buffer.
        const INDEX_BUFFER = 1 << 5;
        /// Usable as a vertex buffer.
        const VERTEX_BUFFER = 1 << 6;
        /// May be the source of copy operations.
        const COPY_SOURCE = 1 << 7;
        /// May be the destination of copy operations.
        const COPY_DEST = 1 << 8;
        /// Holds a raytracing acceleration structure.
        const ACCELERATION_STRUCTURE = 1 << 9;
    }
}

/// Which memory heap a resource is allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemoryType {
    /// Device-local memory, not directly CPU visible.
    #[default]
    Default,
    /// CPU-writable memory for staging data toward the GPU.
    Upload,
    /// CPU-readable memory for reading results back.
    Readback,
}

/// The fundamental kind of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A linear buffer.
    Buffer,
    /// A texture with mip levels and array layers.
    Texture,
    /// A bottom-level raytracing acceleration structure over geometry.
    BottomLevelAccelStructure,
    /// A top-level raytracing acceleration structure over instances.
    TopLevelAccelStructure,
}

/// Everything needed to create a resource on any backend.
#[derive(Debug, Clone)]
pub struct ResourceDesc {
    /// The fundamental kind of resource.
    pub kind: ResourceKind,
    /// Texel format; `Format::Unknown` for buffers.
    pub format: Format,
    /// Physical size. Buffers use `width` as their byte length.
    pub extent: Extent3d,
    /// Number of mip levels (1 for buffers).
    pub level_count: u32,
    /// Number of array layers (1 for buffers).
    pub layer_count: u32,
    /// Samples per pixel.
    pub sample_count: SampleCount,
    /// Which memory heap to allocate from.
    pub memory_type: MemoryType,
    /// How the resource may be bound.
    pub bind_flags: BindFlag,
}

impl ResourceDesc {
    /// Describes a buffer of `size` bytes.
    pub fn buffer(size: u64, bind_flags: BindFlag, memory_type: MemoryType) -> Self {
        Self {
            kind: ResourceKind::Buffer,
            format: Format::Unknown,
            extent: Extent3d {
                width: size,
                height: 1,
                depth: 1,
            },
            level_count: 1,
            layer_count: 1,
            sample_count: SampleCount::X1,
            memory_type: MemoryType::Default,
            bind_flags,
        }
        .with_memory_type(memory_type)
    }

    /// Describes a 2D texture.
    pub fn texture_2d(
        format: Format,
        width: u64,
        height: u32,
        level_count: u32,
        layer_count: u32,
        bind_flags: BindFlag,
    ) -> Self {
        Self {
            kind: ResourceKind::Texture,
            format,
            extent: Extent3d::new_2d(width, height),
            level_count,
            layer_count,
            sample_count: SampleCount::X1,
            memory_type: MemoryType::Default,
            bind_flags,
        }
    }

    /// Replaces the memory type.
    pub fn with_memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = memory_type;
        self
    }

    /// Total number of subresources (`level_count * layer_count`).
    pub fn subresource_count(&self) -> u32 {
        self.level_count * self.layer_count
    }
}

/// A process-unique identifier for a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value, for logging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// A GPU resource shared between command lists, queues, and binding sets.
///
/// Carries the authoritative per-subresource state tracker that submission
/// resolves lazy barriers against. The native payload behind [`NativeResource`]
/// is owned by whichever backend created the resource.
pub struct Resource {
    id: ResourceId,
    desc: ResourceDesc,
    global_state: GlobalResourceStateTracker,
    native: Box<dyn NativeResource>,
    name: Mutex<Option<String>>,
    // Staging buffers for Default-heap uploads, keyed by subresource index.
    staging: Mutex<HashMap<u32, Arc<Resource>>>,
}

impl Resource {
    /// Wraps a backend payload into a shared resource.
    ///
    /// `initial_state` seeds the authoritative tracker; backends pass the
    /// state resources are actually created in (`Common` on every current
    /// backend).
    pub fn new(
        desc: ResourceDesc,
        native: Box<dyn NativeResource>,
        initial_state: ResourceState,
    ) -> Arc<Self> {
        let global_state =
            GlobalResourceStateTracker::new(desc.level_count, desc.layer_count, initial_state);
        Arc::new(Self {
            id: ResourceId::next(),
            desc,
            global_state,
            native,
            name: Mutex::new(None),
            staging: Mutex::new(HashMap::new()),
        })
    }

    /// The process-unique identifier.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The creation descriptor.
    pub fn desc(&self) -> &ResourceDesc {
        &self.desc
    }

    /// The authoritative state tracker for this resource.
    pub fn global_state(&self) -> &GlobalResourceStateTracker {
        &self.global_state
    }

    /// The backend payload.
    pub fn native(&self) -> &dyn NativeResource {
        self.native.as_ref()
    }

    /// Whether the backend implicitly promotes this resource from `Common`
    /// to `state`, making an explicit barrier unnecessary.
    pub fn allow_common_state_promotion(&self, state: ResourceState) -> bool {
        self.native.allow_common_state_promotion(state)
    }

    /// Attaches a debug name, forwarded to the backend payload.
    pub fn set_name(&self, name: &str) {
        self.native.set_name(name);
        *self.name.lock().unwrap() = Some(name.to_owned());
    }

    /// The debug name, if one was set.
    pub fn name(&self) -> Option<String> {
        self.name.lock().unwrap().clone()
    }

    /// The staging buffer attached to subresource `index`, if any.
    pub fn staging_buffer(&self, index: u32) -> Option<Arc<Resource>> {
        self.staging.lock().unwrap().get(&index).cloned()
    }

    /// Attaches a staging buffer to subresource `index`, replacing any
    /// previous one.
    pub fn set_staging_buffer(&self, index: u32, buffer: Arc<Resource>) {
        self.staging.lock().unwrap().insert(index, buffer);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("kind", &self.desc.kind)
            .field("name", &self.name.lock().unwrap())
            .finish_non_exhaustive()
    }
}
