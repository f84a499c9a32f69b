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

//! Global configuration for the graphics layer.

/// Settings consumed when a [`GpuContext`](crate::gpu::GpuContext) is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuSettings {
    /// Number of frames in flight (and swapchain images).
    pub frame_count: u32,
    /// Whether presentation waits for vertical sync.
    pub vsync: bool,
    /// Index of the adapter to use when several are available.
    pub gpu_index: u32,
    /// Append patch barriers to the previous list's tail instead of
    /// recording a separate patch list. Requires a backend that tolerates
    /// reopening a logically closed list.
    pub fake_close: bool,
    /// Capacity of the per-frame descriptor pool.
    pub descriptor_pool_capacity: u32,
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            frame_count: 3,
            vsync: true,
            gpu_index: 0,
            fake_close: false,
            descriptor_pool_capacity: 1024,
        }
    }
}

/// Identity of the adapter a device was created on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GpuAdapterInfo {
    /// Human-readable adapter name.
    pub name: String,
    /// The underlying driver/API, e.g. "Vulkan".
    pub backend: String,
    /// Whether the adapter is a software rasterizer.
    pub is_software: bool,
}
