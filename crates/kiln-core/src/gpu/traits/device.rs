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

//! The central device contract a backend implements.

use std::fmt::Debug;
use std::sync::Arc;

use crate::gpu::api::{BindingDesc, BindingLayout, GpuAdapterInfo, ResourceDesc};
use crate::gpu::command_list::SharedCommandList;
use crate::gpu::error::{BindingError, GpuError, ResourceError};
use crate::gpu::traits::command_list::NativeCommandList;
use crate::gpu::traits::resource::NativeBindingSet;
use crate::gpu::traits::swapchain::Swapchain;
use crate::gpu::traits::sync::{Fence, GpuSemaphore};
use crate::platform::KilnWindowHandle;

/// Creates resources and executes already-resolved command lists.
///
/// Submission-time barrier resolution happens above this trait, in
/// [`CommandQueue`](crate::gpu::CommandQueue); by the time
/// [`execute_command_lists_impl`](GpuDevice::execute_command_lists_impl) is
/// called every barrier carries a concrete prior state.
pub trait GpuDevice: Send + Sync + Debug {
    /// Creates a buffer resource.
    fn create_buffer(&self, desc: &ResourceDesc) -> Result<Arc<crate::gpu::Resource>, ResourceError>;

    /// Creates a texture resource.
    fn create_texture(&self, desc: &ResourceDesc)
        -> Result<Arc<crate::gpu::Resource>, ResourceError>;

    /// Creates an acceleration structure resource.
    fn create_acceleration_structure(
        &self,
        desc: &ResourceDesc,
    ) -> Result<Arc<crate::gpu::Resource>, ResourceError>;

    /// Creates a raw command list in the closed state.
    fn create_command_list(&self) -> Box<dyn NativeCommandList>;

    /// Creates a timeline fence starting at `initial_value`.
    fn create_fence(&self, initial_value: u64) -> Arc<dyn Fence>;

    /// Creates a GPU-to-GPU semaphore.
    fn create_semaphore(&self) -> Arc<dyn GpuSemaphore>;

    /// Creates a swapchain over an externally owned window.
    fn create_swapchain(
        &self,
        window: KilnWindowHandle,
        width: u32,
        height: u32,
        frame_count: u32,
        vsync: bool,
    ) -> Result<Box<dyn Swapchain>, GpuError>;

    /// Builds a native binding set from attached resources.
    fn create_binding_set(
        &self,
        layout: &BindingLayout,
        bindings: &[BindingDesc],
    ) -> Result<Arc<dyn NativeBindingSet>, BindingError>;

    /// Signals `fence` to `value` after previously submitted work completes.
    fn signal_fence(&self, fence: &Arc<dyn Fence>, value: u64);

    /// Makes subsequent submissions wait for `semaphore`.
    fn wait_semaphore(&self, semaphore: &Arc<dyn GpuSemaphore>);

    /// Signals `semaphore` after previously submitted work completes.
    fn signal_semaphore(&self, semaphore: &Arc<dyn GpuSemaphore>);

    /// Hands fully resolved command lists to the driver, in order.
    fn execute_command_lists_impl(&self, lists: &[SharedCommandList]);

    /// Required row alignment for buffer-to-texture copies, in bytes.
    fn texture_data_pitch_alignment(&self) -> u32;

    /// Whether acceleration structures and ray dispatch are available.
    fn supports_raytracing(&self) -> bool;

    /// Identity of the adapter this device runs on.
    fn adapter_info(&self) -> GpuAdapterInfo;
}
