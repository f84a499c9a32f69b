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

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::trace;

use kiln_core::gpu::{
    BindFlag, BindingDesc, BindingError, BindingLayout, Fence, Format, GpuAdapterInfo, GpuDevice,
    GpuError, GpuSemaphore, NativeBindingSet, NativeCommandList, NativePipeline, NativeResource,
    Resource, ResourceDesc, ResourceError, ResourceState, SharedCommandList, SubmitError,
    Swapchain,
};
use kiln_core::platform::KilnWindowHandle;

use super::command::ReplayCommandList;
use super::log::{ReplayOp, ReplayShared};

/// Backing store for a replay resource.
///
/// Uploads land in an in-memory byte vector so tests can assert on staged
/// contents.
#[derive(Debug)]
pub struct ReplayResource {
    allow_promotion: bool,
    size: u64,
    data: Mutex<Vec<u8>>,
}

impl ReplayResource {
    pub fn new(allow_promotion: bool, size: u64) -> Self {
        Self {
            allow_promotion,
            size,
            data: Mutex::new(Vec::new()),
        }
    }

    /// Everything written through `update_upload_data` so far.
    pub fn uploaded(&self) -> Vec<u8> {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl NativeResource for ReplayResource {
    fn allow_common_state_promotion(&self, _state: ResourceState) -> bool {
        self.allow_promotion
    }

    fn update_upload_data(&self, data: &[u8], offset: u64) -> Result<(), ResourceError> {
        let end = offset + data.len() as u64;
        if end > self.size {
            return Err(ResourceError::OutOfBounds {
                offset,
                len: data.len() as u64,
                size: self.size,
            });
        }
        let mut stored = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if stored.len() < end as usize {
            stored.resize(end as usize, 0);
        }
        stored[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn set_name(&self, name: &str) {
        trace!("replay resource named {name:?}");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Fence whose GPU side is driven by the test.
///
/// [`ReplayDevice::complete_work`] retires pending signals; a blocking wait
/// force-completes instead, modelling a GPU that always catches up.
#[derive(Debug, Default)]
pub struct ReplayFence {
    completed: AtomicU64,
}

impl ReplayFence {
    pub fn new(initial_value: u64) -> Self {
        Self {
            completed: AtomicU64::new(initial_value),
        }
    }

    fn complete(&self, value: u64) {
        self.completed.fetch_max(value, Ordering::SeqCst);
    }
}

impl Fence for ReplayFence {
    fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    fn wait(&self, value: u64) -> Result<(), SubmitError> {
        self.complete(value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct ReplaySemaphore;

impl GpuSemaphore for ReplaySemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Stand-in pipeline for tests that exercise binding and draw recording.
#[derive(Debug)]
pub struct ReplayPipeline;

impl NativePipeline for ReplayPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct ReplayBindingSet;

impl NativeBindingSet for ReplayBindingSet {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Headless device that logs instead of executing.
#[derive(Debug, Default)]
pub struct ReplayDevice {
    shared: Arc<ReplayShared>,
    pending_signals: Mutex<Vec<(Arc<dyn Fence>, u64)>>,
    submissions: AtomicU64,
    allow_promotion: bool,
}

impl ReplayDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose resources report `allow_common_state_promotion`.
    pub fn with_promotion() -> Self {
        Self {
            allow_promotion: true,
            ..Self::default()
        }
    }

    /// The shared operation log.
    pub fn shared(&self) -> &Arc<ReplayShared> {
        &self.shared
    }

    /// How many times command lists were handed to the "driver".
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Retires everything submitted so far: every pending fence signal
    /// completes, as if the GPU caught up.
    pub fn complete_work(&self) {
        let pending = std::mem::take(
            &mut *self
                .pending_signals
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        for (fence, value) in pending {
            if let Some(fence) = fence.as_any().downcast_ref::<ReplayFence>() {
                fence.complete(value);
            }
        }
    }

    /// Swapchain without a window, for headless frame-loop tests.
    pub fn create_offscreen_swapchain(
        &self,
        width: u32,
        height: u32,
        frame_count: u32,
    ) -> Box<dyn Swapchain> {
        Box::new(ReplaySwapchain::new(
            Arc::clone(&self.shared),
            width,
            height,
            frame_count,
            self.allow_promotion,
        ))
    }

    fn create_resource(
        &self,
        desc: &ResourceDesc,
        size: u64,
    ) -> Result<Arc<Resource>, ResourceError> {
        let native = ReplayResource::new(self.allow_promotion, size);
        let resource = Resource::new(desc.clone(), Box::new(native), ResourceState::Common);
        self.shared.record(ReplayOp::CreateResource {
            resource: resource.id(),
            level_count: desc.level_count,
            layer_count: desc.layer_count,
            initial_state: ResourceState::Common,
        });
        Ok(resource)
    }
}

impl GpuDevice for ReplayDevice {
    fn create_buffer(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, ResourceError> {
        self.create_resource(desc, desc.extent.width)
    }

    fn create_texture(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, ResourceError> {
        let size = desc.extent.width
            * u64::from(desc.extent.height)
            * u64::from(desc.extent.depth)
            * u64::from(desc.format.bytes_per_pixel())
            * u64::from(desc.layer_count);
        self.create_resource(desc, size)
    }

    fn create_acceleration_structure(
        &self,
        desc: &ResourceDesc,
    ) -> Result<Arc<Resource>, ResourceError> {
        self.create_resource(desc, desc.extent.width)
    }

    fn create_command_list(&self) -> Box<dyn NativeCommandList> {
        Box::new(ReplayCommandList::new())
    }

    fn create_fence(&self, initial_value: u64) -> Arc<dyn Fence> {
        Arc::new(ReplayFence::new(initial_value))
    }

    fn create_semaphore(&self) -> Arc<dyn GpuSemaphore> {
        Arc::new(ReplaySemaphore)
    }

    fn create_swapchain(
        &self,
        _window: KilnWindowHandle,
        width: u32,
        height: u32,
        frame_count: u32,
        _vsync: bool,
    ) -> Result<Box<dyn Swapchain>, GpuError> {
        Ok(self.create_offscreen_swapchain(width, height, frame_count))
    }

    fn create_binding_set(
        &self,
        _layout: &BindingLayout,
        _bindings: &[BindingDesc],
    ) -> Result<Arc<dyn NativeBindingSet>, BindingError> {
        Ok(Arc::new(ReplayBindingSet))
    }

    fn signal_fence(&self, fence: &Arc<dyn Fence>, value: u64) {
        self.pending_signals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((Arc::clone(fence), value));
    }

    fn wait_semaphore(&self, _semaphore: &Arc<dyn GpuSemaphore>) {}

    fn signal_semaphore(&self, _semaphore: &Arc<dyn GpuSemaphore>) {}

    fn execute_command_lists_impl(&self, lists: &[SharedCommandList]) {
        for shared in lists {
            let mut list = shared.lock().unwrap_or_else(|e| e.into_inner());
            match list
                .native_mut()
                .as_any_mut()
                .downcast_mut::<ReplayCommandList>()
            {
                Some(native) => self.shared.record_all(native.drain_ops()),
                None => log::warn!("skipping a command list from another backend"),
            }
        }
        self.submissions.fetch_add(1, Ordering::SeqCst);
    }

    fn texture_data_pitch_alignment(&self) -> u32 {
        256
    }

    fn supports_raytracing(&self) -> bool {
        true
    }

    fn adapter_info(&self) -> GpuAdapterInfo {
        GpuAdapterInfo {
            name: "Kiln Replay".to_owned(),
            backend: "Replay".to_owned(),
            is_software: true,
        }
    }
}

/// Headless swapchain with persistent back buffers.
#[derive(Debug)]
pub struct ReplaySwapchain {
    shared: Arc<ReplayShared>,
    back_buffers: Vec<Arc<Resource>>,
    format: Format,
    frame_count: u32,
    // Index of the back buffer most recently handed out.
    current: u32,
}

impl ReplaySwapchain {
    fn new(
        shared: Arc<ReplayShared>,
        width: u32,
        height: u32,
        frame_count: u32,
        allow_promotion: bool,
    ) -> Self {
        let format = Format::Bgra8UnormSrgb;
        let back_buffers = (0..frame_count)
            .map(|index| {
                let desc = ResourceDesc::texture_2d(
                    format,
                    u64::from(width),
                    height,
                    1,
                    1,
                    BindFlag::RENDER_TARGET,
                );
                let size = u64::from(width)
                    * u64::from(height)
                    * u64::from(format.bytes_per_pixel());
                // Presentation engines hand images over in Present.
                let resource = Resource::new(
                    desc.clone(),
                    Box::new(ReplayResource::new(allow_promotion, size)),
                    ResourceState::Present,
                );
                resource.set_name(&format!("back buffer {index}"));
                shared.record(ReplayOp::CreateResource {
                    resource: resource.id(),
                    level_count: 1,
                    layer_count: 1,
                    initial_state: ResourceState::Present,
                });
                resource
            })
            .collect();
        Self {
            shared,
            back_buffers,
            format,
            frame_count,
            current: 0,
        }
    }
}

impl Swapchain for ReplaySwapchain {
    fn frame_count(&self) -> u32 {
        self.frame_count
    }

    fn format(&self) -> Format {
        self.format
    }

    fn back_buffer(&mut self, index: u32) -> Result<Arc<Resource>, ResourceError> {
        self.current = index % self.frame_count;
        Ok(Arc::clone(&self.back_buffers[self.current as usize]))
    }

    fn next_image(&mut self, _semaphore: &Arc<dyn GpuSemaphore>) -> Result<u32, GpuError> {
        Ok(self.current)
    }

    fn present(&mut self, _semaphore: &Arc<dyn GpuSemaphore>) -> Result<(), GpuError> {
        self.shared.record(ReplayOp::Present {
            image: self.back_buffers[self.current as usize].id(),
        });
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) -> Result<(), GpuError> {
        Ok(())
    }
}
