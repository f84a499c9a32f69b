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
use std::sync::Arc;

use kiln_core::gpu::{
    BindingDesc, BindingLayout, Fence, GpuAdapterInfo, GpuDevice, GpuError, GpuSemaphore,
    NativeBindingSet, NativeCommandList, NativePipeline, NativeResource, Resource, ResourceDesc,
    ResourceError, ResourceKind, ResourceState, SharedCommandList, Swapchain,
};
use kiln_core::gpu::BindingError;
use kiln_core::platform::KilnWindowHandle;

use super::command::WgpuCommandList;
use super::context::WgpuShared;
use super::conversions::{buffer_usages, texture_usages, IntoWgpu};
use super::fence::WgpuFence;
use super::swapchain::WgpuSwapchain;

/// The `wgpu` allocation behind a shared resource.
#[derive(Debug)]
pub enum WgpuResourcePayload {
    Buffer(wgpu::Buffer),
    Texture(wgpu::Texture),
}

/// Backend payload attaching a `wgpu` buffer or texture to a resource.
#[derive(Debug)]
pub struct WgpuResource {
    pub payload: WgpuResourcePayload,
    queue: wgpu::Queue,
}

impl WgpuResource {
    pub fn buffer(buffer: wgpu::Buffer, queue: wgpu::Queue) -> Self {
        Self {
            payload: WgpuResourcePayload::Buffer(buffer),
            queue,
        }
    }

    pub fn texture(texture: wgpu::Texture, queue: wgpu::Queue) -> Self {
        Self {
            payload: WgpuResourcePayload::Texture(texture),
            queue,
        }
    }
}

impl NativeResource for WgpuResource {
    fn allow_common_state_promotion(&self, _state: ResourceState) -> bool {
        // State transitions are tracked by wgpu itself; nothing is gained by
        // skipping the (no-op) barrier, and explicit resolution keeps the
        // replayed command stream identical across backends.
        false
    }

    fn update_upload_data(&self, data: &[u8], offset: u64) -> Result<(), ResourceError> {
        match &self.payload {
            WgpuResourcePayload::Buffer(buffer) => {
                if offset + data.len() as u64 > buffer.size() {
                    return Err(ResourceError::OutOfBounds {
                        offset,
                        len: data.len() as u64,
                        size: buffer.size(),
                    });
                }
                self.queue.write_buffer(buffer, offset, data);
                Ok(())
            }
            WgpuResourcePayload::Texture(_) => Err(ResourceError::BackendError(
                "textures are written through a staging buffer".to_owned(),
            )),
        }
    }

    fn set_name(&self, name: &str) {
        // Labels are fixed at creation in wgpu.
        log::trace!("resource name hint: {name}");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The `wgpu` buffer of `resource`, if it wraps one.
pub(crate) fn wgpu_buffer(resource: &Resource) -> Option<&wgpu::Buffer> {
    match resource.native().as_any().downcast_ref::<WgpuResource>() {
        Some(WgpuResource {
            payload: WgpuResourcePayload::Buffer(buffer),
            ..
        }) => Some(buffer),
        _ => None,
    }
}

/// The `wgpu` texture of `resource`, if it wraps one.
pub(crate) fn wgpu_texture(resource: &Resource) -> Option<&wgpu::Texture> {
    match resource.native().as_any().downcast_ref::<WgpuResource>() {
        Some(WgpuResource {
            payload: WgpuResourcePayload::Texture(texture),
            ..
        }) => Some(texture),
        _ => None,
    }
}

/// A compiled pipeline on the `wgpu` backend.
#[derive(Debug)]
pub enum WgpuPipeline {
    Render(wgpu::RenderPipeline),
    Compute(wgpu::ComputePipeline),
}

impl NativePipeline for WgpuPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Binding sets carry their descriptors; the actual `wgpu::BindGroup` is
/// built at translation time against the bound pipeline's layout.
#[derive(Debug)]
pub struct WgpuBindingSet {
    pub bindings: Vec<BindingDesc>,
}

impl NativeBindingSet for WgpuBindingSet {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// No-op semaphore: surface acquisition and presentation are implicitly
/// ordered by wgpu.
#[derive(Debug)]
pub struct WgpuSemaphore;

impl GpuSemaphore for WgpuSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// [`GpuDevice`] implementation over a shared `wgpu` device and queue.
#[derive(Debug)]
pub struct WgpuDevice {
    shared: Arc<WgpuShared>,
}

impl WgpuDevice {
    pub fn new(shared: Arc<WgpuShared>) -> Self {
        Self { shared }
    }

    pub fn shared(&self) -> &Arc<WgpuShared> {
        &self.shared
    }
}

impl GpuDevice for WgpuDevice {
    fn create_buffer(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, ResourceError> {
        if desc.kind != ResourceKind::Buffer {
            return Err(ResourceError::BackendError(
                "create_buffer expects a buffer descriptor".to_owned(),
            ));
        }
        let buffer = self.shared.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: desc.extent.width,
            usage: buffer_usages(desc.bind_flags, desc.memory_type),
            mapped_at_creation: false,
        });
        log::debug!("created buffer of {} byte(s)", desc.extent.width);
        Ok(Resource::new(
            desc.clone(),
            Box::new(WgpuResource::buffer(buffer, self.shared.queue.clone())),
            ResourceState::Common,
        ))
    }

    fn create_texture(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, ResourceError> {
        if desc.kind != ResourceKind::Texture {
            return Err(ResourceError::BackendError(
                "create_texture expects a texture descriptor".to_owned(),
            ));
        }
        let texture = self.shared.device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: desc.extent.width as u32,
                height: desc.extent.height,
                depth_or_array_layers: desc.layer_count.max(desc.extent.depth),
            },
            mip_level_count: desc.level_count,
            sample_count: desc.sample_count.into_wgpu(),
            dimension: wgpu::TextureDimension::D2,
            format: desc.format.into_wgpu(),
            usage: texture_usages(desc.bind_flags),
            view_formats: &[],
        });
        Ok(Resource::new(
            desc.clone(),
            Box::new(WgpuResource::texture(texture, self.shared.queue.clone())),
            ResourceState::Common,
        ))
    }

    fn create_acceleration_structure(
        &self,
        _desc: &ResourceDesc,
    ) -> Result<Arc<Resource>, ResourceError> {
        Err(ResourceError::FeatureNotSupported(
            "raytracing acceleration structures".to_owned(),
        ))
    }

    fn create_command_list(&self) -> Box<dyn NativeCommandList> {
        Box::new(WgpuCommandList::new(Arc::clone(&self.shared)))
    }

    fn create_fence(&self, initial_value: u64) -> Arc<dyn Fence> {
        Arc::new(WgpuFence::new(Arc::clone(&self.shared), initial_value)) as Arc<dyn Fence>
    }

    fn create_semaphore(&self) -> Arc<dyn GpuSemaphore> {
        Arc::new(WgpuSemaphore) as Arc<dyn GpuSemaphore>
    }

    fn create_swapchain(
        &self,
        window: KilnWindowHandle,
        width: u32,
        height: u32,
        frame_count: u32,
        vsync: bool,
    ) -> Result<Box<dyn Swapchain>, GpuError> {
        let swapchain =
            WgpuSwapchain::new(Arc::clone(&self.shared), window, width, height, frame_count, vsync)?;
        Ok(Box::new(swapchain))
    }

    fn create_binding_set(
        &self,
        layout: &BindingLayout,
        bindings: &[BindingDesc],
    ) -> Result<Arc<dyn NativeBindingSet>, BindingError> {
        for binding in bindings {
            if !layout.declares(&binding.key) {
                return Err(BindingError::UnknownBindKey {
                    slot: binding.key.slot,
                    space: binding.key.space,
                });
            }
        }
        Ok(Arc::new(WgpuBindingSet {
            bindings: bindings.to_vec(),
        }) as Arc<dyn NativeBindingSet>)
    }

    fn signal_fence(&self, fence: &Arc<dyn Fence>, value: u64) {
        if let Some(fence) = fence.as_any().downcast_ref::<WgpuFence>() {
            fence.signal_after_submitted_work(value);
        } else {
            log::warn!("signal_fence called with a foreign fence type");
        }
    }

    fn wait_semaphore(&self, _semaphore: &Arc<dyn GpuSemaphore>) {
        // Implicit: wgpu orders surface acquisition before queue submission.
    }

    fn signal_semaphore(&self, _semaphore: &Arc<dyn GpuSemaphore>) {
        // Implicit: presentation waits for submitted work.
    }

    fn execute_command_lists_impl(&self, lists: &[SharedCommandList]) {
        let mut buffers = Vec::with_capacity(lists.len());
        for shared in lists {
            let mut guard = shared.lock().unwrap_or_else(|err| err.into_inner());
            let native = guard
                .native_mut()
                .as_any_mut()
                .downcast_mut::<WgpuCommandList>();
            match native {
                Some(list) => {
                    if let Some(buffer) = list.take_finished() {
                        buffers.push(buffer);
                    }
                }
                None => log::warn!("skipping a command list from another backend"),
            }
        }
        if !buffers.is_empty() {
            self.shared.queue.submit(buffers);
        }
    }

    fn texture_data_pitch_alignment(&self) -> u32 {
        wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
    }

    fn supports_raytracing(&self) -> bool {
        false
    }

    fn adapter_info(&self) -> GpuAdapterInfo {
        self.shared.adapter_info()
    }
}
