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

//! The frame loop: one recording command list per in-flight frame.

use std::sync::{Arc, MutexGuard};

use log::{debug, info};

use crate::gpu::api::{
    BufferCopyRegion, BufferToTextureCopyRegion, GpuSettings, MemoryType, Resource, ResourceDesc,
    ResourceKind, ResourceState,
};
use crate::gpu::binding::DescriptorPool;
use crate::gpu::command_list::{CommandListBox, SharedCommandList};
use crate::gpu::error::{GpuError, ResourceError};
use crate::gpu::queue::CommandQueue;
use crate::gpu::traits::{Fence, GpuDevice, GpuSemaphore, Swapchain};

/// Drives a swapchain with `frame_count` frames in flight.
///
/// Each frame owns one command list. [`present`](Self::present) closes the
/// current list, submits it through the queue (which resolves its lazy
/// barriers), presents, then blocks only if the list about to be reused is
/// still executing on the GPU.
#[derive(Debug)]
pub struct GpuContext {
    device: Arc<dyn GpuDevice>,
    swapchain: Box<dyn Swapchain>,
    queue: CommandQueue,
    command_lists: Vec<SharedCommandList>,
    frame_fence: Arc<dyn Fence>,
    fence_value: u64,
    // Fence value of the last submission that used each frame slot.
    frame_fence_values: Vec<u64>,
    image_available: Arc<dyn GpuSemaphore>,
    rendering_finished: Arc<dyn GpuSemaphore>,
    frame_index: u32,
    frame_count: u32,
    descriptor_pool: DescriptorPool,
}

impl GpuContext {
    /// Builds the frame loop over an existing device and swapchain.
    ///
    /// The first frame's command list is opened and ready to record into.
    pub fn new(
        device: Arc<dyn GpuDevice>,
        swapchain: Box<dyn Swapchain>,
        settings: &GpuSettings,
    ) -> Result<Self, GpuError> {
        let frame_count = settings.frame_count;
        let mut queue = CommandQueue::new(Arc::clone(&device));
        queue.set_fake_close(settings.fake_close);

        let command_lists: Vec<SharedCommandList> = (0..frame_count)
            .map(|_| {
                let list = CommandListBox::new_shared(device.create_command_list());
                list.lock()
                    .unwrap_or_else(|err| err.into_inner())
                    .set_fake_close(settings.fake_close);
                list
            })
            .collect();

        let frame_fence = device.create_fence(0);
        let image_available = device.create_semaphore();
        let rendering_finished = device.create_semaphore();

        let context = Self {
            device,
            swapchain,
            queue,
            command_lists,
            frame_fence,
            fence_value: 0,
            frame_fence_values: vec![0; frame_count as usize],
            image_available,
            rendering_finished,
            frame_index: 0,
            frame_count,
            descriptor_pool: DescriptorPool::new(settings.descriptor_pool_capacity),
        };
        lock(&context.command_lists[0]).open();
        info!(
            "frame loop ready: {} frame(s) in flight, {:?} back buffers",
            frame_count,
            context.swapchain.format()
        );
        Ok(context)
    }

    /// The device everything was created on.
    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    /// The command list recording the current frame.
    pub fn current(&self) -> &SharedCommandList {
        &self.command_lists[self.frame_index as usize]
    }

    /// Index of the frame currently being recorded.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// The submission queue, e.g. for out-of-band uploads.
    pub fn queue_mut(&mut self) -> &mut CommandQueue {
        &mut self.queue
    }

    /// The per-frame descriptor pool.
    pub fn descriptor_pool_mut(&mut self) -> &mut DescriptorPool {
        &mut self.descriptor_pool
    }

    /// The back buffer the current frame renders into.
    pub fn back_buffer(&mut self) -> Result<Arc<Resource>, GpuError> {
        Ok(self.swapchain.back_buffer(self.frame_index)?)
    }

    /// Finishes the current frame: transitions the back buffer to `Present`,
    /// submits the frame's commands, presents, and opens the next frame's
    /// command list.
    pub fn present(&mut self) -> Result<(), GpuError> {
        let back_buffer = self.swapchain.back_buffer(self.frame_index)?;
        let current = Arc::clone(self.current());
        {
            let mut list = lock(&current);
            list.resource_barrier(&back_buffer, ResourceState::Present);
            list.close();
        }

        self.swapchain.next_image(&self.image_available)?;
        self.device.wait_semaphore(&self.image_available);
        self.queue.execute_command_lists(&[current])?;

        self.fence_value += 1;
        self.device.signal_fence(&self.frame_fence, self.fence_value);
        self.frame_fence_values[self.frame_index as usize] = self.fence_value;

        self.device.signal_semaphore(&self.rendering_finished);
        self.swapchain.present(&self.rendering_finished)?;

        self.frame_index = (self.frame_index + 1) % self.frame_count;

        // Block only if the GPU is still chewing on the frame that last used
        // this slot.
        let pending = self.frame_fence_values[self.frame_index as usize];
        if pending > 0 {
            debug!("waiting for frame slot {} (fence {pending})", self.frame_index);
            self.frame_fence.wait(pending)?;
        }

        self.descriptor_pool.reset();
        lock(&self.command_lists[self.frame_index as usize]).open();
        Ok(())
    }

    /// Blocks until the GPU is idle, then recreates the swapchain images.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.queue.wait_idle()?;
        if self.fence_value > 0 {
            self.frame_fence.wait(self.fence_value)?;
        }
        self.swapchain.resize(width, height)?;
        Ok(())
    }

    /// Creates a buffer on the context's device.
    pub fn create_buffer(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, GpuError> {
        Ok(self.device.create_buffer(desc)?)
    }

    /// Creates a texture on the context's device.
    pub fn create_texture(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, GpuError> {
        Ok(self.device.create_texture(desc)?)
    }

    /// Writes `data` into one subresource of `resource`.
    ///
    /// Upload-heap resources are written directly. Default-heap resources go
    /// through a staging buffer kept alive on the resource, with the copy
    /// recorded on the current frame's command list; `row_pitch` describes
    /// the layout of `data` for textures and is ignored for buffers.
    pub fn update_subresource(
        &mut self,
        resource: &Arc<Resource>,
        mip_level: u32,
        array_layer: u32,
        data: &[u8],
        row_pitch: u32,
    ) -> Result<(), GpuError> {
        let desc = resource.desc().clone();
        if desc.memory_type == MemoryType::Upload {
            resource.native().update_upload_data(data, 0)?;
            return Ok(());
        }

        match desc.kind {
            ResourceKind::Buffer => {
                let staging = self.staging_for(resource, 0, data.len() as u64)?;
                staging.native().update_upload_data(data, 0)?;
                let mut list = lock(self.current());
                list.copy_buffer(
                    &staging,
                    resource,
                    &[BufferCopyRegion {
                        src_offset: 0,
                        dst_offset: 0,
                        num_bytes: data.len() as u64,
                    }],
                );
            }
            ResourceKind::Texture => {
                let extent = desc.extent.mip_level(mip_level);
                let height = extent.height * extent.depth;
                let alignment = self.device.texture_data_pitch_alignment();
                let aligned_pitch = row_pitch.div_ceil(alignment) * alignment;

                // Repack rows to the backend's pitch alignment.
                let mut packed = vec![0u8; aligned_pitch as usize * height as usize];
                for row in 0..height as usize {
                    let src_start = row * row_pitch as usize;
                    let src_end = (src_start + row_pitch as usize).min(data.len());
                    let dst_start = row * aligned_pitch as usize;
                    packed[dst_start..dst_start + (src_end - src_start)]
                        .copy_from_slice(&data[src_start..src_end]);
                }

                let subresource = array_layer * desc.level_count + mip_level;
                let staging = self.staging_for(resource, subresource, packed.len() as u64)?;
                staging.native().update_upload_data(&packed, 0)?;
                let mut list = lock(self.current());
                list.copy_buffer_to_texture(
                    &staging,
                    resource,
                    &[BufferToTextureCopyRegion {
                        buffer_offset: 0,
                        buffer_row_pitch: aligned_pitch,
                        texture_mip_level: mip_level,
                        texture_array_layer: array_layer,
                        texture_extent: extent,
                    }],
                );
            }
            ResourceKind::BottomLevelAccelStructure | ResourceKind::TopLevelAccelStructure => {
                return Err(GpuError::Resource(ResourceError::FeatureNotSupported(
                    "direct acceleration structure upload".to_owned(),
                )));
            }
        }
        Ok(())
    }

    /// The staging buffer for `subresource`, grown on demand.
    fn staging_for(
        &self,
        resource: &Arc<Resource>,
        subresource: u32,
        size: u64,
    ) -> Result<Arc<Resource>, GpuError> {
        if let Some(staging) = resource.staging_buffer(subresource) {
            if staging.desc().extent.width >= size {
                return Ok(staging);
            }
        }
        let staging = self.device.create_buffer(&ResourceDesc::buffer(
            size,
            crate::gpu::api::BindFlag::COPY_SOURCE,
            MemoryType::Upload,
        ))?;
        resource.set_staging_buffer(subresource, Arc::clone(&staging));
        Ok(staging)
    }
}

fn lock(shared: &SharedCommandList) -> MutexGuard<'_, CommandListBox> {
    shared.lock().unwrap_or_else(|err| err.into_inner())
}
