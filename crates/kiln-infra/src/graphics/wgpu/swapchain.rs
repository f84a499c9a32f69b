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

use std::sync::Arc;

use kiln_core::gpu::{
    Format, GpuError, GpuSemaphore, Resource, ResourceError, ResourceState, Swapchain,
};
use kiln_core::platform::KilnWindowHandle;

use super::context::WgpuShared;
use super::conversions::format_from_wgpu;
use super::device::WgpuResource;

/// Swapchain over a `wgpu` surface.
///
/// The surface exposes one acquirable image at a time, so `back_buffer`
/// acquires lazily and `present` consumes the held [`wgpu::SurfaceTexture`].
pub struct WgpuSwapchain {
    shared: Arc<WgpuShared>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    frame_count: u32,
    acquired: Option<(wgpu::SurfaceTexture, Arc<Resource>)>,
    // Keeps the window alive as long as the surface needs it.
    _window: KilnWindowHandle,
}

// Manual impl because `KilnWindowHandle` is not `Debug`; mirrors the derive
// for every other field.
impl std::fmt::Debug for WgpuSwapchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuSwapchain")
            .field("shared", &self.shared)
            .field("surface", &self.surface)
            .field("config", &self.config)
            .field("frame_count", &self.frame_count)
            .field("acquired", &self.acquired)
            .finish_non_exhaustive()
    }
}

impl WgpuSwapchain {
    pub fn new(
        shared: Arc<WgpuShared>,
        window: KilnWindowHandle,
        width: u32,
        height: u32,
        frame_count: u32,
        vsync: bool,
    ) -> Result<Self, GpuError> {
        let surface_target = unsafe {
            wgpu::SurfaceTargetUnsafe::from_window(&window)
                .map_err(|e| GpuError::Internal(format!("Failed to create surface target: {e}")))?
        };
        let surface = unsafe {
            shared
                .instance
                .create_surface_unsafe(surface_target)
                .map_err(|e| GpuError::Internal(format!("Failed to create surface: {e}")))?
        };

        let caps = surface.get_capabilities(&shared.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);
        let present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .iter()
                .copied()
                .find(|m| *m == wgpu::PresentMode::Mailbox)
                .unwrap_or(wgpu::PresentMode::Fifo)
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: frame_count.saturating_sub(1).max(1),
        };
        surface.configure(&shared.device, &config);
        log::info!(
            "surface configured: {}x{} {:?} ({:?})",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok(Self {
            shared,
            surface,
            config,
            frame_count,
            acquired: None,
            _window: window,
        })
    }

    fn acquire(&mut self) -> Result<(), GpuError> {
        if self.acquired.is_some() {
            return Ok(());
        }
        let surface_texture = self
            .surface
            .get_current_texture()
            .map_err(|e| GpuError::SurfaceAcquisitionFailed(format!("{e:?}")))?;
        let desc = kiln_core::gpu::ResourceDesc::texture_2d(
            format_from_wgpu(self.config.format),
            self.config.width as u64,
            self.config.height,
            1,
            1,
            kiln_core::gpu::BindFlag::RENDER_TARGET,
        );
        // Surface textures arrive presentable; the tracker starts there.
        let resource = Resource::new(
            desc,
            Box::new(WgpuResource::texture(
                surface_texture.texture.clone(),
                self.shared.queue.clone(),
            )),
            ResourceState::Present,
        );
        resource.set_name("back buffer");
        self.acquired = Some((surface_texture, resource));
        Ok(())
    }
}

impl Swapchain for WgpuSwapchain {
    fn frame_count(&self) -> u32 {
        self.frame_count
    }

    fn format(&self) -> Format {
        format_from_wgpu(self.config.format)
    }

    fn back_buffer(&mut self, _index: u32) -> Result<Arc<Resource>, ResourceError> {
        self.acquire()
            .map_err(|e| ResourceError::BackendError(e.to_string()))?;
        // Acquire above guarantees the slot is filled.
        Ok(Arc::clone(&self.acquired.as_ref().unwrap().1))
    }

    fn next_image(&mut self, _semaphore: &Arc<dyn GpuSemaphore>) -> Result<u32, GpuError> {
        self.acquire()?;
        Ok(0)
    }

    fn present(&mut self, _semaphore: &Arc<dyn GpuSemaphore>) -> Result<(), GpuError> {
        match self.acquired.take() {
            Some((surface_texture, _)) => {
                surface_texture.present();
                Ok(())
            }
            None => Err(GpuError::Internal(
                "present without an acquired image".to_owned(),
            )),
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        if width == 0 || height == 0 {
            log::warn!("ignoring resize to zero dimensions: {width}x{height}");
            return Ok(());
        }
        self.acquired = None;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.shared.device, &self.config);
        Ok(())
    }
}
