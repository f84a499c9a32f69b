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

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use kiln_core::gpu::{
    AdapterSelector, BackendPreference, GpuAdapterInfo, GpuDevice, GpuError, GpuSettings,
};

use super::device::WgpuDevice;

/// Human-readable name for a `wgpu` backend.
pub fn backend_name(backend: wgpu::Backend) -> &'static str {
    match backend {
        wgpu::Backend::Vulkan => "Vulkan",
        wgpu::Backend::Metal => "Metal",
        wgpu::Backend::Dx12 => "DirectX 12",
        wgpu::Backend::Gl => "OpenGL",
        wgpu::Backend::BrowserWebGpu => "WebGPU",
        wgpu::Backend::Noop => "No-op",
    }
}

/// The `wgpu` objects every backend component hangs off.
///
/// `wgpu::Device` and `wgpu::Queue` are internally synchronized, so one
/// shared handle serves resources, fences, and command translation alike.
#[derive(Debug)]
pub struct WgpuShared {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,
    pub adapter_device_type: wgpu::DeviceType,
}

impl WgpuShared {
    /// Creates the logical device and queue on a pre-selected adapter.
    pub async fn new(instance: wgpu::Instance, adapter: wgpu::Adapter) -> Result<Self> {
        let adapter_info = adapter.get_info();
        log::info!(
            "Creating logical device on \"{}\" ({})",
            adapter_info.name,
            backend_name(adapter_info.backend)
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Kiln Logical Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;

        device.on_uncaptured_error(Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            adapter_device_type: adapter_info.device_type,
        })
    }

    /// Identity of the adapter in the backend-agnostic form.
    pub fn adapter_info(&self) -> GpuAdapterInfo {
        GpuAdapterInfo {
            name: self.adapter_name.clone(),
            backend: backend_name(self.adapter_backend).to_owned(),
            is_software: self.adapter_device_type == wgpu::DeviceType::Cpu,
        }
    }
}

/// Picks a `wgpu` adapter and builds a [`WgpuDevice`] on it.
#[derive(Debug)]
pub struct WgpuAdapterSelector {
    instance: wgpu::Instance,
}

impl WgpuAdapterSelector {
    /// A selector over a fresh instance covering every available backend.
    pub fn new() -> Self {
        Self {
            instance: wgpu::Instance::new(&wgpu::InstanceDescriptor::default()),
        }
    }

    /// Blocking variant of [`AdapterSelector::create_device`] for callers
    /// without an async runtime, e.g. application startup.
    pub fn create_device_blocking(
        &self,
        settings: &GpuSettings,
        preference: BackendPreference,
    ) -> Result<Arc<dyn GpuDevice>, GpuError> {
        pollster::block_on(self.create_device(settings, preference))
    }

    fn power_preference(preference: BackendPreference) -> wgpu::PowerPreference {
        match preference {
            BackendPreference::Auto => wgpu::PowerPreference::None,
            BackendPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            BackendPreference::LowPower | BackendPreference::Software => {
                wgpu::PowerPreference::LowPower
            }
        }
    }
}

impl Default for WgpuAdapterSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdapterSelector for WgpuAdapterSelector {
    async fn enumerate_adapters(&self) -> Vec<GpuAdapterInfo> {
        self.instance
            .enumerate_adapters(wgpu::Backends::all())
            .await
            .into_iter()
            .map(|adapter| {
                let info = adapter.get_info();
                GpuAdapterInfo {
                    name: info.name,
                    backend: backend_name(info.backend).to_owned(),
                    is_software: info.device_type == wgpu::DeviceType::Cpu,
                }
            })
            .collect()
    }

    async fn create_device(
        &self,
        _settings: &GpuSettings,
        preference: BackendPreference,
    ) -> Result<Arc<dyn GpuDevice>, GpuError> {
        let adapter = self
            .instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: Self::power_preference(preference),
                compatible_surface: None,
                force_fallback_adapter: preference == BackendPreference::Software,
            })
            .await
            .map_err(|e| GpuError::Internal(format!("No suitable adapter: {e}")))?;

        let shared = WgpuShared::new(self.instance.clone(), adapter)
            .await
            .map_err(|e| GpuError::Internal(e.to_string()))?;
        Ok(Arc::new(WgpuDevice::new(Arc::new(shared))) as Arc<dyn GpuDevice>)
    }
}
