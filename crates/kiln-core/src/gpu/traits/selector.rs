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

//! Asynchronous adapter discovery and device creation.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::gpu::api::{GpuAdapterInfo, GpuSettings};
use crate::gpu::error::GpuError;
use crate::gpu::traits::device::GpuDevice;

/// Hints for adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Let the selector pick the best adapter.
    #[default]
    Auto,
    /// Prefer a discrete, high-performance adapter.
    HighPerformance,
    /// Prefer a low-power (usually integrated) adapter.
    LowPower,
    /// Require a software rasterizer.
    Software,
}

/// Discovers adapters and creates a device on one of them.
///
/// Adapter enumeration is asynchronous on some drivers; callers that do not
/// run an executor can resolve the futures with `pollster::block_on`.
#[async_trait]
pub trait AdapterSelector: Send + Sync + Debug {
    /// Lists the adapters this backend can create a device on.
    async fn enumerate_adapters(&self) -> Vec<GpuAdapterInfo>;

    /// Creates a device on the adapter chosen by `settings` and `preference`.
    async fn create_device(
        &self,
        settings: &GpuSettings,
        preference: BackendPreference,
    ) -> Result<Arc<dyn GpuDevice>, GpuError>;
}
