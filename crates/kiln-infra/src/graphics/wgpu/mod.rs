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

//! The `wgpu` hardware backend.
//!
//! `wgpu` tracks resource states internally, so explicit barriers become
//! ordering metadata: the backend logs them and otherwise relies on the
//! driver-side tracking. Fences are modeled with submitted-work callbacks,
//! and command lists record a deferred operation stream that is translated
//! into a [`wgpu::CommandEncoder`] when the list closes.

mod command;
mod context;
mod conversions;
mod device;
mod fence;
mod swapchain;

pub use command::WgpuCommandList;
pub use context::{WgpuAdapterSelector, WgpuShared};
pub use device::WgpuDevice;
pub use fence::WgpuFence;
pub use swapchain::WgpuSwapchain;
