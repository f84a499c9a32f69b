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

//! CPU/GPU and GPU/GPU synchronization primitives.

use std::any::Any;
use std::fmt::Debug;

use crate::gpu::error::SubmitError;

/// A monotonically increasing timeline fence.
///
/// Values are signaled from the GPU side via
/// [`GpuDevice::signal_fence`](crate::gpu::GpuDevice::signal_fence).
pub trait Fence: Send + Sync + Debug {
    /// The highest value the GPU has completed. Never blocks.
    fn completed_value(&self) -> u64;

    /// Blocks until the GPU has completed `value`.
    fn wait(&self, value: u64) -> Result<(), SubmitError>;

    /// Downcasting hook for backends.
    fn as_any(&self) -> &dyn Any;
}

/// A binary GPU-to-GPU synchronization point, used between swapchain
/// acquisition, rendering, and presentation.
pub trait GpuSemaphore: Send + Sync + Debug {
    /// Downcasting hook for backends.
    fn as_any(&self) -> &dyn Any;
}
