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

//! The presentation surface contract.

use std::fmt::Debug;
use std::sync::Arc;

use crate::gpu::api::{Format, Resource};
use crate::gpu::error::{GpuError, ResourceError};
use crate::gpu::traits::sync::GpuSemaphore;

/// A swapchain owning `frame_count` presentable images.
pub trait Swapchain: Send + Debug {
    /// Number of back buffers.
    fn frame_count(&self) -> u32;

    /// Format of the back buffers.
    fn format(&self) -> Format;

    /// The back buffer at `index` as a shared resource.
    fn back_buffer(&mut self, index: u32) -> Result<Arc<Resource>, ResourceError>;

    /// Acquires the next image, signaling `semaphore` when it is ready.
    fn next_image(&mut self, semaphore: &Arc<dyn GpuSemaphore>) -> Result<u32, GpuError>;

    /// Presents the current image once `semaphore` is signaled.
    fn present(&mut self, semaphore: &Arc<dyn GpuSemaphore>) -> Result<(), GpuError>;

    /// Recreates the back buffers at a new size.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError>;
}
