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

//! Contracts a graphics backend implements.
//!
//! The submission core never talks to a driver directly; everything it
//! needs from a backend flows through these traits.

pub mod command_list;
pub mod device;
pub mod resource;
pub mod selector;
pub mod swapchain;
pub mod sync;

pub use command_list::NativeCommandList;
pub use device::GpuDevice;
pub use resource::{NativeBindingSet, NativePipeline, NativeResource};
pub use selector::{AdapterSelector, BackendPreference};
pub use swapchain::Swapchain;
pub use sync::{Fence, GpuSemaphore};
