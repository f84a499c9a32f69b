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

//! The backend-agnostic graphics layer.
//!
//! This module defines the 'what' of GPU work; the 'how' is handled by a
//! concrete backend in `kiln-infra` which implements the [`traits`]. The
//! submission core ([`command_list`], [`queue`], [`context`]) is shared by
//! every backend: it tracks per-subresource states, defers barriers whose
//! prior state is unknowable at record time, and resolves them against each
//! resource's authoritative tracker when command lists are submitted.

pub mod api;
pub mod binding;
pub mod command_list;
pub mod context;
pub mod error;
pub mod queue;
pub mod tracker;
pub mod traits;

// Re-export the most important types for easier use.
pub use self::api::*;
pub use self::binding::{DescriptorPool, DescriptorRange, ProgramBindings};
pub use self::command_list::{CommandListBox, SharedCommandList};
pub use self::context::GpuContext;
pub use self::error::{BindingError, GpuError, ResourceError, SubmitError};
pub use self::queue::CommandQueue;
pub use self::tracker::{GlobalResourceStateTracker, ResourceStateTracker};
pub use self::traits::{
    AdapterSelector, BackendPreference, Fence, GpuDevice, GpuSemaphore, NativeBindingSet,
    NativeCommandList, NativePipeline, NativeResource, Swapchain,
};
