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

//! Backend payloads carried by shared resource objects.

use std::any::Any;
use std::fmt::Debug;

use crate::gpu::api::ResourceState;
use crate::gpu::error::ResourceError;

/// The backend payload of a [`Resource`](crate::gpu::Resource).
pub trait NativeResource: Send + Sync + Debug {
    /// Whether the backend implicitly promotes this resource from `Common`
    /// to `state` on first use, making an explicit barrier unnecessary.
    fn allow_common_state_promotion(&self, state: ResourceState) -> bool;

    /// Writes `data` into a CPU-visible (Upload-heap) resource at `offset`.
    ///
    /// Fails for resources not allocated from the Upload heap.
    fn update_upload_data(&self, data: &[u8], offset: u64) -> Result<(), ResourceError>;

    /// Attaches a debug name for captures and validation layers.
    fn set_name(&self, name: &str);

    /// Downcasting hook for backends.
    fn as_any(&self) -> &dyn Any;
}

/// The backend payload of a compiled pipeline.
pub trait NativePipeline: Send + Sync + Debug {
    /// Downcasting hook for backends.
    fn as_any(&self) -> &dyn Any;
}

/// The backend payload of a built binding set.
pub trait NativeBindingSet: Send + Sync + Debug {
    /// Downcasting hook for backends.
    fn as_any(&self) -> &dyn Any;
}
