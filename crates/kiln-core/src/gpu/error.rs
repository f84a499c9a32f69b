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

//! Error types for the graphics layer.

use std::error::Error;
use std::fmt;

/// Errors arising from resource creation and access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The backend reported a creation or mapping failure.
    BackendError(String),
    /// The handle does not refer to a live resource.
    InvalidHandle,
    /// An offset or region exceeds the resource's bounds.
    OutOfBounds {
        /// Byte offset of the access.
        offset: u64,
        /// Length of the access in bytes.
        len: u64,
        /// Size of the resource in bytes.
        size: u64,
    },
    /// The backend does not support the requested feature.
    FeatureNotSupported(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::BackendError(msg) => write!(f, "Resource backend error: {msg}"),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle"),
            ResourceError::OutOfBounds { offset, len, size } => write!(
                f,
                "Access of {len} bytes at offset {offset} exceeds resource size {size}"
            ),
            ResourceError::FeatureNotSupported(feature) => {
                write!(f, "Feature not supported by this backend: {feature}")
            }
        }
    }
}

impl Error for ResourceError {}

/// Errors arising from binding-set construction and descriptor allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The descriptor pool cannot satisfy the allocation.
    PoolExhausted {
        /// Descriptors requested.
        requested: u32,
        /// Descriptors still available.
        available: u32,
    },
    /// A binding was attached at a key the layout does not declare.
    UnknownBindKey {
        /// Slot of the offending key.
        slot: u32,
        /// Space of the offending key.
        space: u32,
    },
    /// The attached resources do not match the layout.
    LayoutMismatch(String),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::PoolExhausted {
                requested,
                available,
            } => write!(
                f,
                "Descriptor pool exhausted: requested {requested}, {available} available"
            ),
            BindingError::UnknownBindKey { slot, space } => {
                write!(f, "Bind key (slot {slot}, space {space}) is not declared by the layout")
            }
            BindingError::LayoutMismatch(msg) => write!(f, "Binding layout mismatch: {msg}"),
        }
    }
}

impl Error for BindingError {}

/// Errors arising from command submission and synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Waiting on a fence failed.
    FenceWaitFailed(String),
    /// The device was lost; no further submissions are possible.
    DeviceLost,
    /// A command list was submitted in an invalid state.
    InvalidCommandList(String),
    /// The backend reported a submission failure.
    BackendError(String),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::FenceWaitFailed(msg) => write!(f, "Fence wait failed: {msg}"),
            SubmitError::DeviceLost => write!(f, "Device lost"),
            SubmitError::InvalidCommandList(msg) => write!(f, "Invalid command list: {msg}"),
            SubmitError::BackendError(msg) => write!(f, "Submission backend error: {msg}"),
        }
    }
}

impl Error for SubmitError {}

/// Top-level error for the graphics layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// A resource operation failed.
    Resource(ResourceError),
    /// A binding operation failed.
    Binding(BindingError),
    /// A submission or synchronization operation failed.
    Submit(SubmitError),
    /// Acquiring the next swapchain image failed.
    SurfaceAcquisitionFailed(String),
    /// The layer was used before initialization completed.
    NotInitialized,
    /// An internal invariant was violated.
    Internal(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::Resource(err) => write!(f, "Resource error: {err}"),
            GpuError::Binding(err) => write!(f, "Binding error: {err}"),
            GpuError::Submit(err) => write!(f, "Submit error: {err}"),
            GpuError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire swapchain image: {msg}")
            }
            GpuError::NotInitialized => write!(f, "Graphics layer is not initialized"),
            GpuError::Internal(msg) => write!(f, "Internal graphics error: {msg}"),
        }
    }
}

impl Error for GpuError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GpuError::Resource(err) => Some(err),
            GpuError::Binding(err) => Some(err),
            GpuError::Submit(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for GpuError {
    fn from(err: ResourceError) -> Self {
        GpuError::Resource(err)
    }
}

impl From<BindingError> for GpuError {
    fn from(err: BindingError) -> Self {
        GpuError::Binding(err)
    }
}

impl From<SubmitError> for GpuError {
    fn from(err: SubmitError) -> Self {
        GpuError::Submit(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_error_display() {
        let err = ResourceError::OutOfBounds {
            offset: 16,
            len: 64,
            size: 32,
        };
        assert_eq!(
            err.to_string(),
            "Access of 64 bytes at offset 16 exceeds resource size 32"
        );
    }

    #[test]
    fn binding_error_display() {
        let err = BindingError::PoolExhausted {
            requested: 8,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Descriptor pool exhausted: requested 8, 3 available"
        );
    }

    #[test]
    fn gpu_error_wraps_and_sources() {
        let err: GpuError = SubmitError::DeviceLost.into();
        assert_eq!(err.to_string(), "Submit error: Device lost");
        assert!(err.source().is_some());
    }
}
