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

//! Per-subresource resource state tracking.
//!
//! Two flavors share one representation: a plain [`ResourceStateTracker`]
//! records what a single command list believes about a resource while it is
//! being recorded, and [`GlobalResourceStateTracker`] holds the authoritative
//! state that submissions resolve lazy barriers against and commit back into.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::gpu::api::ResourceState;

/// Tracks the state of every subresource of one resource.
///
/// The representation is uniform until a per-subresource write diverges it:
/// while `per_subresource` is empty, `resource_state` applies to the whole
/// resource. A bulk write collapses back to the uniform form.
#[derive(Debug, Clone)]
pub struct ResourceStateTracker {
    level_count: u32,
    layer_count: u32,
    resource_state: ResourceState,
    per_subresource: HashMap<(u32, u32), ResourceState>,
}

impl ResourceStateTracker {
    /// A tracker for a resource with the given subresource grid, with every
    /// subresource in `initial_state`.
    pub fn new(level_count: u32, layer_count: u32, initial_state: ResourceState) -> Self {
        Self {
            level_count,
            layer_count,
            resource_state: initial_state,
            per_subresource: HashMap::new(),
        }
    }

    /// Number of mip levels tracked.
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    /// Number of array layers tracked.
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// Whether the tracker is in the uniform representation, i.e. one state
    /// applies to every subresource.
    pub fn has_resource_state(&self) -> bool {
        self.per_subresource.is_empty()
    }

    /// The uniform state. Only meaningful while
    /// [`has_resource_state`](Self::has_resource_state) is `true`.
    pub fn resource_state(&self) -> ResourceState {
        self.resource_state
    }

    /// Sets every subresource to `state`, collapsing back to uniform form.
    pub fn set_resource_state(&mut self, state: ResourceState) {
        self.per_subresource.clear();
        self.resource_state = state;
    }

    /// The state of one subresource.
    pub fn subresource_state(&self, mip_level: u32, array_layer: u32) -> ResourceState {
        if self.has_resource_state() {
            self.resource_state
        } else {
            self.per_subresource
                .get(&(mip_level, array_layer))
                .copied()
                .unwrap_or(ResourceState::Unknown)
        }
    }

    /// Sets the state of one subresource, diverging from the uniform form
    /// if necessary.
    pub fn set_subresource_state(&mut self, mip_level: u32, array_layer: u32, state: ResourceState) {
        if self.has_resource_state() {
            // Materialize the uniform state so untouched subresources keep it.
            for layer in 0..self.layer_count {
                for mip in 0..self.level_count {
                    self.per_subresource
                        .insert((mip, layer), self.resource_state);
                }
            }
        }
        self.per_subresource.insert((mip_level, array_layer), state);
    }

    /// Merges every known (non-`Unknown`) state of `other` into `self`.
    ///
    /// Used at submission time to commit a command list's final view of a
    /// resource into the authoritative tracker.
    pub fn merge(&mut self, other: &ResourceStateTracker) {
        if other.has_resource_state() {
            if other.resource_state() != ResourceState::Unknown {
                self.set_resource_state(other.resource_state());
            }
        } else {
            for (&(mip, layer), &state) in &other.per_subresource {
                if state != ResourceState::Unknown {
                    self.set_subresource_state(mip, layer, state);
                }
            }
        }
    }
}

/// The authoritative, thread-safe tracker owned by each resource.
///
/// Multiple threads may record command lists that reference a resource, but
/// by protocol only the submitting queue writes here, under the lock.
#[derive(Debug)]
pub struct GlobalResourceStateTracker {
    inner: Mutex<ResourceStateTracker>,
}

impl GlobalResourceStateTracker {
    /// A tracker with every subresource in `initial_state`.
    pub fn new(level_count: u32, layer_count: u32, initial_state: ResourceState) -> Self {
        Self {
            inner: Mutex::new(ResourceStateTracker::new(
                level_count,
                layer_count,
                initial_state,
            )),
        }
    }

    /// The state of one subresource.
    pub fn subresource_state(&self, mip_level: u32, array_layer: u32) -> ResourceState {
        self.lock().subresource_state(mip_level, array_layer)
    }

    /// Sets the state of one subresource.
    pub fn set_subresource_state(&self, mip_level: u32, array_layer: u32, state: ResourceState) {
        self.lock().set_subresource_state(mip_level, array_layer, state);
    }

    /// Sets every subresource to `state`.
    pub fn set_resource_state(&self, state: ResourceState) {
        self.lock().set_resource_state(state);
    }

    /// Commits a command list's final view of the resource.
    pub fn merge(&self, local: &ResourceStateTracker) {
        self.lock().merge(local);
    }

    fn lock(&self) -> MutexGuard<'_, ResourceStateTracker> {
        // Poisoning only happens if a panic unwound mid-update; the tracker
        // has no invalid intermediate states, so recover the data.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_state_applies_to_all_subresources() {
        let tracker = ResourceStateTracker::new(4, 2, ResourceState::Common);
        assert!(tracker.has_resource_state());
        assert_eq!(tracker.subresource_state(0, 0), ResourceState::Common);
        assert_eq!(tracker.subresource_state(3, 1), ResourceState::Common);
    }

    #[test]
    fn per_subresource_write_diverges_and_keeps_uniform_elsewhere() {
        let mut tracker = ResourceStateTracker::new(2, 2, ResourceState::Common);
        tracker.set_subresource_state(1, 0, ResourceState::RenderTarget);
        assert!(!tracker.has_resource_state());
        assert_eq!(tracker.subresource_state(1, 0), ResourceState::RenderTarget);
        assert_eq!(tracker.subresource_state(0, 0), ResourceState::Common);
        assert_eq!(tracker.subresource_state(1, 1), ResourceState::Common);
    }

    #[test]
    fn bulk_write_collapses_back_to_uniform() {
        let mut tracker = ResourceStateTracker::new(2, 1, ResourceState::Common);
        tracker.set_subresource_state(0, 0, ResourceState::CopyDest);
        tracker.set_resource_state(ResourceState::ShaderResource);
        assert!(tracker.has_resource_state());
        assert_eq!(tracker.subresource_state(0, 0), ResourceState::ShaderResource);
        assert_eq!(tracker.subresource_state(1, 0), ResourceState::ShaderResource);
    }

    #[test]
    fn merge_skips_unknown_states() {
        let mut global = ResourceStateTracker::new(2, 1, ResourceState::Common);
        let mut local = ResourceStateTracker::new(2, 1, ResourceState::Unknown);
        local.set_subresource_state(1, 0, ResourceState::CopySource);
        // (0, 0) stays Unknown in the local tracker.
        let local_snapshot = local.clone();
        global.merge(&local_snapshot);
        assert_eq!(global.subresource_state(0, 0), ResourceState::Common);
        assert_eq!(global.subresource_state(1, 0), ResourceState::CopySource);
    }

    #[test]
    fn merge_uniform_overwrites_everything() {
        let mut global = ResourceStateTracker::new(2, 2, ResourceState::Common);
        global.set_subresource_state(0, 1, ResourceState::CopyDest);
        let mut local = ResourceStateTracker::new(2, 2, ResourceState::Unknown);
        local.set_resource_state(ResourceState::Present);
        global.merge(&local);
        assert!(global.has_resource_state());
        assert_eq!(global.subresource_state(0, 1), ResourceState::Present);
    }

    #[test]
    fn global_tracker_round_trips_through_lock() {
        let global = GlobalResourceStateTracker::new(1, 1, ResourceState::Common);
        assert_eq!(global.subresource_state(0, 0), ResourceState::Common);
        global.set_subresource_state(0, 0, ResourceState::Present);
        assert_eq!(global.subresource_state(0, 0), ResourceState::Present);
    }
}
