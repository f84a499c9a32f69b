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

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kiln_core::gpu::{Fence, SubmitError};

use super::context::WgpuShared;

/// Timeline fence emulated with submitted-work callbacks.
///
/// `wgpu` exposes no user fences; instead, a signal registers a callback
/// that fires once everything submitted so far has completed, which is
/// exactly the timeline semantic the submission layer relies on.
#[derive(Debug)]
pub struct WgpuFence {
    shared: Arc<WgpuShared>,
    completed: Arc<AtomicU64>,
}

impl WgpuFence {
    pub fn new(shared: Arc<WgpuShared>, initial_value: u64) -> Self {
        Self {
            shared,
            completed: Arc::new(AtomicU64::new(initial_value)),
        }
    }

    /// Advances the completed value to `value` once the work submitted up to
    /// this point has finished on the GPU.
    pub fn signal_after_submitted_work(&self, value: u64) {
        let completed = Arc::clone(&self.completed);
        self.shared.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::SeqCst);
        });
    }
}

impl Fence for WgpuFence {
    fn completed_value(&self) -> u64 {
        // Pump callbacks without blocking so completions become visible.
        if let Err(e) = self.shared.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {e:?}");
        }
        self.completed.load(Ordering::SeqCst)
    }

    fn wait(&self, value: u64) -> Result<(), SubmitError> {
        while self.completed.load(Ordering::SeqCst) < value {
            self.shared
                .device
                .poll(wgpu::PollType::wait_indefinitely())
                .map_err(|e| SubmitError::FenceWaitFailed(format!("{e:?}")))?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
