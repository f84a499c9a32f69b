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

//! Submission-time barrier resolution and the patch list pool.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace};

use crate::gpu::api::{ResourceBarrierDesc, ResourceState, SubresourceRange};
use crate::gpu::command_list::{CommandListBox, SharedCommandList};
use crate::gpu::error::SubmitError;
use crate::gpu::traits::{Fence, GpuDevice};

/// Submits command lists, resolving their lazy barriers against each
/// resource's authoritative tracker.
///
/// Resolved barriers are recorded into *patch* command lists inserted before
/// the list they fix up. Patch lists come from a pool guarded by a fence:
/// a pooled list is only reused once the GPU has finished the submission
/// that contained it.
#[derive(Debug)]
pub struct CommandQueue {
    device: Arc<dyn GpuDevice>,
    fence: Option<Arc<dyn Fence>>,
    fence_value: u64,
    patch_pool: Vec<SharedCommandList>,
    // (fence value the slot is reusable after, pool slot), oldest first.
    fence_value_by_slot: VecDeque<(u64, usize)>,
    fake_close: bool,
}

impl CommandQueue {
    /// A queue submitting through `device`.
    pub fn new(device: Arc<dyn GpuDevice>) -> Self {
        Self {
            device,
            fence: None,
            fence_value: 0,
            patch_pool: Vec::new(),
            fence_value_by_slot: VecDeque::new(),
            fake_close: false,
        }
    }

    /// Appends patch barriers to the previous list's tail instead of
    /// recording separate patch lists. Only valid when the command lists
    /// were recorded with the matching deferred-close mode.
    pub fn set_fake_close(&mut self, fake_close: bool) {
        self.fake_close = fake_close;
    }

    /// Number of patch lists currently pooled.
    pub fn patch_pool_len(&self) -> usize {
        self.patch_pool.len()
    }

    /// Resolves every lazy barrier in `lists` and submits them, interleaved
    /// with the patch lists the resolution produced.
    ///
    /// For each deferred intent the prior state is read from the resource's
    /// authoritative tracker; a residual `Unknown` (a resource no submission
    /// has touched under a tracker seeded that way) is treated as `Common`.
    /// Transitions that resolve to their current state are dropped. After
    /// resolution, each list's final view of its resources is committed back
    /// into the authoritative trackers, in submission order.
    pub fn execute_command_lists(
        &mut self,
        lists: &[SharedCommandList],
    ) -> Result<(), SubmitError> {
        if lists.is_empty() {
            return Ok(());
        }
        let fence = match &self.fence {
            Some(fence) => Arc::clone(fence),
            None => {
                let fence = self.device.create_fence(0);
                self.fence = Some(Arc::clone(&fence));
                fence
            }
        };

        let mut to_submit: Vec<SharedCommandList> = Vec::with_capacity(lists.len());
        let mut patch_cmds = 0usize;

        for (c, shared) in lists.iter().enumerate() {
            let list = lock(shared);
            if list.is_open() {
                return Err(SubmitError::InvalidCommandList(
                    "list submitted while still recording".to_owned(),
                ));
            }

            let mut new_barriers: Vec<ResourceBarrierDesc> = Vec::new();
            for lazy in list.lazy_barriers() {
                // The first list in a submission may rely on implicit
                // promotion out of Common where the backend offers it.
                if c == 0 && lazy.resource.allow_common_state_promotion(lazy.state) {
                    trace!("{}: promoted to {:?}", lazy.resource.id(), lazy.state);
                    continue;
                }
                for (mip, layer) in lazy.range.subresources() {
                    let tracked = lazy.resource.global_state().subresource_state(mip, layer);
                    let state_before = if tracked == ResourceState::Unknown {
                        ResourceState::Common
                    } else {
                        tracked
                    };
                    // A residual Unknown is never elided, even against an
                    // identical target, so the transition reaches the driver.
                    if tracked == ResourceState::Unknown || state_before != lazy.state {
                        new_barriers.push(ResourceBarrierDesc {
                            resource: Arc::clone(&lazy.resource),
                            range: SubresourceRange::single(mip, layer),
                            state_before,
                            state_after: lazy.state,
                        });
                    }
                }
            }

            if !new_barriers.is_empty() {
                debug!(
                    "resolved {} patch barrier(s) ahead of list {c}",
                    new_barriers.len()
                );
                if c != 0 && self.fake_close {
                    // The previous list's native close is still pending, so
                    // the barriers can ride on its tail.
                    lock(&lists[c - 1]).resource_barrier_manual(&new_barriers);
                } else {
                    let patch = self.acquire_patch_list(&fence);
                    {
                        let mut patch_list = lock(&patch);
                        patch_list.open();
                        patch_list.resource_barrier_manual(&new_barriers);
                        patch_list.close();
                    }
                    to_submit.push(patch);
                    patch_cmds += 1;
                }
            }

            for (resource, tracker) in list.state_trackers() {
                resource.global_state().merge(tracker);
            }
            drop(list);
            to_submit.push(Arc::clone(shared));
        }

        for shared in &to_submit {
            lock(shared).finalize_native_close();
        }
        self.device.execute_command_lists_impl(&to_submit);

        // The fence only guards patch list reuse; skip the signal when no
        // pooled list was consumed.
        if patch_cmds > 0 {
            self.fence_value += 1;
            self.device.signal_fence(&fence, self.fence_value);
        }
        Ok(())
    }

    /// Blocks until everything submitted so far has completed.
    pub fn wait_idle(&mut self) -> Result<(), SubmitError> {
        let fence = match &self.fence {
            Some(fence) => Arc::clone(fence),
            None => return Ok(()),
        };
        self.fence_value += 1;
        self.device.signal_fence(&fence, self.fence_value);
        fence.wait(self.fence_value)
    }

    /// Pops the oldest pooled list if the GPU is done with it, otherwise
    /// grows the pool. Never blocks.
    fn acquire_patch_list(&mut self, fence: &Arc<dyn Fence>) -> SharedCommandList {
        if let Some(&(reusable_after, slot)) = self.fence_value_by_slot.front() {
            if fence.completed_value() >= reusable_after {
                self.fence_value_by_slot.pop_front();
                self.fence_value_by_slot.push_back((self.fence_value + 1, slot));
                return Arc::clone(&self.patch_pool[slot]);
            }
        }
        let list = CommandListBox::new_shared(self.device.create_command_list());
        self.patch_pool.push(Arc::clone(&list));
        self.fence_value_by_slot
            .push_back((self.fence_value + 1, self.patch_pool.len() - 1));
        list
    }
}

fn lock(shared: &SharedCommandList) -> MutexGuard<'_, CommandListBox> {
    shared.lock().unwrap_or_else(|err| err.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::api::{
        BindFlag, BindingDesc, BindingLayout, Format, GpuAdapterInfo, Resource, ResourceDesc,
    };
    use crate::gpu::command_list::test_support::{RecordedOp, RecordingList, StubResource};
    use crate::gpu::error::{BindingError, GpuError, ResourceError};
    use crate::gpu::traits::{
        GpuSemaphore, NativeBindingSet, NativeCommandList, Swapchain,
    };
    use crate::platform::KilnWindowHandle;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug)]
    struct ManualFence {
        completed: AtomicU64,
    }

    impl Fence for ManualFence {
        fn completed_value(&self) -> u64 {
            self.completed.load(Ordering::SeqCst)
        }
        fn wait(&self, value: u64) -> Result<(), SubmitError> {
            // Tests drive completion by hand; waiting force-completes.
            self.completed.fetch_max(value, Ordering::SeqCst);
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[derive(Debug)]
    struct MockDevice {
        fence: Arc<ManualFence>,
        submissions: Mutex<Vec<Vec<SharedCommandList>>>,
        signals: Mutex<Vec<u64>>,
    }

    impl MockDevice {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fence: Arc::new(ManualFence {
                    completed: AtomicU64::new(0),
                }),
                submissions: Mutex::new(Vec::new()),
                signals: Mutex::new(Vec::new()),
            })
        }

        fn complete(&self, value: u64) {
            self.fence.completed.fetch_max(value, Ordering::SeqCst);
        }

        fn last_submission(&self) -> Vec<SharedCommandList> {
            self.submissions.lock().unwrap().last().unwrap().clone()
        }
    }

    impl GpuDevice for MockDevice {
        fn create_buffer(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, ResourceError> {
            Ok(Resource::new(
                desc.clone(),
                Box::new(StubResource {
                    allow_promotion: false,
                }),
                ResourceState::Common,
            ))
        }
        fn create_texture(&self, desc: &ResourceDesc) -> Result<Arc<Resource>, ResourceError> {
            self.create_buffer(desc)
        }
        fn create_acceleration_structure(
            &self,
            _desc: &ResourceDesc,
        ) -> Result<Arc<Resource>, ResourceError> {
            Err(ResourceError::FeatureNotSupported("raytracing".to_owned()))
        }
        fn create_command_list(&self) -> Box<dyn NativeCommandList> {
            Box::new(RecordingList::default())
        }
        fn create_fence(&self, _initial_value: u64) -> Arc<dyn Fence> {
            Arc::clone(&self.fence) as Arc<dyn Fence>
        }
        fn create_semaphore(&self) -> Arc<dyn GpuSemaphore> {
            unimplemented!("not exercised by queue tests")
        }
        fn create_swapchain(
            &self,
            _window: KilnWindowHandle,
            _width: u32,
            _height: u32,
            _frame_count: u32,
            _vsync: bool,
        ) -> Result<Box<dyn Swapchain>, GpuError> {
            unimplemented!("not exercised by queue tests")
        }
        fn create_binding_set(
            &self,
            _layout: &BindingLayout,
            _bindings: &[BindingDesc],
        ) -> Result<Arc<dyn NativeBindingSet>, BindingError> {
            unimplemented!("not exercised by queue tests")
        }
        fn signal_fence(&self, _fence: &Arc<dyn Fence>, value: u64) {
            self.signals.lock().unwrap().push(value);
        }
        fn wait_semaphore(&self, _semaphore: &Arc<dyn GpuSemaphore>) {}
        fn signal_semaphore(&self, _semaphore: &Arc<dyn GpuSemaphore>) {}
        fn execute_command_lists_impl(&self, lists: &[SharedCommandList]) {
            self.submissions.lock().unwrap().push(lists.to_vec());
        }
        fn texture_data_pitch_alignment(&self) -> u32 {
            256
        }
        fn supports_raytracing(&self) -> bool {
            false
        }
        fn adapter_info(&self) -> GpuAdapterInfo {
            GpuAdapterInfo::default()
        }
    }

    fn texture(device: &Arc<MockDevice>) -> Arc<Resource> {
        device
            .create_texture(&ResourceDesc::texture_2d(
                Format::Rgba8Unorm,
                64,
                64,
                1,
                1,
                BindFlag::RENDER_TARGET | BindFlag::SHADER_RESOURCE,
            ))
            .unwrap()
    }

    fn recorded_barriers(
        shared: &SharedCommandList,
    ) -> Vec<(ResourceState, ResourceState)> {
        let mut list = shared.lock().unwrap();
        let ops = list
            .native_mut()
            .as_any_mut()
            .downcast_mut::<RecordingList>()
            .unwrap()
            .ops
            .clone();
        ops.into_iter()
            .filter_map(|op| match op {
                RecordedOp::Barrier(barriers) => Some(barriers),
                _ => None,
            })
            .flatten()
            .map(|(_, _, before, after)| (before, after))
            .collect()
    }

    fn recorded_list(device: &Arc<MockDevice>) -> SharedCommandList {
        CommandListBox::new_shared(device.create_command_list())
    }

    #[test]
    fn first_touch_resolves_against_common_in_patch_list() {
        let device = MockDevice::new();
        let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let tex = texture(&device);

        let list = recorded_list(&device);
        {
            let mut guard = list.lock().unwrap();
            guard.open();
            guard.resource_barrier(&tex, ResourceState::RenderTarget);
            guard.close();
        }
        queue.execute_command_lists(&[Arc::clone(&list)]).unwrap();

        let submitted = device.last_submission();
        assert_eq!(submitted.len(), 2, "patch list precedes the user list");
        let patch_barriers = recorded_barriers(&submitted[0]);
        assert_eq!(
            patch_barriers,
            vec![(ResourceState::Common, ResourceState::RenderTarget)]
        );
        // Global truth now reflects the list's final state.
        assert_eq!(
            tex.global_state().subresource_state(0, 0),
            ResourceState::RenderTarget
        );
        // A patch list was consumed, so the pool fence was signaled.
        assert_eq!(*device.signals.lock().unwrap(), vec![1]);
    }

    #[test]
    fn transition_into_current_state_is_elided() {
        let device = MockDevice::new();
        let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let tex = texture(&device);

        let list = recorded_list(&device);
        {
            let mut guard = list.lock().unwrap();
            guard.open();
            guard.resource_barrier(&tex, ResourceState::Common);
            guard.close();
        }
        queue.execute_command_lists(&[Arc::clone(&list)]).unwrap();

        let submitted = device.last_submission();
        assert_eq!(submitted.len(), 1, "no patch list for a no-op transition");
        assert!(device.signals.lock().unwrap().is_empty());
    }

    #[test]
    fn promotion_skips_barrier_on_first_list_only() {
        let device = MockDevice::new();
        let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let tex = Resource::new(
            ResourceDesc::texture_2d(Format::Rgba8Unorm, 8, 8, 1, 1, BindFlag::SHADER_RESOURCE),
            Box::new(StubResource {
                allow_promotion: true,
            }),
            ResourceState::Common,
        );

        let first = recorded_list(&device);
        let second = recorded_list(&device);
        for shared in [&first, &second] {
            let mut guard = shared.lock().unwrap();
            guard.open();
            guard.resource_barrier(&tex, ResourceState::ShaderResource);
            guard.close();
        }
        // Reset global truth between recordings is not needed; the second
        // list's intent resolves against whatever the first committed.
        queue
            .execute_command_lists(&[Arc::clone(&first), Arc::clone(&second)])
            .unwrap();

        let submitted = device.last_submission();
        // First list promoted; second list's intent resolves to the state
        // the first committed, which elides too.
        assert_eq!(submitted.len(), 2);
    }

    #[test]
    fn patch_barrier_uses_state_committed_by_earlier_list() {
        let device = MockDevice::new();
        let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let tex = texture(&device);

        let first = recorded_list(&device);
        {
            let mut guard = first.lock().unwrap();
            guard.open();
            guard.resource_barrier(&tex, ResourceState::RenderTarget);
            guard.close();
        }
        let second = recorded_list(&device);
        {
            let mut guard = second.lock().unwrap();
            guard.open();
            guard.resource_barrier(&tex, ResourceState::ShaderResource);
            guard.close();
        }
        queue
            .execute_command_lists(&[Arc::clone(&first), Arc::clone(&second)])
            .unwrap();

        let submitted = device.last_submission();
        // patch(first), first, patch(second), second.
        assert_eq!(submitted.len(), 4);
        let second_patch = recorded_barriers(&submitted[2]);
        assert_eq!(
            second_patch,
            vec![(ResourceState::RenderTarget, ResourceState::ShaderResource)]
        );
    }

    #[test]
    fn patch_pool_reuses_only_after_fence_completion() {
        let device = MockDevice::new();
        let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let tex = texture(&device);

        let submit_transition = |queue: &mut CommandQueue, state| {
            let list = recorded_list(&device);
            {
                let mut guard = list.lock().unwrap();
                guard.open();
                guard.resource_barrier(&tex, state);
                guard.close();
            }
            queue.execute_command_lists(&[list]).unwrap();
        };

        submit_transition(&mut queue, ResourceState::RenderTarget);
        assert_eq!(queue.patch_pool_len(), 1);

        // GPU still busy: the pooled list cannot be reused.
        submit_transition(&mut queue, ResourceState::ShaderResource);
        assert_eq!(queue.patch_pool_len(), 2);

        // Both submissions retired: the oldest pooled list is reusable.
        device.complete(2);
        submit_transition(&mut queue, ResourceState::CopySource);
        assert_eq!(queue.patch_pool_len(), 2);
    }

    #[test]
    fn fake_close_appends_patch_barriers_to_previous_tail() {
        let device = MockDevice::new();
        let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        queue.set_fake_close(true);
        let tex = texture(&device);

        let first = recorded_list(&device);
        {
            let mut guard = first.lock().unwrap();
            guard.set_fake_close(true);
            guard.open();
            guard.resource_barrier(&tex, ResourceState::RenderTarget);
            guard.close();
        }
        let second = recorded_list(&device);
        {
            let mut guard = second.lock().unwrap();
            guard.set_fake_close(true);
            guard.open();
            guard.resource_barrier(&tex, ResourceState::ShaderResource);
            guard.close();
        }
        queue
            .execute_command_lists(&[Arc::clone(&first), Arc::clone(&second)])
            .unwrap();

        let submitted = device.last_submission();
        // First list still needs a leading patch list; the second's barriers
        // ride on the first list's tail.
        assert_eq!(submitted.len(), 3);
        assert_eq!(queue.patch_pool_len(), 1);
        let first_tail = recorded_barriers(&first);
        assert_eq!(
            first_tail,
            vec![(ResourceState::RenderTarget, ResourceState::ShaderResource)]
        );
    }

    #[test]
    fn open_list_is_rejected() {
        let device = MockDevice::new();
        let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let list = recorded_list(&device);
        list.lock().unwrap().open();
        let err = queue.execute_command_lists(&[list]).unwrap_err();
        assert!(matches!(err, SubmitError::InvalidCommandList(_)));
    }
}
