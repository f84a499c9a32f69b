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

//! Descriptor allocation and program binding state.

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;

use crate::gpu::api::{
    BindKey, BindingDesc, BindingLayout, LazyResourceBarrierDesc, Resource, ResourceState,
    ViewDesc, ViewKind,
};
use crate::gpu::command_list::CommandListBox;
use crate::gpu::error::BindingError;
use crate::gpu::traits::{GpuDevice, NativeBindingSet};

/// A contiguous range of descriptors handed out by a [`DescriptorPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRange {
    /// First descriptor index.
    pub offset: u32,
    /// Number of descriptors.
    pub count: u32,
}

/// A bump allocator over a fixed descriptor budget.
///
/// Reset wholesale once per frame; individual ranges are never freed.
#[derive(Debug)]
pub struct DescriptorPool {
    capacity: u32,
    next: u32,
}

impl DescriptorPool {
    /// A pool holding `capacity` descriptors.
    pub fn new(capacity: u32) -> Self {
        Self { capacity, next: 0 }
    }

    /// Hands out the next `count` descriptors.
    pub fn allocate(&mut self, count: u32) -> Result<DescriptorRange, BindingError> {
        let available = self.capacity - self.next;
        if count > available {
            return Err(BindingError::PoolExhausted {
                requested: count,
                available,
            });
        }
        let offset = self.next;
        self.next += count;
        Ok(DescriptorRange { offset, count })
    }

    /// Reclaims every range at once.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Descriptors not yet handed out.
    pub fn available(&self) -> u32 {
        self.capacity - self.next
    }
}

/// The resources currently attached to a program's binding slots.
///
/// Rebuilding native binding sets is deferred until [`apply`](Self::apply),
/// so attaching the same resources over consecutive draws reuses the set.
#[derive(Debug)]
pub struct ProgramBindings {
    layout: BindingLayout,
    attached: HashMap<BindKey, (Arc<Resource>, ViewDesc)>,
    dirty: bool,
    native_set: Option<Arc<dyn NativeBindingSet>>,
}

impl ProgramBindings {
    /// Bindings for a program exposing `layout`.
    pub fn new(layout: BindingLayout) -> Self {
        Self {
            layout,
            attached: HashMap::new(),
            dirty: false,
            native_set: None,
        }
    }

    /// The layout the bindings were created for.
    pub fn layout(&self) -> &BindingLayout {
        &self.layout
    }

    /// Attaches `resource` at `key`, replacing any previous attachment.
    pub fn attach(
        &mut self,
        key: BindKey,
        resource: Arc<Resource>,
        view: ViewDesc,
    ) -> Result<(), BindingError> {
        if !self.layout.declares(&key) {
            return Err(BindingError::UnknownBindKey {
                slot: key.slot,
                space: key.space,
            });
        }
        // Re-attaching the identical resource/view pair keeps the set valid.
        let unchanged = matches!(
            self.attached.get(&key),
            Some((old_res, old_view)) if Arc::ptr_eq(old_res, &resource) && *old_view == view
        );
        self.attached.insert(key, (resource, view));
        if !unchanged {
            self.dirty = true;
        }
        Ok(())
    }

    /// Forces the next [`apply`](Self::apply) to rebuild the native set.
    pub fn invalidate(&mut self) {
        self.dirty = true;
        self.native_set = None;
    }

    /// Transitions every attached resource into the state its view implies,
    /// builds the native set if anything changed, and binds it on `cmd`.
    pub fn apply(
        &mut self,
        device: &Arc<dyn GpuDevice>,
        pool: &mut DescriptorPool,
        cmd: &mut CommandListBox,
    ) -> Result<(), BindingError> {
        let mut intents = Vec::with_capacity(self.attached.len());
        for (resource, view) in self.attached.values() {
            if let Some(state) = state_for_view(view.kind) {
                intents.push(LazyResourceBarrierDesc {
                    resource: Arc::clone(resource),
                    range: view.range(resource.desc()),
                    state,
                });
            }
        }
        cmd.lazy_resource_barrier(intents);

        if self.dirty || self.native_set.is_none() {
            let range = pool.allocate(self.layout.descriptor_count())?;
            trace!(
                "rebuilding binding set over descriptors [{}, {})",
                range.offset,
                range.offset + range.count
            );
            let bindings: Vec<BindingDesc> = self
                .attached
                .iter()
                .map(|(key, (resource, view))| BindingDesc {
                    key: *key,
                    resource: Arc::clone(resource),
                    view: *view,
                })
                .collect();
            self.native_set = Some(device.create_binding_set(&self.layout, &bindings)?);
            self.dirty = false;
        }

        // Unwrap is fine: the branch above guarantees a set exists.
        let set = self.native_set.as_ref().unwrap();
        cmd.bind_binding_set(set);
        Ok(())
    }
}

/// The resource state a view kind requires, or `None` when binding does not
/// constrain the state (samplers).
fn state_for_view(kind: ViewKind) -> Option<ResourceState> {
    match kind {
        ViewKind::ConstantBuffer => Some(ResourceState::VertexAndConstantBuffer),
        ViewKind::ShaderResource => Some(ResourceState::ShaderResource),
        ViewKind::UnorderedAccess => Some(ResourceState::UnorderedAccess),
        ViewKind::Sampler => None,
        ViewKind::RenderTarget => Some(ResourceState::RenderTarget),
        ViewKind::DepthStencil => Some(ResourceState::DepthTarget),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::api::{BindingLayoutEntry, ResourceDesc, ShaderKind};
    use crate::gpu::command_list::test_support::{stub_texture, RecordingList};
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct NullBindingSet;

    impl NativeBindingSet for NullBindingSet {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct BindingDevice {
        sets_created: AtomicUsize,
    }

    impl crate::gpu::traits::GpuDevice for BindingDevice {
        fn create_buffer(
            &self,
            _desc: &ResourceDesc,
        ) -> Result<Arc<Resource>, crate::gpu::error::ResourceError> {
            unimplemented!()
        }
        fn create_texture(
            &self,
            _desc: &ResourceDesc,
        ) -> Result<Arc<Resource>, crate::gpu::error::ResourceError> {
            unimplemented!()
        }
        fn create_acceleration_structure(
            &self,
            _desc: &ResourceDesc,
        ) -> Result<Arc<Resource>, crate::gpu::error::ResourceError> {
            unimplemented!()
        }
        fn create_command_list(&self) -> Box<dyn crate::gpu::traits::NativeCommandList> {
            Box::new(RecordingList::default())
        }
        fn create_fence(&self, _initial_value: u64) -> Arc<dyn crate::gpu::traits::Fence> {
            unimplemented!()
        }
        fn create_semaphore(&self) -> Arc<dyn crate::gpu::traits::GpuSemaphore> {
            unimplemented!()
        }
        fn create_swapchain(
            &self,
            _window: crate::platform::KilnWindowHandle,
            _width: u32,
            _height: u32,
            _frame_count: u32,
            _vsync: bool,
        ) -> Result<Box<dyn crate::gpu::traits::Swapchain>, crate::gpu::error::GpuError> {
            unimplemented!()
        }
        fn create_binding_set(
            &self,
            _layout: &BindingLayout,
            _bindings: &[BindingDesc],
        ) -> Result<Arc<dyn NativeBindingSet>, BindingError> {
            self.sets_created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullBindingSet))
        }
        fn signal_fence(&self, _fence: &Arc<dyn crate::gpu::traits::Fence>, _value: u64) {}
        fn wait_semaphore(&self, _semaphore: &Arc<dyn crate::gpu::traits::GpuSemaphore>) {}
        fn signal_semaphore(&self, _semaphore: &Arc<dyn crate::gpu::traits::GpuSemaphore>) {}
        fn execute_command_lists_impl(
            &self,
            _lists: &[crate::gpu::command_list::SharedCommandList],
        ) {
        }
        fn texture_data_pitch_alignment(&self) -> u32 {
            256
        }
        fn supports_raytracing(&self) -> bool {
            false
        }
        fn adapter_info(&self) -> crate::gpu::api::GpuAdapterInfo {
            crate::gpu::api::GpuAdapterInfo::default()
        }
    }

    fn srv_key() -> BindKey {
        BindKey {
            shader: ShaderKind::Pixel,
            kind: ViewKind::ShaderResource,
            slot: 0,
            space: 0,
        }
    }

    fn srv_layout() -> BindingLayout {
        BindingLayout {
            entries: vec![BindingLayoutEntry {
                key: srv_key(),
                count: 1,
            }],
        }
    }

    #[test]
    fn pool_exhaustion_reports_remaining_budget() {
        let mut pool = DescriptorPool::new(4);
        pool.allocate(3).unwrap();
        let err = pool.allocate(2).unwrap_err();
        assert_eq!(
            err,
            BindingError::PoolExhausted {
                requested: 2,
                available: 1
            }
        );
        pool.reset();
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn attach_rejects_undeclared_keys() {
        let mut bindings = ProgramBindings::new(srv_layout());
        let unknown = BindKey {
            slot: 7,
            ..srv_key()
        };
        let err = bindings
            .attach(unknown, stub_texture(1, 1), ViewDesc::full(ViewKind::ShaderResource))
            .unwrap_err();
        assert_eq!(err, BindingError::UnknownBindKey { slot: 7, space: 0 });
    }

    #[test]
    fn apply_transitions_and_reuses_the_set() {
        let concrete = Arc::new(BindingDevice {
            sets_created: AtomicUsize::new(0),
        });
        let device: Arc<dyn GpuDevice> = Arc::clone(&concrete) as Arc<dyn GpuDevice>;
        let mut pool = DescriptorPool::new(16);
        let mut cmd = CommandListBox::new(Box::new(RecordingList::default()));
        cmd.open();

        let tex = stub_texture(1, 1);
        let mut bindings = ProgramBindings::new(srv_layout());
        bindings
            .attach(srv_key(), Arc::clone(&tex), ViewDesc::full(ViewKind::ShaderResource))
            .unwrap();

        bindings.apply(&device, &mut pool, &mut cmd).unwrap();
        bindings.apply(&device, &mut pool, &mut cmd).unwrap();

        // The transition into ShaderResource was tracked once.
        assert_eq!(cmd.lazy_barriers().len(), 1);
        assert_eq!(cmd.lazy_barriers()[0].state, ResourceState::ShaderResource);
        // The set was built once, so only one range was consumed.
        assert_eq!(concrete.sets_created.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available(), 15);
    }

    #[test]
    fn reattaching_same_resource_keeps_set_clean() {
        let mut bindings = ProgramBindings::new(srv_layout());
        let tex = stub_texture(1, 1);
        bindings
            .attach(srv_key(), Arc::clone(&tex), ViewDesc::full(ViewKind::ShaderResource))
            .unwrap();
        bindings.dirty = false;
        bindings
            .attach(srv_key(), Arc::clone(&tex), ViewDesc::full(ViewKind::ShaderResource))
            .unwrap();
        assert!(!bindings.dirty);
        bindings
            .attach(srv_key(), stub_texture(1, 1), ViewDesc::full(ViewKind::ShaderResource))
            .unwrap();
        assert!(bindings.dirty);
    }
}
