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

//! Stateful command list wrapper with lazy barrier tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::trace;

use crate::gpu::api::{
    BufferCopyRegion, BufferToTextureCopyRegion, IndexFormat, LazyResourceBarrierDesc,
    RaytracingGeometryDesc, RenderPassDesc, Resource, ResourceBarrierDesc, ResourceId,
    ResourceState, ScissorRect, SubresourceRange, TextureCopyRegion, TopLevelInstance, ViewDesc,
    Viewport,
};
use crate::gpu::tracker::ResourceStateTracker;
use crate::gpu::traits::{NativeBindingSet, NativeCommandList, NativePipeline};

/// A command list shared between its recording thread and the queue that
/// submits it.
pub type SharedCommandList = Arc<Mutex<CommandListBox>>;

/// Wraps a raw backend command list with the state every recorded operation
/// needs: which states this list has driven each resource into, and which
/// barriers could not be resolved at record time.
///
/// A barrier is *lazy* when the resource is first touched by this list: its
/// prior state depends on lists submitted before this one, possibly still
/// executing on the GPU, so resolution is deferred to
/// [`CommandQueue::execute_command_lists`](crate::gpu::CommandQueue::execute_command_lists).
#[derive(Debug)]
pub struct CommandListBox {
    native: Box<dyn NativeCommandList>,
    state_trackers: HashMap<ResourceId, (Arc<Resource>, ResourceStateTracker)>,
    lazy_barriers: Vec<LazyResourceBarrierDesc>,
    is_open: bool,
    // Logical close happened but the native close is deferred so the queue
    // may still append patch barriers to the tail.
    native_close_deferred: bool,
    native_closed: bool,
    fake_close: bool,
    open_render_pass: bool,
}

impl CommandListBox {
    /// Wraps a raw command list. The list starts closed; call
    /// [`open`](Self::open) before recording.
    pub fn new(native: Box<dyn NativeCommandList>) -> Self {
        Self {
            native,
            state_trackers: HashMap::new(),
            lazy_barriers: Vec::new(),
            is_open: false,
            native_close_deferred: false,
            native_closed: true,
            fake_close: false,
            open_render_pass: false,
        }
    }

    /// Wraps a raw command list into a [`SharedCommandList`].
    pub fn new_shared(native: Box<dyn NativeCommandList>) -> SharedCommandList {
        Arc::new(Mutex::new(Self::new(native)))
    }

    /// Controls whether [`close`](Self::close) defers the native close so
    /// patch barriers can be appended to this list's tail at submission.
    pub fn set_fake_close(&mut self, fake_close: bool) {
        self.fake_close = fake_close;
    }

    /// Begins recording, discarding all previously recorded commands and
    /// tracked state.
    pub fn open(&mut self) {
        self.state_trackers.clear();
        self.lazy_barriers.clear();
        self.native_close_deferred = false;
        self.native_closed = false;
        self.open_render_pass = false;
        self.native.open();
        self.is_open = true;
    }

    /// Ends recording. With fake close enabled the native close is deferred
    /// until [`finalize_native_close`](Self::finalize_native_close).
    pub fn close(&mut self) {
        if !self.is_open {
            return;
        }
        self.end_render_pass();
        self.is_open = false;
        if self.fake_close {
            self.native_close_deferred = true;
        } else {
            self.native.close();
            self.native_closed = true;
        }
    }

    /// Performs the deferred native close, if any. Called by the queue
    /// right before submission.
    pub fn finalize_native_close(&mut self) {
        if !self.native_closed {
            self.native.close();
            self.native_closed = true;
            self.native_close_deferred = false;
        }
    }

    /// Whether the list is currently recording.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Whether the native close is still pending after a logical close.
    pub fn native_close_deferred(&self) -> bool {
        self.native_close_deferred
    }

    /// The barriers whose prior state must be resolved at submission.
    pub fn lazy_barriers(&self) -> &[LazyResourceBarrierDesc] {
        &self.lazy_barriers
    }

    /// The per-resource states this list leaves resources in, for committing
    /// into the authoritative trackers after submission.
    pub fn state_trackers(
        &self,
    ) -> impl Iterator<Item = (&Arc<Resource>, &ResourceStateTracker)> {
        self.state_trackers
            .values()
            .map(|(resource, tracker)| (resource, tracker))
    }

    /// Transitions a whole resource to `state`, deferring if the prior state
    /// is unknown to this list.
    pub fn resource_barrier(&mut self, resource: &Arc<Resource>, state: ResourceState) {
        let range = SubresourceRange::whole(resource.desc());
        self.lazy_resource_barrier(vec![LazyResourceBarrierDesc {
            resource: Arc::clone(resource),
            range,
            state,
        }]);
    }

    /// Transitions subresources to target states, resolving each against
    /// this list's own tracker.
    ///
    /// Intents whose prior state this list already knows become immediate
    /// native barriers, flushed as one batch. First touches go to the lazy
    /// list. Transitions into the state a subresource is already in are
    /// dropped entirely.
    pub fn lazy_resource_barrier(&mut self, intents: Vec<LazyResourceBarrierDesc>) {
        debug_assert!(self.is_open, "barriers recorded on a closed list");
        let mut immediate = Vec::new();
        for intent in intents {
            let desc = intent.resource.desc().clone();
            let (_, tracker) = self
                .state_trackers
                .entry(intent.resource.id())
                .or_insert_with(|| {
                    (
                        Arc::clone(&intent.resource),
                        ResourceStateTracker::new(
                            desc.level_count,
                            desc.layer_count,
                            ResourceState::Unknown,
                        ),
                    )
                });

            if tracker.has_resource_state() && intent.range.covers(&desc) {
                let before = tracker.resource_state();
                tracker.set_resource_state(intent.state);
                if before == intent.state {
                    continue;
                }
                if before == ResourceState::Unknown {
                    self.lazy_barriers.push(intent);
                } else {
                    immediate.push(ResourceBarrierDesc {
                        resource: Arc::clone(&intent.resource),
                        range: intent.range,
                        state_before: before,
                        state_after: intent.state,
                    });
                }
            } else {
                for (mip, layer) in intent.range.subresources() {
                    let before = tracker.subresource_state(mip, layer);
                    tracker.set_subresource_state(mip, layer, intent.state);
                    if before == intent.state {
                        continue;
                    }
                    let single = SubresourceRange::single(mip, layer);
                    if before == ResourceState::Unknown {
                        self.lazy_barriers.push(LazyResourceBarrierDesc {
                            resource: Arc::clone(&intent.resource),
                            range: single,
                            state: intent.state,
                        });
                    } else {
                        immediate.push(ResourceBarrierDesc {
                            resource: Arc::clone(&intent.resource),
                            range: single,
                            state_before: before,
                            state_after: intent.state,
                        });
                    }
                }
            }
        }
        if !immediate.is_empty() {
            trace!("flushing {} immediate barrier(s)", immediate.len());
            self.native.resource_barrier(&immediate);
        }
    }

    /// Records already-resolved barriers, bypassing the trackers. Used by
    /// the queue for patch barriers.
    pub fn resource_barrier_manual(&mut self, barriers: &[ResourceBarrierDesc]) {
        debug_assert!(
            !self.native_closed,
            "patch barriers appended after the native close"
        );
        self.native.resource_barrier(barriers);
    }

    /// Binds a compiled pipeline.
    pub fn bind_pipeline(&mut self, pipeline: &Arc<dyn NativePipeline>) {
        self.native.bind_pipeline(pipeline);
    }

    /// Binds a built binding set.
    pub fn bind_binding_set(&mut self, set: &Arc<dyn NativeBindingSet>) {
        self.native.bind_binding_set(set);
    }

    /// Transitions the attachments and begins a render pass.
    pub fn begin_render_pass(&mut self, desc: &RenderPassDesc) {
        let mut intents = Vec::with_capacity(desc.colors.len() + 1);
        for color in &desc.colors {
            intents.push(LazyResourceBarrierDesc {
                resource: Arc::clone(&color.resource),
                range: color.view.range(color.resource.desc()),
                state: ResourceState::RenderTarget,
            });
        }
        if let Some(depth) = &desc.depth_stencil {
            intents.push(LazyResourceBarrierDesc {
                resource: Arc::clone(&depth.resource),
                range: depth.view.range(depth.resource.desc()),
                state: ResourceState::DepthTarget,
            });
        }
        self.lazy_resource_barrier(intents);
        self.native.begin_render_pass(desc);
        self.open_render_pass = true;
    }

    /// Ends the render pass, if one is open.
    pub fn end_render_pass(&mut self) {
        if self.open_render_pass {
            self.native.end_render_pass();
            self.open_render_pass = false;
        }
    }

    /// Opens a named debug region.
    pub fn begin_event(&mut self, name: &str) {
        self.native.begin_event(name);
    }

    /// Closes the innermost debug region.
    pub fn end_event(&mut self) {
        self.native.end_event();
    }

    /// Clears a color view, transitioning it to `RenderTarget` first.
    pub fn clear_color(&mut self, resource: &Arc<Resource>, view: &ViewDesc, color: [f32; 4]) {
        self.lazy_resource_barrier(vec![LazyResourceBarrierDesc {
            resource: Arc::clone(resource),
            range: view.range(resource.desc()),
            state: ResourceState::RenderTarget,
        }]);
        self.native.clear_color(resource, view, color);
    }

    /// Clears a depth view, transitioning it to `DepthTarget` first.
    pub fn clear_depth(&mut self, resource: &Arc<Resource>, view: &ViewDesc, depth: f32) {
        self.lazy_resource_barrier(vec![LazyResourceBarrierDesc {
            resource: Arc::clone(resource),
            range: view.range(resource.desc()),
            state: ResourceState::DepthTarget,
        }]);
        self.native.clear_depth(resource, view, depth);
    }

    /// Issues an indexed draw.
    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32, base_vertex: i32) {
        self.native
            .draw_indexed(index_count, instance_count, base_vertex);
    }

    /// Dispatches a compute grid.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.native.dispatch(x, y, z);
    }

    /// Dispatches rays.
    pub fn dispatch_rays(&mut self, width: u32, height: u32, depth: u32) {
        self.native.dispatch_rays(width, height, depth);
    }

    /// Sets the viewport transform.
    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.native.set_viewport(viewport);
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor_rect(&mut self, rect: &ScissorRect) {
        self.native.set_scissor_rect(rect);
    }

    /// Binds an index buffer, transitioning it to `IndexBuffer`.
    pub fn set_index_buffer(&mut self, resource: &Arc<Resource>, format: IndexFormat) {
        self.resource_barrier(resource, ResourceState::IndexBuffer);
        self.native.set_index_buffer(resource, format);
    }

    /// Binds a vertex buffer, transitioning it to `VertexAndConstantBuffer`.
    pub fn set_vertex_buffer(&mut self, slot: u32, resource: &Arc<Resource>) {
        self.resource_barrier(resource, ResourceState::VertexAndConstantBuffer);
        self.native.set_vertex_buffer(slot, resource);
    }

    /// Copies between buffers, transitioning source and destination.
    pub fn copy_buffer(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[BufferCopyRegion],
    ) {
        self.end_render_pass();
        self.resource_barrier(src, ResourceState::CopySource);
        self.resource_barrier(dst, ResourceState::CopyDest);
        self.native.copy_buffer(src, dst, regions);
    }

    /// Copies buffer contents into texture subresources.
    pub fn copy_buffer_to_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[BufferToTextureCopyRegion],
    ) {
        self.end_render_pass();
        self.resource_barrier(src, ResourceState::CopySource);
        let intents = regions
            .iter()
            .map(|region| LazyResourceBarrierDesc {
                resource: Arc::clone(dst),
                range: SubresourceRange::single(region.texture_mip_level, region.texture_array_layer),
                state: ResourceState::CopyDest,
            })
            .collect();
        self.lazy_resource_barrier(intents);
        self.native.copy_buffer_to_texture(src, dst, regions);
    }

    /// Copies between texture subresources.
    pub fn copy_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[TextureCopyRegion],
    ) {
        self.end_render_pass();
        let mut intents = Vec::with_capacity(regions.len() * 2);
        for region in regions {
            intents.push(LazyResourceBarrierDesc {
                resource: Arc::clone(src),
                range: SubresourceRange::single(region.src_mip_level, region.src_array_layer),
                state: ResourceState::CopySource,
            });
            intents.push(LazyResourceBarrierDesc {
                resource: Arc::clone(dst),
                range: SubresourceRange::single(region.dst_mip_level, region.dst_array_layer),
                state: ResourceState::CopyDest,
            });
        }
        self.lazy_resource_barrier(intents);
        self.native.copy_texture(src, dst, regions);
    }

    /// Builds a bottom-level acceleration structure, transitioning its
    /// inputs to `ShaderResource` and the destination into
    /// `RaytracingAccelerationStructure`.
    pub fn build_bottom_level_as(
        &mut self,
        dst: &Arc<Resource>,
        geometry: &[RaytracingGeometryDesc],
    ) {
        for geo in geometry {
            self.resource_barrier(&geo.vertex_buffer, ResourceState::ShaderResource);
            if let Some(index_buffer) = &geo.index_buffer {
                self.resource_barrier(index_buffer, ResourceState::ShaderResource);
            }
        }
        self.resource_barrier(dst, ResourceState::RaytracingAccelerationStructure);
        self.native.build_bottom_level_as(dst, geometry);
    }

    /// Builds a top-level acceleration structure over `instances`.
    pub fn build_top_level_as(&mut self, dst: &Arc<Resource>, instances: &[TopLevelInstance]) {
        for instance in instances {
            self.resource_barrier(&instance.blas, ResourceState::RaytracingAccelerationStructure);
        }
        self.resource_barrier(dst, ResourceState::RaytracingAccelerationStructure);
        self.native.build_top_level_as(dst, instances);
    }

    /// Mutable access to the raw list, for backends during execution.
    pub fn native_mut(&mut self) -> &mut dyn NativeCommandList {
        self.native.as_mut()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{stub_texture, RecordedOp, RecordingList};
    use super::*;

    fn recorded_ops(list: &mut CommandListBox) -> Vec<RecordedOp> {
        list.native_mut()
            .as_any_mut()
            .downcast_mut::<RecordingList>()
            .unwrap()
            .ops
            .clone()
    }

    #[test]
    fn first_touch_defers_barrier() {
        let texture = stub_texture(1, 1);
        let mut list = CommandListBox::new(Box::new(RecordingList::default()));
        list.open();
        list.resource_barrier(&texture, ResourceState::RenderTarget);
        assert_eq!(list.lazy_barriers().len(), 1);
        assert_eq!(list.lazy_barriers()[0].state, ResourceState::RenderTarget);
        // Nothing but the open reached the raw list.
        assert_eq!(recorded_ops(&mut list), vec![RecordedOp::Open]);
    }

    #[test]
    fn second_transition_is_immediate() {
        let texture = stub_texture(1, 1);
        let mut list = CommandListBox::new(Box::new(RecordingList::default()));
        list.open();
        list.resource_barrier(&texture, ResourceState::RenderTarget);
        list.resource_barrier(&texture, ResourceState::ShaderResource);
        assert_eq!(list.lazy_barriers().len(), 1);
        let ops = recorded_ops(&mut list);
        match &ops[1] {
            RecordedOp::Barrier(barriers) => {
                assert_eq!(barriers.len(), 1);
                assert_eq!(barriers[0].2, ResourceState::RenderTarget);
                assert_eq!(barriers[0].3, ResourceState::ShaderResource);
            }
            other => panic!("expected a barrier, got {other:?}"),
        }
    }

    #[test]
    fn same_state_transition_is_dropped() {
        let texture = stub_texture(1, 1);
        let mut list = CommandListBox::new(Box::new(RecordingList::default()));
        list.open();
        list.resource_barrier(&texture, ResourceState::RenderTarget);
        list.resource_barrier(&texture, ResourceState::RenderTarget);
        assert_eq!(list.lazy_barriers().len(), 1);
        assert_eq!(recorded_ops(&mut list), vec![RecordedOp::Open]);
    }

    #[test]
    fn partial_range_splits_into_subresource_barriers() {
        let texture = stub_texture(4, 1);
        let mut list = CommandListBox::new(Box::new(RecordingList::default()));
        list.open();
        list.lazy_resource_barrier(vec![LazyResourceBarrierDesc {
            resource: Arc::clone(&texture),
            range: SubresourceRange {
                base_mip_level: 1,
                level_count: 2,
                base_array_layer: 0,
                layer_count: 1,
            },
            state: ResourceState::CopyDest,
        }]);
        assert_eq!(list.lazy_barriers().len(), 2);
        assert_eq!(list.lazy_barriers()[0].range, SubresourceRange::single(1, 0));
        assert_eq!(list.lazy_barriers()[1].range, SubresourceRange::single(2, 0));
    }

    #[test]
    fn reopen_discards_tracked_state() {
        let texture = stub_texture(1, 1);
        let mut list = CommandListBox::new(Box::new(RecordingList::default()));
        list.open();
        list.resource_barrier(&texture, ResourceState::RenderTarget);
        list.close();
        list.open();
        assert!(list.lazy_barriers().is_empty());
        assert_eq!(list.state_trackers().count(), 0);
        // First touch after reopen defers again.
        list.resource_barrier(&texture, ResourceState::CopySource);
        assert_eq!(list.lazy_barriers().len(), 1);
    }

    #[test]
    fn fake_close_defers_native_close() {
        let mut list = CommandListBox::new(Box::new(RecordingList::default()));
        list.set_fake_close(true);
        list.open();
        list.close();
        assert!(list.native_close_deferred());
        assert_eq!(recorded_ops(&mut list), vec![RecordedOp::Open]);
        list.finalize_native_close();
        assert_eq!(
            recorded_ops(&mut list),
            vec![RecordedOp::Open, RecordedOp::Close]
        );
    }

    #[test]
    fn close_ends_open_render_pass() {
        let texture = stub_texture(1, 1);
        let mut list = CommandListBox::new(Box::new(RecordingList::default()));
        list.open();
        list.begin_render_pass(&RenderPassDesc {
            colors: vec![crate::gpu::api::RenderPassAttachment {
                resource: Arc::clone(&texture),
                view: ViewDesc::full(crate::gpu::api::ViewKind::RenderTarget),
            }],
            depth_stencil: None,
        });
        list.close();
        let ops = recorded_ops(&mut list);
        assert!(ops.contains(&RecordedOp::EndRenderPass));
        assert_eq!(*ops.last().unwrap(), RecordedOp::Close);
    }
}
