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

//! The raw command recording surface of a backend.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::gpu::api::{
    BufferCopyRegion, BufferToTextureCopyRegion, IndexFormat, RaytracingGeometryDesc,
    RenderPassDesc, Resource, ResourceBarrierDesc, ScissorRect, TextureCopyRegion,
    TopLevelInstance, ViewDesc, Viewport,
};
use crate::gpu::traits::resource::{NativeBindingSet, NativePipeline};

/// Records commands into a backend-specific command list.
///
/// State and lifecycle rules (open/closed, barrier resolution) are enforced
/// by [`CommandListBox`](crate::gpu::CommandListBox); implementations only
/// translate calls into their native API and may assume they arrive in a
/// valid order.
pub trait NativeCommandList: Send + Debug {
    /// Begins recording, discarding any previously recorded commands.
    fn open(&mut self);

    /// Ends recording.
    fn close(&mut self);

    /// Binds a compiled pipeline.
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn NativePipeline>);

    /// Binds a built binding set for the current pipeline.
    fn bind_binding_set(&mut self, set: &Arc<dyn NativeBindingSet>);

    /// Begins a render pass over the given attachments.
    fn begin_render_pass(&mut self, desc: &RenderPassDesc);

    /// Ends the open render pass.
    fn end_render_pass(&mut self);

    /// Opens a named debug region.
    fn begin_event(&mut self, name: &str);

    /// Closes the innermost debug region.
    fn end_event(&mut self);

    /// Clears a color view to `color`.
    fn clear_color(&mut self, resource: &Arc<Resource>, view: &ViewDesc, color: [f32; 4]);

    /// Clears a depth view to `depth`.
    fn clear_depth(&mut self, resource: &Arc<Resource>, view: &ViewDesc, depth: f32);

    /// Issues an indexed draw.
    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, base_vertex: i32);

    /// Dispatches a compute grid.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Dispatches rays over a `width` x `height` grid.
    fn dispatch_rays(&mut self, width: u32, height: u32, depth: u32);

    /// Records explicit state transitions.
    fn resource_barrier(&mut self, barriers: &[ResourceBarrierDesc]);

    /// Sets the viewport transform.
    fn set_viewport(&mut self, viewport: &Viewport);

    /// Sets the scissor rectangle.
    fn set_scissor_rect(&mut self, rect: &ScissorRect);

    /// Binds an index buffer.
    fn set_index_buffer(&mut self, resource: &Arc<Resource>, format: IndexFormat);

    /// Binds a vertex buffer at `slot`.
    fn set_vertex_buffer(&mut self, slot: u32, resource: &Arc<Resource>);

    /// Copies between buffers.
    fn copy_buffer(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[BufferCopyRegion],
    );

    /// Copies buffer contents into texture subresources.
    fn copy_buffer_to_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[BufferToTextureCopyRegion],
    );

    /// Copies between texture subresources.
    fn copy_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[TextureCopyRegion],
    );

    /// Builds a bottom-level acceleration structure into `dst`.
    fn build_bottom_level_as(&mut self, dst: &Arc<Resource>, geometry: &[RaytracingGeometryDesc]);

    /// Builds a top-level acceleration structure into `dst`.
    fn build_top_level_as(&mut self, dst: &Arc<Resource>, instances: &[TopLevelInstance]);

    /// Downcasting hook for backends.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
