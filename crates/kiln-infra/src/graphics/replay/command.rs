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
use std::sync::Arc;

use kiln_core::gpu::{
    BufferCopyRegion, BufferToTextureCopyRegion, IndexFormat, NativeBindingSet, NativeCommandList,
    NativePipeline, RaytracingGeometryDesc, RenderPassDesc, Resource, ResourceBarrierDesc,
    ScissorRect, SubresourceRange, TextureCopyRegion, TopLevelInstance, ViewDesc, Viewport,
};

use super::log::ReplayOp;

/// Command list that records the operations a driver would have received.
///
/// Nothing is executed; the ops are drained into the shared log when the
/// device "submits" the list.
#[derive(Debug, Default)]
pub struct ReplayCommandList {
    ops: Vec<ReplayOp>,
}

impl ReplayCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands the recorded ops to the submitting device.
    pub(crate) fn drain_ops(&mut self) -> Vec<ReplayOp> {
        std::mem::take(&mut self.ops)
    }
}

impl NativeCommandList for ReplayCommandList {
    fn open(&mut self) {
        self.ops.clear();
    }

    fn close(&mut self) {}

    fn bind_pipeline(&mut self, _pipeline: &Arc<dyn NativePipeline>) {
        self.ops.push(ReplayOp::BindPipeline);
    }

    fn bind_binding_set(&mut self, _set: &Arc<dyn NativeBindingSet>) {
        self.ops.push(ReplayOp::BindBindingSet);
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDesc) {
        self.ops.push(ReplayOp::BeginRenderPass {
            colors: desc
                .colors
                .iter()
                .map(|a| (a.resource.id(), a.view.range(a.resource.desc())))
                .collect(),
            depth: desc
                .depth_stencil
                .as_ref()
                .map(|a| (a.resource.id(), a.view.range(a.resource.desc()))),
        });
    }

    fn end_render_pass(&mut self) {
        self.ops.push(ReplayOp::EndRenderPass);
    }

    fn begin_event(&mut self, name: &str) {
        self.ops.push(ReplayOp::BeginEvent(name.to_owned()));
    }

    fn end_event(&mut self) {
        self.ops.push(ReplayOp::EndEvent);
    }

    fn clear_color(&mut self, resource: &Arc<Resource>, view: &ViewDesc, _color: [f32; 4]) {
        self.ops.push(ReplayOp::ClearColor {
            resource: resource.id(),
            range: view.range(resource.desc()),
        });
    }

    fn clear_depth(&mut self, resource: &Arc<Resource>, view: &ViewDesc, _depth: f32) {
        self.ops.push(ReplayOp::ClearDepth {
            resource: resource.id(),
            range: view.range(resource.desc()),
        });
    }

    fn draw_indexed(&mut self, index_count: u32, _instance_count: u32, _base_vertex: i32) {
        self.ops.push(ReplayOp::DrawIndexed { index_count });
    }

    fn dispatch(&mut self, _x: u32, _y: u32, _z: u32) {
        self.ops.push(ReplayOp::Dispatch);
    }

    fn dispatch_rays(&mut self, _width: u32, _height: u32, _depth: u32) {
        self.ops.push(ReplayOp::DispatchRays);
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrierDesc]) {
        for barrier in barriers {
            self.ops.push(ReplayOp::Barrier {
                resource: barrier.resource.id(),
                range: barrier.range,
                state_before: barrier.state_before,
                state_after: barrier.state_after,
            });
        }
    }

    fn set_viewport(&mut self, _viewport: &Viewport) {}

    fn set_scissor_rect(&mut self, _rect: &ScissorRect) {}

    fn set_index_buffer(&mut self, resource: &Arc<Resource>, _format: IndexFormat) {
        self.ops.push(ReplayOp::SetIndexBuffer {
            resource: resource.id(),
        });
    }

    fn set_vertex_buffer(&mut self, _slot: u32, resource: &Arc<Resource>) {
        self.ops.push(ReplayOp::SetVertexBuffer {
            resource: resource.id(),
        });
    }

    fn copy_buffer(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        _regions: &[BufferCopyRegion],
    ) {
        self.ops.push(ReplayOp::CopyBuffer {
            src: src.id(),
            dst: dst.id(),
        });
    }

    fn copy_buffer_to_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[BufferToTextureCopyRegion],
    ) {
        self.ops.push(ReplayOp::CopyBufferToTexture {
            src: src.id(),
            dst: dst.id(),
            ranges: regions
                .iter()
                .map(|r| SubresourceRange::single(r.texture_mip_level, r.texture_array_layer))
                .collect(),
        });
    }

    fn copy_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        _regions: &[TextureCopyRegion],
    ) {
        self.ops.push(ReplayOp::CopyTexture {
            src: src.id(),
            dst: dst.id(),
        });
    }

    fn build_bottom_level_as(&mut self, dst: &Arc<Resource>, _geometry: &[RaytracingGeometryDesc]) {
        self.ops.push(ReplayOp::BuildBottomLevelAs { dst: dst.id() });
    }

    fn build_top_level_as(&mut self, dst: &Arc<Resource>, _instances: &[TopLevelInstance]) {
        self.ops.push(ReplayOp::BuildTopLevelAs { dst: dst.id() });
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
