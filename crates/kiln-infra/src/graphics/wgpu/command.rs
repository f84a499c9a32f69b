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

//! Deferred command recording for the `wgpu` backend.
//!
//! `wgpu` render passes borrow their encoder, which does not fit a
//! retained command-list object. Recording therefore captures an operation
//! stream, and [`WgpuCommandList::close`] replays it into a fresh encoder.

use std::any::Any;
use std::sync::Arc;

use kiln_core::gpu::{
    BufferCopyRegion, BufferToTextureCopyRegion, IndexFormat, NativeBindingSet, NativeCommandList,
    NativePipeline, RaytracingGeometryDesc, RenderPassDesc, Resource, ResourceBarrierDesc,
    ScissorRect, TextureCopyRegion, TopLevelInstance, ViewDesc, Viewport,
};

use super::context::WgpuShared;
use super::conversions::IntoWgpu;
use super::device::{wgpu_buffer, wgpu_texture, WgpuBindingSet, WgpuPipeline};

#[derive(Debug)]
enum Op {
    BeginRenderPass(RenderPassDesc),
    EndRenderPass,
    BindPipeline(Arc<dyn NativePipeline>),
    BindBindingSet(Arc<dyn NativeBindingSet>),
    BeginEvent(String),
    EndEvent,
    ClearColor {
        resource: Arc<Resource>,
        view: ViewDesc,
        color: [f32; 4],
    },
    ClearDepth {
        resource: Arc<Resource>,
        view: ViewDesc,
        depth: f32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        base_vertex: i32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    SetViewport(Viewport),
    SetScissorRect(ScissorRect),
    SetIndexBuffer {
        resource: Arc<Resource>,
        format: IndexFormat,
    },
    SetVertexBuffer {
        slot: u32,
        resource: Arc<Resource>,
    },
    CopyBuffer {
        src: Arc<Resource>,
        dst: Arc<Resource>,
        regions: Vec<BufferCopyRegion>,
    },
    CopyBufferToTexture {
        src: Arc<Resource>,
        dst: Arc<Resource>,
        regions: Vec<BufferToTextureCopyRegion>,
    },
    CopyTexture {
        src: Arc<Resource>,
        dst: Arc<Resource>,
        regions: Vec<TextureCopyRegion>,
    },
}

/// Latched pass state, applied whenever a render pass opens.
#[derive(Default)]
struct PassState {
    pipeline: Option<Arc<dyn NativePipeline>>,
    binding_sets: Vec<Arc<dyn NativeBindingSet>>,
    index_buffer: Option<(Arc<Resource>, IndexFormat)>,
    vertex_buffers: Vec<(u32, Arc<Resource>)>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
}

/// Command list that records an operation stream and translates it into a
/// [`wgpu::CommandBuffer`] when closed.
#[derive(Debug)]
pub struct WgpuCommandList {
    shared: Arc<WgpuShared>,
    ops: Vec<Op>,
    finished: Option<wgpu::CommandBuffer>,
}

impl WgpuCommandList {
    pub fn new(shared: Arc<WgpuShared>) -> Self {
        Self {
            shared,
            ops: Vec::new(),
            finished: None,
        }
    }

    /// Takes the translated command buffer out for submission.
    pub fn take_finished(&mut self) -> Option<wgpu::CommandBuffer> {
        self.finished.take()
    }

    fn translate(&mut self) -> wgpu::CommandBuffer {
        let mut encoder =
            self.shared
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("kiln command list"),
                });
        let mut state = PassState::default();
        let mut idx = 0;
        while idx < self.ops.len() {
            match &self.ops[idx] {
                Op::BeginRenderPass(desc) => {
                    idx = self.translate_render_pass(&mut encoder, &mut state, desc, idx + 1);
                }
                Op::EndRenderPass => {
                    // Unbalanced end; the pass scope already consumed the
                    // balanced ones.
                    idx += 1;
                }
                op => {
                    translate_encoder_op(&self.shared, &mut encoder, &mut state, op);
                    idx += 1;
                }
            }
        }
        encoder.finish()
    }

    /// Replays ops from `start` until the matching `EndRenderPass` inside a
    /// live pass. Returns the index after the pass.
    fn translate_render_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        state: &mut PassState,
        desc: &RenderPassDesc,
        start: usize,
    ) -> usize {
        let mut color_views = Vec::with_capacity(desc.colors.len());
        for attachment in &desc.colors {
            match wgpu_texture(&attachment.resource) {
                Some(texture) => color_views.push(texture.create_view(&view_desc(&attachment.view))),
                None => {
                    log::warn!("render pass color attachment has no wgpu texture; skipping pass");
                    return skip_to_pass_end(&self.ops, start);
                }
            }
        }
        let depth_view = desc.depth_stencil.as_ref().and_then(|attachment| {
            wgpu_texture(&attachment.resource)
                .map(|texture| texture.create_view(&view_desc(&attachment.view)))
        });

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
            .iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();
        let depth_stencil_attachment =
            depth_view
                .as_ref()
                .map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("kiln render pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        apply_pass_state(&self.shared, &mut pass, state);

        let mut idx = start;
        while idx < self.ops.len() {
            match &self.ops[idx] {
                Op::EndRenderPass => {
                    idx += 1;
                    break;
                }
                op => {
                    translate_pass_op(&self.shared, &mut pass, state, op);
                    idx += 1;
                }
            }
        }
        idx
    }
}

impl std::fmt::Debug for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassState").finish_non_exhaustive()
    }
}

fn skip_to_pass_end(ops: &[Op], start: usize) -> usize {
    let mut idx = start;
    while idx < ops.len() {
        if matches!(ops[idx], Op::EndRenderPass) {
            return idx + 1;
        }
        idx += 1;
    }
    idx
}

fn view_desc(view: &ViewDesc) -> wgpu::TextureViewDescriptor<'static> {
    wgpu::TextureViewDescriptor {
        label: None,
        format: None,
        dimension: None,
        usage: None,
        aspect: wgpu::TextureAspect::All,
        base_mip_level: view.base_mip_level,
        mip_level_count: view.level_count,
        base_array_layer: view.base_array_layer,
        array_layer_count: view.layer_count,
    }
}

/// Builds bind groups for the latched sets against the bound pipeline.
fn apply_pass_state(shared: &WgpuShared, pass: &mut wgpu::RenderPass<'_>, state: &PassState) {
    if let Some(viewport) = &state.viewport {
        pass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_depth,
            viewport.max_depth,
        );
    }
    if let Some(scissor) = &state.scissor {
        pass.set_scissor_rect(
            scissor.left,
            scissor.top,
            scissor.right - scissor.left,
            scissor.bottom - scissor.top,
        );
    }
    let render_pipeline = state.pipeline.as_ref().and_then(|pipeline| {
        match pipeline.as_any().downcast_ref::<WgpuPipeline>() {
            Some(WgpuPipeline::Render(render)) => Some(render),
            _ => None,
        }
    });
    if let Some(render) = render_pipeline {
        pass.set_pipeline(render);
        for set in &state.binding_sets {
            for (space, group) in build_bind_groups(shared, render, set) {
                pass.set_bind_group(space, &group, &[]);
            }
        }
    }
    if let Some((resource, format)) = &state.index_buffer {
        if let Some(buffer) = wgpu_buffer(resource) {
            pass.set_index_buffer(buffer.slice(..), (*format).into_wgpu());
        }
    }
    for (slot, resource) in &state.vertex_buffers {
        if let Some(buffer) = wgpu_buffer(resource) {
            pass.set_vertex_buffer(*slot, buffer.slice(..));
        }
    }
}

fn build_bind_groups(
    shared: &WgpuShared,
    pipeline: &wgpu::RenderPipeline,
    set: &Arc<dyn NativeBindingSet>,
) -> Vec<(u32, wgpu::BindGroup)> {
    let Some(set) = set.as_any().downcast_ref::<WgpuBindingSet>() else {
        log::warn!("binding set from another backend; ignoring");
        return Vec::new();
    };
    let mut spaces: Vec<u32> = set.bindings.iter().map(|b| b.key.space).collect();
    spaces.sort_unstable();
    spaces.dedup();

    let mut groups = Vec::with_capacity(spaces.len());
    for space in spaces {
        let in_space: Vec<_> = set
            .bindings
            .iter()
            .filter(|b| b.key.space == space)
            .collect();
        // Texture views must outlive the entries referencing them.
        let views: Vec<Option<wgpu::TextureView>> = in_space
            .iter()
            .map(|binding| {
                wgpu_texture(&binding.resource)
                    .map(|texture| texture.create_view(&view_desc(&binding.view)))
            })
            .collect();
        let mut entries = Vec::with_capacity(in_space.len());
        for (binding, view) in in_space.iter().zip(views.iter()) {
            let resource = if let Some(view) = view {
                wgpu::BindingResource::TextureView(view)
            } else if let Some(buffer) = wgpu_buffer(&binding.resource) {
                buffer.as_entire_binding()
            } else {
                continue;
            };
            entries.push(wgpu::BindGroupEntry {
                binding: binding.key.slot,
                resource,
            });
        }
        let group = shared.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kiln binding set"),
            layout: &pipeline.get_bind_group_layout(space),
            entries: &entries,
        });
        groups.push((space, group));
    }
    groups
}

fn translate_pass_op(
    shared: &WgpuShared,
    pass: &mut wgpu::RenderPass<'_>,
    state: &mut PassState,
    op: &Op,
) {
    match op {
        Op::BindPipeline(pipeline) => {
            state.pipeline = Some(Arc::clone(pipeline));
            if let Some(WgpuPipeline::Render(render)) =
                pipeline.as_any().downcast_ref::<WgpuPipeline>()
            {
                pass.set_pipeline(render);
            }
        }
        Op::BindBindingSet(set) => {
            state.binding_sets.push(Arc::clone(set));
            if let Some(WgpuPipeline::Render(render)) = state
                .pipeline
                .as_ref()
                .and_then(|p| p.as_any().downcast_ref::<WgpuPipeline>())
            {
                for (space, group) in build_bind_groups(shared, render, set) {
                    pass.set_bind_group(space, &group, &[]);
                }
            } else {
                log::warn!("binding set bound without a render pipeline");
            }
        }
        Op::BeginEvent(name) => pass.push_debug_group(name),
        Op::EndEvent => pass.pop_debug_group(),
        Op::DrawIndexed {
            index_count,
            instance_count,
            base_vertex,
        } => {
            if state.pipeline.is_some() {
                pass.draw_indexed(0..*index_count, *base_vertex, 0..*instance_count);
            } else {
                log::warn!("draw without a bound pipeline; skipping");
            }
        }
        Op::SetViewport(viewport) => {
            state.viewport = Some(*viewport);
            pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
        }
        Op::SetScissorRect(scissor) => {
            state.scissor = Some(*scissor);
            pass.set_scissor_rect(
                scissor.left,
                scissor.top,
                scissor.right - scissor.left,
                scissor.bottom - scissor.top,
            );
        }
        Op::SetIndexBuffer { resource, format } => {
            state.index_buffer = Some((Arc::clone(resource), *format));
            if let Some(buffer) = wgpu_buffer(resource) {
                pass.set_index_buffer(buffer.slice(..), (*format).into_wgpu());
            }
        }
        Op::SetVertexBuffer { slot, resource } => {
            state.vertex_buffers.retain(|(s, _)| s != slot);
            state.vertex_buffers.push((*slot, Arc::clone(resource)));
            if let Some(buffer) = wgpu_buffer(resource) {
                pass.set_vertex_buffer(*slot, buffer.slice(..));
            }
        }
        other => {
            log::warn!("operation not valid inside a render pass: {other:?}");
        }
    }
}

fn translate_encoder_op(
    shared: &WgpuShared,
    encoder: &mut wgpu::CommandEncoder,
    state: &mut PassState,
    op: &Op,
) {
    match op {
        Op::BindPipeline(pipeline) => state.pipeline = Some(Arc::clone(pipeline)),
        Op::BindBindingSet(set) => state.binding_sets.push(Arc::clone(set)),
        Op::BeginEvent(name) => encoder.push_debug_group(name),
        Op::EndEvent => encoder.pop_debug_group(),
        Op::SetViewport(viewport) => state.viewport = Some(*viewport),
        Op::SetScissorRect(scissor) => state.scissor = Some(*scissor),
        Op::SetIndexBuffer { resource, format } => {
            state.index_buffer = Some((Arc::clone(resource), *format));
        }
        Op::SetVertexBuffer { slot, resource } => {
            state.vertex_buffers.retain(|(s, _)| s != slot);
            state.vertex_buffers.push((*slot, Arc::clone(resource)));
        }
        Op::ClearColor {
            resource,
            view,
            color,
        } => {
            let Some(texture) = wgpu_texture(resource) else {
                log::warn!("clear target has no wgpu texture");
                return;
            };
            let target = texture.create_view(&view_desc(view));
            // A clear is its own tiny pass with a clearing load op.
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kiln clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color[0] as f64,
                            g: color[1] as f64,
                            b: color[2] as f64,
                            a: color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        Op::ClearDepth {
            resource,
            view,
            depth,
        } => {
            let Some(texture) = wgpu_texture(resource) else {
                log::warn!("clear target has no wgpu texture");
                return;
            };
            let target = texture.create_view(&view_desc(view));
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kiln depth clear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(*depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        Op::Dispatch { x, y, z } => {
            let compute_pipeline = state.pipeline.as_ref().and_then(|pipeline| {
                match pipeline.as_any().downcast_ref::<WgpuPipeline>() {
                    Some(WgpuPipeline::Compute(compute)) => Some(compute),
                    _ => None,
                }
            });
            let Some(compute) = compute_pipeline else {
                log::warn!("dispatch without a bound compute pipeline; skipping");
                return;
            };
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("kiln compute"),
                timestamp_writes: None,
            });
            pass.set_pipeline(compute);
            pass.dispatch_workgroups(*x, *y, *z);
        }
        Op::CopyBuffer { src, dst, regions } => {
            let (Some(src), Some(dst)) = (wgpu_buffer(src), wgpu_buffer(dst)) else {
                log::warn!("buffer copy with a non-buffer resource");
                return;
            };
            for region in regions {
                encoder.copy_buffer_to_buffer(
                    src,
                    region.src_offset,
                    dst,
                    region.dst_offset,
                    region.num_bytes,
                );
            }
        }
        Op::CopyBufferToTexture { src, dst, regions } => {
            let (Some(src), Some(dst)) = (wgpu_buffer(src), wgpu_texture(dst)) else {
                log::warn!("buffer-to-texture copy with mismatched resources");
                return;
            };
            for region in regions {
                encoder.copy_buffer_to_texture(
                    wgpu::TexelCopyBufferInfo {
                        buffer: src,
                        layout: wgpu::TexelCopyBufferLayout {
                            offset: region.buffer_offset,
                            bytes_per_row: Some(region.buffer_row_pitch),
                            rows_per_image: None,
                        },
                    },
                    wgpu::TexelCopyTextureInfo {
                        texture: dst,
                        mip_level: region.texture_mip_level,
                        origin: wgpu::Origin3d {
                            x: 0,
                            y: 0,
                            z: region.texture_array_layer,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    region.texture_extent.into_wgpu(),
                );
            }
        }
        Op::CopyTexture { src, dst, regions } => {
            let (Some(src), Some(dst)) = (wgpu_texture(src), wgpu_texture(dst)) else {
                log::warn!("texture copy with a non-texture resource");
                return;
            };
            for region in regions {
                encoder.copy_texture_to_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: src,
                        mip_level: region.src_mip_level,
                        origin: region.src_origin.into_wgpu(),
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::TexelCopyTextureInfo {
                        texture: dst,
                        mip_level: region.dst_mip_level,
                        origin: region.dst_origin.into_wgpu(),
                        aspect: wgpu::TextureAspect::All,
                    },
                    region.extent.into_wgpu(),
                );
            }
        }
        Op::DrawIndexed { .. } => {
            log::warn!("draw recorded outside a render pass; skipping");
        }
        Op::BeginRenderPass(_) | Op::EndRenderPass => {
            // Handled by the caller.
        }
    }
}

impl NativeCommandList for WgpuCommandList {
    fn open(&mut self) {
        self.ops.clear();
        self.finished = None;
    }

    fn close(&mut self) {
        self.finished = Some(self.translate());
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn NativePipeline>) {
        self.ops.push(Op::BindPipeline(Arc::clone(pipeline)));
    }

    fn bind_binding_set(&mut self, set: &Arc<dyn NativeBindingSet>) {
        self.ops.push(Op::BindBindingSet(Arc::clone(set)));
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDesc) {
        self.ops.push(Op::BeginRenderPass(desc.clone()));
    }

    fn end_render_pass(&mut self) {
        self.ops.push(Op::EndRenderPass);
    }

    fn begin_event(&mut self, name: &str) {
        self.ops.push(Op::BeginEvent(name.to_owned()));
    }

    fn end_event(&mut self) {
        self.ops.push(Op::EndEvent);
    }

    fn clear_color(&mut self, resource: &Arc<Resource>, view: &ViewDesc, color: [f32; 4]) {
        self.ops.push(Op::ClearColor {
            resource: Arc::clone(resource),
            view: *view,
            color,
        });
    }

    fn clear_depth(&mut self, resource: &Arc<Resource>, view: &ViewDesc, depth: f32) {
        self.ops.push(Op::ClearDepth {
            resource: Arc::clone(resource),
            view: *view,
            depth,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32, base_vertex: i32) {
        self.ops.push(Op::DrawIndexed {
            index_count,
            instance_count,
            base_vertex,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.ops.push(Op::Dispatch { x, y, z });
    }

    fn dispatch_rays(&mut self, _width: u32, _height: u32, _depth: u32) {
        log::warn!("ray dispatch is not available on the wgpu backend");
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrierDesc]) {
        // wgpu tracks states internally; the resolved transitions are only
        // useful as a trace of what the submission layer decided.
        for barrier in barriers {
            log::trace!(
                "barrier {}: {:?} -> {:?}",
                barrier.resource.id(),
                barrier.state_before,
                barrier.state_after
            );
        }
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.ops.push(Op::SetViewport(*viewport));
    }

    fn set_scissor_rect(&mut self, rect: &ScissorRect) {
        self.ops.push(Op::SetScissorRect(*rect));
    }

    fn set_index_buffer(&mut self, resource: &Arc<Resource>, format: IndexFormat) {
        self.ops.push(Op::SetIndexBuffer {
            resource: Arc::clone(resource),
            format,
        });
    }

    fn set_vertex_buffer(&mut self, slot: u32, resource: &Arc<Resource>) {
        self.ops.push(Op::SetVertexBuffer {
            slot,
            resource: Arc::clone(resource),
        });
    }

    fn copy_buffer(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[BufferCopyRegion],
    ) {
        self.ops.push(Op::CopyBuffer {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
            regions: regions.to_vec(),
        });
    }

    fn copy_buffer_to_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[BufferToTextureCopyRegion],
    ) {
        self.ops.push(Op::CopyBufferToTexture {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
            regions: regions.to_vec(),
        });
    }

    fn copy_texture(
        &mut self,
        src: &Arc<Resource>,
        dst: &Arc<Resource>,
        regions: &[TextureCopyRegion],
    ) {
        self.ops.push(Op::CopyTexture {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
            regions: regions.to_vec(),
        });
    }

    fn build_bottom_level_as(&mut self, _dst: &Arc<Resource>, _geometry: &[RaytracingGeometryDesc]) {
        log::warn!("acceleration structures are not available on the wgpu backend");
    }

    fn build_top_level_as(&mut self, _dst: &Arc<Resource>, _instances: &[TopLevelInstance]) {
        log::warn!("acceleration structures are not available on the wgpu backend");
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
