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

//! The whole frame loop over the replay backend.

use std::sync::Arc;

use kiln_core::gpu::{
    GpuContext, GpuDevice, GpuSettings, ResourceState, ViewDesc, ViewKind,
};
use kiln_infra::graphics::replay::{validate_barrier_contract, ReplayDevice, ReplayOp};

fn context(frame_count: u32) -> (Arc<ReplayDevice>, GpuContext) {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = Arc::new(ReplayDevice::new());
    let swapchain = device.create_offscreen_swapchain(64, 64, frame_count);
    let settings = GpuSettings {
        frame_count,
        ..GpuSettings::default()
    };
    let context = GpuContext::new(
        Arc::clone(&device) as Arc<dyn GpuDevice>,
        swapchain,
        &settings,
    )
    .unwrap();
    (device, context)
}

fn render_one_frame(context: &mut GpuContext) {
    let back_buffer = context.back_buffer().unwrap();
    {
        let mut list = context.current().lock().unwrap();
        list.begin_event("frame");
        list.clear_color(
            &back_buffer,
            &ViewDesc::full(ViewKind::RenderTarget),
            [0.1, 0.2, 0.3, 1.0],
        );
        list.end_event();
    }
    context.present().unwrap();
}

#[test]
fn three_frames_over_two_slots_keep_the_barrier_contract() {
    let (device, mut context) = context(2);
    for _ in 0..3 {
        render_one_frame(&mut context);
    }

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();

    let presents = ops
        .iter()
        .filter(|op| matches!(op, ReplayOp::Present { .. }))
        .count();
    assert_eq!(presents, 3);

    // Every frame turns its back buffer around: out of Present to render,
    // back to Present to show.
    let to_render = ops
        .iter()
        .filter(|op| {
            matches!(
                op,
                ReplayOp::Barrier {
                    state_before: ResourceState::Present,
                    state_after: ResourceState::RenderTarget,
                    ..
                }
            )
        })
        .count();
    let to_present = ops
        .iter()
        .filter(|op| {
            matches!(
                op,
                ReplayOp::Barrier {
                    state_before: ResourceState::RenderTarget,
                    state_after: ResourceState::Present,
                    ..
                }
            )
        })
        .count();
    assert_eq!(to_render, 3);
    assert_eq!(to_present, 3);
}

#[test]
fn frame_slots_alternate_back_buffers() {
    let (device, mut context) = context(2);
    assert_eq!(context.frame_index(), 0);
    render_one_frame(&mut context);
    assert_eq!(context.frame_index(), 1);
    render_one_frame(&mut context);
    assert_eq!(context.frame_index(), 0);

    let presented: Vec<_> = device
        .shared()
        .snapshot()
        .into_iter()
        .filter_map(|op| match op {
            ReplayOp::Present { image } => Some(image),
            _ => None,
        })
        .collect();
    assert_eq!(presented.len(), 2);
    assert_ne!(presented[0], presented[1], "slots must alternate images");
}

#[test]
fn resize_drains_the_gpu_first() {
    let (device, mut context) = context(2);
    render_one_frame(&mut context);
    render_one_frame(&mut context);
    context.resize(128, 128).unwrap();
    // Everything submitted before the resize must have retired.
    device.complete_work();
    render_one_frame(&mut context);
    validate_barrier_contract(&device.shared().snapshot()).unwrap();
}
