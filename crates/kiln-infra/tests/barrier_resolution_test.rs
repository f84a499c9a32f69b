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

//! End-to-end barrier resolution through the replay backend.

use std::sync::Arc;

use kiln_core::gpu::{
    BindFlag, CommandListBox, CommandQueue, Format, GpuDevice, Resource, ResourceDesc,
    ResourceState, SharedCommandList, ViewDesc, ViewKind,
};
use kiln_infra::graphics::replay::{validate_barrier_contract, ReplayDevice, ReplayOp};

fn render_target(device: &ReplayDevice) -> Arc<Resource> {
    let _ = env_logger::builder().is_test(true).try_init();
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

fn closed_list(device: &ReplayDevice, record: impl FnOnce(&mut CommandListBox)) -> SharedCommandList {
    let shared = CommandListBox::new_shared(device.create_command_list());
    {
        let mut list = shared.lock().unwrap();
        list.open();
        record(&mut list);
        list.close();
    }
    shared
}

fn barriers_for(
    ops: &[ReplayOp],
    id: kiln_core::gpu::ResourceId,
) -> Vec<(ResourceState, ResourceState)> {
    ops.iter()
        .filter_map(|op| match op {
            ReplayOp::Barrier {
                resource,
                state_before,
                state_after,
                ..
            } if *resource == id => Some((*state_before, *state_after)),
            _ => None,
        })
        .collect()
}

#[test]
fn first_use_of_fresh_texture_is_patched_out_of_common() {
    let device = Arc::new(ReplayDevice::new());
    let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
    let tex = render_target(&device);

    let list = closed_list(&device, |list| {
        list.clear_color(&tex, &ViewDesc::full(ViewKind::RenderTarget), [0.0; 4]);
    });
    queue.execute_command_lists(&[list]).unwrap();

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();

    assert_eq!(
        barriers_for(&ops, tex.id()),
        vec![(ResourceState::Common, ResourceState::RenderTarget)]
    );
    assert_eq!(device.submission_count(), 1);
}

#[test]
fn second_submission_resolves_against_committed_state() {
    let device = Arc::new(ReplayDevice::new());
    let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
    let tex = render_target(&device);

    let frame = closed_list(&device, |list| {
        list.clear_color(&tex, &ViewDesc::full(ViewKind::RenderTarget), [0.0; 4]);
    });
    queue.execute_command_lists(&[frame]).unwrap();

    // A later submission sees RenderTarget as the prior state, not Common.
    let sample = closed_list(&device, |list| {
        list.resource_barrier(&tex, ResourceState::ShaderResource);
    });
    queue.execute_command_lists(&[sample]).unwrap();

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();
    assert_eq!(
        barriers_for(&ops, tex.id()),
        vec![
            (ResourceState::Common, ResourceState::RenderTarget),
            (ResourceState::RenderTarget, ResourceState::ShaderResource),
        ]
    );
}

#[test]
fn transition_into_current_state_reaches_no_driver() {
    let device = Arc::new(ReplayDevice::new());
    let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
    let tex = render_target(&device);

    let first = closed_list(&device, |list| {
        list.resource_barrier(&tex, ResourceState::CopySource);
    });
    queue.execute_command_lists(&[first]).unwrap();

    let second = closed_list(&device, |list| {
        list.resource_barrier(&tex, ResourceState::CopySource);
    });
    queue.execute_command_lists(&[second]).unwrap();

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();
    assert_eq!(
        barriers_for(&ops, tex.id()),
        vec![(ResourceState::Common, ResourceState::CopySource)],
        "the repeated transition must be elided"
    );
}

#[test]
fn per_subresource_divergence_resolves_each_slice() {
    let device = Arc::new(ReplayDevice::new());
    let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
    let tex = device
        .create_texture(&ResourceDesc::texture_2d(
            Format::Rgba8Unorm,
            64,
            64,
            2,
            1,
            BindFlag::RENDER_TARGET | BindFlag::COPY_SOURCE,
        ))
        .unwrap();

    // Only mip 0 becomes a render target; mip 1 stays Common.
    let mip0 = ViewDesc {
        kind: ViewKind::RenderTarget,
        base_mip_level: 0,
        level_count: Some(1),
        base_array_layer: 0,
        layer_count: Some(1),
    };
    let frame = closed_list(&device, |list| {
        list.clear_color(&tex, &mip0, [0.0; 4]);
    });
    queue.execute_command_lists(&[frame]).unwrap();

    // A whole-resource transition now needs two different prior states.
    let readback = closed_list(&device, |list| {
        list.resource_barrier(&tex, ResourceState::CopySource);
    });
    queue.execute_command_lists(&[readback]).unwrap();

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();
    assert_eq!(
        barriers_for(&ops, tex.id()),
        vec![
            (ResourceState::Common, ResourceState::RenderTarget),
            (ResourceState::RenderTarget, ResourceState::CopySource),
            (ResourceState::Common, ResourceState::CopySource),
        ]
    );
}
