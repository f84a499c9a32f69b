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

//! Patch list pooling against simulated GPU progress.

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
            32,
            32,
            1,
            1,
            BindFlag::RENDER_TARGET | BindFlag::SHADER_RESOURCE,
        ))
        .unwrap()
}

fn transition_list(
    device: &ReplayDevice,
    resource: &Arc<Resource>,
    state: ResourceState,
    fake_close: bool,
) -> SharedCommandList {
    let shared = CommandListBox::new_shared(device.create_command_list());
    {
        let mut list = shared.lock().unwrap();
        list.set_fake_close(fake_close);
        list.open();
        list.resource_barrier(resource, state);
        list.close();
    }
    shared
}

#[test]
fn pool_grows_while_the_gpu_is_behind_and_reuses_after() {
    let device = Arc::new(ReplayDevice::new());
    let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
    let tex = render_target(&device);

    let first = transition_list(&device, &tex, ResourceState::RenderTarget, false);
    queue.execute_command_lists(&[first]).unwrap();
    assert_eq!(queue.patch_pool_len(), 1);

    // No signal has completed, so the pooled list is still in flight.
    let second = transition_list(&device, &tex, ResourceState::ShaderResource, false);
    queue.execute_command_lists(&[second]).unwrap();
    assert_eq!(queue.patch_pool_len(), 2);

    // The GPU catches up; the oldest pooled list becomes reusable.
    device.complete_work();
    let third = transition_list(&device, &tex, ResourceState::CopySource, false);
    queue.execute_command_lists(&[third]).unwrap();
    assert_eq!(queue.patch_pool_len(), 2);

    validate_barrier_contract(&device.shared().snapshot()).unwrap();
}

#[test]
fn fake_close_rides_patch_barriers_on_the_previous_tail() {
    let device = Arc::new(ReplayDevice::new());
    let mut queue = CommandQueue::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
    queue.set_fake_close(true);
    let tex = render_target(&device);

    let frame = CommandListBox::new_shared(device.create_command_list());
    {
        let mut list = frame.lock().unwrap();
        list.set_fake_close(true);
        list.open();
        list.clear_color(&tex, &ViewDesc::full(ViewKind::RenderTarget), [0.0; 4]);
        list.close();
    }
    let sample = transition_list(&device, &tex, ResourceState::ShaderResource, true);
    queue
        .execute_command_lists(&[frame, Arc::clone(&sample)])
        .unwrap();

    // Only the leading patch list came from the pool; the second list's
    // barrier rode on the first list's tail.
    assert_eq!(queue.patch_pool_len(), 1);

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();

    let position = |op: &ReplayOp| ops.iter().position(|o| o == op).unwrap();
    let clear = position(&ReplayOp::ClearColor {
        resource: tex.id(),
        range: kiln_core::gpu::SubresourceRange::whole(tex.desc()),
    });
    let tail_barrier = position(&ReplayOp::Barrier {
        resource: tex.id(),
        range: kiln_core::gpu::SubresourceRange::single(0, 0),
        state_before: ResourceState::RenderTarget,
        state_after: ResourceState::ShaderResource,
    });
    assert!(
        clear < tail_barrier,
        "tail barrier must execute after the frame's commands"
    );
}
