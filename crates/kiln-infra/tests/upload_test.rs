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

//! Staged uploads through the frame loop.

use std::sync::Arc;

use kiln_core::gpu::{
    BindFlag, Format, GpuContext, GpuDevice, GpuSettings, MemoryType, ResourceDesc,
};
use kiln_infra::graphics::replay::{
    validate_barrier_contract, ReplayDevice, ReplayOp, ReplayResource,
};

fn context() -> (Arc<ReplayDevice>, GpuContext) {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = Arc::new(ReplayDevice::new());
    let swapchain = device.create_offscreen_swapchain(64, 64, 2);
    let settings = GpuSettings {
        frame_count: 2,
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

#[test]
fn upload_heap_buffers_are_written_directly() {
    let (device, mut context) = context();
    let vertices: [f32; 4] = [0.0, 0.5, -0.5, 1.0];
    let data = bytemuck::cast_slice(&vertices);

    let buffer = context
        .create_buffer(&ResourceDesc::buffer(
            data.len() as u64,
            BindFlag::VERTEX_BUFFER,
            MemoryType::Upload,
        ))
        .unwrap();
    context.update_subresource(&buffer, 0, 0, data, 0).unwrap();

    let native = buffer
        .native()
        .as_any()
        .downcast_ref::<ReplayResource>()
        .unwrap();
    assert_eq!(native.uploaded(), data);
    // No copy commands: the write went straight into the mapped heap.
    assert!(device.shared().snapshot().iter().all(|op| !matches!(
        op,
        ReplayOp::CopyBuffer { .. } | ReplayOp::CopyBufferToTexture { .. }
    )));
}

#[test]
fn default_heap_buffer_upload_goes_through_staging() {
    let (device, mut context) = context();
    let indices: [u32; 6] = [0, 1, 2, 2, 1, 3];
    let data = bytemuck::cast_slice(&indices);

    let buffer = context
        .create_buffer(&ResourceDesc::buffer(
            data.len() as u64,
            BindFlag::INDEX_BUFFER | BindFlag::COPY_DEST,
            MemoryType::Default,
        ))
        .unwrap();
    context.update_subresource(&buffer, 0, 0, data, 0).unwrap();
    context.present().unwrap();

    let staging = buffer.staging_buffer(0).expect("staging buffer kept alive");
    assert_eq!(staging.desc().memory_type, MemoryType::Upload);
    let staged = staging
        .native()
        .as_any()
        .downcast_ref::<ReplayResource>()
        .unwrap();
    assert_eq!(staged.uploaded(), data);

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();
    assert!(ops.iter().any(|op| matches!(
        op,
        ReplayOp::CopyBuffer { src, dst } if *src == staging.id() && *dst == buffer.id()
    )));
}

#[test]
fn texture_upload_repacks_rows_to_the_pitch_alignment() {
    let (device, mut context) = context();
    let width = 16u32;
    let height = 4u32;
    let row_pitch = width * 4;
    let texel = [0x40u8, 0x80, 0xc0, 0xff];
    let data: Vec<u8> = texel
        .iter()
        .copied()
        .cycle()
        .take((row_pitch * height) as usize)
        .collect();

    let texture = context
        .create_texture(&ResourceDesc::texture_2d(
            Format::Rgba8Unorm,
            u64::from(width),
            height,
            1,
            1,
            BindFlag::SHADER_RESOURCE | BindFlag::COPY_DEST,
        ))
        .unwrap();
    context
        .update_subresource(&texture, 0, 0, &data, row_pitch)
        .unwrap();
    context.present().unwrap();

    let staging = texture.staging_buffer(0).expect("staging buffer kept alive");
    let staged = staging
        .native()
        .as_any()
        .downcast_ref::<ReplayResource>()
        .unwrap()
        .uploaded();
    // 64-byte rows land at the 256-byte alignment the device reports.
    let aligned_pitch = device.texture_data_pitch_alignment() as usize;
    assert_eq!(staged.len(), aligned_pitch * height as usize);
    assert_eq!(&staged[..row_pitch as usize], &data[..row_pitch as usize]);
    assert!(staged[row_pitch as usize..aligned_pitch]
        .iter()
        .all(|byte| *byte == 0));

    let ops = device.shared().snapshot();
    validate_barrier_contract(&ops).unwrap();
    assert!(ops.iter().any(|op| matches!(
        op,
        ReplayOp::CopyBufferToTexture { src, dst, .. }
            if *src == staging.id() && *dst == texture.id()
    )));
}
