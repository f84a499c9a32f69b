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

//! The executed-operation log and its validation.

use std::collections::HashMap;
use std::sync::Mutex;

use kiln_core::gpu::{ResourceId, ResourceState, SubresourceRange};

/// One operation as the simulated driver received it.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOp {
    /// A resource came into existence with every subresource in
    /// `initial_state`.
    CreateResource {
        resource: ResourceId,
        level_count: u32,
        layer_count: u32,
        initial_state: ResourceState,
    },
    /// An explicit state transition.
    Barrier {
        resource: ResourceId,
        range: SubresourceRange,
        state_before: ResourceState,
        state_after: ResourceState,
    },
    BeginRenderPass {
        colors: Vec<(ResourceId, SubresourceRange)>,
        depth: Option<(ResourceId, SubresourceRange)>,
    },
    EndRenderPass,
    ClearColor {
        resource: ResourceId,
        range: SubresourceRange,
    },
    ClearDepth {
        resource: ResourceId,
        range: SubresourceRange,
    },
    BindPipeline,
    BindBindingSet,
    BeginEvent(String),
    EndEvent,
    DrawIndexed {
        index_count: u32,
    },
    Dispatch,
    DispatchRays,
    SetIndexBuffer {
        resource: ResourceId,
    },
    SetVertexBuffer {
        resource: ResourceId,
    },
    CopyBuffer {
        src: ResourceId,
        dst: ResourceId,
    },
    CopyBufferToTexture {
        src: ResourceId,
        dst: ResourceId,
        ranges: Vec<SubresourceRange>,
    },
    CopyTexture {
        src: ResourceId,
        dst: ResourceId,
    },
    BuildBottomLevelAs {
        dst: ResourceId,
    },
    BuildTopLevelAs {
        dst: ResourceId,
    },
    /// A back buffer was handed to the presentation engine.
    Present {
        image: ResourceId,
    },
}

/// Log and simulated-progress state shared by every replay object.
#[derive(Debug, Default)]
pub struct ReplayShared {
    ops: Mutex<Vec<ReplayOp>>,
}

impl ReplayShared {
    /// Appends one executed operation.
    pub fn record(&self, op: ReplayOp) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
    }

    /// Appends a batch of executed operations.
    pub fn record_all(&self, ops: impl IntoIterator<Item = ReplayOp>) {
        self.ops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(ops);
    }

    /// A snapshot of everything executed so far.
    pub fn snapshot(&self) -> Vec<ReplayOp> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn states_in<'a>(
    states: &'a HashMap<(ResourceId, u32, u32), ResourceState>,
    seeds: &'a HashMap<ResourceId, ResourceState>,
    resource: ResourceId,
    range: &'a SubresourceRange,
) -> impl Iterator<Item = ((u32, u32), ResourceState)> + 'a {
    let seed = seeds.get(&resource).copied().unwrap_or(ResourceState::Common);
    range.subresources().map(move |(mip, layer)| {
        (
            (mip, layer),
            states
                .get(&(resource, mip, layer))
                .copied()
                .unwrap_or(seed),
        )
    })
}

fn expect_state(
    states: &HashMap<(ResourceId, u32, u32), ResourceState>,
    seeds: &HashMap<ResourceId, ResourceState>,
    resource: ResourceId,
    range: &SubresourceRange,
    required: ResourceState,
    what: &str,
) -> Result<(), String> {
    for ((mip, layer), current) in states_in(states, seeds, resource, range) {
        if current != required {
            return Err(format!(
                "{what}: {resource} subresource ({mip}, {layer}) is {current:?}, requires {required:?}"
            ));
        }
    }
    Ok(())
}

/// Replays `ops` and checks the state machine end to end.
///
/// Every barrier must depart from exactly the state the stream left the
/// subresource in, and every use must find its resource in the state the
/// operation requires. Resources never created in the log start in
/// `Common`.
pub fn validate_barrier_contract(ops: &[ReplayOp]) -> Result<(), String> {
    let mut states: HashMap<(ResourceId, u32, u32), ResourceState> = HashMap::new();
    let mut seeds: HashMap<ResourceId, ResourceState> = HashMap::new();

    for (index, op) in ops.iter().enumerate() {
        let result = match op {
            ReplayOp::CreateResource {
                resource,
                initial_state,
                ..
            } => {
                seeds.insert(*resource, *initial_state);
                Ok(())
            }
            ReplayOp::Barrier {
                resource,
                range,
                state_before,
                state_after,
            } => {
                let mut result = Ok(());
                for ((mip, layer), current) in
                    states_in(&states, &seeds, *resource, range).collect::<Vec<_>>()
                {
                    if *state_before != current {
                        result = Err(format!(
                            "barrier on {resource} subresource ({mip}, {layer}) departs from \
                             {state_before:?} but the stream left it in {current:?}"
                        ));
                        break;
                    }
                    states.insert((*resource, mip, layer), *state_after);
                }
                result
            }
            ReplayOp::BeginRenderPass { colors, depth } => {
                let mut result = Ok(());
                for (resource, range) in colors {
                    result = result.and(expect_state(
                        &states,
                        &seeds,
                        *resource,
                        range,
                        ResourceState::RenderTarget,
                        "render pass color attachment",
                    ));
                }
                if let Some((resource, range)) = depth {
                    result = result.and(expect_state(
                        &states,
                        &seeds,
                        *resource,
                        range,
                        ResourceState::DepthTarget,
                        "render pass depth attachment",
                    ));
                }
                result
            }
            ReplayOp::ClearColor { resource, range } => expect_state(
                &states,
                &seeds,
                *resource,
                range,
                ResourceState::RenderTarget,
                "color clear",
            ),
            ReplayOp::ClearDepth { resource, range } => expect_state(
                &states,
                &seeds,
                *resource,
                range,
                ResourceState::DepthTarget,
                "depth clear",
            ),
            ReplayOp::SetIndexBuffer { resource } => expect_state(
                &states,
                &seeds,
                *resource,
                &SubresourceRange::single(0, 0),
                ResourceState::IndexBuffer,
                "index buffer bind",
            ),
            ReplayOp::SetVertexBuffer { resource } => expect_state(
                &states,
                &seeds,
                *resource,
                &SubresourceRange::single(0, 0),
                ResourceState::VertexAndConstantBuffer,
                "vertex buffer bind",
            ),
            ReplayOp::CopyBuffer { src, dst } => expect_state(
                &states,
                &seeds,
                *src,
                &SubresourceRange::single(0, 0),
                ResourceState::CopySource,
                "buffer copy source",
            )
            .and(expect_state(
                &states,
                &seeds,
                *dst,
                &SubresourceRange::single(0, 0),
                ResourceState::CopyDest,
                "buffer copy destination",
            )),
            ReplayOp::CopyBufferToTexture { src, dst, ranges } => {
                let mut result = expect_state(
                    &states,
                    &seeds,
                    *src,
                    &SubresourceRange::single(0, 0),
                    ResourceState::CopySource,
                    "upload copy source",
                );
                for range in ranges {
                    result = result.and(expect_state(
                        &states,
                        &seeds,
                        *dst,
                        range,
                        ResourceState::CopyDest,
                        "upload copy destination",
                    ));
                }
                result
            }
            ReplayOp::BuildBottomLevelAs { dst } | ReplayOp::BuildTopLevelAs { dst } => {
                expect_state(
                    &states,
                    &seeds,
                    *dst,
                    &SubresourceRange::single(0, 0),
                    ResourceState::RaytracingAccelerationStructure,
                    "acceleration structure build",
                )
            }
            ReplayOp::Present { image } => expect_state(
                &states,
                &seeds,
                *image,
                &SubresourceRange::single(0, 0),
                ResourceState::Present,
                "present",
            ),
            _ => Ok(()),
        };
        result.map_err(|msg| format!("op #{index}: {msg}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::gpu::{BindFlag, Format, Resource, ResourceDesc};

    fn fresh_id() -> ResourceId {
        // Resource IDs come from the shared process counter; making a real
        // resource is the supported way to obtain one.
        let resource = Resource::new(
            ResourceDesc::texture_2d(Format::Rgba8Unorm, 4, 4, 1, 1, BindFlag::RENDER_TARGET),
            Box::new(NullPayload),
            ResourceState::Common,
        );
        resource.id()
    }

    #[derive(Debug)]
    struct NullPayload;

    impl kiln_core::gpu::NativeResource for NullPayload {
        fn allow_common_state_promotion(&self, _state: ResourceState) -> bool {
            false
        }
        fn update_upload_data(
            &self,
            _data: &[u8],
            _offset: u64,
        ) -> Result<(), kiln_core::gpu::ResourceError> {
            Ok(())
        }
        fn set_name(&self, _name: &str) {}
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn consistent_stream_validates() {
        let id = fresh_id();
        let range = SubresourceRange::single(0, 0);
        let ops = vec![
            ReplayOp::Barrier {
                resource: id,
                range,
                state_before: ResourceState::Common,
                state_after: ResourceState::RenderTarget,
            },
            ReplayOp::ClearColor {
                resource: id,
                range,
            },
            ReplayOp::Barrier {
                resource: id,
                range,
                state_before: ResourceState::RenderTarget,
                state_after: ResourceState::Present,
            },
            ReplayOp::Present { image: id },
        ];
        validate_barrier_contract(&ops).unwrap();
    }

    #[test]
    fn stale_state_before_is_rejected() {
        let id = fresh_id();
        let range = SubresourceRange::single(0, 0);
        let ops = vec![
            ReplayOp::Barrier {
                resource: id,
                range,
                state_before: ResourceState::Common,
                state_after: ResourceState::RenderTarget,
            },
            ReplayOp::Barrier {
                resource: id,
                range,
                state_before: ResourceState::Common,
                state_after: ResourceState::ShaderResource,
            },
        ];
        let err = validate_barrier_contract(&ops).unwrap_err();
        assert!(err.contains("departs from"), "{err}");
    }

    #[test]
    fn use_in_wrong_state_is_rejected() {
        let id = fresh_id();
        let range = SubresourceRange::single(0, 0);
        let ops = vec![ReplayOp::ClearColor {
            resource: id,
            range,
        }];
        let err = validate_barrier_contract(&ops).unwrap_err();
        assert!(err.contains("color clear"), "{err}");
    }

    #[test]
    fn created_resources_seed_their_initial_state() {
        let id = fresh_id();
        let range = SubresourceRange::single(0, 0);
        let ops = vec![
            ReplayOp::CreateResource {
                resource: id,
                level_count: 1,
                layer_count: 1,
                initial_state: ResourceState::Present,
            },
            ReplayOp::Barrier {
                resource: id,
                range,
                state_before: ResourceState::Present,
                state_after: ResourceState::RenderTarget,
            },
        ];
        validate_barrier_contract(&ops).unwrap();
    }
}
