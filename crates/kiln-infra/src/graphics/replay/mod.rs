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

//! Headless replay backend.
//!
//! Executes nothing: every operation that reaches the backend is appended
//! to a shared log, in submission order, exactly as a driver would receive
//! it. [`validate_barrier_contract`] then replays the log and checks that
//! every transition's prior state matches the state the preceding stream
//! established, and that every use happens in the state it requires.
//!
//! GPU progress is simulated: fence signals stay pending until the test
//! retires submissions (or a blocking wait force-completes them), which is
//! what makes patch-list reuse and frame pacing observable.

mod command;
mod device;
mod log;

pub use command::ReplayCommandList;
pub use device::{ReplayDevice, ReplayFence, ReplayResource, ReplaySwapchain};
pub use log::{validate_barrier_contract, ReplayOp, ReplayShared};
