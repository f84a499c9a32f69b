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

//! # Kiln Core
//!
//! Backend-agnostic graphics contracts and the resource-state tracking /
//! command-submission core.
//!
//! This crate defines the "common language" every backend speaks: the data
//! model ([`gpu::api`]), the capability traits a native backend implements
//! ([`gpu::traits`]), and the machinery that makes concurrent CPU recording
//! and GPU execution correct: per-command-list and global resource state
//! trackers, lazy barrier deferral, submission-time barrier resolution with a
//! fence-gated patch-list pool, and the buffered frame loop.
//!
//! Concrete backends live in `kiln-infra` and implement these traits.

#![warn(missing_docs)]

pub mod gpu;
pub mod platform;
pub mod utils;
