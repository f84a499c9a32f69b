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

//! Backend-agnostic data model.
//!
//! Organized into several logical sub-modules:
//!
//! - **[`format`]**: texel formats, extents, and sample counts.
//! - **[`resource`]**: resource descriptors and the shared [`Resource`] object.
//! - **[`state`]**: resource states, subresource ranges, barrier descriptors.
//! - **[`command`]**: structures describing recorded GPU operations.
//! - **[`binding`]**: binding keys and view descriptors.
//! - **[`settings`]**: global configuration for the graphics layer.

pub mod binding;
pub mod command;
pub mod format;
pub mod resource;
pub mod settings;
pub mod state;

pub use self::binding::*;
pub use self::command::*;
pub use self::format::*;
pub use self::resource::*;
pub use self::settings::*;
pub use self::state::*;
