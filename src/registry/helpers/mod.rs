// Copyright 2024 OctoFHIR Team
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

//! Built-in block helpers

pub mod conditional;
pub mod each;
pub mod with;

pub use conditional::{IfHelper, UnlessHelper};
pub use each::EachHelper;
pub use with::WithHelper;

use super::HelperRegistry;

/// Register `if`, `unless`, `with` and `each`
pub fn register_builtin_helpers(registry: &mut HelperRegistry) {
    registry.register("if", IfHelper);
    registry.register("unless", UnlessHelper);
    registry.register("with", WithHelper);
    registry.register("each", EachHelper);
}
