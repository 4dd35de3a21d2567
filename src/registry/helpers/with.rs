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

//! `with` block helper

use crate::model::type_coercion::is_truthy;
use crate::registry::helper::{Helper, HelperError, HelperOutput, HelperParams, HelperResult};

/// `{{#with value as |v|}}`: renders the body with `value` as context, or
/// the inverse with the context unchanged when `value` is falsy
pub struct WithHelper;

impl Helper for WithHelper {
    fn call(&self, h: &HelperParams<'_>) -> HelperResult {
        h.require_block()?;
        let [value] = h.params() else {
            return Err(HelperError::message("#with requires exactly one argument"));
        };
        let out = if is_truthy(value) {
            h.block_with_params(value.clone(), None, vec![value.clone()])?
        } else {
            h.inverse()?
        };
        Ok(HelperOutput::safe(out))
    }
}
