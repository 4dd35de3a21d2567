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

//! `if` and `unless` block helpers

use crate::model::type_coercion::{is_truthy, is_truthy_including_zero};
use crate::registry::helper::{Helper, HelperError, HelperOutput, HelperParams, HelperResult};

/// Evaluate the single condition parameter, honouring `includeZero=true`
fn condition(h: &HelperParams<'_>) -> Result<bool, HelperError> {
    h.require_block()?;
    let [value] = h.params() else {
        return Err(HelperError::message(format!(
            "#{} requires exactly one argument",
            h.name()
        )));
    };
    Ok(if h.hash_bool("includeZero") {
        is_truthy_including_zero(value)
    } else {
        is_truthy(value)
    })
}

/// `{{#if cond}}`: primary body when truthy, inverse otherwise. The context
/// is never changed.
pub struct IfHelper;

impl Helper for IfHelper {
    fn call(&self, h: &HelperParams<'_>) -> HelperResult {
        let out = if condition(h)? { h.block()? } else { h.inverse()? };
        Ok(HelperOutput::safe(out))
    }
}

/// `{{#unless cond}}`: the negation of [`IfHelper`]
pub struct UnlessHelper;

impl Helper for UnlessHelper {
    fn call(&self, h: &HelperParams<'_>) -> HelperResult {
        let out = if condition(h)? { h.inverse()? } else { h.block()? };
        Ok(HelperOutput::safe(out))
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::Handlebars;
    use crate::evaluator::RenderError;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(true), "yes")]
    #[case(json!(false), "no")]
    #[case(json!(0), "no")]
    #[case(json!(""), "no")]
    #[case(json!([]), "no")]
    #[case(json!({}), "no")]
    #[case(json!(null), "no")]
    #[case(json!([0]), "yes")]
    #[case(json!("0"), "yes")]
    fn test_if_and_unless_are_negations(#[case] value: serde_json::Value, #[case] expected: &str) {
        let engine = Handlebars::new();
        let data = json!({ "v": value });
        let if_out = engine
            .render_source("{{#if v}}yes{{else}}no{{/if}}", &data)
            .unwrap();
        let unless_out = engine
            .render_source("{{#unless v}}no{{else}}yes{{/unless}}", &data)
            .unwrap();
        assert_eq!(if_out, expected);
        assert_eq!(unless_out, expected);
    }

    #[test]
    fn test_include_zero() {
        let engine = Handlebars::new();
        let data = json!({ "n": 0 });
        assert_eq!(
            engine
                .render_source("{{#if n includeZero=true}}zero{{/if}}", &data)
                .unwrap(),
            "zero"
        );
        assert_eq!(
            engine
                .render_source("{{#unless n includeZero=true}}x{{else}}y{{/unless}}", &data)
                .unwrap(),
            "y"
        );
    }

    #[test]
    fn test_if_keeps_context() {
        let engine = Handlebars::new();
        let out = engine
            .render_source("{{#if user}}{{name}}{{/if}}", &json!({"user": {"name": "in"}, "name": "out"}))
            .unwrap();
        assert_eq!(out, "out");
    }

    #[test]
    fn test_if_requires_one_argument() {
        let engine = Handlebars::new();
        let err = engine
            .render_source("{{#if a b}}x{{/if}}", &json!({}))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::HandlebarsError::Render(RenderError::Helper { ref helper, .. }) if helper == "if"
        ));
    }
}
