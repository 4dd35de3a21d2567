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

//! `each` block helper
//!
//! Arrays iterate in order with `@index`, `@first` and `@last`; maps iterate
//! in insertion order with `@key`, `@first` and `@last`. Block parameters bind
//! to the element and its index or key.

use crate::evaluator::scope::DataFrame;
use crate::model::Value;
use crate::registry::helper::{Helper, HelperError, HelperOutput, HelperParams, HelperResult};

/// `{{#each collection as |item index|}}`
pub struct EachHelper;

impl Helper for EachHelper {
    fn call(&self, h: &HelperParams<'_>) -> HelperResult {
        h.require_block()?;
        let [collection] = h.params() else {
            return Err(HelperError::message("#each requires exactly one argument"));
        };
        iterate(h, collection)
    }
}

/// Render the block once per element of `collection`, or the inverse when it
/// is empty or not iterable
pub(crate) fn iterate(h: &HelperParams<'_>, collection: &Value) -> HelperResult {
    let mut out = String::new();
    match collection {
        Value::Array(items) if !items.is_empty() => {
            let last = items.len() - 1;
            for (index, item) in items.iter().enumerate() {
                let data = DataFrame::new()
                    .with("index", index)
                    .with("first", index == 0)
                    .with("last", index == last);
                out.push_str(&h.block_with_params(
                    item.clone(),
                    Some(data),
                    vec![item.clone(), Value::from(index)],
                )?);
            }
        }
        Value::Map(map) if !map.is_empty() => {
            let last = map.len() - 1;
            for (position, (key, value)) in map.iter().enumerate() {
                let data = DataFrame::new()
                    .with("key", key.as_str())
                    .with("first", position == 0)
                    .with("last", position == last);
                out.push_str(&h.block_with_params(
                    value.clone(),
                    Some(data),
                    vec![value.clone(), Value::from(key.as_str())],
                )?);
            }
        }
        _ => out = h.inverse()?,
    }
    Ok(HelperOutput::safe(out))
}

#[cfg(test)]
mod tests {
    use crate::engine::Handlebars;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> String {
        Handlebars::new().render_source(source, &data).unwrap()
    }

    #[test]
    fn test_each_array_data() {
        assert_eq!(
            render(
                "{{#each xs}}{{@index}}:{{this}}:{{@first}}:{{@last}};{{/each}}",
                json!({"xs": ["a", "b", "c"]})
            ),
            "0:a:true:false;1:b:false:false;2:c:false:true;"
        );
    }

    #[test]
    fn test_each_single_element_is_first_and_last() {
        assert_eq!(
            render("{{#each xs}}{{@first}}/{{@last}}{{/each}}", json!({"xs": [1]})),
            "true/true"
        );
    }

    #[test]
    fn test_each_map_in_insertion_order() {
        assert_eq!(
            render(
                "{{#each m}}{{@key}}={{this}}{{#unless @last}},{{/unless}}{{/each}}",
                json!({"m": {"z": 1, "a": 2, "k": 3}})
            ),
            "z=1,a=2,k=3"
        );
    }

    #[test]
    fn test_each_empty_renders_inverse() {
        assert_eq!(
            render("{{#each xs}}x{{else}}none{{/each}}", json!({"xs": []})),
            "none"
        );
        assert_eq!(render("{{#each m}}x{{/each}}", json!({"m": {}})), "");
        assert_eq!(
            render("{{#each missing}}x{{else}}none{{/each}}", json!({})),
            "none"
        );
    }

    #[test]
    fn test_each_block_params() {
        assert_eq!(
            render(
                "{{#each xs as |item i|}}{{i}}={{item.n}} {{/each}}",
                json!({"xs": [{"n": "a"}, {"n": "b"}]})
            ),
            "0=a 1=b "
        );
        assert_eq!(
            render(
                "{{#each m as |v k|}}{{k}}:{{v}} {{/each}}",
                json!({"m": {"x": 1, "y": 2}})
            ),
            "x:1 y:2 "
        );
    }

    #[test]
    fn test_nested_each_parent_access() {
        assert_eq!(
            render(
                "{{#each rows}}{{#each cells}}{{../label}}{{@../index}}{{this}} {{/each}}{{/each}}",
                json!({"rows": [{"label": "r", "cells": [1, 2]}]})
            ),
            "r01 r02 "
        );
    }
}
