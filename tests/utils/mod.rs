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

//! Shared fixtures for integration tests

#![allow(dead_code)]

use octofhir_handlebars::{Handlebars, HelperOutput, HelperParams, HelperResult, Value};

/// Install a test logger once; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Render template source with a fresh engine
pub fn render(source: &str, data: serde_json::Value) -> String {
    init_logging();
    Handlebars::new()
        .render_source(source, &data)
        .unwrap_or_else(|err| panic!("failed to render {source:?}: {err}"))
}

/// `{{echo text count}}`: `text` repeated `count` times (default 1)
pub fn echo(h: &HelperParams<'_>) -> HelperResult {
    let count = h.param_i64_or(1, 1).max(0) as usize;
    Ok(h.param_str(0).repeat(count).into())
}

/// `{{gnak count}}`: "GnAK!" repeated `count` times (default 1)
pub fn gnak(h: &HelperParams<'_>) -> HelperResult {
    let count = h.param_i64_or(0, 1).max(0) as usize;
    Ok("GnAK!".repeat(count).into())
}

/// `{{bool flag}}`
pub fn bool_helper(h: &HelperParams<'_>) -> HelperResult {
    Ok(if h.param_bool(0) {
        "yes it is"
    } else {
        "absolutely not"
    }
    .into())
}

/// `{{#raw a b}}body{{/raw}}`: the body followed by every parameter
pub fn raw(h: &HelperParams<'_>) -> HelperResult {
    let mut out = h.block()?;
    for index in 0..h.params().len() {
        out.push_str(&h.param_str(index));
    }
    Ok(HelperOutput::safe(out))
}

/// `{{#form}}body{{/form}}`
pub fn form(h: &HelperParams<'_>) -> HelperResult {
    Ok(HelperOutput::safe(format!("<form>{}</form>", h.block()?)))
}

/// `{{#formCtx value}}body{{/formCtx}}`: the body rendered against `value`
pub fn form_ctx(h: &HelperParams<'_>) -> HelperResult {
    let context = h.param(0).cloned().unwrap_or_default();
    Ok(HelperOutput::safe(format!(
        "<form>{}</form>",
        h.block_with(context)?
    )))
}

/// `{{#list items}}item{{else}}empty{{/list}}`
pub fn list(h: &HelperParams<'_>) -> HelperResult {
    match h.param(0).and_then(Value::as_array) {
        Some(items) if !items.is_empty() => {
            let mut out = String::from("<ul>");
            for item in items {
                out.push_str("<li>");
                out.push_str(&h.block_with(item.clone())?);
                out.push_str("</li>");
            }
            out.push_str("</ul>");
            Ok(HelperOutput::safe(out))
        }
        _ => Ok(HelperOutput::safe(format!("<p>{}</p>", h.inverse()?))),
    }
}

/// Engine with the test helpers registered
pub fn engine_with_test_helpers() -> Handlebars {
    init_logging();
    let mut engine = Handlebars::new();
    engine.register_helper_fn("foo", |_h: &HelperParams<'_>| Ok("bar".into()));
    engine.register_helper_fn("echo", echo);
    engine.register_helper_fn("gnak", gnak);
    engine.register_helper_fn("bool", bool_helper);
    engine.register_helper_fn("raw", raw);
    engine.register_helper_fn("form", form);
    engine.register_helper_fn("formCtx", form_ctx);
    engine.register_helper_fn("list", list);
    engine.register_helper_fn("dash", |h: &HelperParams<'_>| {
        Ok(format!("{}-{}", h.param_str(0), h.param_str(1)).into())
    });
    engine.register_helper_fn("concat", |h: &HelperParams<'_>| {
        Ok(format!("{}{}", h.param_str(0), h.param_str(1)).into())
    });
    engine
}
