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

//! Helper invocation through the engine facade

use octofhir_handlebars::{
    Handlebars, HandlebarsError, HelperError, HelperOutput, HelperParams, RenderError,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

mod utils;
use utils::engine_with_test_helpers;

#[rstest]
#[case::simple_helper("{{foo}}", json!(null), "bar")]
#[case::literal_string_param(r#"{{echo "foo"}}"#, json!(null), "foo")]
#[case::identifier_param("{{echo foo}}", json!({"foo": "bar"}), "bar")]
#[case::literal_true("{{bool true}}", json!(null), "yes it is")]
#[case::literal_false("{{bool false}}", json!(null), "absolutely not")]
#[case::repeat_count("{{gnak 5}}", json!(null), "GnAK!GnAK!GnAK!GnAK!GnAK!")]
#[case::count_defaults_to_one("{{gnak}}", json!(null), "GnAK!")]
#[case::non_numeric_count(r#"{{gnak "many"}}"#, json!(null), "GnAK!")]
#[case::several_params(r#"{{echo "GnAK!" 3}}"#, json!(null), "GnAK!GnAK!GnAK!")]
#[case::if_true_literal("{{#if true}}YES MAN{{/if}}", json!(null), "YES MAN")]
#[case::if_false_literal("{{#if false}}YES MAN{{/if}}", json!(null), "")]
#[case::if_truthy_identifier("{{#if ok}}YES MAN{{/if}}", json!({"ok": true}), "YES MAN")]
#[case::if_falsy_identifier("{{#if ok}}YES MAN{{/if}}", json!({"ok": false}), "")]
#[case::unless_true_literal("{{#unless true}}YES MAN{{/unless}}", json!(null), "")]
#[case::unless_false_literal("{{#unless false}}YES MAN{{/unless}}", json!(null), "YES MAN")]
#[case::unless_truthy_identifier("{{#unless ok}}YES MAN{{/unless}}", json!({"ok": true}), "")]
#[case::unless_falsy_identifier("{{#unless ok}}YES MAN{{/unless}}", json!({"ok": false}), "YES MAN")]
fn test_helper_cases(
    #[case] source: &str,
    #[case] data: serde_json::Value,
    #[case] expected: &str,
) {
    let engine = engine_with_test_helpers();
    assert_eq!(engine.render_source(source, &data).unwrap(), expected);
}

#[test]
fn test_block_helper_renders_body_in_current_context() {
    let engine = engine_with_test_helpers();
    let out = engine
        .render_source("{{#form}}<p>{{name}}</p>{{/form}}", &json!({"name": "Yehuda"}))
        .unwrap();
    assert_eq!(out, "<form><p>Yehuda</p></form>");
}

#[test]
fn test_block_helper_with_explicit_context() {
    let engine = engine_with_test_helpers();
    let data = json!({"name": "outer", "person": {"name": "inner"}});
    let out = engine
        .render_source("{{#formCtx person}}{{name}}{{/formCtx}}{{name}}", &data)
        .unwrap();
    assert_eq!(out, "<form>inner</form>outer");
}

#[test]
fn test_block_helper_iterating_and_inverse() {
    let engine = engine_with_test_helpers();
    let source = "{{#list people}}{{name}}{{else}}nobody{{/list}}";
    assert_eq!(
        engine
            .render_source(source, &json!({"people": [{"name": "Alan"}, {"name": "Yehuda"}]}))
            .unwrap(),
        "<ul><li>Alan</li><li>Yehuda</li></ul>"
    );
    assert_eq!(
        engine.render_source(source, &json!({"people": []})).unwrap(),
        "<p>nobody</p>"
    );
}

#[test]
fn test_block_helper_appends_params() {
    let engine = engine_with_test_helpers();
    assert_eq!(
        engine
            .render_source(r#"{{#raw "a" 1 true}}body:{{/raw}}"#, &json!(null))
            .unwrap(),
        "body:a1true"
    );
}

#[test]
fn test_subexpressions() {
    let engine = engine_with_test_helpers();
    let out = engine
        .render_source(
            r#"{{dash (concat a b) (concat "x" (concat c "z"))}}"#,
            &json!({"a": "1", "b": "2", "c": "y"}),
        )
        .unwrap();
    assert_eq!(out, "12-xyz");
}

#[test]
fn test_helper_wins_over_context_field() {
    let engine = engine_with_test_helpers();
    assert_eq!(
        engine.render_source("{{foo}}", &json!({"foo": "field"})).unwrap(),
        "bar"
    );
}

#[test]
fn test_parameters_are_lookups_not_calls() {
    let engine = engine_with_test_helpers();
    assert_eq!(
        engine.render_source("{{echo foo}}", &json!({"foo": "field"})).unwrap(),
        "field"
    );
}

#[test]
fn test_helper_output_is_escaped_unless_safe() {
    let mut engine = Handlebars::new();
    engine.register_helper_fn("tag", |_h: &HelperParams<'_>| Ok("<b>".into()));
    engine.register_helper_fn("safe_tag", |_h: &HelperParams<'_>| {
        Ok(HelperOutput::safe("<b>"))
    });
    assert_eq!(engine.render_source("{{tag}}", &json!(null)).unwrap(), "&lt;b&gt;");
    assert_eq!(engine.render_source("{{{tag}}}", &json!(null)).unwrap(), "<b>");
    assert_eq!(engine.render_source("{{safe_tag}}", &json!(null)).unwrap(), "<b>");
}

#[test]
fn test_hash_arguments_and_data_access() {
    let mut engine = Handlebars::new();
    engine.register_helper_fn("link", |h: &HelperParams<'_>| {
        Ok(HelperOutput::safe(format!(
            r#"<a href="{}/{}">{}</a>"#,
            h.param_str(0),
            h.hash_str("url"),
            h.hash_str("text")
        )))
    });
    engine.register_helper_fn("position", |h: &HelperParams<'_>| {
        Ok(h.data_str("index").into())
    });
    let out = engine
        .render_source(
            r#"{{link "http://x" url=path text="go"}}"#,
            &json!({"path": "docs"}),
        )
        .unwrap();
    assert_eq!(out, r#"<a href="http://x/docs">go</a>"#);

    let out = engine
        .render_source("{{#each xs}}{{position}}{{/each}}", &json!({"xs": [1, 2, 3]}))
        .unwrap();
    assert_eq!(out, "012");
}

#[test]
fn test_custom_helper_with_block_params() {
    let mut engine = Handlebars::new();
    engine.register_helper_fn("pair", |h: &HelperParams<'_>| {
        let out = h.block_with_params(
            h.context().clone(),
            None,
            vec![h.param(0).cloned().unwrap_or_default(), h.param(1).cloned().unwrap_or_default()],
        )?;
        Ok(HelperOutput::safe(out))
    });
    let out = engine
        .render_source(
            "{{#pair 1 2 as |left right|}}{{left}}+{{right}}{{/pair}}",
            &json!(null),
        )
        .unwrap();
    assert_eq!(out, "1+2");
}

#[test]
fn test_helper_error_is_wrapped_with_name_and_position() {
    let mut engine = Handlebars::new();
    engine.register_helper_fn("fail", |_h: &HelperParams<'_>| {
        Err(HelperError::message("no way"))
    });
    let err = engine
        .render_source("line one\n  {{fail}}", &json!(null))
        .unwrap_err();
    match err {
        HandlebarsError::Render(RenderError::Helper {
            helper,
            position,
            message,
        }) => {
            assert_eq!(helper, "fail");
            assert_eq!(message, "no way");
            assert_eq!((position.line, position.column), (2, 3));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_invalid_parameter_error() {
    let mut engine = Handlebars::new();
    engine.register_helper_fn("times", |h: &HelperParams<'_>| {
        let count = h.expect_param_i64(0)?;
        Ok(HelperOutput::new(count * 2))
    });
    assert_eq!(engine.render_source("{{times 4}}", &json!(null)).unwrap(), "8");
    let err = engine
        .render_source(r#"{{times "x"}}"#, &json!(null))
        .unwrap_err();
    assert!(matches!(
        err,
        HandlebarsError::Render(RenderError::InvalidHelperParameter { index: 0, ref actual, .. })
            if actual == "string"
    ));
}

#[test]
fn test_helper_panic_is_contained() {
    let mut engine = Handlebars::new();
    engine.register_helper_fn("explode", |_h: &HelperParams<'_>| -> Result<HelperOutput, HelperError> {
        panic!("kaboom")
    });
    let err = engine
        .render_source("{{#if true}}{{explode}}{{/if}}", &json!(null))
        .unwrap_err();
    assert!(matches!(
        err,
        HandlebarsError::Render(RenderError::HelperPanicked { ref helper, ref message, .. })
            if helper == "explode" && message == "kaboom"
    ));
    // the engine keeps working after a contained panic
    assert_eq!(engine.render_source("{{x}}", &json!({"x": 1})).unwrap(), "1");
}

#[test]
fn test_missing_helper() {
    let engine = Handlebars::new();
    let err = engine
        .render_source("{{unknown name}}", &json!({"name": "x"}))
        .unwrap_err();
    assert!(matches!(
        err,
        HandlebarsError::Render(RenderError::MissingHelper { ref name, .. }) if name == "unknown"
    ));
}

#[test]
fn test_unregistered_builtin() {
    let mut engine = Handlebars::new();
    assert!(engine.unregister_helper("if"));
    assert!(!engine.has_helper("if"));
    assert!(engine
        .render_source("{{#if true}}x{{/if}}", &json!(null))
        .is_err());
}
