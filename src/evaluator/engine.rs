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

//! Tree-walking template evaluator

use super::error::{RenderError, RenderResult};
use super::escape::escape_html_into;
use super::scope::{BlockParams, Scope};
use crate::ast::{
    BlockStatement, CallExpression, Expression, LiteralValue, MustacheStatement, PartialName,
    PartialStatement, PathExpression, Program, Statement,
};
use crate::config::RenderConfig;
use crate::model::{Number, Value, ValueMap, is_truthy};
use crate::registry::helper::{Helper, HelperOutput, HelperParams};
use crate::registry::helpers::each;
use crate::registry::{HelperRegistry, PartialRegistry};
use crate::parser::span::SourcePosition;
use log::{debug, trace, warn};
use std::any::Any;
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Evaluator for compiled programs.
///
/// Holds only shared references to the registries; each [`render`](Self::render)
/// call builds its own scope chain, so one evaluator can serve concurrent
/// renders as long as the registries are not mutated meanwhile.
#[derive(Clone, Copy)]
pub struct Evaluator<'reg> {
    helpers: &'reg HelperRegistry,
    partials: &'reg PartialRegistry,
    config: RenderConfig,
}

impl<'reg> Evaluator<'reg> {
    /// Create an evaluator with the default render configuration
    pub fn new(helpers: &'reg HelperRegistry, partials: &'reg PartialRegistry) -> Self {
        Self::with_config(helpers, partials, RenderConfig::default())
    }

    /// Create an evaluator with a custom render configuration
    pub fn with_config(
        helpers: &'reg HelperRegistry,
        partials: &'reg PartialRegistry,
        config: RenderConfig,
    ) -> Self {
        Self {
            helpers,
            partials,
            config,
        }
    }

    /// Render a program against a root context
    pub fn render(&self, program: &Program, context: &Value) -> RenderResult<String> {
        let scope = Scope::root(context.clone());
        let mut out = String::with_capacity(256);
        self.render_program(program, &scope, &mut out)?;
        Ok(out)
    }

    pub(crate) fn render_program(
        &self,
        program: &Program,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> RenderResult<()> {
        for statement in program.iter() {
            self.render_statement(statement, scope, out)?;
        }
        Ok(())
    }

    fn render_statement(
        &self,
        statement: &Statement,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> RenderResult<()> {
        match statement {
            Statement::Content(text) => {
                out.push_str(text);
                Ok(())
            }
            Statement::Mustache(mustache) => self.render_mustache(mustache, scope, out),
            Statement::Block(block) => self.render_block(block, scope, out),
            Statement::Partial(partial) => self.render_partial(partial, scope, out),
            Statement::Comment(_) => Ok(()),
        }
    }

    fn render_mustache(
        &self,
        mustache: &MustacheStatement,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> RenderResult<()> {
        let output = self.evaluate_call(&mustache.call, scope)?;
        let content = output.content();
        if mustache.escaped && self.config.escape_html && !output.is_safe() {
            escape_html_into(&content, out);
        } else {
            out.push_str(&content);
        }
        Ok(())
    }

    fn render_block(
        &self,
        block: &BlockStatement,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> RenderResult<()> {
        self.check_render_depth(scope, block.position)?;
        let call = &block.call;
        if let Some((name, helper)) = self.lookup_helper(call) {
            let output = self.call_helper(name, helper, call, Some(block), block.position, scope)?;
            out.push_str(&output.content());
            return Ok(());
        }
        if call.has_arguments() {
            return Err(RenderError::MissingHelper {
                name: call.callee.original(),
                position: block.position,
            });
        }
        let value = self.evaluate(&call.callee, scope)?;
        self.render_section(block, value, scope, out)
    }

    /// `{{#path}}` with no helper of that name
    fn render_section(
        &self,
        block: &BlockStatement,
        value: Value,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> RenderResult<()> {
        if !is_truthy(&value) {
            if let Some(inverse) = &block.inverse {
                let nested = scope.child(None, None, BlockParams::new());
                self.render_program(inverse, &nested, out)?;
            }
            return Ok(());
        }
        match value {
            Value::Array(_) => {
                let name = block.name();
                let params = HelperParams::new(
                    &name,
                    vec![value.clone()],
                    Vec::new(),
                    Some(block),
                    scope,
                    self,
                    block.position,
                );
                let output = each::iterate(&params, &value)
                    .map_err(|err| err.into_render_error(&name, block.position))?;
                out.push_str(&output.content());
                Ok(())
            }
            Value::Boolean(true) => {
                let nested = scope.child(None, None, BlockParams::new());
                self.render_program(&block.program, &nested, out)
            }
            context => {
                let child = scope.child(Some(context), None, BlockParams::new());
                self.render_program(&block.program, &child, out)
            }
        }
    }

    fn render_partial(
        &self,
        partial: &PartialStatement,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> RenderResult<()> {
        let position = partial.position;
        let name: Cow<'_, str> = match &partial.name {
            PartialName::Static(name) => Cow::Borrowed(name.as_str()),
            PartialName::Dynamic(call) => match self.evaluate_call(call, scope)?.into_value() {
                Value::String(name) => Cow::Owned(name),
                other => {
                    return Err(RenderError::InvalidPartialName {
                        actual: other.type_name().to_string(),
                        position,
                    });
                }
            },
        };

        let Some(template) = self.partials.get(&name) else {
            return Err(RenderError::UnknownPartial {
                name: name.into_owned(),
                position,
            });
        };

        let depth = scope.partial_depth() + 1;
        if depth > self.config.max_partial_depth {
            return Err(RenderError::PartialDepthExceeded {
                name: name.into_owned(),
                limit: self.config.max_partial_depth,
                position,
            });
        }
        self.check_render_depth(scope, position)?;

        let mut context = match &partial.context {
            Some(expression) => self.evaluate(expression, scope)?,
            None => scope.context().clone(),
        };
        if !partial.hash.is_empty() {
            let mut map: ValueMap = context.as_map().cloned().unwrap_or_default();
            for pair in partial.hash.iter() {
                map.insert(pair.key.clone(), self.evaluate(&pair.value, scope)?);
            }
            context = Value::Map(Arc::new(map));
        }

        debug!("Rendering partial '{name}' at depth {depth}");
        let child = scope.partial_child(context, depth);
        self.render_program(template.program(), &child, out)
    }

    fn check_render_depth(&self, scope: &Scope<'_>, position: SourcePosition) -> RenderResult<()> {
        if scope.render_depth() >= self.config.max_render_depth {
            return Err(RenderError::RenderDepthExceeded {
                limit: self.config.max_render_depth,
                position,
            });
        }
        Ok(())
    }

    fn lookup_helper<'c>(&self, call: &'c CallExpression) -> Option<(&'c str, &'reg Arc<dyn Helper>)> {
        let name = call.helper_name()?;
        self.helpers.get(name).map(|helper| (name, helper))
    }

    /// Callee position: a helper call when the name is registered, otherwise
    /// a plain value (arguments without a helper are an error)
    fn evaluate_call(&self, call: &CallExpression, scope: &Scope<'_>) -> RenderResult<HelperOutput> {
        if let Some((name, helper)) = self.lookup_helper(call) {
            return self.call_helper(name, helper, call, None, call.position, scope);
        }
        if call.has_arguments() {
            return Err(RenderError::MissingHelper {
                name: call.callee.original(),
                position: call.position,
            });
        }
        self.evaluate(&call.callee, scope).map(HelperOutput::new)
    }

    /// Parameter position: paths are always lookups, never helper calls
    pub(crate) fn evaluate(&self, expression: &Expression, scope: &Scope<'_>) -> RenderResult<Value> {
        Ok(match expression {
            Expression::Path(path) => self.resolve_path(path, scope),
            Expression::Data(path) => resolve_data(path, scope),
            Expression::Literal(literal) => literal_value(literal),
            Expression::SubExpression(call) => self.evaluate_call(call, scope)?.into_value(),
        })
    }

    fn resolve_path(&self, path: &PathExpression, scope: &Scope<'_>) -> Value {
        if path.parent_levels == 0 && !path.is_this {
            if let Some(value) = path.head().and_then(|head| scope.block_param(head)) {
                return follow(value, &path.segments[1..]);
            }
        }
        follow(scope.ancestor_context(path.parent_levels), &path.segments)
    }

    fn call_helper(
        &self,
        name: &str,
        helper: &Arc<dyn Helper>,
        call: &CallExpression,
        block: Option<&BlockStatement>,
        position: SourcePosition,
        scope: &Scope<'_>,
    ) -> RenderResult<HelperOutput> {
        let params = call
            .params
            .iter()
            .map(|param| self.evaluate(param, scope))
            .collect::<RenderResult<Vec<_>>>()?;
        let hash = call
            .hash
            .iter()
            .map(|pair| Ok((pair.key.as_str(), self.evaluate(&pair.value, scope)?)))
            .collect::<RenderResult<Vec<_>>>()?;

        trace!(
            "Calling helper '{name}' with {} params and {} hash arguments",
            params.len(),
            hash.len()
        );
        let h = HelperParams::new(name, params, hash, block, scope, self, position);
        match panic::catch_unwind(AssertUnwindSafe(|| helper.call(&h))) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(err.into_render_error(name, position)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Helper '{name}' panicked at {position}: {message}");
                Err(RenderError::HelperPanicked {
                    helper: name.to_string(),
                    position,
                    message,
                })
            }
        }
    }
}

fn resolve_data(path: &PathExpression, scope: &Scope<'_>) -> Value {
    let Some(head) = path.head() else {
        return Value::Null;
    };
    match scope.data(head, path.parent_levels) {
        Some(value) => follow(value, &path.segments[1..]),
        None => Value::Null,
    }
}

/// Follow segments from `base`; missing fields resolve to `Null`
fn follow(base: &Value, segments: &[String]) -> Value {
    let Some((first, rest)) = segments.split_first() else {
        return base.clone();
    };
    rest.iter()
        .fold(base.get_field(first), |value, segment| value.get_field(segment))
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Integer(i) => Value::Number(Number::Integer(*i)),
        LiteralValue::Float(f) => Value::Number(Number::Float(*f)),
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::Null | LiteralValue::Undefined => Value::Null,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> RenderResult<String> {
        let helpers = HelperRegistry::new();
        let partials = PartialRegistry::new();
        let program = parse(source).unwrap();
        Evaluator::new(&helpers, &partials).render(&program, &Value::from(data))
    }

    #[test]
    fn test_literal_text_is_identity() {
        let text = "no mustaches here <b>&</b>\n";
        assert_eq!(render(text, json!(null)).unwrap(), text);
    }

    #[test]
    fn test_path_lookup_and_escaping() {
        assert_eq!(
            render("{{a.b}} {{{a.b}}} {{&a.b}}", json!({"a": {"b": "<x>"}})).unwrap(),
            "&lt;x&gt; <x> <x>"
        );
        assert_eq!(render("[{{missing.deep}}]", json!({})).unwrap(), "[]");
    }

    #[test]
    fn test_parent_and_root_access() {
        let data = json!({"name": "top", "child": {"name": "inner"}});
        assert_eq!(
            render("{{#with child}}{{name}}/{{../name}}/{{@root.name}}{{/with}}", data).unwrap(),
            "inner/top/top"
        );
    }

    #[test]
    fn test_sections() {
        let data = json!({"list": [1, 2], "flag": true, "obj": {"v": "o"}, "none": []});
        assert_eq!(
            render("{{#list}}<{{.}}>{{/list}}", data.clone()).unwrap(),
            "<1><2>"
        );
        assert_eq!(
            render("{{#flag}}{{obj.v}}{{/flag}}", data.clone()).unwrap(),
            "o"
        );
        assert_eq!(render("{{#obj}}{{v}}{{/obj}}", data.clone()).unwrap(), "o");
        assert_eq!(
            render("{{#none}}x{{else}}empty{{/none}}", data.clone()).unwrap(),
            "empty"
        );
        assert_eq!(render("{{^none}}nothing{{/none}}", data).unwrap(), "nothing");
    }

    #[test]
    fn test_missing_helper_with_arguments() {
        let err = render("{{nope 1}}", json!({})).unwrap_err();
        assert!(matches!(err, RenderError::MissingHelper { ref name, .. } if name == "nope"));

        let err = render("{{#nope a}}x{{/nope}}", json!({})).unwrap_err();
        assert!(matches!(err, RenderError::MissingHelper { .. }));
    }

    #[test]
    fn test_escape_can_be_disabled() {
        let helpers = HelperRegistry::new();
        let partials = PartialRegistry::new();
        let program = parse("{{x}}").unwrap();
        let config = RenderConfig {
            escape_html: false,
            ..RenderConfig::default()
        };
        let out = Evaluator::with_config(&helpers, &partials, config)
            .render(&program, &Value::from(json!({"x": "a&b"})))
            .unwrap();
        assert_eq!(out, "a&b");
    }

    #[test]
    fn test_render_depth_limit_counts_block_bodies() {
        let helpers = HelperRegistry::new();
        let partials = PartialRegistry::new();
        let program = parse("{{#if a}}{{#if a}}{{#if a}}deep{{/if}}{{/if}}{{/if}}").unwrap();
        let context = Value::from(json!({"a": true}));

        let config = RenderConfig::default().with_max_render_depth(3);
        let out = Evaluator::with_config(&helpers, &partials, config).render(&program, &context);
        assert_eq!(out.unwrap(), "deep");

        let config = RenderConfig::default().with_max_render_depth(2);
        let err = Evaluator::with_config(&helpers, &partials, config)
            .render(&program, &context)
            .unwrap_err();
        assert!(matches!(err, RenderError::RenderDepthExceeded { limit: 2, .. }));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&5u8), "unknown panic payload");
    }
}
