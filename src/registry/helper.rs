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

//! Helper trait and the call context passed to helpers

use crate::ast::BlockStatement;
use crate::evaluator::engine::Evaluator;
use crate::evaluator::error::{RenderError, RenderResult};
use crate::evaluator::scope::{BlockParams, DataFrame, Scope};
use crate::model::type_coercion::{self, to_display_string};
use crate::model::Value;
use crate::parser::span::SourcePosition;
use std::borrow::Cow;
use thiserror::Error;

/// Result type for helper calls
pub type HelperResult = Result<HelperOutput, HelperError>;

/// Failures reported by helpers.
///
/// They are converted at the call boundary into a [`RenderError`] carrying the
/// helper name and the template position of the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HelperError {
    /// Free-form failure
    #[error("{0}")]
    Message(String),

    /// A positional parameter with the wrong type
    #[error("parameter {index} must be {expected}, got {actual}")]
    InvalidParameter {
        /// Parameter index (0-based)
        index: usize,
        /// What the helper accepts
        expected: Cow<'static, str>,
        /// Type actually supplied
        actual: String,
    },

    /// A required positional parameter was not supplied
    #[error("missing parameter {index}")]
    MissingParameter {
        /// Parameter index (0-based)
        index: usize,
    },

    /// Rendering a block body from inside the helper failed
    #[error(transparent)]
    Render(Box<RenderError>),
}

impl HelperError {
    /// Free-form failure
    pub fn message(message: impl Into<String>) -> Self {
        HelperError::Message(message.into())
    }

    /// Attach the helper name and call position
    pub(crate) fn into_render_error(self, helper: &str, position: SourcePosition) -> RenderError {
        match self {
            HelperError::Render(err) => *err,
            HelperError::InvalidParameter {
                index,
                expected,
                actual,
            } => RenderError::InvalidHelperParameter {
                helper: helper.to_string(),
                index,
                expected,
                actual,
                position,
            },
            other => RenderError::Helper {
                helper: helper.to_string(),
                position,
                message: other.to_string(),
            },
        }
    }
}

impl From<RenderError> for HelperError {
    fn from(err: RenderError) -> Self {
        HelperError::Render(Box::new(err))
    }
}

impl From<String> for HelperError {
    fn from(message: String) -> Self {
        HelperError::Message(message)
    }
}

impl From<&str> for HelperError {
    fn from(message: &str) -> Self {
        HelperError::Message(message.to_string())
    }
}

/// Value returned by a helper.
///
/// Mustaches write its text form, escaped unless it is marked safe. Used as a
/// sub-expression, the value itself becomes the parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HelperOutput {
    value: Value,
    safe: bool,
}

impl HelperOutput {
    /// Output subject to HTML escaping
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            safe: false,
        }
    }

    /// Pre-escaped output, written verbatim even by `{{expr}}`
    pub fn safe(content: impl Into<String>) -> Self {
        Self {
            value: Value::String(content.into()),
            safe: true,
        }
    }

    /// The returned value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Take the returned value
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Whether escaping is bypassed
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    /// Text form written into the output
    pub fn content(&self) -> Cow<'_, str> {
        to_display_string(&self.value)
    }
}

impl From<String> for HelperOutput {
    fn from(content: String) -> Self {
        HelperOutput::new(content)
    }
}

impl From<&str> for HelperOutput {
    fn from(content: &str) -> Self {
        HelperOutput::new(content)
    }
}

impl From<Value> for HelperOutput {
    fn from(value: Value) -> Self {
        HelperOutput::new(value)
    }
}

/// A named routine callable from templates.
///
/// Implemented for every `Fn(&HelperParams<'_>) -> HelperResult` closure, so
/// most helpers never name this trait. Helpers must be reentrant: the same
/// instance may run on several threads and recursively within one render.
pub trait Helper: Send + Sync {
    /// Run the helper
    fn call(&self, h: &HelperParams<'_>) -> HelperResult;
}

impl<F> Helper for F
where
    F: Fn(&HelperParams<'_>) -> HelperResult + Send + Sync,
{
    fn call(&self, h: &HelperParams<'_>) -> HelperResult {
        self(h)
    }
}

/// Call context handed to a helper.
///
/// Parameters and hash values are already evaluated. Block bodies are
/// rendered on demand, any number of times, against the current or an
/// explicitly supplied context; the surrounding scope is never modified.
pub struct HelperParams<'a> {
    name: &'a str,
    params: Vec<Value>,
    hash: Vec<(&'a str, Value)>,
    block: Option<&'a BlockStatement>,
    scope: &'a Scope<'a>,
    evaluator: &'a Evaluator<'a>,
    position: SourcePosition,
}

impl<'a> HelperParams<'a> {
    pub(crate) fn new(
        name: &'a str,
        params: Vec<Value>,
        hash: Vec<(&'a str, Value)>,
        block: Option<&'a BlockStatement>,
        scope: &'a Scope<'a>,
        evaluator: &'a Evaluator<'a>,
        position: SourcePosition,
    ) -> Self {
        Self {
            name,
            params,
            hash,
            block,
            scope,
            evaluator,
            position,
        }
    }

    /// Name the helper was invoked under
    pub fn name(&self) -> &str {
        self.name
    }

    /// Position of the mustache or block that called the helper
    pub fn position(&self) -> SourcePosition {
        self.position
    }

    /// Positional parameter
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }

    /// All positional parameters, in order
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Positional parameter as text; empty when missing
    pub fn param_str(&self, index: usize) -> String {
        self.param(index)
            .map(|value| to_display_string(value).into_owned())
            .unwrap_or_default()
    }

    /// Boolean parameter; `false` when missing or not a boolean
    pub fn param_bool(&self, index: usize) -> bool {
        self.param(index)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Integer parameter; `None` when missing or not an integral number
    pub fn param_i64(&self, index: usize) -> Option<i64> {
        self.param(index).and_then(type_coercion::as_i64)
    }

    /// Integer parameter with a default for missing or mismatched values
    pub fn param_i64_or(&self, index: usize, default: i64) -> i64 {
        self.param_i64(index).unwrap_or(default)
    }

    /// Numeric parameter; `None` when missing or not a number
    pub fn param_f64(&self, index: usize) -> Option<f64> {
        self.param(index).and_then(type_coercion::as_f64)
    }

    /// Integer parameter that must be present and integral
    pub fn expect_param_i64(&self, index: usize) -> Result<i64, HelperError> {
        let value = self
            .param(index)
            .ok_or(HelperError::MissingParameter { index })?;
        type_coercion::as_i64(value).ok_or_else(|| HelperError::InvalidParameter {
            index,
            expected: Cow::Borrowed("an integer"),
            actual: value.type_name().to_string(),
        })
    }

    /// Hash argument
    pub fn hash(&self, key: &str) -> Option<&Value> {
        self.hash
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }

    /// Hash argument as text; empty when missing
    pub fn hash_str(&self, key: &str) -> String {
        self.hash(key)
            .map(|value| to_display_string(value).into_owned())
            .unwrap_or_default()
    }

    /// Boolean hash argument; `false` when missing or not a boolean
    pub fn hash_bool(&self, key: &str) -> bool {
        self.hash(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// All hash arguments, in source order
    pub fn hash_entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.hash.iter().map(|(key, value)| (*key, value))
    }

    /// Private variable visible at the call site (`@name`)
    pub fn data(&self, key: &str) -> Value {
        self.scope.data(key, 0).cloned().unwrap_or_default()
    }

    /// Private variable as text; empty when missing
    pub fn data_str(&self, key: &str) -> String {
        to_display_string(&self.data(key)).into_owned()
    }

    /// The current context (`this` at the call site)
    pub fn context(&self) -> &Value {
        self.scope.context()
    }

    /// Whether the helper was invoked as `{{#name}}`
    pub fn is_block(&self) -> bool {
        self.block.is_some()
    }

    /// Whether the block has an `{{else}}` section
    pub fn has_inverse(&self) -> bool {
        self.block.is_some_and(|block| block.inverse.is_some())
    }

    /// Names declared with `as |a b|`
    pub fn block_param_names(&self) -> &[String] {
        self.block
            .map(|block| block.block_params.as_slice())
            .unwrap_or_default()
    }

    /// Fail unless invoked as a block
    pub fn require_block(&self) -> Result<(), HelperError> {
        if self.is_block() {
            Ok(())
        } else {
            Err(HelperError::message(format!(
                "{} must be used as a block helper",
                self.name
            )))
        }
    }

    /// Scope for a body rendered against the current context
    fn nested(&self) -> Scope<'_> {
        self.scope.child(None, None, BlockParams::new())
    }

    fn render(&self, program: &crate::ast::Program, scope: &Scope<'_>) -> RenderResult<String> {
        let mut out = String::new();
        self.evaluator.render_program(program, scope, &mut out)?;
        Ok(out)
    }

    /// Render the block body against the current context
    pub fn block(&self) -> RenderResult<String> {
        match self.block {
            Some(block) => self.render(&block.program, &self.nested()),
            None => Ok(String::new()),
        }
    }

    /// Render the block body with `context` as `this`
    pub fn block_with(&self, context: Value) -> RenderResult<String> {
        self.block_with_params(context, None, Vec::new())
    }

    /// Render the block body with `context` as `this`, an optional private
    /// data frame, and values for the declared block parameters (extra values
    /// are ignored, missing ones leave the name unbound)
    pub fn block_with_params(
        &self,
        context: Value,
        data: Option<DataFrame>,
        values: Vec<Value>,
    ) -> RenderResult<String> {
        let Some(block) = self.block else {
            return Ok(String::new());
        };
        let params: BlockParams<'_> = block
            .block_params
            .iter()
            .map(String::as_str)
            .zip(values)
            .collect();
        let scope = self.scope.child(Some(context), data, params);
        self.render(&block.program, &scope)
    }

    /// Render the `{{else}}` body against the current context; empty if absent
    pub fn inverse(&self) -> RenderResult<String> {
        match self.block.and_then(|block| block.inverse.as_ref()) {
            Some(inverse) => self.render(inverse, &self.nested()),
            None => Ok(String::new()),
        }
    }
}

impl std::fmt::Debug for HelperParams<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperParams")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("hash", &self.hash)
            .field("is_block", &self.is_block())
            .field("position", &self.position)
            .finish()
    }
}
