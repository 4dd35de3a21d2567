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

//! Statement and program nodes

use super::expression::{CallExpression, Hash};
use crate::parser::span::SourcePosition;

/// An ordered sequence of statements; the root of every template and the
/// body of every block section.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Program {
    /// Statements in source order
    pub statements: Vec<Statement>,
}

impl Program {
    /// Empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the program has no statements
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of top-level statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Iterate over the statements
    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }
}

/// Template statement
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Statement {
    /// Literal text, whitespace control already applied
    Content(String),
    /// `{{expr}}`, `{{{expr}}}` or `{{&expr}}`
    Mustache(MustacheStatement),
    /// `{{#name}}...{{else}}...{{/name}}`
    Block(Box<BlockStatement>),
    /// `{{> name}}`
    Partial(PartialStatement),
    /// `{{! ... }}`; produces no output
    Comment(String),
}

/// Single value output
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MustacheStatement {
    /// Value or helper call to output
    pub call: CallExpression,
    /// Whether HTML escaping applies
    pub escaped: bool,
    /// Position of the opening delimiter
    pub position: SourcePosition,
}

/// Block section with an optional inverse
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockStatement {
    /// Helper name (or section path) and its arguments
    pub call: CallExpression,
    /// Names declared with `as |a b|`
    pub block_params: Vec<String>,
    /// Primary body
    pub program: Program,
    /// Body after `{{else}}`, or the whole body of `{{^name}}`
    pub inverse: Option<Program>,
    /// Position of the opening delimiter
    pub position: SourcePosition,
}

impl BlockStatement {
    /// Name used in the opening tag
    pub fn name(&self) -> String {
        self.call.callee.original()
    }
}

/// Partial name, fixed at parse time or computed by a sub-expression
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartialName {
    /// `{{> name}}` or `{{> "name"}}`
    Static(String),
    /// `{{> (helper args)}}`
    Dynamic(Box<CallExpression>),
}

/// Partial inclusion
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartialStatement {
    /// Which partial to render
    pub name: PartialName,
    /// Explicit context for the partial
    pub context: Option<super::Expression>,
    /// Hash arguments overlaid on the partial context
    pub hash: Hash,
    /// Position of the opening delimiter
    pub position: SourcePosition,
}
