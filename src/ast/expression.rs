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

//! Expression AST node definitions

use crate::parser::span::SourcePosition;
use smallvec::SmallVec;
use std::fmt;

/// Literal values that can appear in expressions
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LiteralValue {
    /// Quoted string with escapes resolved
    String(String),
    /// Integer literal
    Integer(i64),
    /// Decimal literal
    Float(f64),
    /// `true` / `false`
    Boolean(bool),
    /// `null`
    Null,
    /// `undefined`
    Undefined,
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "\"{s}\""),
            LiteralValue::Integer(i) => write!(f, "{i}"),
            LiteralValue::Float(x) => write!(f, "{x}"),
            LiteralValue::Boolean(b) => write!(f, "{b}"),
            LiteralValue::Null => f.write_str("null"),
            LiteralValue::Undefined => f.write_str("undefined"),
        }
    }
}

/// A dotted path such as `../person.name` or `this`.
///
/// The same structure backs private-data references (`@index`,
/// `@../key`), which are wrapped in [`Expression::Data`] so they can never be
/// resolved against the context stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathExpression {
    /// Path text as written in the template
    pub original: String,
    /// Number of leading `../`
    pub parent_levels: usize,
    /// Path starts with `this` or `.`
    pub is_this: bool,
    /// Segments to follow after ascending, in order
    pub segments: SmallVec<[String; 2]>,
}

impl PathExpression {
    /// Path to the current context (`this`)
    pub fn this() -> Self {
        Self {
            original: "this".to_string(),
            parent_levels: 0,
            is_this: true,
            segments: SmallVec::new(),
        }
    }

    /// Simple path from a dotted string, no parent references
    pub fn simple(path: &str) -> Self {
        Self {
            original: path.to_string(),
            parent_levels: 0,
            is_this: false,
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    /// A single bare identifier that may name a helper
    pub fn helper_name(&self) -> Option<&str> {
        if self.parent_levels == 0 && !self.is_this && self.segments.len() == 1 {
            Some(&self.segments[0])
        } else {
            None
        }
    }

    /// The first segment, if any
    pub fn head(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// A `key=value` argument
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HashPair {
    /// Argument name
    pub key: String,
    /// Argument value, evaluated at call time
    pub value: Expression,
}

/// Hash arguments of a call, keys unique, in source order
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hash {
    /// The pairs
    pub pairs: Vec<HashPair>,
}

impl Hash {
    /// Empty hash
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there are no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Look up a pair by key
    pub fn get(&self, key: &str) -> Option<&Expression> {
        self.pairs.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    /// Iterate over the pairs
    pub fn iter(&self) -> std::slice::Iter<'_, HashPair> {
        self.pairs.iter()
    }
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expression {
    /// Context path lookup
    Path(PathExpression),
    /// Private data lookup (`@name`)
    Data(PathExpression),
    /// Literal value
    Literal(LiteralValue),
    /// Parenthesized helper call used as a value
    SubExpression(Box<CallExpression>),
}

impl Expression {
    /// Create a path expression
    pub fn path(path: PathExpression) -> Self {
        Expression::Path(path)
    }

    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Expression::Literal(value)
    }

    /// Helper name if this expression is a bare identifier
    pub fn helper_name(&self) -> Option<&str> {
        match self {
            Expression::Path(path) => path.helper_name(),
            _ => None,
        }
    }

    /// Text used to refer to this expression in messages and close tags
    pub fn original(&self) -> String {
        match self {
            Expression::Path(path) => path.original.clone(),
            Expression::Data(path) => format!("@{}", path.original),
            Expression::Literal(LiteralValue::String(s)) => s.clone(),
            Expression::Literal(literal) => literal.to_string(),
            Expression::SubExpression(call) => format!("({})", call.callee.original()),
        }
    }
}

/// A helper-call shaped expression: callee plus arguments.
///
/// Mustaches, block openers and sub-expressions all share this shape; a
/// callee without arguments may still resolve to a plain value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ast-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallExpression {
    /// Helper name or value path
    pub callee: Expression,
    /// Positional parameters
    pub params: Vec<Expression>,
    /// Named arguments
    pub hash: Hash,
    /// Where the call starts
    pub position: SourcePosition,
}

impl CallExpression {
    /// Whether any arguments were supplied
    pub fn has_arguments(&self) -> bool {
        !self.params.is_empty() || !self.hash.is_empty()
    }

    /// Helper name if the callee is a bare identifier
    pub fn helper_name(&self) -> Option<&str> {
        self.callee.helper_name()
    }
}
