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

//! Parser error types

use super::span::SourcePosition;
use std::borrow::Cow;
use thiserror::Error;

/// Result type for tokenizer and parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors produced while compiling template source.
///
/// Every variant carries the position where the problem was detected; no
/// template is produced once any of these is raised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A character that cannot start any token inside a mustache
    #[error("Unexpected character '{character}' at {position}")]
    UnexpectedCharacter {
        /// The offending character
        character: char,
        /// Where it was found
        position: SourcePosition,
    },

    /// A string literal without its closing quote
    #[error("Unterminated string literal starting at {position}")]
    UnterminatedString {
        /// Position of the opening quote
        position: SourcePosition,
    },

    /// Input ended inside a `{{ ... }}` expression
    #[error("Unterminated mustache starting at {position}")]
    UnterminatedMustache {
        /// Position of the opening delimiter
        position: SourcePosition,
    },

    /// Input ended inside a `{{! ... }}` comment
    #[error("Unterminated comment starting at {position}")]
    UnterminatedComment {
        /// Position of the opening delimiter
        position: SourcePosition,
    },

    /// A bracketed path segment without its closing `]`
    #[error("Unterminated bracketed segment starting at {position}")]
    UnterminatedSegment {
        /// Position of the opening bracket
        position: SourcePosition,
    },

    /// A token that does not fit the grammar at this point
    #[error("Expected {expected}, found {found} at {position}")]
    UnexpectedToken {
        /// Description of what was found
        found: String,
        /// Description of what the grammar allows here
        expected: Cow<'static, str>,
        /// Where the token starts
        position: SourcePosition,
    },

    /// End of input where more tokens were required
    #[error("Unexpected end of input, expected {expected} at {position}")]
    UnexpectedEof {
        /// Description of what the grammar required
        expected: Cow<'static, str>,
        /// End position of the input
        position: SourcePosition,
    },

    /// `{{/name}}` does not match the innermost `{{#name}}`
    #[error("{open} doesn't match {close}: block opened at {open_position}, closed at {position}")]
    MismatchedBlock {
        /// Name used in the opening tag
        open: String,
        /// Name used in the closing tag
        close: String,
        /// Position of the opening tag
        open_position: SourcePosition,
        /// Position of the closing tag
        position: SourcePosition,
    },

    /// End of input with a block still open
    #[error("Unclosed block {name} opened at {position}")]
    UnclosedBlock {
        /// Name of the open block
        name: String,
        /// Position of the opening tag
        position: SourcePosition,
    },

    /// `{{/name}}` with no open block
    #[error("Unexpected closing block {name} at {position}")]
    UnexpectedCloseBlock {
        /// Name used in the closing tag
        name: String,
        /// Position of the closing tag
        position: SourcePosition,
    },

    /// A second `{{else}}` in the same block section
    #[error("Duplicate {{{{else}}}} in block {name} at {position}")]
    DuplicateElse {
        /// Name of the block
        name: String,
        /// Position of the second else
        position: SourcePosition,
    },

    /// `{{else}}` at the top level
    #[error("{{{{else}}}} outside of a block at {position}")]
    ElseOutsideBlock {
        /// Position of the else marker
        position: SourcePosition,
    },

    /// The same hash key twice in one call
    #[error("Duplicate hash key '{key}' at {position}")]
    DuplicateHashKey {
        /// The repeated key
        key: String,
        /// Position of the second occurrence
        position: SourcePosition,
    },

    /// Blocks or sub-expressions nested beyond the configured limit
    #[error("Nesting depth exceeds the limit of {limit} at {position}")]
    NestingTooDeep {
        /// Configured maximum depth
        limit: usize,
        /// Position of the construct that crossed the limit
        position: SourcePosition,
    },

    /// A numeric literal that does not fit the number model
    #[error("Invalid number literal '{literal}' at {position}")]
    InvalidNumber {
        /// The literal text
        literal: String,
        /// Where it starts
        position: SourcePosition,
    },

    /// A structurally invalid path such as `foo.this` or `foo/../bar`
    #[error("Invalid path '{path}': {reason} at {position}")]
    InvalidPath {
        /// Path text as written
        path: String,
        /// What is wrong with it
        reason: Cow<'static, str>,
        /// Where the path starts
        position: SourcePosition,
    },
}

impl ParseError {
    /// Position at which the error was detected
    pub fn position(&self) -> SourcePosition {
        match self {
            ParseError::UnexpectedCharacter { position, .. }
            | ParseError::UnterminatedString { position }
            | ParseError::UnterminatedMustache { position }
            | ParseError::UnterminatedComment { position }
            | ParseError::UnterminatedSegment { position }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEof { position, .. }
            | ParseError::MismatchedBlock { position, .. }
            | ParseError::UnclosedBlock { position, .. }
            | ParseError::UnexpectedCloseBlock { position, .. }
            | ParseError::DuplicateElse { position, .. }
            | ParseError::ElseOutsideBlock { position }
            | ParseError::DuplicateHashKey { position, .. }
            | ParseError::NestingTooDeep { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::InvalidPath { position, .. } => *position,
        }
    }

    /// Line of the error (1-based)
    pub fn line(&self) -> usize {
        self.position().line
    }

    /// Column of the error (1-based)
    pub fn column(&self) -> usize {
        self.position().column
    }
}
