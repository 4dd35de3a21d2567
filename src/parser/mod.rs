//! Template parser
//!
//! Converts template source into an immutable [`Program`]. Tokenization is
//! lazy; the parser pulls tokens through a small lookahead buffer and keeps
//! open blocks on an explicit stack.

#![warn(missing_docs)]

pub mod error;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod span;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use parser::Parser;
pub use span::{LineIndex, SourcePosition, Spanned};
pub use tokenizer::{Token, Tokenizer, tokenize};

use crate::ast::Program;
use crate::config::ParserConfig;

/// Parse template source with default limits
pub fn parse(input: &str) -> ParseResult<Program> {
    Parser::new(input).parse()
}

/// Parse template source with custom limits
pub fn parse_with_config(input: &str, config: ParserConfig) -> ParseResult<Program> {
    Parser::with_config(input, config).parse()
}
