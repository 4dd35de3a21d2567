//! Abstract Syntax Tree (AST) definitions for templates
//!
//! The AST is pure data: produced once by the parser, never mutated afterwards,
//! and shared freely between concurrent renders.

#![warn(missing_docs)]

mod expression;
mod statement;
mod visitor;

pub use expression::*;
pub use statement::*;
pub use visitor::*;
