//! Template evaluator
//!
//! Walks a parsed [`Program`](crate::ast::Program) against a context value,
//! resolving paths through a scope chain, invoking helpers and expanding
//! partials. Output is accumulated into a single string buffer.

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod escape;
pub mod scope;

pub use engine::Evaluator;
pub use error::{RenderError, RenderResult};
pub use escape::{escape_html, escape_html_into};
pub use scope::{BlockParams, DataFrame, Scope};
