//! Error types for the Handlebars engine
//!
//! Parsing and rendering each have their own error taxonomy; this module
//! unifies them for callers of the [`Handlebars`](crate::Handlebars) facade.

use crate::evaluator::RenderError;
use crate::parser::{ParseError, SourcePosition};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, HandlebarsError>;

/// Any error the engine can return
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlebarsError {
    /// The template could not be compiled
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The template failed while rendering
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The render context could not be converted into a template value
    #[error("Cannot convert render context: {message}")]
    Serialization {
        /// Serializer message
        message: String,
    },
}

impl HandlebarsError {
    /// Template position the error refers to, if any
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            HandlebarsError::Parse(err) => Some(err.position()),
            HandlebarsError::Render(err) => Some(err.position()),
            HandlebarsError::Serialization { .. } => None,
        }
    }

    /// Whether the error happened while compiling
    pub fn is_parse_error(&self) -> bool {
        matches!(self, HandlebarsError::Parse(_))
    }

    /// Whether the error happened while rendering
    pub fn is_render_error(&self) -> bool {
        matches!(self, HandlebarsError::Render(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_keep_position() {
        let position = SourcePosition::new(2, 7, 12);
        let err: HandlebarsError = RenderError::UnknownPartial {
            name: "card".to_string(),
            position,
        }
        .into();
        assert!(err.is_render_error());
        assert_eq!(err.position(), Some(position));
        assert_eq!(
            err.to_string(),
            "The partial card could not be found at line 2, column 7"
        );
    }
}
