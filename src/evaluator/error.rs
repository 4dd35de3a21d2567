// Error types for template rendering

use crate::parser::span::SourcePosition;
use std::borrow::Cow;
use thiserror::Error;

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that abort a render call. No partial output is returned with them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// `{{> name}}` with no partial registered under that name
    #[error("The partial {name} could not be found at {position}")]
    UnknownPartial {
        /// Partial name
        name: String,
        /// Position of the partial statement
        position: SourcePosition,
    },

    /// Partial expansion nested deeper than the configured limit
    #[error("Partial {name} exceeds the maximum expansion depth of {limit} at {position}")]
    PartialDepthExceeded {
        /// Partial that crossed the limit
        name: String,
        /// Configured maximum depth
        limit: usize,
        /// Position of the partial statement
        position: SourcePosition,
    },

    /// Blocks and partials nested deeper than the configured limit
    #[error("Template nesting exceeds the maximum render depth of {limit} at {position}")]
    RenderDepthExceeded {
        /// Configured maximum depth
        limit: usize,
        /// Position of the block or partial that crossed the limit
        position: SourcePosition,
    },

    /// A dynamic partial name that did not evaluate to a string
    #[error("Partial name must be a string, got {actual} at {position}")]
    InvalidPartialName {
        /// Type of the evaluated name
        actual: String,
        /// Position of the partial statement
        position: SourcePosition,
    },

    /// Arguments were supplied to a name that is not a registered helper
    #[error("Missing helper: \"{name}\" at {position}")]
    MissingHelper {
        /// Name used in the template
        name: String,
        /// Position of the call
        position: SourcePosition,
    },

    /// A helper reported a failure
    #[error("Error in helper {helper} at {position}: {message}")]
    Helper {
        /// Helper name
        helper: String,
        /// Position of the call or enclosing block
        position: SourcePosition,
        /// Failure reported by the helper
        message: String,
    },

    /// A helper rejected one of its positional parameters
    #[error("Helper {helper} expects parameter {index} to be {expected}, got {actual} at {position}")]
    InvalidHelperParameter {
        /// Helper name
        helper: String,
        /// Parameter index (0-based)
        index: usize,
        /// What the helper accepts
        expected: Cow<'static, str>,
        /// Type actually supplied
        actual: String,
        /// Position of the call or enclosing block
        position: SourcePosition,
    },

    /// A helper panicked; the panic was contained at the call boundary
    #[error("Helper {helper} panicked at {position}: {message}")]
    HelperPanicked {
        /// Helper name
        helper: String,
        /// Position of the call or enclosing block
        position: SourcePosition,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl RenderError {
    /// Template position the error refers to
    pub fn position(&self) -> SourcePosition {
        match self {
            RenderError::UnknownPartial { position, .. }
            | RenderError::PartialDepthExceeded { position, .. }
            | RenderError::RenderDepthExceeded { position, .. }
            | RenderError::InvalidPartialName { position, .. }
            | RenderError::MissingHelper { position, .. }
            | RenderError::Helper { position, .. }
            | RenderError::InvalidHelperParameter { position, .. }
            | RenderError::HelperPanicked { position, .. } => *position,
        }
    }

    /// Name of the helper involved, if any
    pub fn helper_name(&self) -> Option<&str> {
        match self {
            RenderError::MissingHelper { name, .. } => Some(name),
            RenderError::Helper { helper, .. }
            | RenderError::InvalidHelperParameter { helper, .. }
            | RenderError::HelperPanicked { helper, .. } => Some(helper),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_error_names_helper_and_position() {
        let err = RenderError::Helper {
            helper: "link".to_string(),
            position: SourcePosition::new(3, 5, 20),
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Error in helper link at line 3, column 5: boom"
        );
        assert_eq!(err.helper_name(), Some("link"));
        assert_eq!(err.position().line, 3);
    }
}
