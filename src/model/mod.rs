//! Value model for template data
//!
//! Contexts, helper parameters and helper results are all [`Value`]s.

#![warn(missing_docs)]

pub mod type_coercion;
pub mod value;

pub use type_coercion::{is_truthy, to_display_string};
pub use value::{Number, Object, Value, ValueMap};
