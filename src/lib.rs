//! Handlebars templates in Rust
//!
//! A Mustache/Handlebars-compatible template engine: templates are compiled
//! once into an immutable AST and rendered any number of times, from any
//! number of threads, against a [`Value`] context with explicitly supplied
//! helper and partial registries.
//!
//! ```
//! use octofhir_handlebars::{HelperRegistry, PartialRegistry, Template, Value, render};
//! use serde_json::json;
//!
//! let template = Template::compile("{{#each people}}{{name}}{{#unless @last}}, {{/unless}}{{/each}}")
//!     .unwrap();
//! let context = Value::from(json!({"people": [{"name": "Ann"}, {"name": "Bo"}]}));
//! let out = render(&template, &context, &HelperRegistry::new(), &PartialRegistry::new()).unwrap();
//! assert_eq!(out, "Ann, Bo");
//! ```

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;

pub use config::{EngineConfig, ParserConfig, RenderConfig};
pub use engine::{Handlebars, Template, render, render_with_config};
pub use error::{HandlebarsError, Result};
pub use evaluator::{DataFrame, Evaluator, RenderError, RenderResult, escape_html};
pub use model::{Number, Object, Value, ValueMap, is_truthy};
pub use parser::{ParseError, ParseResult, SourcePosition, parse};
pub use registry::{
    Helper, HelperError, HelperOutput, HelperParams, HelperRegistry, HelperResult,
    PartialRegistry,
};
