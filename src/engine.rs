//! Handlebars engine - compiled templates and the engine facade

use crate::ast::{HelperNameCollector, PartialNameCollector, Program, Visitor};
use crate::config::{EngineConfig, ParserConfig, RenderConfig};
use crate::error::{HandlebarsError, Result};
use crate::evaluator::{Evaluator, RenderResult};
use crate::model::Value;
use crate::parser::{ParseResult, parse_with_config};
use crate::registry::{Helper, HelperParams, HelperRegistry, HelperResult, PartialRegistry};
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A compiled template.
///
/// Immutable once compiled; clones share the same program, and a template
/// can be rendered from any number of threads at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    program: Arc<Program>,
}

impl Template {
    /// Compile template source with default parser limits
    pub fn compile(source: &str) -> ParseResult<Self> {
        Self::compile_with_config(source, ParserConfig::default())
    }

    /// Compile template source with custom parser limits
    pub fn compile_with_config(source: &str, config: ParserConfig) -> ParseResult<Self> {
        let program = parse_with_config(source, config)?;
        debug!("Compiled template with {} top-level statements", program.len());
        Ok(Self {
            program: Arc::new(program),
        })
    }

    /// The parsed program
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Statically named partials this template includes, in first-use order
    pub fn partial_names(&self) -> Vec<String> {
        let mut collector = PartialNameCollector::default();
        collector.visit_program(&self.program);
        collector.names.into_iter().collect()
    }

    /// Names that must resolve to helpers (calls with arguments, blocks with
    /// arguments and sub-expressions), in first-use order
    pub fn helper_names(&self) -> Vec<String> {
        let mut collector = HelperNameCollector::default();
        collector.visit_program(&self.program);
        collector.names.into_iter().collect()
    }

    /// Render against `context` with the given registries
    pub fn render(
        &self,
        context: &Value,
        helpers: &HelperRegistry,
        partials: &PartialRegistry,
    ) -> RenderResult<String> {
        render(self, context, helpers, partials)
    }
}

impl From<Program> for Template {
    fn from(program: Program) -> Self {
        Self {
            program: Arc::new(program),
        }
    }
}

/// Render a template against a root context with explicit registries
pub fn render(
    template: &Template,
    context: &Value,
    helpers: &HelperRegistry,
    partials: &PartialRegistry,
) -> RenderResult<String> {
    render_with_config(template, context, helpers, partials, RenderConfig::default())
}

/// [`render`] with custom render settings
pub fn render_with_config(
    template: &Template,
    context: &Value,
    helpers: &HelperRegistry,
    partials: &PartialRegistry,
    config: RenderConfig,
) -> RenderResult<String> {
    Evaluator::with_config(helpers, partials, config).render(template.program(), context)
}

/// Engine owning a helper registry, a partial registry and a cache of
/// templates compiled from source strings.
///
/// Registration takes `&mut self`; rendering takes `&self`, so an engine
/// shared between threads (e.g. behind an `Arc`) is frozen for the duration.
///
/// # Examples
///
/// ```
/// use octofhir_handlebars::Handlebars;
/// use serde_json::json;
///
/// let mut engine = Handlebars::new();
/// engine.register_helper_fn("upper", |h| Ok(h.param_str(0).to_uppercase().into()));
/// let out = engine
///     .render_source("Hello {{upper name}}!", &json!({"name": "world"}))
///     .unwrap();
/// assert_eq!(out, "Hello WORLD!");
/// ```
#[derive(Debug)]
pub struct Handlebars {
    helpers: HelperRegistry,
    partials: PartialRegistry,
    config: EngineConfig,
    cache: Option<Mutex<LruCache<String, Template>>>,
}

impl Default for Handlebars {
    fn default() -> Self {
        Self::new()
    }
}

impl Handlebars {
    /// Engine with the built-in helpers and default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with the built-in helpers and a custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        let cache = NonZeroUsize::new(config.template_cache_size)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));
        Self {
            helpers: HelperRegistry::new(),
            partials: PartialRegistry::new(),
            config,
            cache,
        }
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The helper registry
    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    /// The partial registry
    pub fn partials(&self) -> &PartialRegistry {
        &self.partials
    }

    /// Compile source with the engine's parser limits
    pub fn compile(&self, source: &str) -> Result<Template> {
        Ok(Template::compile_with_config(source, self.config.parser)?)
    }

    /// Register a helper, replacing any helper of the same name
    pub fn register_helper<H: Helper + 'static>(&mut self, name: impl Into<String>, helper: H) {
        self.helpers.register(name, helper);
    }

    /// Register a closure as a helper
    pub fn register_helper_fn<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&HelperParams<'_>) -> HelperResult + Send + Sync + 'static,
    {
        self.helpers.register_fn(name, helper);
    }

    /// Remove a helper; built-ins can be removed too
    pub fn unregister_helper(&mut self, name: &str) -> bool {
        self.helpers.remove(name).is_some()
    }

    /// Whether a helper with this name is registered
    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains(name)
    }

    /// Register a compiled partial
    pub fn register_partial(&mut self, name: impl Into<String>, template: Template) {
        self.partials.register(name, template);
    }

    /// Compile and register a partial
    pub fn register_partial_source(&mut self, name: impl Into<String>, source: &str) -> Result<()> {
        let template = self.compile(source)?;
        self.partials.register(name, template);
        Ok(())
    }

    /// Remove a partial
    pub fn unregister_partial(&mut self, name: &str) -> bool {
        self.partials.remove(name).is_some()
    }

    /// Whether a partial with this name is registered
    pub fn has_partial(&self, name: &str) -> bool {
        self.partials.contains(name)
    }

    /// Render a compiled template
    pub fn render(&self, template: &Template, context: impl Into<Value>) -> Result<String> {
        let context = context.into();
        Ok(render_with_config(
            template,
            &context,
            &self.helpers,
            &self.partials,
            self.config.render,
        )?)
    }

    /// Render a compiled template against any serializable context
    pub fn render_serialize<T: Serialize + ?Sized>(
        &self,
        template: &Template,
        context: &T,
    ) -> Result<String> {
        let context = Value::from_serialize(context).map_err(|err| {
            HandlebarsError::Serialization {
                message: err.to_string(),
            }
        })?;
        self.render(template, context)
    }

    /// Compile (or fetch from the cache) and render template source
    pub fn render_source(&self, source: &str, context: impl Into<Value>) -> Result<String> {
        let template = self.cached_template(source)?;
        self.render(&template, context)
    }

    /// Number of templates currently held in the source cache
    pub fn cached_templates(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.lock().len())
    }

    /// Drop every cached template
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
    }

    fn cached_template(&self, source: &str) -> Result<Template> {
        let Some(cache) = &self.cache else {
            return self.compile(source);
        };
        if let Some(template) = cache.lock().get(source) {
            return Ok(template.clone());
        }
        let template = self.compile(source)?;
        cache.lock().put(source.to_string(), template.clone());
        Ok(template)
    }
}
