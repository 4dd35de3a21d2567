//! Helper and partial registries
//!
//! Registries are built by the host before rendering and then shared by
//! reference with every render. They follow a "configure, then freeze, then
//! render" discipline: mutation requires `&mut self`, so no registry can be
//! changed while a render borrows it.

#![warn(missing_docs)]

pub mod helper;
pub mod helpers;

pub use helper::{Helper, HelperError, HelperOutput, HelperParams, HelperResult};

use crate::engine::Template;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Named helpers callable from templates
#[derive(Clone)]
pub struct HelperRegistry {
    helpers: FxHashMap<String, Arc<dyn Helper>>,
}

impl Default for HelperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HelperRegistry {
    /// Registry holding the built-in helpers `if`, `unless`, `with` and `each`
    pub fn new() -> Self {
        let mut registry = Self::empty();
        helpers::register_builtin_helpers(&mut registry);
        registry
    }

    /// Registry with no helpers at all
    pub fn empty() -> Self {
        Self {
            helpers: FxHashMap::default(),
        }
    }

    /// Register a helper, replacing any helper of the same name
    pub fn register<H: Helper + 'static>(&mut self, name: impl Into<String>, helper: H) {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    /// Register a closure as a helper
    pub fn register_fn<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&HelperParams<'_>) -> HelperResult + Send + Sync + 'static,
    {
        self.register(name, helper);
    }

    /// Register an already shared helper
    pub fn register_arc(&mut self, name: impl Into<String>, helper: Arc<dyn Helper>) {
        self.helpers.insert(name.into(), helper);
    }

    /// Look up a helper
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Helper>> {
        self.helpers.get(name)
    }

    /// Whether a helper with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Remove a helper, returning it if it was registered
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Helper>> {
        self.helpers.remove(name)
    }

    /// Registered helper names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.helpers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered helpers
    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    /// Whether no helper is registered
    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("helpers", &self.names())
            .finish()
    }
}

/// Named, separately compiled templates available to `{{> name}}`
#[derive(Debug, Clone, Default)]
pub struct PartialRegistry {
    partials: FxHashMap<String, Arc<Template>>,
}

impl PartialRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a partial, replacing any partial of the same name
    pub fn register(&mut self, name: impl Into<String>, template: Template) {
        self.partials.insert(name.into(), Arc::new(template));
    }

    /// Look up a partial
    pub fn get(&self, name: &str) -> Option<&Arc<Template>> {
        self.partials.get(name)
    }

    /// Whether a partial with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.partials.contains_key(name)
    }

    /// Remove a partial, returning it if it was registered
    pub fn remove(&mut self, name: &str) -> Option<Arc<Template>> {
        self.partials.remove(name)
    }

    /// Registered partial names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.partials.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered partials
    pub fn len(&self) -> usize {
        self.partials.len()
    }

    /// Whether no partial is registered
    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }
}
