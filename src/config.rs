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

//! Parser, renderer and engine configuration options

/// Configuration for template compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum number of simultaneously open blocks, and separately the
    /// maximum sub-expression nesting inside one mustache
    pub max_nesting_depth: usize,
}

impl ParserConfig {
    /// Create a parser configuration with a custom nesting limit
    pub fn new(max_nesting_depth: usize) -> Self {
        Self { max_nesting_depth }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 128,
        }
    }
}

/// Configuration for a single render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    /// Maximum partial expansion depth before rendering fails
    pub max_partial_depth: usize,

    /// Maximum number of nested block bodies and partials in one render,
    /// counted together. Keeps self-referential partials off the stack limit
    pub max_render_depth: usize,

    /// Whether `{{expr}}` output is HTML escaped. When false, escaped and
    /// raw mustaches behave the same
    pub escape_html: bool,
}

impl RenderConfig {
    /// Create a render configuration with custom settings
    pub fn new(max_partial_depth: usize, escape_html: bool) -> Self {
        Self {
            max_partial_depth,
            escape_html,
            ..Self::default()
        }
    }

    /// Replace the combined block and partial nesting limit
    pub fn with_max_render_depth(mut self, max_render_depth: usize) -> Self {
        self.max_render_depth = max_render_depth;
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_partial_depth: 64,
            max_render_depth: 160,
            escape_html: true,
        }
    }
}

/// Configuration for the [`Handlebars`](crate::Handlebars) engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Compilation settings
    pub parser: ParserConfig,

    /// Rendering settings
    pub render: RenderConfig,

    /// Number of compiled templates kept by `render_source`; 0 disables the cache
    pub template_cache_size: usize,
}

impl EngineConfig {
    /// Create an engine configuration with custom settings
    pub fn new(parser: ParserConfig, render: RenderConfig, template_cache_size: usize) -> Self {
        Self {
            parser,
            render,
            template_cache_size,
        }
    }

    /// Tight limits for untrusted templates
    pub fn strict() -> Self {
        Self {
            parser: ParserConfig::new(32),
            render: RenderConfig::new(8, true).with_max_render_depth(48),
            template_cache_size: 32,
        }
    }

    /// Plain text output without HTML escaping
    pub fn text() -> Self {
        Self {
            render: RenderConfig {
                escape_html: false,
                ..RenderConfig::default()
            },
            ..Self::default()
        }
    }

    /// Create a configuration with the template cache disabled
    pub fn uncached() -> Self {
        Self {
            template_cache_size: 0,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            render: RenderConfig::default(),
            template_cache_size: 128,
        }
    }
}
