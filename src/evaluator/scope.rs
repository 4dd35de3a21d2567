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

//! Context and private-data scopes
//!
//! A render keeps its scopes on the call stack: every block that changes the
//! context, adds private data or binds block parameters creates a child
//! [`Scope`] borrowing its parent, and the child is dropped when the block
//! returns. Push and pop therefore always balance, even on error.

use crate::model::Value;
use smallvec::SmallVec;
use std::borrow::Cow;

static NULL: Value = Value::Null;

/// Private variables (`@index`, `@key`, helper-defined names) of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    entries: SmallVec<[(Cow<'static, str>, Value); 4]>,
}

impl DataFrame {
    /// Empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing an existing one with the same name
    pub fn insert(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the frame has no variables
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the variables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_ref(), value))
    }
}

/// Block parameter bindings of one frame
pub type BlockParams<'a> = Vec<(&'a str, Value)>;

/// One level of the scope chain
#[derive(Debug)]
pub struct Scope<'a> {
    /// Context pushed at this level; `None` keeps the parent's
    context: Option<Value>,
    /// Private data frame pushed at this level
    data: Option<DataFrame>,
    block_params: BlockParams<'a>,
    parent: Option<&'a Scope<'a>>,
    partial_depth: usize,
    /// Scope levels from the root, across blocks and partials
    render_depth: usize,
    /// Partial boundary: block parameters of outer frames are not visible
    isolated: bool,
}

impl Scope<'static> {
    /// Outermost scope of a render, with `@root` bound to the context
    pub fn root(context: Value) -> Self {
        Self {
            data: Some(DataFrame::new().with("root", context.clone())),
            context: Some(context),
            block_params: BlockParams::new(),
            parent: None,
            partial_depth: 0,
            render_depth: 0,
            isolated: false,
        }
    }
}

impl<'a> Scope<'a> {
    /// Child scope; `None` context keeps the current one
    pub fn child<'s>(
        &'s self,
        context: Option<Value>,
        data: Option<DataFrame>,
        block_params: BlockParams<'s>,
    ) -> Scope<'s> {
        Scope {
            context,
            data,
            block_params,
            parent: Some(self),
            partial_depth: self.partial_depth,
            render_depth: self.render_depth + 1,
            isolated: false,
        }
    }

    /// Child scope entering a partial at the given expansion depth
    pub fn partial_child(&self, context: Value, partial_depth: usize) -> Scope<'_> {
        Scope {
            context: Some(context),
            data: None,
            block_params: BlockParams::new(),
            parent: Some(self),
            partial_depth,
            render_depth: self.render_depth + 1,
            isolated: true,
        }
    }

    fn frames(&self) -> impl Iterator<Item = &Scope<'a>> {
        std::iter::successors(Some(self), |scope: &&Scope<'a>| scope.parent)
    }

    /// The current context (`this`)
    pub fn context(&self) -> &Value {
        self.ancestor_context(0)
    }

    /// The context `levels` pushes above the current one; `Null` past the root
    pub fn ancestor_context(&self, levels: usize) -> &Value {
        self.frames()
            .filter_map(|scope| scope.context.as_ref())
            .nth(levels)
            .unwrap_or(&NULL)
    }

    /// Private variable, searching innermost-first after skipping `levels`
    /// data frames
    pub fn data(&self, name: &str, levels: usize) -> Option<&Value> {
        self.frames()
            .filter_map(|scope| scope.data.as_ref())
            .skip(levels)
            .find_map(|frame| frame.get(name))
    }

    /// Block parameter visible from this scope
    pub fn block_param(&self, name: &str) -> Option<&Value> {
        for scope in self.frames() {
            if let Some((_, value)) = scope.block_params.iter().find(|(key, _)| *key == name) {
                return Some(value);
            }
            if scope.isolated {
                break;
            }
        }
        None
    }

    /// Number of partials entered to reach this scope
    pub fn partial_depth(&self) -> usize {
        self.partial_depth
    }

    /// Number of scopes (blocks and partials) entered to reach this scope
    pub fn render_depth(&self) -> usize {
        self.render_depth
    }

    /// Number of context levels from here to the root
    pub fn depth(&self) -> usize {
        self.frames().filter(|scope| scope.context.is_some()).count()
    }
}
