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

//! Visitor pattern for AST traversal

use super::expression::{CallExpression, Expression};
use super::statement::{BlockStatement, PartialName, PartialStatement, Program, Statement};
use indexmap::IndexSet;

/// Read-only traversal over a program.
///
/// Every method has a default that walks into children, so implementors only
/// override the nodes they care about.
pub trait Visitor: Sized {
    /// Visit a program
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    /// Visit a statement
    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    /// Visit a block section
    fn visit_block(&mut self, block: &BlockStatement) {
        walk_block(self, block);
    }

    /// Visit a partial inclusion
    fn visit_partial(&mut self, partial: &PartialStatement) {
        walk_partial(self, partial);
    }

    /// Visit a call (mustache, block opener or sub-expression)
    fn visit_call(&mut self, call: &CallExpression) {
        walk_call(self, call);
    }

    /// Visit an expression
    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }
}

/// Walk every statement of a program
pub fn walk_program<V: Visitor>(visitor: &mut V, program: &Program) {
    for statement in program.iter() {
        visitor.visit_statement(statement);
    }
}

/// Walk the children of a statement
pub fn walk_statement<V: Visitor>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Content(_) | Statement::Comment(_) => {}
        Statement::Mustache(mustache) => visitor.visit_call(&mustache.call),
        Statement::Block(block) => visitor.visit_block(block),
        Statement::Partial(partial) => visitor.visit_partial(partial),
    }
}

/// Walk the opener and both bodies of a block
pub fn walk_block<V: Visitor>(visitor: &mut V, block: &BlockStatement) {
    visitor.visit_call(&block.call);
    visitor.visit_program(&block.program);
    if let Some(inverse) = &block.inverse {
        visitor.visit_program(inverse);
    }
}

/// Walk the arguments of a partial
pub fn walk_partial<V: Visitor>(visitor: &mut V, partial: &PartialStatement) {
    if let PartialName::Dynamic(call) = &partial.name {
        visitor.visit_call(call);
    }
    if let Some(context) = &partial.context {
        visitor.visit_expression(context);
    }
    for pair in partial.hash.iter() {
        visitor.visit_expression(&pair.value);
    }
}

/// Walk callee, params and hash values
pub fn walk_call<V: Visitor>(visitor: &mut V, call: &CallExpression) {
    visitor.visit_expression(&call.callee);
    for param in &call.params {
        visitor.visit_expression(param);
    }
    for pair in call.hash.iter() {
        visitor.visit_expression(&pair.value);
    }
}

/// Walk into sub-expressions
pub fn walk_expression<V: Visitor>(visitor: &mut V, expression: &Expression) {
    if let Expression::SubExpression(call) = expression {
        visitor.visit_call(call);
    }
}

/// Collects the names of statically referenced partials
#[derive(Debug, Default)]
pub struct PartialNameCollector {
    /// Names in first-seen order
    pub names: IndexSet<String>,
}

impl Visitor for PartialNameCollector {
    fn visit_partial(&mut self, partial: &PartialStatement) {
        if let PartialName::Static(name) = &partial.name {
            self.names.insert(name.clone());
        }
        walk_partial(self, partial);
    }
}

/// Collects the names of every call that takes arguments or opens a block,
/// i.e. every name that can only be satisfied by a helper
#[derive(Debug, Default)]
pub struct HelperNameCollector {
    /// Names in first-seen order
    pub names: IndexSet<String>,
}

impl Visitor for HelperNameCollector {
    fn visit_call(&mut self, call: &CallExpression) {
        if call.has_arguments() {
            if let Some(name) = call.helper_name() {
                self.names.insert(name.to_string());
            }
        }
        walk_call(self, call);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        if let Expression::SubExpression(call) = expression {
            if let Some(name) = call.helper_name() {
                self.names.insert(name.to_string());
            }
        }
        walk_expression(self, expression);
    }
}
