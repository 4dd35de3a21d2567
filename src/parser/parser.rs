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

//! Recursive-descent template parser
//!
//! Expressions inside a mustache are parsed by recursive descent. Block
//! structure is not: every `{{#name}}` pushes a [`BlockFrame`] onto an explicit
//! stack and the matching `{{/name}}` pops it, so nesting depth is bounded by
//! [`ParserConfig::max_nesting_depth`] rather than by the call stack.
//!
//! Whitespace control is applied while statements are assembled. An opening
//! `~` trims the tail of the previous content statement, a closing `~` trims the
//! head of the next one.

use super::error::{ParseError, ParseResult};
use super::lexer::TokenStream;
use super::span::{LineIndex, SourcePosition, Spanned};
use super::tokenizer::Token;
use crate::ast::{
    BlockStatement, CallExpression, Expression, Hash, HashPair, LiteralValue, MustacheStatement,
    PartialName, PartialStatement, PathExpression, Program, Statement,
};
use crate::config::ParserConfig;
use smallvec::SmallVec;
use std::borrow::Cow;

/// A block whose body is still being accumulated
struct BlockFrame {
    call: CallExpression,
    block_params: Vec<String>,
    program: Program,
    inverse: Program,
    /// Statements currently go to `inverse`
    in_inverse: bool,
    has_else: bool,
    /// Opened with `{{^name}}`
    inverted: bool,
    /// Opened by `{{else name}}`; closed by the same tag as the frame below it
    chained: bool,
    name: String,
    position: SourcePosition,
}

impl BlockFrame {
    fn new(
        call: CallExpression,
        block_params: Vec<String>,
        inverted: bool,
        chained: bool,
        position: SourcePosition,
    ) -> Self {
        let name = call.callee.original();
        Self {
            call,
            block_params,
            program: Program::new(),
            inverse: Program::new(),
            in_inverse: inverted,
            has_else: false,
            inverted,
            chained,
            name,
            position,
        }
    }

    fn target(&mut self) -> &mut Program {
        if self.in_inverse {
            &mut self.inverse
        } else {
            &mut self.program
        }
    }

    fn into_statement(self) -> Statement {
        let inverse = (self.has_else || self.inverted).then_some(self.inverse);
        Statement::Block(Box::new(BlockStatement {
            call: self.call,
            block_params: self.block_params,
            program: self.program,
            inverse,
            position: self.position,
        }))
    }
}

/// Template parser over a lazy token stream
pub struct Parser<'input> {
    tokens: TokenStream<'input>,
    lines: LineIndex<'input>,
    config: ParserConfig,
    root: Program,
    frames: Vec<BlockFrame>,
    /// The previous delimiter ended with `~}}`
    strip_next: bool,
    expression_depth: usize,
}

impl<'input> Parser<'input> {
    /// Create a parser with default limits
    pub fn new(input: &'input str) -> Self {
        Self::with_config(input, ParserConfig::default())
    }

    /// Create a parser with custom limits
    pub fn with_config(input: &'input str, config: ParserConfig) -> Self {
        Self {
            tokens: TokenStream::new(input),
            lines: LineIndex::new(input),
            config,
            root: Program::new(),
            frames: Vec::new(),
            strip_next: false,
            expression_depth: 0,
        }
    }

    /// Parse the whole input into a program
    pub fn parse(mut self) -> ParseResult<Program> {
        while let Some(token) = self.tokens.next()? {
            if let Token::Content(text) = token.value {
                self.push_content(text);
                continue;
            }
            let position = self.position_at(token.start);
            let strip_next = match token.value {
                Token::Comment {
                    body,
                    strip_open,
                    strip_close,
                } => {
                    if strip_open {
                        self.strip_previous();
                    }
                    self.target()
                        .statements
                        .push(Statement::Comment(body.to_string()));
                    strip_close
                }
                Token::OpenEscaped { strip } => self.parse_mustache(strip, true, position)?,
                Token::OpenRaw { strip } | Token::OpenUnescaped { strip } => {
                    self.parse_mustache(strip, false, position)?
                }
                Token::OpenBlock { strip } => self.open_block(strip, false, position)?,
                Token::OpenInverseBlock { strip } => {
                    // `{{^}}` is an else marker
                    if self.peek_is_close()? {
                        self.parse_else(strip, position)?
                    } else {
                        self.open_block(strip, true, position)?
                    }
                }
                Token::Else { strip } => self.parse_else(strip, position)?,
                Token::CloseBlock { strip } => self.close_block(strip, position)?,
                Token::OpenPartial { strip } => self.parse_partial(strip, position)?,
                _ => return Err(self.unexpected(&token, "content or an opening delimiter")),
            };
            self.strip_next = strip_next;
        }

        if let Some(frame) = self.frames.iter().rev().find(|frame| !frame.chained) {
            return Err(ParseError::UnclosedBlock {
                name: frame.name.clone(),
                position: frame.position,
            });
        }
        Ok(self.root)
    }

    #[inline]
    fn position_at(&self, offset: usize) -> SourcePosition {
        self.lines.position(offset)
    }

    fn eof(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedEof {
            expected: Cow::Borrowed(expected),
            position: self.position_at(self.tokens.source().len()),
        }
    }

    fn unexpected(&self, token: &Spanned<Token<'input>>, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            found: token.value.describe(),
            expected: Cow::Borrowed(expected),
            position: self.position_at(token.start),
        }
    }

    fn next_required(&mut self, expected: &'static str) -> ParseResult<Spanned<Token<'input>>> {
        match self.tokens.next()? {
            Some(token) => Ok(token),
            None => Err(self.eof(expected)),
        }
    }

    fn peek_is_close(&mut self) -> ParseResult<bool> {
        Ok(self.tokens.peek()?.is_some_and(|t| t.value.is_close()))
    }

    /// Next token, only if it starts exactly at `end`
    fn peek_adjacent(&mut self, end: usize) -> ParseResult<Option<Spanned<Token<'input>>>> {
        Ok(self.tokens.peek()?.filter(|t| t.start == end).cloned())
    }

    fn target(&mut self) -> &mut Program {
        match self.frames.last_mut() {
            Some(frame) => frame.target(),
            None => &mut self.root,
        }
    }

    fn push_content(&mut self, text: &str) {
        let text = if std::mem::take(&mut self.strip_next) {
            text.trim_start()
        } else {
            text
        };
        if text.is_empty() {
            return;
        }
        let target = self.target();
        if let Some(Statement::Content(existing)) = target.statements.last_mut() {
            existing.push_str(text);
        } else {
            target.statements.push(Statement::Content(text.to_string()));
        }
    }

    /// Trim trailing whitespace of the content right before an opening `~`
    fn strip_previous(&mut self) {
        let statements = &mut self.target().statements;
        let emptied = match statements.last_mut() {
            Some(Statement::Content(text)) => {
                let len = text.trim_end().len();
                text.truncate(len);
                text.is_empty()
            }
            _ => false,
        };
        if emptied {
            statements.pop();
        }
    }

    /// Consume the closing delimiter and return its strip flag
    fn expect_close(&mut self) -> ParseResult<bool> {
        let token = self.next_required("'}}'")?;
        if token.value.is_close() {
            Ok(token.value.close_strip())
        } else {
            Err(self.unexpected(&token, "'}}'"))
        }
    }

    fn parse_mustache(
        &mut self,
        strip: bool,
        escaped: bool,
        position: SourcePosition,
    ) -> ParseResult<bool> {
        if strip {
            self.strip_previous();
        }
        let call = self.parse_call(position)?;
        let close = self.expect_close()?;
        self.target()
            .statements
            .push(Statement::Mustache(MustacheStatement {
                call,
                escaped,
                position,
            }));
        Ok(close)
    }

    fn open_block(
        &mut self,
        strip: bool,
        inverted: bool,
        position: SourcePosition,
    ) -> ParseResult<bool> {
        if strip {
            self.strip_previous();
        }
        self.check_block_depth(position)?;
        let call = self.parse_call(position)?;
        let block_params = self.parse_block_params()?;
        let close = self.expect_close()?;
        self.frames
            .push(BlockFrame::new(call, block_params, inverted, false, position));
        Ok(close)
    }

    fn check_block_depth(&self, position: SourcePosition) -> ParseResult<()> {
        if self.frames.len() >= self.config.max_nesting_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.config.max_nesting_depth,
                position,
            });
        }
        Ok(())
    }

    /// `{{else}}`, `{{^}}` or a chained `{{else name args}}`
    fn parse_else(&mut self, strip: bool, position: SourcePosition) -> ParseResult<bool> {
        if self.frames.is_empty() {
            return Err(ParseError::ElseOutsideBlock { position });
        }
        if strip {
            self.strip_previous();
        }

        let chained = if self.peek_is_close()? {
            None
        } else {
            self.check_block_depth(position)?;
            let call = self.parse_call(position)?;
            let block_params = self.parse_block_params()?;
            Some((call, block_params))
        };
        let close = self.expect_close()?;

        let Some(frame) = self.frames.last_mut() else {
            return Err(ParseError::ElseOutsideBlock { position });
        };
        if frame.has_else {
            return Err(ParseError::DuplicateElse {
                name: frame.name.clone(),
                position,
            });
        }
        frame.has_else = true;
        frame.in_inverse = !frame.in_inverse;

        if let Some((call, block_params)) = chained {
            self.frames
                .push(BlockFrame::new(call, block_params, false, true, position));
        }
        Ok(close)
    }

    fn close_block(&mut self, strip: bool, position: SourcePosition) -> ParseResult<bool> {
        if strip {
            self.strip_previous();
        }
        let close_name = self.parse_expression()?.original();
        let close = self.expect_close()?;

        let Some(mut frame) = self.frames.pop() else {
            return Err(ParseError::UnexpectedCloseBlock {
                name: close_name,
                position,
            });
        };
        while frame.chained {
            let statement = frame.into_statement();
            let Some(mut parent) = self.frames.pop() else {
                return Err(ParseError::UnexpectedCloseBlock {
                    name: close_name,
                    position,
                });
            };
            parent.target().statements.push(statement);
            frame = parent;
        }

        if frame.name != close_name {
            return Err(ParseError::MismatchedBlock {
                open: frame.name,
                close: close_name,
                open_position: frame.position,
                position,
            });
        }
        let statement = frame.into_statement();
        self.target().statements.push(statement);
        Ok(close)
    }

    fn parse_partial(&mut self, strip: bool, position: SourcePosition) -> ParseResult<bool> {
        if strip {
            self.strip_previous();
        }
        let token = self.next_required("partial name")?;
        let name = match token.value {
            Token::OpenParen => {
                let call = self.parse_sub_expression(self.position_at(token.start))?;
                PartialName::Dynamic(Box::new(call))
            }
            Token::StringLiteral(raw) => PartialName::Static(unescape_string(raw)),
            Token::Identifier(_) | Token::Segment(_) => {
                let path = self.parse_path(token)?;
                if path.segments.len() == 1 {
                    PartialName::Static(path.segments[0].clone())
                } else {
                    PartialName::Static(path.original)
                }
            }
            _ => return Err(self.unexpected(&token, "partial name")),
        };

        let (mut params, hash) = self.parse_arguments()?;
        if params.len() > 1 {
            return Err(ParseError::UnexpectedToken {
                found: params[1].original(),
                expected: Cow::Borrowed("at most one partial context"),
                position,
            });
        }
        let context = params.pop();
        let close = self.expect_close()?;
        self.target()
            .statements
            .push(Statement::Partial(PartialStatement {
                name,
                context,
                hash,
                position,
            }));
        Ok(close)
    }

    fn parse_call(&mut self, position: SourcePosition) -> ParseResult<CallExpression> {
        let callee = self.parse_expression()?;
        let (params, hash) = self.parse_arguments()?;
        Ok(CallExpression {
            callee,
            params,
            hash,
            position,
        })
    }

    /// Parameters followed by hash pairs, up to a closing token
    fn parse_arguments(&mut self) -> ParseResult<(Vec<Expression>, Hash)> {
        let mut params = Vec::new();
        let mut hash = Hash::new();
        loop {
            let Some(token) = self.tokens.peek()?.cloned() else {
                return Err(self.eof("'}}'"));
            };
            match token.value {
                Token::CloseMustache { .. }
                | Token::CloseRaw { .. }
                | Token::CloseParen
                | Token::OpenBlockParams
                | Token::Pipe => break,
                Token::Identifier(key) if self.peek_is_equals()? => {
                    self.tokens.next()?;
                    self.tokens.next()?;
                    if hash.get(key).is_some() {
                        return Err(ParseError::DuplicateHashKey {
                            key: key.to_string(),
                            position: self.position_at(token.start),
                        });
                    }
                    let value = self.parse_expression()?;
                    hash.pairs.push(HashPair {
                        key: key.to_string(),
                        value,
                    });
                }
                _ if !hash.is_empty() => return Err(self.unexpected(&token, "hash argument")),
                _ => params.push(self.parse_expression()?),
            }
        }
        Ok((params, hash))
    }

    fn peek_is_equals(&mut self) -> ParseResult<bool> {
        Ok(self
            .tokens
            .peek_ahead(1)?
            .is_some_and(|t| t.value == Token::Equals))
    }

    fn parse_block_params(&mut self) -> ParseResult<Vec<String>> {
        let opened = self
            .tokens
            .consume_if(|t| matches!(t, Token::OpenBlockParams | Token::Pipe))?;
        if opened.is_none() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        loop {
            let token = self.next_required("block parameter name")?;
            match token.value {
                Token::Identifier(name) => names.push(name.to_string()),
                Token::Comma if !names.is_empty() => {}
                Token::Pipe if !names.is_empty() => return Ok(names),
                _ => return Err(self.unexpected(&token, "block parameter name")),
            }
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        let token = self.next_required("expression")?;
        let position = self.position_at(token.start);
        let expression = match token.value {
            Token::OpenParen => Expression::SubExpression(Box::new(self.parse_sub_expression(position)?)),
            Token::StringLiteral(raw) => Expression::Literal(LiteralValue::String(unescape_string(raw))),
            Token::NumberLiteral(literal) => Expression::Literal(parse_number(literal, position)?),
            Token::BooleanLiteral(value) => Expression::Literal(LiteralValue::Boolean(value)),
            Token::NullLiteral => Expression::Literal(LiteralValue::Null),
            Token::UndefinedLiteral => Expression::Literal(LiteralValue::Undefined),
            Token::At => {
                let Some(first) = self.peek_adjacent(token.end)? else {
                    return Err(ParseError::InvalidPath {
                        path: "@".to_string(),
                        reason: Cow::Borrowed("expected a data name after '@'"),
                        position,
                    });
                };
                self.tokens.next()?;
                Expression::Data(self.parse_path(first)?)
            }
            Token::Identifier(_) | Token::Segment(_) | Token::Dot | Token::ParentRef => {
                Expression::Path(self.parse_path(token)?)
            }
            _ => return Err(self.unexpected(&token, "expression")),
        };
        Ok(expression)
    }

    /// Body of `( ... )` after the opening parenthesis
    fn parse_sub_expression(&mut self, position: SourcePosition) -> ParseResult<CallExpression> {
        self.expression_depth += 1;
        if self.expression_depth > self.config.max_nesting_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.config.max_nesting_depth,
                position,
            });
        }
        let call = self.parse_call(position)?;
        let close = self.next_required("')'")?;
        if close.value != Token::CloseParen {
            return Err(self.unexpected(&close, "')'"));
        }
        self.expression_depth -= 1;
        Ok(call)
    }

    /// Path starting at an already consumed token. Separators and segments
    /// must be adjacent, so `{{foo .}}` is a call with `this` as parameter.
    fn parse_path(&mut self, first: Spanned<Token<'input>>) -> ParseResult<PathExpression> {
        let start = first.start;
        let mut end = first.end;
        let mut parent_levels = 0;
        let mut is_this = false;
        let mut segments: SmallVec<[String; 2]> = SmallVec::new();
        let mut current = first;

        while current.value == Token::ParentRef {
            parent_levels += 1;
            match self.peek_adjacent(end)? {
                Some(next)
                    if matches!(
                        next.value,
                        Token::ParentRef | Token::Identifier(_) | Token::Segment(_)
                    ) =>
                {
                    self.tokens.next()?;
                    end = next.end;
                    current = next;
                }
                _ => {
                    // `..` on its own refers to the parent context
                    return Ok(PathExpression {
                        original: self.tokens.source()[start..end].to_string(),
                        parent_levels,
                        is_this,
                        segments,
                    });
                }
            }
        }

        match current.value {
            Token::Dot | Token::Identifier("this") => is_this = true,
            Token::Identifier(name) | Token::Segment(name) => segments.push(name.to_string()),
            _ => return Err(self.unexpected(&current, "path")),
        }

        while let Some(separator) = self.peek_adjacent(end)? {
            if !matches!(separator.value, Token::Dot | Token::Slash) {
                break;
            }
            self.tokens.next()?;
            let segment = self.next_required("path segment")?;
            if segment.start != separator.end {
                return Err(self.unexpected(&segment, "path segment"));
            }
            match segment.value {
                Token::Identifier(name) | Token::Segment(name) | Token::NumberLiteral(name)
                    if !(name == "this" && matches!(segment.value, Token::Identifier(_))) =>
                {
                    segments.push(name.to_string());
                }
                Token::Identifier(_) | Token::ParentRef => {
                    return Err(ParseError::InvalidPath {
                        path: self.tokens.source()[start..segment.end].to_string(),
                        reason: Cow::Borrowed("'this' and '..' may only start a path"),
                        position: self.position_at(start),
                    });
                }
                _ => return Err(self.unexpected(&segment, "path segment")),
            }
            end = segment.end;
        }

        Ok(PathExpression {
            original: self.tokens.source()[start..end].to_string(),
            parent_levels,
            is_this,
            segments,
        })
    }
}

/// Resolve `\"`, `\'` and `\\`; any other backslash is kept
fn unescape_string(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('"' | '\'' | '\\')) => result.push(escaped),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

fn parse_number(literal: &str, position: SourcePosition) -> ParseResult<LiteralValue> {
    let invalid = || ParseError::InvalidNumber {
        literal: literal.to_string(),
        position,
    };
    if literal.contains('.') {
        literal
            .parse::<f64>()
            .map(LiteralValue::Float)
            .map_err(|_| invalid())
    } else {
        literal
            .parse::<i64>()
            .map(LiteralValue::Integer)
            .map_err(|_| invalid())
    }
}
