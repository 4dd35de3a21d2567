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

//! Two-mode tokenizer for template source
//!
//! The tokenizer alternates between *content* mode, where everything up to the
//! next `{{` is literal text, and *mustache* mode, where the expression grammar
//! (paths, literals, hash pairs, sub-expressions, block params) is recognised
//! until the closing delimiter. Tokens borrow from the input and are produced
//! lazily; a tokenizer cannot be rewound.

use super::error::{ParseError, ParseResult};
use super::lexer::{is_identifier_char, is_literal_terminator};
use super::span::{SourcePosition, Spanned};

/// Template token. `strip` flags record a `~` adjacent to the delimiter.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// Literal text outside of any mustache
    Content(&'input str),

    /// `{{`
    OpenEscaped {
        /// `{{~`
        strip: bool,
    },
    /// `{{{`
    OpenRaw {
        /// `{{~{`
        strip: bool,
    },
    /// `{{&`
    OpenUnescaped {
        /// `{{~&`
        strip: bool,
    },
    /// `{{#`
    OpenBlock {
        /// `{{~#`
        strip: bool,
    },
    /// `{{^`
    OpenInverseBlock {
        /// `{{~^`
        strip: bool,
    },
    /// `{{/`
    CloseBlock {
        /// `{{~/`
        strip: bool,
    },
    /// `{{>`
    OpenPartial {
        /// `{{~>`
        strip: bool,
    },
    /// `{{else`, followed by a closing delimiter or a chained call
    Else {
        /// `{{~else`
        strip: bool,
    },
    /// A whole `{{! ... }}` or `{{!-- ... --}}` comment
    Comment {
        /// Comment text between the markers
        body: &'input str,
        /// `{{~!`
        strip_open: bool,
        /// `~}}`
        strip_close: bool,
    },
    /// `}}`
    CloseMustache {
        /// `~}}`
        strip: bool,
    },
    /// `}}}`
    CloseRaw {
        /// `~}}}`
        strip: bool,
    },

    /// Path segment or helper name
    Identifier(&'input str),
    /// Bracketed literal segment `[any text]`, brackets removed
    Segment(&'input str),
    /// `.`
    Dot,
    /// `/`
    Slash,
    /// `../` (or a bare `..`)
    ParentRef,
    /// `@`
    At,
    /// Quoted string, quotes removed, escapes still present
    StringLiteral(&'input str),
    /// Numeric literal text
    NumberLiteral(&'input str),
    /// `true` / `false`
    BooleanLiteral(bool),
    /// `null`
    NullLiteral,
    /// `undefined`
    UndefinedLiteral,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `=` between a hash key and its value
    Equals,
    /// `as |`
    OpenBlockParams,
    /// `|`
    Pipe,
    /// `,`
    Comma,
}

impl<'input> Token<'input> {
    /// Human readable description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Content(_) => "content".to_string(),
            Token::OpenEscaped { .. } => "'{{'".to_string(),
            Token::OpenRaw { .. } => "'{{{'".to_string(),
            Token::OpenUnescaped { .. } => "'{{&'".to_string(),
            Token::OpenBlock { .. } => "'{{#'".to_string(),
            Token::OpenInverseBlock { .. } => "'{{^'".to_string(),
            Token::CloseBlock { .. } => "'{{/'".to_string(),
            Token::OpenPartial { .. } => "'{{>'".to_string(),
            Token::Else { .. } => "'{{else'".to_string(),
            Token::Comment { .. } => "comment".to_string(),
            Token::CloseMustache { .. } => "'}}'".to_string(),
            Token::CloseRaw { .. } => "'}}}'".to_string(),
            Token::Identifier(name) => format!("identifier '{name}'"),
            Token::Segment(name) => format!("segment '[{name}]'"),
            Token::Dot => "'.'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::ParentRef => "'../'".to_string(),
            Token::At => "'@'".to_string(),
            Token::StringLiteral(s) => format!("string \"{s}\""),
            Token::NumberLiteral(n) => format!("number {n}"),
            Token::BooleanLiteral(b) => format!("boolean {b}"),
            Token::NullLiteral => "null".to_string(),
            Token::UndefinedLiteral => "undefined".to_string(),
            Token::OpenParen => "'('".to_string(),
            Token::CloseParen => "')'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::OpenBlockParams => "'as |'".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }

    /// Whether this token closes a mustache
    #[inline]
    pub fn is_close(&self) -> bool {
        matches!(self, Token::CloseMustache { .. } | Token::CloseRaw { .. })
    }

    /// Strip flag of a closing delimiter
    #[inline]
    pub fn close_strip(&self) -> bool {
        matches!(
            self,
            Token::CloseMustache { strip: true } | Token::CloseRaw { strip: true }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Content,
    Mustache {
        /// Offset of the opening `{{`, for unterminated-mustache errors
        open: usize,
        /// Opened with `{{{`, so `}}}` is the expected close
        raw: bool,
    },
}

/// Lazy tokenizer over template source
#[derive(Clone)]
pub struct Tokenizer<'input> {
    source: &'input str,
    pos: usize,
    mode: Mode,
    /// The `{{` at `pos` was escaped with a backslash and is literal text
    literal_open: bool,
    finished: bool,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    pub fn new(source: &'input str) -> Self {
        Self {
            source,
            pos: 0,
            mode: Mode::Content,
            literal_open: false,
            finished: false,
        }
    }

    /// The source being tokenized
    pub fn source(&self) -> &'input str {
        self.source
    }

    #[inline]
    fn position_at(&self, offset: usize) -> SourcePosition {
        SourcePosition::from_offset(self.source, offset)
    }

    #[inline]
    fn rest(&self) -> &'input str {
        &self.source[self.pos..]
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    #[inline]
    fn starts_with(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    /// Produce the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        if self.finished {
            return Ok(None);
        }
        let result = match self.mode {
            Mode::Content => self.lex_content(),
            Mode::Mustache { open, raw } => self.lex_mustache(open, raw),
        };
        match result {
            Ok(None) | Err(_) => self.finished = true,
            Ok(Some(_)) => {}
        }
        result
    }

    /// Collect every remaining token
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn lex_content(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        if self.pos >= self.source.len() {
            return Ok(None);
        }
        let start = self.pos;
        // An escaped `{{` is part of this content run
        let search_from = if self.literal_open { start + 2 } else { start };
        self.literal_open = false;

        let bytes = self.source.as_bytes();
        let Some(found) = memchr::memmem::find(&bytes[search_from..], b"{{").map(|i| i + search_from)
        else {
            self.pos = self.source.len();
            return Ok(Some(Spanned::new(
                Token::Content(&self.source[start..]),
                start,
                self.pos,
            )));
        };

        if found == start {
            return self.lex_open().map(Some);
        }

        let text = &self.source[start..found];
        if text.ends_with("\\\\") {
            // `\\{{`: one literal backslash, then a real mustache
            self.pos = found;
            return Ok(Some(Spanned::new(
                Token::Content(&text[..text.len() - 1]),
                start,
                found,
            )));
        }
        if text.ends_with('\\') {
            // `\{{`: drop the backslash, the braces become content
            self.pos = found;
            self.literal_open = true;
            let text = &text[..text.len() - 1];
            if text.is_empty() {
                return self.lex_content();
            }
            return Ok(Some(Spanned::new(Token::Content(text), start, found)));
        }

        self.pos = found;
        Ok(Some(Spanned::new(Token::Content(text), start, found)))
    }

    fn lex_open(&mut self) -> ParseResult<Spanned<Token<'input>>> {
        let start = self.pos;
        self.pos += 2;
        let strip = if self.starts_with("~") {
            self.pos += 1;
            true
        } else {
            false
        };

        let mut raw = false;
        let token = match self.peek_char() {
            Some('{') => {
                self.pos += 1;
                raw = true;
                Token::OpenRaw { strip }
            }
            Some('&') => {
                self.pos += 1;
                Token::OpenUnescaped { strip }
            }
            Some('#') => {
                self.pos += 1;
                Token::OpenBlock { strip }
            }
            Some('^') => {
                self.pos += 1;
                Token::OpenInverseBlock { strip }
            }
            Some('/') => {
                self.pos += 1;
                Token::CloseBlock { strip }
            }
            Some('>') => {
                self.pos += 1;
                Token::OpenPartial { strip }
            }
            Some('!') => {
                self.pos += 1;
                return self.lex_comment(start, strip);
            }
            _ if self.at_else() => Token::Else { strip },
            _ => Token::OpenEscaped { strip },
        };

        self.mode = Mode::Mustache { open: start, raw };
        Ok(Spanned::new(token, start, self.pos))
    }

    /// Detects `else` as the first word of a mustache and consumes it
    fn at_else(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        let Some(after) = trimmed.strip_prefix("else") else {
            return false;
        };
        match after.chars().next() {
            Some(c) if c.is_whitespace() || c == '~' || c == '}' => {
                self.pos += rest.len() - after.len();
                true
            }
            _ => false,
        }
    }

    fn lex_comment(&mut self, start: usize, strip_open: bool) -> ParseResult<Spanned<Token<'input>>> {
        let long = self.starts_with("--");
        let (body_start, terminator) = if long {
            (self.pos + 2, "--")
        } else {
            (self.pos, "")
        };

        let mut search = body_start;
        loop {
            let Some(close) = memchr::memmem::find(&self.source.as_bytes()[search..], b"}}")
                .map(|i| i + search)
            else {
                return Err(ParseError::UnterminatedComment {
                    position: self.position_at(start),
                });
            };
            let before = &self.source[body_start..close];
            let (before, strip_close) = match before.strip_suffix('~') {
                Some(b) => (b, true),
                None => (before, false),
            };
            if let Some(body) = before.strip_suffix(terminator) {
                self.pos = close + 2;
                return Ok(Spanned::new(
                    Token::Comment {
                        body,
                        strip_open,
                        strip_close,
                    },
                    start,
                    self.pos,
                ));
            }
            // `}}` inside a long comment, keep looking
            search = close + 2;
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn lex_mustache(&mut self, open: usize, raw: bool) -> ParseResult<Option<Spanned<Token<'input>>>> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Err(ParseError::UnterminatedMustache {
                position: self.position_at(open),
            });
        };

        let token = match c {
            '~' | '}' => {
                let strip = c == '~';
                if strip {
                    self.pos += 1;
                }
                let close = if raw { "}}}" } else { "}}" };
                if !self.starts_with(close) {
                    return match self.peek_char() {
                        Some(found) => Err(ParseError::UnexpectedCharacter {
                            character: found,
                            position: self.position_at(self.pos),
                        }),
                        None => Err(ParseError::UnterminatedMustache {
                            position: self.position_at(open),
                        }),
                    };
                }
                self.pos += close.len();
                self.mode = Mode::Content;
                if raw {
                    Token::CloseRaw { strip }
                } else {
                    Token::CloseMustache { strip }
                }
            }
            '(' => self.single(Token::OpenParen),
            ')' => self.single(Token::CloseParen),
            '=' => self.single(Token::Equals),
            ',' => self.single(Token::Comma),
            '@' => self.single(Token::At),
            '/' => self.single(Token::Slash),
            '|' => self.single(Token::Pipe),
            '.' => {
                if self.starts_with("..") {
                    self.pos += 2;
                    if self.starts_with("/") {
                        self.pos += 1;
                    }
                    Token::ParentRef
                } else {
                    self.single(Token::Dot)
                }
            }
            '[' => self.lex_segment()?,
            '"' | '\'' => self.lex_string(c)?,
            _ => {
                if let Some(number) = self.lex_number() {
                    number
                } else if is_identifier_char(c) {
                    self.lex_identifier()
                } else {
                    return Err(ParseError::UnexpectedCharacter {
                        character: c,
                        position: self.position_at(start),
                    });
                }
            }
        };

        Ok(Some(Spanned::new(token, start, self.pos)))
    }

    #[inline]
    fn single(&mut self, token: Token<'input>) -> Token<'input> {
        self.pos += 1;
        token
    }

    fn lex_segment(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        let inner_start = start + 1;
        match self.source[inner_start..].find(']') {
            Some(len) => {
                self.pos = inner_start + len + 1;
                Ok(Token::Segment(&self.source[inner_start..inner_start + len]))
            }
            None => Err(ParseError::UnterminatedSegment {
                position: self.position_at(start),
            }),
        }
    }

    fn lex_string(&mut self, quote: char) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\\' => self.pos += 2,
                b if b == quote as u8 => {
                    let content = &self.source[content_start..self.pos];
                    self.pos += 1;
                    return Ok(Token::StringLiteral(content));
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.source.len();
        Err(ParseError::UnterminatedString {
            position: self.position_at(start),
        })
    }

    /// `-?[0-9]+(\.[0-9]+)?` followed by a literal terminator
    fn lex_number(&mut self) -> Option<Token<'input>> {
        let bytes = self.rest().as_bytes();
        let mut i = usize::from(bytes.first() == Some(&b'-'));
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        let terminated = self.rest()[i..]
            .chars()
            .next()
            .is_none_or(is_literal_terminator);
        if !terminated {
            return None;
        }
        let literal = &self.rest()[..i];
        self.pos += i;
        Some(Token::NumberLiteral(literal))
    }

    fn lex_identifier(&mut self) -> Token<'input> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_identifier_char(c))
            .map_or(rest.len(), |(i, _)| i);
        let ident = &rest[..len];
        let after = &rest[len..];
        let terminated = after.chars().next().is_none_or(is_literal_terminator);

        if ident == "as" && after.trim_start().starts_with('|') {
            let pipe = len + (after.len() - after.trim_start().len());
            self.pos += pipe + 1;
            return Token::OpenBlockParams;
        }

        self.pos += len;
        match ident {
            "true" if terminated => Token::BooleanLiteral(true),
            "false" if terminated => Token::BooleanLiteral(false),
            "null" if terminated => Token::NullLiteral,
            "undefined" if terminated => Token::UndefinedLiteral,
            _ => Token::Identifier(ident),
        }
    }
}

impl<'input> Iterator for Tokenizer<'input> {
    type Item = ParseResult<Spanned<Token<'input>>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Tokenize a whole template
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn test_content_only() {
        assert_eq!(kinds("hello world"), vec![Token::Content("hello world")]);
        assert!(kinds("").is_empty());
    }

    #[test]
    fn test_simple_mustache() {
        assert_eq!(
            kinds("Hi {{name}}!"),
            vec![
                Token::Content("Hi "),
                Token::OpenEscaped { strip: false },
                Token::Identifier("name"),
                Token::CloseMustache { strip: false },
                Token::Content("!"),
            ]
        );
    }

    #[test]
    fn test_raw_mustache() {
        assert_eq!(
            kinds("{{{ html }}}"),
            vec![
                Token::OpenRaw { strip: false },
                Token::Identifier("html"),
                Token::CloseRaw { strip: false },
            ]
        );
    }

    #[test]
    fn test_block_tokens() {
        assert_eq!(
            kinds("{{#if ok}}y{{else}}n{{/if}}"),
            vec![
                Token::OpenBlock { strip: false },
                Token::Identifier("if"),
                Token::Identifier("ok"),
                Token::CloseMustache { strip: false },
                Token::Content("y"),
                Token::Else { strip: false },
                Token::CloseMustache { strip: false },
                Token::Content("n"),
                Token::CloseBlock { strip: false },
                Token::Identifier("if"),
                Token::CloseMustache { strip: false },
            ]
        );
    }

    #[test]
    fn test_else_prefix_is_identifier() {
        assert_eq!(
            kinds("{{elsewhere}}"),
            vec![
                Token::OpenEscaped { strip: false },
                Token::Identifier("elsewhere"),
                Token::CloseMustache { strip: false },
            ]
        );
    }

    #[test]
    fn test_strip_flags() {
        assert_eq!(
            kinds("{{~foo~}}"),
            vec![
                Token::OpenEscaped { strip: true },
                Token::Identifier("foo"),
                Token::CloseMustache { strip: true },
            ]
        );
        assert_eq!(
            kinds("{{~{foo}~}}"),
            vec![
                Token::OpenRaw { strip: true },
                Token::Identifier("foo"),
                Token::CloseRaw { strip: true },
            ]
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            kinds("{{../../a.b.[c d]}}")[1..6],
            [
                Token::ParentRef,
                Token::ParentRef,
                Token::Identifier("a"),
                Token::Dot,
                Token::Identifier("b"),
            ]
        );
        assert_eq!(
            kinds("{{@index}}")[1..3],
            [Token::At, Token::Identifier("index")]
        );
        assert_eq!(kinds("{{.}}")[1], Token::Dot);
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"{{f "a \"q\"" 'b' 12 -3.5 true false null undefined}}"#)[2..10],
            [
                Token::StringLiteral(r#"a \"q\""#),
                Token::StringLiteral("b"),
                Token::NumberLiteral("12"),
                Token::NumberLiteral("-3.5"),
                Token::BooleanLiteral(true),
                Token::BooleanLiteral(false),
                Token::NullLiteral,
                Token::UndefinedLiteral,
            ]
        );
    }

    #[test]
    fn test_number_needs_terminator() {
        assert_eq!(kinds("{{12abc}}")[1], Token::Identifier("12abc"));
        assert_eq!(kinds("{{truest}}")[1], Token::Identifier("truest"));
    }

    #[test]
    fn test_hash_and_subexpression() {
        assert_eq!(
            kinds("{{f (g x) key=1}}")[1..9],
            [
                Token::Identifier("f"),
                Token::OpenParen,
                Token::Identifier("g"),
                Token::Identifier("x"),
                Token::CloseParen,
                Token::Identifier("key"),
                Token::Equals,
                Token::NumberLiteral("1"),
            ]
        );
    }

    #[test]
    fn test_block_params() {
        assert_eq!(
            kinds("{{#each items as |item, i|}}")[3..8],
            [
                Token::OpenBlockParams,
                Token::Identifier("item"),
                Token::Comma,
                Token::Identifier("i"),
                Token::Pipe,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("a{{! note }}b"),
            vec![
                Token::Content("a"),
                Token::Comment {
                    body: " note ",
                    strip_open: false,
                    strip_close: false
                },
                Token::Content("b"),
            ]
        );
        assert_eq!(
            kinds("{{~!-- has }} inside --~}}")[0],
            Token::Comment {
                body: " has }} inside ",
                strip_open: true,
                strip_close: true
            }
        );
    }

    #[test]
    fn test_escaped_open() {
        assert_eq!(
            kinds(r"a\{{b}}"),
            vec![Token::Content("a"), Token::Content("{{b}}")]
        );
        assert_eq!(
            kinds(r"\\{{b}}")[..2],
            [Token::Content("\\"), Token::OpenEscaped { strip: false }]
        );
    }

    #[test]
    fn test_unterminated_mustache() {
        let err = tokenize("ab\n{{foo").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnterminatedMustache {
                position: SourcePosition::new(2, 1, 3)
            }
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize(r#"{{f "abc}}"#).unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedString { .. }));
        assert_eq!(err.column(), 5);
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("{{foo%}}").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter {
                character: '%',
                position: SourcePosition::new(1, 6, 5)
            }
        );
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut tokenizer = Tokenizer::new("{{#");
        assert!(tokenizer.next().unwrap().is_ok());
        assert!(tokenizer.next().unwrap().is_err());
        assert!(tokenizer.next().is_none());
    }
}
