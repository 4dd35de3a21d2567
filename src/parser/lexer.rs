//! Lexical analysis utilities

use super::error::ParseResult;
use super::span::Spanned;
use super::tokenizer::{Token, Tokenizer};
use std::collections::VecDeque;

/// Check if a character may appear in an identifier.
///
/// Identifiers are any run of characters that are neither whitespace nor one
/// of the punctuation characters the expression grammar reserves, so `foo-bar`,
/// `$index` and `élan` are all single identifiers.
#[inline]
pub fn is_identifier_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '!' | '"'
                | '#'
                | '%'
                | '&'
                | '\''
                | '('
                | ')'
                | '*'
                | '+'
                | ','
                | '.'
                | '/'
                | ';'
                | '<'
                | '='
                | '>'
                | '@'
                | '['
                | '\\'
                | ']'
                | '^'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// Check if a character may directly follow a literal keyword or number
#[inline]
pub fn is_literal_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '~' | '}' | ')' | '|')
}

/// Token stream with lookahead over the lazy tokenizer.
///
/// Tokens are pulled from the tokenizer only when the parser asks for them;
/// the buffer never holds more than the deepest lookahead requested.
pub struct TokenStream<'input> {
    tokenizer: Tokenizer<'input>,
    buffer: VecDeque<Spanned<Token<'input>>>,
}

impl<'input> TokenStream<'input> {
    /// Create a new token stream over the given source
    pub fn new(input: &'input str) -> Self {
        Self {
            tokenizer: Tokenizer::new(input),
            buffer: VecDeque::with_capacity(4),
        }
    }

    /// The source text being tokenized
    pub fn source(&self) -> &'input str {
        self.tokenizer.source()
    }

    fn fill(&mut self, n: usize) -> ParseResult<()> {
        while self.buffer.len() <= n {
            match self.tokenizer.next_token()? {
                Some(token) => self.buffer.push_back(token),
                None => break,
            }
        }
        Ok(())
    }

    /// Peek at the current token without consuming
    pub fn peek(&mut self) -> ParseResult<Option<&Spanned<Token<'input>>>> {
        self.fill(0)?;
        Ok(self.buffer.front())
    }

    /// Peek at a token n positions ahead
    pub fn peek_ahead(&mut self, n: usize) -> ParseResult<Option<&Spanned<Token<'input>>>> {
        self.fill(n)?;
        Ok(self.buffer.get(n))
    }

    /// Consume and return the current token
    pub fn next(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        self.fill(0)?;
        Ok(self.buffer.pop_front())
    }

    /// Consume a token if it matches the predicate
    pub fn consume_if<F>(&mut self, predicate: F) -> ParseResult<Option<Spanned<Token<'input>>>>
    where
        F: FnOnce(&Token<'input>) -> bool,
    {
        match self.peek()? {
            Some(token) if predicate(&token.value) => self.next(),
            _ => Ok(None),
        }
    }
}
