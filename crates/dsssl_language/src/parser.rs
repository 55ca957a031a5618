//! Reader for DSSSL source.
//!
//! Converts a stream of tokens into s-expression [`Ast`] nodes. Quotation
//! shorthands are expanded here: `'x` reads as `(quote x)`, `` `x `` as
//! `(quasiquote x)`, `,x` as `(unquote x)` and `,@x` as
//! `(unquote-splicing x)`.

use dsssl_foundation::{Error, Result};

use crate::ast::{Ast, FormalMarker};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Reader for DSSSL source code.
pub struct Parser<'src> {
    /// The lexer providing tokens.
    lexer: Lexer<'src>,
    /// Current token (lookahead).
    current: Token,
}

impl<'src> Parser<'src> {
    /// Creates a new reader for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    /// Reads a single datum from the source.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read.
    pub fn parse(&mut self) -> Result<Ast> {
        self.skip_trivia();
        self.parse_form()
    }

    /// Reads all data from the source.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read.
    pub fn parse_all(&mut self) -> Result<Vec<Ast>> {
        let mut forms = Vec::new();
        self.skip_trivia();

        while self.current.kind != TokenKind::Eof {
            forms.push(self.parse_form()?);
            self.skip_trivia();
        }

        Ok(forms)
    }

    fn parse_form(&mut self) -> Result<Ast> {
        self.skip_trivia();
        let span = self.current.span;

        let atom = match &self.current.kind {
            TokenKind::True => Ast::Bool(true, span),
            TokenKind::False => Ast::Bool(false, span),
            TokenKind::Integer(n) => Ast::Integer(*n, span),
            TokenKind::Real(n) => Ast::Real(*n, span),
            TokenKind::Quantity { magnitude, unit } => Ast::Quantity(*magnitude, unit.clone(), span),
            TokenKind::Char(c) => Ast::Char(*c, span),
            TokenKind::String(s) => Ast::String(s.clone(), span),
            TokenKind::Symbol(name) => Ast::Symbol(name.clone(), span),
            TokenKind::Keyword(name) => Ast::Keyword(name.clone(), span),
            TokenKind::Optional => Ast::Marker(FormalMarker::Optional, span),
            TokenKind::Rest => Ast::Marker(FormalMarker::Rest, span),
            TokenKind::Key => Ast::Marker(FormalMarker::Key, span),
            TokenKind::LParen => return self.parse_list(),
            TokenKind::HashParen => return self.parse_vector(),
            TokenKind::Quote => return self.parse_abbreviation("quote"),
            TokenKind::Backtick => return self.parse_abbreviation("quasiquote"),
            TokenKind::Unquote => return self.parse_abbreviation("unquote"),
            TokenKind::UnquoteSplice => return self.parse_abbreviation("unquote-splicing"),
            TokenKind::Eof => return Err(self.error("unexpected end of input")),
            TokenKind::Error(msg) => return Err(self.error(msg)),
            TokenKind::RParen => return Err(self.error("unexpected `)`")),
            TokenKind::Dot => return Err(self.error("unexpected `.`")),
            TokenKind::Comment(_) => {
                self.advance();
                return self.parse_form();
            }
        };
        self.advance();
        Ok(atom)
    }

    /// Reads a list: `(...)` or `(... . tail)`.
    fn parse_list(&mut self) -> Result<Ast> {
        let start_span = self.current.span;
        self.advance();

        let mut elements = Vec::new();
        self.skip_trivia();

        while self.current.kind != TokenKind::RParen {
            match self.current.kind {
                TokenKind::Eof => return Err(self.error_at(start_span, "unterminated list")),
                TokenKind::Dot => {
                    if elements.is_empty() {
                        return Err(self.error("`.` must follow at least one element"));
                    }
                    self.advance();
                    let tail = self.parse_form()?;
                    self.skip_trivia();
                    let end_span = self.current.span;
                    if self.current.kind != TokenKind::RParen {
                        return Err(self.error("expected `)` after dotted tail"));
                    }
                    self.advance();
                    return Ok(Ast::DottedList(
                        elements,
                        Box::new(tail),
                        start_span.to(end_span),
                    ));
                }
                _ => elements.push(self.parse_form()?),
            }
            self.skip_trivia();
        }

        let end_span = self.current.span;
        self.advance();

        Ok(Ast::List(elements, start_span.to(end_span)))
    }

    /// Reads a vector: `#(...)`.
    fn parse_vector(&mut self) -> Result<Ast> {
        let start_span = self.current.span;
        self.advance();

        let mut elements = Vec::new();
        self.skip_trivia();

        while self.current.kind != TokenKind::RParen {
            if self.current.kind == TokenKind::Eof {
                return Err(self.error_at(start_span, "unterminated vector"));
            }
            elements.push(self.parse_form()?);
            self.skip_trivia();
        }

        let end_span = self.current.span;
        self.advance();

        Ok(Ast::Vector(elements, start_span.to(end_span)))
    }

    /// Reads `'x`-style shorthand as a two-element list.
    fn parse_abbreviation(&mut self, name: &str) -> Result<Ast> {
        let start_span = self.current.span;
        self.advance();
        let datum = self.parse_form()?;
        let span = start_span.to(datum.span());
        Ok(Ast::List(vec![Ast::Symbol(name.into(), start_span), datum], span))
    }

    fn skip_trivia(&mut self) {
        while matches!(self.current.kind, TokenKind::Comment(_)) {
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn error(&self, message: &str) -> Error {
        self.error_at(self.current.span, message)
    }

    #[allow(clippy::unused_self)]
    fn error_at(&self, span: Span, message: &str) -> Error {
        Error::syntax(message, span.location())
    }
}

/// Reads all data from source.
///
/// # Errors
/// Returns an error if the source cannot be read.
pub fn parse(source: &str) -> Result<Vec<Ast>> {
    Parser::new(source).parse_all()
}

/// Reads a single datum from source.
///
/// # Errors
/// Returns an error if the source cannot be read.
pub fn parse_one(source: &str) -> Result<Ast> {
    Parser::new(source).parse()
}
