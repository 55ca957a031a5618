//! Lexer for DSSSL source.
//!
//! The lexer converts source text into a stream of tokens.

use dsssl_foundation::Decimal;

use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Lexer for DSSSL source code.
pub struct Lexer<'src> {
    /// Source text being tokenized.
    source: &'src str,
    /// Remaining source text.
    rest: &'src str,
    /// Current byte offset in source.
    position: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        let Some(c) = self.peek_char() else {
            return Token::new(
                TokenKind::Eof,
                Span::new(start, start, start_line, start_column),
            );
        };

        let kind = match c {
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '\'' => {
                self.advance();
                TokenKind::Quote
            }
            '`' => {
                self.advance();
                TokenKind::Backtick
            }
            ',' => {
                self.advance();
                if self.peek_char() == Some('@') {
                    self.advance();
                    TokenKind::UnquoteSplice
                } else {
                    TokenKind::Unquote
                }
            }
            ';' => self.scan_comment(),
            '#' => self.scan_hash(),
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            '-' | '+' | '.' if self.starts_number() => self.scan_number(),
            '.' if self.peek_char_n(1).is_none_or(is_delimiter) => {
                self.advance();
                TokenKind::Dot
            }
            c if is_identifier_char(c) => self.scan_identifier(),
            c => {
                self.advance();
                TokenKind::Error(format!("unexpected character: {c}"))
            }
        };

        Token::new(
            kind,
            Span::new(start, self.position, start_line, start_column),
        )
    }

    /// Tokenizes all source and returns a vector of tokens.
    ///
    /// Comments are included in the output.
    #[must_use]
    pub fn tokenize_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// True if the text at the cursor is a sign or point followed by a digit.
    fn starts_number(&self) -> bool {
        match (self.peek_char(), self.peek_char_n(1), self.peek_char_n(2)) {
            (Some('.'), Some(d), _) => d.is_ascii_digit(),
            (Some('-' | '+'), Some(d), _) if d.is_ascii_digit() => true,
            (Some('-' | '+'), Some('.'), Some(d)) => d.is_ascii_digit(),
            _ => false,
        }
    }

    fn scan_comment(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.advance();
        }
        TokenKind::Comment(text)
    }

    /// Scans tokens starting with `#`.
    fn scan_hash(&mut self) -> TokenKind {
        self.advance(); // consume '#'
        match self.peek_char() {
            Some('(') => {
                self.advance();
                TokenKind::HashParen
            }
            Some('\\') => {
                self.advance();
                self.scan_char()
            }
            Some('!') => {
                self.advance();
                match self.scan_identifier_text().as_str() {
                    "optional" => TokenKind::Optional,
                    "rest" => TokenKind::Rest,
                    "key" => TokenKind::Key,
                    other => TokenKind::Error(format!("unknown #! marker: #!{other}")),
                }
            }
            Some(c) if is_identifier_char(c) => match self.scan_identifier_text().as_str() {
                "t" => TokenKind::True,
                "f" => TokenKind::False,
                other => TokenKind::Error(format!("unknown # syntax: #{other}")),
            },
            Some(c) => TokenKind::Error(format!("unexpected character after #: {c}")),
            None => TokenKind::Error("unexpected end of input after #".into()),
        }
    }

    /// Scans the character after `#\`.
    fn scan_char(&mut self) -> TokenKind {
        let Some(first) = self.peek_char() else {
            return TokenKind::Error("unexpected end of input in character literal".into());
        };
        self.advance();
        if !first.is_alphabetic() || !self.peek_char().is_some_and(is_identifier_char) {
            return TokenKind::Char(first);
        }
        let mut name = String::from(first);
        name.push_str(&self.scan_identifier_text());
        match name.as_str() {
            "space" => TokenKind::Char(' '),
            "newline" | "linefeed" => TokenKind::Char('\n'),
            "tab" => TokenKind::Char('\t'),
            "return" => TokenKind::Char('\r'),
            "null" => TokenKind::Char('\0'),
            _ => TokenKind::Error(format!("unknown character name: #\\{name}")),
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // consume opening '"'
        let mut text = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(c) => {
                            return TokenKind::Error(format!("invalid escape sequence: \\{c}"));
                        }
                        None => {
                            return TokenKind::Error(
                                "unexpected end of input in string escape".into(),
                            );
                        }
                    };
                    self.advance();
                    text.push(escaped);
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
                None => {
                    return TokenKind::Error("unterminated string literal".into());
                }
            }
        }
        TokenKind::String(text)
    }

    /// Scans a number, optionally followed by a unit name.
    fn scan_number(&mut self) -> TokenKind {
        let start = self.position;
        let mut has_dot = false;

        if matches!(self.peek_char(), Some('-' | '+')) {
            self.advance();
        }

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.position];

        if self.peek_char().is_some_and(char::is_alphabetic) {
            let unit = self.scan_identifier_text();
            if !unit.chars().all(char::is_alphabetic) {
                return TokenKind::Error(format!("invalid quantity: {text}{unit}"));
            }
            return match Decimal::parse(text) {
                Some(magnitude) => TokenKind::Quantity { magnitude, unit },
                None => TokenKind::Error(format!("invalid quantity: {text}{unit}")),
            };
        }

        if has_dot {
            match text.parse::<f64>() {
                Ok(n) => TokenKind::Real(n),
                Err(e) => TokenKind::Error(format!("invalid number: {e}")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Integer(n),
                Err(e) => TokenKind::Error(format!("invalid integer: {e}")),
            }
        }
    }

    /// Scans an identifier; a trailing `:` makes it a keyword.
    fn scan_identifier(&mut self) -> TokenKind {
        let name = self.scan_identifier_text();
        match name.strip_suffix(':') {
            Some(keyword) if !keyword.is_empty() => TokenKind::Keyword(keyword.to_string()),
            _ => TokenKind::Symbol(name),
        }
    }

    fn scan_identifier_text(&mut self) -> String {
        let start = self.position;
        while self.peek_char().is_some_and(is_identifier_char) {
            self.advance();
        }
        self.source[start..self.position].to_string()
    }
}

/// Returns true if `c` can appear in an identifier.
fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(
            c,
            '!' | '$' | '%' | '&' | '*' | '/' | ':' | '<' | '=' | '>' | '?' | '^' | '_' | '~'
                | '+' | '-' | '.'
        )
}

/// Returns true if `c` ends a token.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';' | '\'' | '`' | ',')
}
