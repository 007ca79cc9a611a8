//! Script lexer/tokenizer
//!
//! This module implements a lexer for the JS-flavored script subset that the
//! bridge frontend executes. It produces tokens from source code, including
//! template literals split into head/middle/tail around substitutions.

mod token;

pub use token::{Keyword, Token, TokenKind};

use crate::error::{Error, Result, SourceLocation};

/// A lexer for script source code
pub struct Lexer<'src> {
    /// Source code being lexed
    source: &'src str,
    /// Source as bytes for faster access
    bytes: &'src [u8],
    /// Current position in bytes
    pos: usize,
    /// Current line number (1-indexed)
    line: u32,
    /// Current column number (1-indexed)
    column: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Get current source location
    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    /// Create a lexer error with source context
    fn error(&self, message: impl Into<String>, location: SourceLocation) -> Error {
        Error::lexer_error_with_context(message, location, self.source)
    }

    /// Check if we've reached the end of input
    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        if self.is_eof() {
            None
        } else {
            self.source[self.pos..].chars().next()
        }
    }

    /// Peek at next character (one ahead)
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advance and return current character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            if self.peek() == Some('/') {
                if self.peek_next() == Some('/') {
                    // Single-line comment
                    self.advance();
                    self.advance();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    continue;
                } else if self.peek_next() == Some('*') {
                    // Multi-line comment
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => break, // Unterminated comment, will error later
                            Some('*') if self.peek_next() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                    continue;
                }
            }

            break;
        }
    }

    /// Check if character can start an identifier
    fn is_id_start(c: char) -> bool {
        c == '_' || c == '$' || unicode_xid::UnicodeXID::is_xid_start(c)
    }

    /// Check if character can continue an identifier
    fn is_id_continue(c: char) -> bool {
        c == '_' || c == '$' || unicode_xid::UnicodeXID::is_xid_continue(c)
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> Token<'src> {
        let start = self.pos;
        let start_loc = self.location();

        while let Some(c) = self.peek() {
            if Self::is_id_continue(c) {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.pos];
        let kind = match Keyword::from_str(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        };

        Token {
            kind,
            text,
            location: start_loc,
        }
    }

    /// Scan a numeric literal (decimal, optional fraction and exponent)
    fn scan_number(&mut self) -> Result<Token<'src>> {
        let start = self.pos;
        let start_loc = self.location();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        // Decimal point
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // Exponent
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        Ok(Token {
            kind: TokenKind::NumberLiteral,
            text: &self.source[start..self.pos],
            location: start_loc,
        })
    }

    /// Scan a string literal
    fn scan_string(&mut self, quote: char) -> Result<Token<'src>> {
        let start = self.pos;
        let start_loc = self.location();
        self.advance(); // Opening quote

        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return Err(self.error("Unterminated string literal", start_loc));
                }
                Some('\\') => {
                    self.advance();
                    self.advance(); // Escaped character
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }

        Ok(Token {
            kind: TokenKind::StringLiteral,
            text: &self.source[start..self.pos],
            location: start_loc,
        })
    }

    /// Scan a template literal
    fn scan_template(&mut self) -> Result<Token<'src>> {
        let start = self.pos;
        let start_loc = self.location();
        self.advance(); // Opening backtick

        let mut has_substitution = false;
        loop {
            match self.peek() {
                None => {
                    return Err(self.error("Unterminated template literal", start_loc));
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('$') if self.peek_next() == Some('{') => {
                    // End template head, substitution starts; ${ stays in the token
                    self.advance();
                    self.advance();
                    has_substitution = true;
                    break;
                }
                Some('`') => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }

        let kind = if has_substitution {
            TokenKind::TemplateHead
        } else {
            TokenKind::TemplateLiteral
        };

        Ok(Token {
            kind,
            text: &self.source[start..self.pos],
            location: start_loc,
        })
    }

    /// Continue scanning a template literal after a `}` closes a substitution
    fn scan_template_continuation(&mut self) -> Result<Token<'src>> {
        let start = self.pos;
        let start_loc = self.location();

        let mut has_substitution = false;
        loop {
            match self.peek() {
                None => {
                    return Err(self.error("Unterminated template literal", start_loc));
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('$') if self.peek_next() == Some('{') => {
                    self.advance();
                    self.advance();
                    has_substitution = true;
                    break;
                }
                Some('`') => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }

        let kind = if has_substitution {
            TokenKind::TemplateMiddle
        } else {
            TokenKind::TemplateTail
        };

        Ok(Token {
            kind,
            text: &self.source[start..self.pos],
            location: start_loc,
        })
    }

    /// Scan the next token
    pub fn next_token(&mut self) -> Result<Token<'src>> {
        self.skip_whitespace_and_comments();

        if self.is_eof() {
            return Ok(Token {
                kind: TokenKind::Eof,
                text: "",
                location: self.location(),
            });
        }

        let start_loc = self.location();
        let c = self.peek().unwrap();

        if Self::is_id_start(c) {
            return Ok(self.scan_identifier());
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        if c == '`' {
            return self.scan_template();
        }

        let start = self.pos;
        self.advance();

        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::DotDotDot
                } else {
                    TokenKind::Dot
                }
            }
            '+' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::PlusEquals
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::MinusEquals
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::LessEquals
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::GreaterEquals
                } else {
                    TokenKind::Greater
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::EqualsEqualsEquals
                    } else {
                        TokenKind::EqualsEquals
                    }
                } else {
                    TokenKind::Equals
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::BangEqualsEquals
                    } else {
                        TokenKind::BangEquals
                    }
                } else {
                    TokenKind::Bang
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AmpersandAmpersand
                } else {
                    return Err(self.error("Unexpected character '&'", start_loc));
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    return Err(self.error("Unexpected character '|'", start_loc));
                }
            }
            _ => {
                return Err(self.error(format!("Unexpected character '{}'", c), start_loc));
            }
        };

        Ok(Token {
            kind,
            text: &self.source[start..self.pos],
            location: start_loc,
        })
    }

    /// Tokenize the entire source into a vector of tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token<'src>>> {
        let mut tokens = Vec::new();
        let mut template_depth: i32 = 0; // Track nested template literals
        let mut brace_depth_stack: Vec<i32> = Vec::new(); // Brace depth per template level

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;

            match token.kind {
                TokenKind::TemplateHead => {
                    template_depth += 1;
                    brace_depth_stack.push(0);
                    tokens.push(token);
                }
                TokenKind::LeftBrace if template_depth > 0 => {
                    if let Some(depth) = brace_depth_stack.last_mut() {
                        *depth += 1;
                    }
                    tokens.push(token);
                }
                TokenKind::RightBrace if template_depth > 0 => {
                    if let Some(depth) = brace_depth_stack.last_mut() {
                        if *depth == 0 {
                            // This closes the template substitution
                            tokens.push(token);

                            let continuation = self.scan_template_continuation()?;
                            if continuation.kind == TokenKind::TemplateTail {
                                template_depth -= 1;
                                brace_depth_stack.pop();
                            }
                            tokens.push(continuation);
                        } else {
                            *depth -= 1;
                            tokens.push(token);
                        }
                    } else {
                        tokens.push(token);
                    }
                }
                _ => {
                    tokens.push(token);
                }
            }

            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source() {
        let mut lexer = Lexer::new("");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Eof);
    }

    #[test]
    fn test_identifiers() {
        let mut lexer = Lexer::new("foo bar _private $jquery value_");
        assert_eq!(lexer.next_token().unwrap().text, "foo");
        assert_eq!(lexer.next_token().unwrap().text, "bar");
        assert_eq!(lexer.next_token().unwrap().text, "_private");
        assert_eq!(lexer.next_token().unwrap().text, "$jquery");
        assert_eq!(lexer.next_token().unwrap().text, "value_");
    }

    #[test]
    fn test_keywords() {
        let mut lexer = Lexer::new("var let const new is");
        assert_eq!(
            lexer.next_token().unwrap().kind,
            TokenKind::Keyword(Keyword::Var)
        );
        assert_eq!(
            lexer.next_token().unwrap().kind,
            TokenKind::Keyword(Keyword::Let)
        );
        assert_eq!(
            lexer.next_token().unwrap().kind,
            TokenKind::Keyword(Keyword::Const)
        );
        assert_eq!(
            lexer.next_token().unwrap().kind,
            TokenKind::Keyword(Keyword::New)
        );
        assert_eq!(
            lexer.next_token().unwrap().kind,
            TokenKind::Keyword(Keyword::Is)
        );
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 3.14 13.37 1e3");
        assert_eq!(lexer.next_token().unwrap().text, "42");
        assert_eq!(lexer.next_token().unwrap().text, "3.14");
        assert_eq!(lexer.next_token().unwrap().text, "13.37");
        assert_eq!(lexer.next_token().unwrap().text, "1e3");
    }

    #[test]
    fn test_strings() {
        let mut lexer = Lexer::new(r#""hello" 'world'"#);
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::StringLiteral);
        assert_eq!(t.text, "\"hello\"");
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::StringLiteral);
        assert_eq!(t.text, "'world'");
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("'oops");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn test_template_plain() {
        let mut lexer = Lexer::new("`hello world`");
        let t = lexer.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::TemplateLiteral);
    }

    #[test]
    fn test_template_with_substitution() {
        let mut lexer = Lexer::new("`a ${x} b ${y} c`");
        let tokens = lexer.tokenize().unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TemplateHead,
                TokenKind::Identifier,
                TokenKind::RightBrace,
                TokenKind::TemplateMiddle,
                TokenKind::Identifier,
                TokenKind::RightBrace,
                TokenKind::TemplateTail,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_template_nested_braces() {
        // Object literal inside a substitution must not close the template
        let mut lexer = Lexer::new("`v: ${ {a: 1} } end`");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens.first().unwrap().kind, TokenKind::TemplateHead);
        assert_eq!(
            tokens.iter().filter(|t| t.kind == TokenKind::TemplateTail).count(),
            1
        );
    }

    #[test]
    fn test_operators() {
        let mut lexer = Lexer::new("=== !== == != <= >= && || += -=");
        let expected = [
            TokenKind::EqualsEqualsEquals,
            TokenKind::BangEqualsEquals,
            TokenKind::EqualsEquals,
            TokenKind::BangEquals,
            TokenKind::LessEquals,
            TokenKind::GreaterEquals,
            TokenKind::AmpersandAmpersand,
            TokenKind::PipePipe,
            TokenKind::PlusEquals,
            TokenKind::MinusEquals,
        ];
        for kind in expected {
            assert_eq!(lexer.next_token().unwrap().kind, kind);
        }
    }

    #[test]
    fn test_comments_skipped() {
        let mut lexer = Lexer::new("a // line comment\n/* block */ b");
        assert_eq!(lexer.next_token().unwrap().text, "a");
        assert_eq!(lexer.next_token().unwrap().text, "b");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_rest_parameter_token() {
        let mut lexer = Lexer::new("...args");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::DotDotDot);
        assert_eq!(lexer.next_token().unwrap().text, "args");
    }
}
