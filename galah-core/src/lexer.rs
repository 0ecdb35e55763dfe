//! Lexer for Galah source text.
//!
//! The lexer is a single forward scanner with one character of extra
//! lookahead. Whitespace and comments are emitted as trivia tokens; it is
//! up to the parser to decide where they matter.

use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::span::{Location, Size, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Fn,
    If,
    Else,
    Return,
    Let,
    Struct,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Fn => "fn",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::Return => "return",
            Keyword::Let => "let",
            Keyword::Struct => "struct",
        }
    }

    fn from_ident(ident: &str) -> Option<Keyword> {
        match ident {
            "fn" => Some(Keyword::Fn),
            "if" => Some(Keyword::If),
            "else" => Some(Keyword::Else),
            "return" => Some(Keyword::Return),
            "let" => Some(Keyword::Let),
            "struct" => Some(Keyword::Struct),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whitespace {
    Space,
    Tab,
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trivia {
    Whitespace(Whitespace),
    /// Comment text without the leading `//`.
    Comment(String),
}

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Colon,
    Comma,
    Period,
    Keyword(Keyword),
    /// Unescaped string contents.
    StringLiteral(String),
    IntegerLiteral(i64),
    Trivia(Trivia),
    /// A maximal run of operator characters, e.g. `+`, `==` or `->`.
    Op(String),
}

impl TokenKind {
    pub const NEWLINE: TokenKind = TokenKind::Trivia(Trivia::Whitespace(Whitespace::Newline));

    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Trivia(_))
    }

    pub fn is_op(&self, op: &str) -> bool {
        matches!(self, TokenKind::Op(token) if token == op)
    }

    /// How the token is referred to in "expected X, got Y" messages.
    pub fn noun(&self) -> String {
        match self {
            TokenKind::Ident(_) => "an ident".into(),
            TokenKind::LeftParen => "'('".into(),
            TokenKind::RightParen => "')'".into(),
            TokenKind::LeftBrace => "'{'".into(),
            TokenKind::RightBrace => "'}'".into(),
            TokenKind::Colon => "':'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Period => "'.'".into(),
            TokenKind::Keyword(keyword) => format!("'{}'", keyword.as_str()),
            TokenKind::StringLiteral(_) => "a string literal".into(),
            TokenKind::IntegerLiteral(_) => "an integer literal".into(),
            TokenKind::Trivia(Trivia::Whitespace(Whitespace::Space)) => "a space".into(),
            TokenKind::Trivia(Trivia::Whitespace(Whitespace::Tab)) => "a tab".into(),
            TokenKind::Trivia(Trivia::Whitespace(Whitespace::Newline)) => "a newline".into(),
            TokenKind::Trivia(Trivia::Comment(_)) => "a comment".into(),
            TokenKind::Op(op) => format!("'{op}'"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.noun())
    }
}

/// A single token with the location of its first character and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
    pub size: Size,
}

impl Token {
    pub fn new(kind: TokenKind, location: Location, size: Size) -> Self {
        Token {
            kind,
            location,
            size,
        }
    }

    /// Location just past the token's last character.
    pub fn end(&self) -> Location {
        self.location + self.size
    }

    pub fn span(&self) -> Span {
        self.location.span_until(self.end())
    }
}

const OPERATOR_CHARS: &[char] = &[
    '+', '-', '*', '/', '>', '<', '=', '!', '%', '^', '&', '|', '?', '~',
];

/// Lex a source string into tokens, including trivia.
///
/// Lexing stops at the first error.
pub fn lex(source: &str) -> Result<Vec<Token>, Diagnostic> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        index: 0,
        line: 1,
        column: 1,
    };
    lexer.run()
}

struct Lexer {
    chars: Vec<char>,
    index: usize,
    /// Location of `chars[index]`.
    line: usize,
    column: usize,
}

impl Lexer {
    fn run(&mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            let start = self.location();
            let kind = match ch {
                '(' => self.simple_token(TokenKind::LeftParen),
                ')' => self.simple_token(TokenKind::RightParen),
                '{' => self.simple_token(TokenKind::LeftBrace),
                '}' => self.simple_token(TokenKind::RightBrace),
                ':' => self.simple_token(TokenKind::Colon),
                ',' => self.simple_token(TokenKind::Comma),
                '.' => self.simple_token(TokenKind::Period),
                ' ' => self.simple_token(TokenKind::Trivia(Trivia::Whitespace(Whitespace::Space))),
                '\t' => self.simple_token(TokenKind::Trivia(Trivia::Whitespace(Whitespace::Tab))),
                '\n' => self.simple_token(TokenKind::NEWLINE),
                '\r' if self.peek_next() == Some('\n') => {
                    self.consume_char();
                    self.simple_token(TokenKind::NEWLINE)
                }
                '"' => self.lex_string(start)?,
                '/' if self.peek_next() == Some('/') => self.lex_comment(),
                '0'..='9' => self.lex_number(start)?,
                _ if is_ident_start(ch) => self.lex_ident_or_keyword(),
                _ if OPERATOR_CHARS.contains(&ch) => self.lex_operator(),
                _ => {
                    return Err(Diagnostic::error_at(
                        format!("Unexpected character '{}'", ch.escape_debug()),
                        start,
                    ));
                }
            };

            let size = self.size_since(start);
            tokens.push(Token::new(kind, start, size));
        }

        Ok(tokens)
    }

    fn simple_token(&mut self, kind: TokenKind) -> TokenKind {
        self.consume_char();
        kind
    }

    fn lex_string(&mut self, start: Location) -> Result<TokenKind, Diagnostic> {
        // Opening quote
        self.consume_char();

        let mut content = String::new();
        loop {
            let escape_location = self.location();
            match self.consume_char() {
                None => {
                    return Err(Diagnostic::error_at("Unterminated string literal", start));
                }
                Some('"') => return Ok(TokenKind::StringLiteral(content)),
                Some('\\') => {
                    let escaped = match self.consume_char() {
                        None => {
                            return Err(Diagnostic::error_at(
                                "Unterminated string literal",
                                start,
                            ));
                        }
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some(other) => {
                            return Err(Diagnostic::error_at(
                                format!("Invalid escape sequence '\\{}'", other.escape_debug()),
                                escape_location,
                            ));
                        }
                    };
                    content.push(escaped);
                }
                Some('\r') => {
                    if self.peek_char() == Some('\n') {
                        self.consume_char();
                    }
                    content.push('\n');
                }
                Some(ch) => content.push(ch),
            }
        }
    }

    fn lex_comment(&mut self) -> TokenKind {
        // The leading `//`
        self.consume_char();
        self.consume_char();

        let mut content = String::new();
        while let Some(ch) = self.peek_char() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.consume_char();
            content.push(ch);
        }
        TokenKind::Trivia(Trivia::Comment(content))
    }

    fn lex_number(&mut self, start: Location) -> Result<TokenKind, Diagnostic> {
        let mut digits = String::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.consume_char();
                digits.push(ch);
            } else {
                break;
            }
        }

        digits
            .parse::<i64>()
            .map(TokenKind::IntegerLiteral)
            .map_err(|_| {
                Diagnostic::error_at(format!("Integer literal '{digits}' is out of range"), start)
            })
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let mut ident = String::new();
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
                ident.push(ch);
            } else {
                break;
            }
        }

        match Keyword::from_ident(&ident) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(ident),
        }
    }

    fn lex_operator(&mut self) -> TokenKind {
        let mut op = String::new();
        while let Some(ch) = self.peek_char() {
            if OPERATOR_CHARS.contains(&ch) {
                self.consume_char();
                op.push(ch);
            } else {
                break;
            }
        }
        TokenKind::Op(op)
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn size_since(&self, start: Location) -> Size {
        if self.line == start.line {
            Size::columns(self.column - start.column)
        } else {
            Size {
                lines: self.line - start.line + 1,
                last_line_columns: self.column - 1,
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.index += 1;
        match ch {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            // Only `\n` breaks a line, so a `\r\n` pair counts once and a
            // lone `\r` is an ordinary column.
            '\r' if self.peek_char() == Some('\n') => {}
            _ => self.column += 1,
        }
        Some(ch)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_locations(source: &str) -> Vec<(TokenKind, usize, usize)> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| (token.kind, token.location.line, token.location.column))
            .collect()
    }

    #[test]
    fn lexes_idents_separated_by_a_space() {
        assert_eq!(
            kinds_and_locations("a b"),
            vec![
                (TokenKind::Ident("a".into()), 1, 1),
                (TokenKind::Trivia(Trivia::Whitespace(Whitespace::Space)), 1, 2),
                (TokenKind::Ident("b".into()), 1, 3),
            ]
        );
    }

    #[test]
    fn lexes_integer_literal() {
        assert_eq!(
            kinds_and_locations("123"),
            vec![(TokenKind::IntegerLiteral(123), 1, 1)]
        );
    }

    #[test]
    fn lexes_comment_followed_by_crlf() {
        assert_eq!(
            kinds_and_locations("// comment\t\r\n123"),
            vec![
                (TokenKind::Trivia(Trivia::Comment(" comment\t".into())), 1, 1),
                (TokenKind::NEWLINE, 1, 12),
                (TokenKind::IntegerLiteral(123), 2, 1),
            ]
        );
    }

    #[test]
    fn lexes_keywords_and_punctuation() {
        let kinds: Vec<TokenKind> = lex("struct fn(x.y){}:,")
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .filter(|kind| !kind.is_trivia())
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::Struct),
                TokenKind::Keyword(Keyword::Fn),
                TokenKind::LeftParen,
                TokenKind::Ident("x".into()),
                TokenKind::Period,
                TokenKind::Ident("y".into()),
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Colon,
                TokenKind::Comma,
            ]
        );
    }

    #[test]
    fn operator_runs_are_single_tokens() {
        let kinds: Vec<TokenKind> = lex("a==b->c||!d")
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Op("==".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Op("->".into()),
                TokenKind::Ident("c".into()),
                TokenKind::Op("||!".into()),
                TokenKind::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn unescapes_string_literals() {
        let tokens = lex(r#""a\"b\\c\n\t\0""#).expect("lex");
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            tokens[0].kind,
            TokenKind::StringLiteral("a\"b\\c\n\t\0".into())
        );
        assert_eq!(tokens[0].end(), Location::new(1, 16));
    }

    #[test]
    fn unescapes_carriage_return() {
        let tokens = lex(r#""a\rb""#).expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("a\rb".into()));
        assert_eq!(tokens[0].end(), Location::new(1, 7));
    }

    #[test]
    fn lone_carriage_return_is_not_a_line_break() {
        let tokens = lex("\"a\rb\" x").expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("a\nb".into()));
        assert_eq!(tokens[0].end(), Location::new(1, 6));
        assert_eq!(tokens[2].kind, TokenKind::Ident("x".into()));
        assert_eq!(tokens[2].location, Location::new(1, 7));
    }

    #[test]
    fn multi_line_string_moves_following_locations() {
        let tokens = lex("\"ab\r\ncd\" x").expect("lex");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("ab\ncd".into()));
        assert_eq!(tokens[0].end(), Location::new(2, 4));
        assert_eq!(tokens[2].kind, TokenKind::Ident("x".into()));
        assert_eq!(tokens[2].location, Location::new(2, 5));
    }

    #[test]
    fn rejects_unterminated_string_literal() {
        let err = lex("\"asdf").unwrap_err();
        assert_eq!(err.message, "Unterminated string literal");
        assert_eq!(err.to_string(), "error:1:1: Unterminated string literal");
    }

    #[test]
    fn rejects_invalid_escape_sequence() {
        let err = lex("x \"ab\\q\"").unwrap_err();
        assert_eq!(err.to_string(), "error:1:6: Invalid escape sequence '\\q'");
    }

    #[test]
    fn rejects_unexpected_character() {
        let err = lex("let a = $").unwrap_err();
        assert_eq!(err.to_string(), "error:1:9: Unexpected character '$'");
    }

    #[test]
    fn rejects_out_of_range_integer_literal() {
        let err = lex("99999999999999999999").unwrap_err();
        assert!(err.message.contains("out of range"));
    }
}
