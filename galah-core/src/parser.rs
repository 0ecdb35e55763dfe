//! Recursive-descent parser from tokens to the untyped [`Ast`].
//!
//! Trivia is skipped explicitly at every decision point. It is significant
//! in a few places: keywords must be followed by whitespace, statements are
//! separated by newlines, and the spacing around operators decides between
//! prefix and infix application.
//!
//! There is no operator precedence. An operator takes the whole remaining
//! expression as its right operand, so `1 + 2 * 3` is `1 + (2 * 3)`.

use crate::ast::{
    Ast, ElseBlock, Expr, Field, FnDecl, FnSignature, IfStmt, Param, Stmt, StructDecl,
    StructInitField, Type, VarDecl,
};
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lexer::{Keyword, Token, TokenKind, Trivia, Whitespace, lex};
use crate::span::{Location, Spanned};

type ParseResult<T> = Result<T, Diagnostic>;

/// Lex and parse a source string.
pub fn parse_source(source: &str) -> Result<Ast, CoreError> {
    let tokens = lex(source).map_err(CoreError::Lex)?;
    parse(&tokens).map_err(CoreError::Parse)
}

/// Parse a token stream produced by [`lex`].
pub fn parse(tokens: &[Token]) -> Result<Ast, Diagnostic> {
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    parser.parse_ast()
}

/// Whether an identifier followed by `{` may start a struct literal.
///
/// Forbidden in `if` conditions, where the `{` opens the block instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StructLiterals {
    Allowed,
    Forbidden,
}

#[derive(Debug, Default, Clone, Copy)]
struct SkippedTrivia {
    whitespace: bool,
    newline: bool,
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> Parser<'a> {
    fn parse_ast(&mut self) -> ParseResult<Ast> {
        let mut ast = Ast::default();

        self.skip_trivia();
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Keyword(Keyword::Struct) => {
                    ast.struct_decls.push(self.parse_struct_decl()?);
                }
                TokenKind::Keyword(Keyword::Fn) => {
                    ast.fn_decls.push(self.parse_fn_decl()?);
                }
                ref other => {
                    return Err(Diagnostic::error_at(
                        format!(
                            "Unexpected token {} while parsing top-level declarations",
                            other.noun()
                        ),
                        token.location,
                    ));
                }
            }
            self.skip_trivia();
        }

        Ok(ast)
    }

    fn parse_struct_decl(&mut self) -> ParseResult<Spanned<StructDecl>> {
        let start = self.peek_location();
        self.expect(TokenKind::Keyword(Keyword::Struct))?;
        self.expect_whitespace_skipping_trivia()?;
        let ident = self.expect_ident()?;

        self.skip_trivia();
        self.expect(TokenKind::LeftBrace)?;
        self.skip_trivia();

        let mut fields = Vec::new();
        while self.peek_kind().is_some_and(|kind| *kind != TokenKind::RightBrace) {
            fields.push(self.parse_field()?);
            if !self.skip_comma() {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;

        Ok(self.spanned_from(start, StructDecl { ident, fields }))
    }

    fn parse_field(&mut self) -> ParseResult<Spanned<Field>> {
        let start = self.peek_location();
        let ident = self.expect_ident()?;
        self.skip_trivia();
        self.expect(TokenKind::Colon)?;
        self.skip_trivia();
        let ty = self.parse_type()?;
        Ok(self.spanned_from(start, Field { ident, ty }))
    }

    fn parse_fn_decl(&mut self) -> ParseResult<Spanned<FnDecl>> {
        let start = self.peek_location();
        let signature = self.parse_fn_signature()?;
        self.skip_trivia();
        let stmts = self.parse_code_block()?;
        Ok(self.spanned_from(start, FnDecl { signature, stmts }))
    }

    fn parse_fn_signature(&mut self) -> ParseResult<Spanned<FnSignature>> {
        let start = self.peek_location();
        self.expect(TokenKind::Keyword(Keyword::Fn))?;
        self.expect_whitespace_skipping_trivia()?;
        let ident = self.expect_ident()?;

        self.expect(TokenKind::LeftParen)?;
        self.skip_trivia();

        let mut params = Vec::new();
        while self.peek_kind().is_some_and(|kind| *kind != TokenKind::RightParen) {
            params.push(self.parse_param()?);
            if !self.skip_comma() {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;

        let return_type = if self.peek_past_trivia().is_some_and(|kind| kind.is_op("->")) {
            self.skip_trivia();
            self.next();
            self.skip_trivia();
            Some(self.parse_type()?)
        } else {
            None
        };

        Ok(self.spanned_from(
            start,
            FnSignature {
                ident,
                params,
                return_type,
            },
        ))
    }

    fn parse_param(&mut self) -> ParseResult<Spanned<Param>> {
        let start = self.peek_location();
        let ident = self.expect_ident()?;
        self.skip_trivia();
        self.expect(TokenKind::Colon)?;
        self.skip_trivia();
        let ty = self.parse_type()?;
        Ok(self.spanned_from(start, Param { ident, ty }))
    }

    fn parse_type(&mut self) -> ParseResult<Spanned<Type>> {
        Ok(self.expect_ident()?.map(Type::Nominal))
    }

    /// `{`, statements separated by newlines, `}`.
    fn parse_code_block(&mut self) -> ParseResult<Vec<Spanned<Stmt>>> {
        self.expect(TokenKind::LeftBrace)?;
        self.skip_trivia();

        let mut stmts = Vec::new();
        while self.peek_kind().is_some_and(|kind| *kind != TokenKind::RightBrace) {
            let stmt = self.parse_stmt()?;
            let ends_with_code_block = matches!(stmt.inner, Stmt::If(_));
            stmts.push(stmt);

            if ends_with_code_block {
                self.skip_trivia();
            } else {
                self.expect_newline_skipping_trivia()?;
            }
        }
        self.expect(TokenKind::RightBrace)?;

        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> ParseResult<Spanned<Stmt>> {
        let start = self.peek_location();
        let stmt = match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::If)) => Stmt::If(self.parse_if_stmt()?),
            Some(TokenKind::Keyword(Keyword::Return)) => Stmt::Return(self.parse_return_stmt()?),
            Some(TokenKind::Keyword(Keyword::Let)) => Stmt::Let(self.parse_let_stmt()?),
            _ => Stmt::Expr(self.parse_expr(StructLiterals::Allowed)?),
        };
        Ok(self.spanned_from(start, stmt))
    }

    fn parse_return_stmt(&mut self) -> ParseResult<Option<Spanned<Expr>>> {
        self.expect(TokenKind::Keyword(Keyword::Return))?;

        // Never look for the value past the end of the line.
        while let Some(TokenKind::Trivia(trivia)) = self.peek_kind() {
            if *trivia == Trivia::Whitespace(Whitespace::Newline) {
                break;
            }
            self.next();
        }

        match self.peek_kind() {
            None | Some(TokenKind::RightBrace) => Ok(None),
            Some(kind) if *kind == TokenKind::NEWLINE => Ok(None),
            Some(_) => Ok(Some(self.parse_expr(StructLiterals::Allowed)?)),
        }
    }

    fn parse_let_stmt(&mut self) -> ParseResult<VarDecl> {
        self.expect(TokenKind::Keyword(Keyword::Let))?;
        self.expect_whitespace_skipping_trivia()?;

        let ident = self.expect_ident()?;
        self.skip_trivia();

        let ty = if self.peek_kind() == Some(&TokenKind::Colon) {
            self.next();
            self.skip_trivia();
            let ty = self.parse_type()?;
            self.skip_trivia();
            Some(ty)
        } else {
            None
        };

        self.expect(TokenKind::Op("=".to_string()))?;
        self.skip_trivia();

        let value = self.parse_expr(StructLiterals::Allowed)?;
        Ok(VarDecl { ident, ty, value })
    }

    fn parse_if_stmt(&mut self) -> ParseResult<Spanned<IfStmt>> {
        let start = self.peek_location();
        self.expect(TokenKind::Keyword(Keyword::If))?;
        self.expect_whitespace_skipping_trivia()?;
        let condition = self.parse_expr(StructLiterals::Forbidden)?;
        self.skip_trivia();
        let if_block = self.parse_code_block()?;

        let else_block = if self.peek_past_trivia() == Some(&TokenKind::Keyword(Keyword::Else)) {
            self.skip_trivia();
            self.next();
            self.skip_trivia();

            match self.peek_kind() {
                Some(TokenKind::Keyword(Keyword::If)) => {
                    Some(ElseBlock::ElseIf(Box::new(self.parse_if_stmt()?)))
                }
                Some(TokenKind::LeftBrace) => Some(ElseBlock::Else(self.parse_code_block()?)),
                other => {
                    return Err(Diagnostic::error_at(
                        format!("Expected 'if' or '{{', got {}", noun_or_eof(other)),
                        self.peek_location(),
                    ));
                }
            }
        } else {
            None
        };

        Ok(self.spanned_from(
            start,
            IfStmt {
                condition,
                if_block,
                else_block,
            },
        ))
    }

    fn parse_expr(&mut self, struct_literals: StructLiterals) -> ParseResult<Spanned<Expr>> {
        let start = self.peek_location();
        let Some(token) = self.next() else {
            return Err(Diagnostic::error_at(
                "Unexpected EOF while parsing expression",
                start,
            ));
        };

        let mut expr = match &token.kind {
            TokenKind::Ident(ident) => {
                let ident = Spanned::new(ident.clone(), token.span());
                if self.peek_kind() == Some(&TokenKind::LeftParen) {
                    Expr::FnCall {
                        ident,
                        arguments: self.parse_tuple()?,
                    }
                } else if struct_literals == StructLiterals::Allowed
                    && self.peek_past_trivia() == Some(&TokenKind::LeftBrace)
                {
                    Expr::StructInit {
                        ident,
                        fields: self.parse_struct_init_block()?,
                    }
                } else {
                    Expr::Ident(ident.inner)
                }
            }
            TokenKind::StringLiteral(value) => Expr::StringLiteral(value.clone()),
            TokenKind::IntegerLiteral(value) => Expr::IntegerLiteral(*value),
            TokenKind::Op(op) => {
                if self.peek_kind().is_some_and(TokenKind::is_trivia) {
                    return Err(Diagnostic::error_at(
                        "A prefix unary operator must not be separated from its operand",
                        token.location,
                    ));
                }
                Expr::UnaryOp {
                    op: Spanned::new(op.clone(), token.span()),
                    operand: Box::new(self.parse_expr(struct_literals)?),
                }
            }
            TokenKind::LeftParen => {
                self.skip_trivia();
                let inner = self.parse_expr(StructLiterals::Allowed)?;
                self.skip_trivia();
                self.expect(TokenKind::RightParen)?;
                Expr::Parenthesized(Box::new(inner))
            }
            other => {
                return Err(Diagnostic::error_at(
                    format!("Expected an expression, got {}", other.noun()),
                    token.location,
                ));
            }
        };

        while self.peek_kind() == Some(&TokenKind::Period) {
            let base = self.spanned_from(start, expr);
            self.next();
            let member = self.expect_ident()?;
            expr = Expr::MemberAccess {
                base: Box::new(base),
                member,
            };
        }

        let left_end = self.last_end();
        let checkpoint = self.position;
        let before = self.skip_trivia();
        let Some((op_token, op)) = self.peek_op() else {
            self.position = checkpoint;
            return Ok(self.spanned_from(start, expr));
        };
        self.next();

        let op = Spanned::new(op.to_string(), op_token.span());
        let after = self.skip_trivia();
        if before.whitespace != after.whitespace {
            return Err(Diagnostic::error_at(
                "A binary operator must either have whitespace on both sides or none at all",
                op_token.location,
            ));
        }

        let left = Spanned::new(expr, start.span_until(left_end));
        let right = self.parse_expr(struct_literals)?;
        Ok(self.spanned_from(
            start,
            Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        ))
    }

    /// `( expr, ... )` as used by call arguments.
    fn parse_tuple(&mut self) -> ParseResult<Vec<Spanned<Expr>>> {
        self.expect(TokenKind::LeftParen)?;
        self.skip_trivia();

        let mut elements = Vec::new();
        while self.peek_kind().is_some_and(|kind| *kind != TokenKind::RightParen) {
            elements.push(self.parse_expr(StructLiterals::Allowed)?);
            if !self.skip_comma() {
                break;
            }
        }

        self.skip_trivia();
        self.expect(TokenKind::RightParen)?;
        Ok(elements)
    }

    fn parse_struct_init_block(&mut self) -> ParseResult<Spanned<Vec<Spanned<StructInitField>>>> {
        self.skip_trivia();
        let start = self.peek_location();
        self.expect(TokenKind::LeftBrace)?;
        self.skip_trivia();

        let mut fields = Vec::new();
        while self.peek_kind().is_some_and(|kind| *kind != TokenKind::RightBrace) {
            let field_start = self.peek_location();
            let ident = self.expect_ident()?;
            self.skip_trivia();
            self.expect(TokenKind::Colon)?;
            self.skip_trivia();
            let value = self.parse_expr(StructLiterals::Allowed)?;
            fields.push(self.spanned_from(field_start, StructInitField { ident, value }));

            if !self.skip_comma() {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;

        Ok(self.spanned_from(start, fields))
    }

    /// Skips trivia and an optional comma with the trivia after it. Returns
    /// whether there was a comma.
    fn skip_comma(&mut self) -> bool {
        self.skip_trivia();
        if self.peek_kind() == Some(&TokenKind::Comma) {
            self.next();
            self.skip_trivia();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn peek_op(&self) -> Option<(&'a Token, &'a str)> {
        let token = self.peek()?;
        match &token.kind {
            TokenKind::Op(op) => Some((token, op.as_str())),
            _ => None,
        }
    }

    fn peek_past_trivia(&self) -> Option<&'a TokenKind> {
        self.tokens[self.position..]
            .iter()
            .map(|token| &token.kind)
            .find(|kind| !kind.is_trivia())
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// Where the next token starts, or where the input ends.
    fn peek_location(&self) -> Location {
        match self.peek() {
            Some(token) => token.location,
            None => self.last_end(),
        }
    }

    /// The end of the most recently consumed token.
    fn last_end(&self) -> Location {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or(Location::new(1, 1), Token::end)
    }

    fn spanned_from<T>(&self, start: Location, inner: T) -> Spanned<T> {
        Spanned::new(inner, start.span_until(self.last_end()))
    }

    fn skip_trivia(&mut self) -> SkippedTrivia {
        let mut skipped = SkippedTrivia::default();
        while let Some(TokenKind::Trivia(trivia)) = self.peek_kind() {
            if let Trivia::Whitespace(whitespace) = trivia {
                skipped.whitespace = true;
                skipped.newline |= *whitespace == Whitespace::Newline;
            }
            self.next();
        }
        skipped
    }

    fn expect_whitespace_skipping_trivia(&mut self) -> ParseResult<()> {
        if self.skip_trivia().whitespace {
            Ok(())
        } else {
            Err(Diagnostic::error_at(
                format!("Expected whitespace, got {}", noun_or_eof(self.peek_kind())),
                self.peek_location(),
            ))
        }
    }

    /// Statement separator. A missing newline is tolerated right before the
    /// closing brace of the block.
    fn expect_newline_skipping_trivia(&mut self) -> ParseResult<()> {
        let skipped = self.skip_trivia();
        if skipped.newline || self.peek_kind() == Some(&TokenKind::RightBrace) {
            Ok(())
        } else {
            Err(Diagnostic::error_at(
                format!("Expected a newline, got {}", noun_or_eof(self.peek_kind())),
                self.peek_location(),
            ))
        }
    }

    fn expect(&mut self, expected: TokenKind) -> ParseResult<()> {
        let location = self.peek_location();
        match self.next() {
            Some(token) if token.kind == expected => Ok(()),
            other => Err(Diagnostic::error_at(
                format!(
                    "Expected {}, got {}",
                    expected.noun(),
                    noun_or_eof(other.map(|token| &token.kind))
                ),
                location,
            )),
        }
    }

    fn expect_ident(&mut self) -> ParseResult<Spanned<String>> {
        let location = self.peek_location();
        match self.next() {
            Some(Token {
                kind: TokenKind::Ident(ident),
                ..
            }) => Ok(self.spanned_from(location, ident.clone())),
            other => Err(Diagnostic::error_at(
                format!(
                    "Expected an ident, got {}",
                    noun_or_eof(other.map(|token| &token.kind))
                ),
                location,
            )),
        }
    }
}

fn noun_or_eof(kind: Option<&TokenKind>) -> String {
    kind.map_or_else(|| "an EOF".to_string(), TokenKind::noun)
}
