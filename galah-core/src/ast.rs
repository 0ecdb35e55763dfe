//! Untyped syntax tree produced by the parser.
//!
//! Type names are kept as written; resolving them is the job of the type
//! checker.

use crate::span::Spanned;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ast {
    pub struct_decls: Vec<Spanned<StructDecl>>,
    pub fn_decls: Vec<Spanned<FnDecl>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Nominal(String),
}

impl Type {
    pub fn name(&self) -> &str {
        match self {
            Type::Nominal(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub ident: Spanned<String>,
    pub fields: Vec<Spanned<Field>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub ident: Spanned<String>,
    pub ty: Spanned<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnDecl {
    pub signature: Spanned<FnSignature>,
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnSignature {
    pub ident: Spanned<String>,
    pub params: Vec<Spanned<Param>>,
    /// `None` means the function returns `Void`.
    pub return_type: Option<Spanned<Type>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ident: Spanned<String>,
    pub ty: Spanned<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    If(Spanned<IfStmt>),
    Return(Option<Spanned<Expr>>),
    Let(VarDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfStmt {
    pub condition: Spanned<Expr>,
    pub if_block: Vec<Spanned<Stmt>>,
    pub else_block: Option<ElseBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElseBlock {
    ElseIf(Box<Spanned<IfStmt>>),
    Else(Vec<Spanned<Stmt>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub ident: Spanned<String>,
    pub ty: Option<Spanned<Type>>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    StringLiteral(String),
    IntegerLiteral(i64),
    FnCall {
        ident: Spanned<String>,
        arguments: Vec<Spanned<Expr>>,
    },
    Ident(String),
    UnaryOp {
        op: Spanned<String>,
        operand: Box<Spanned<Expr>>,
    },
    BinaryOp {
        op: Spanned<String>,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Parenthesized(Box<Spanned<Expr>>),
    StructInit {
        ident: Spanned<String>,
        fields: Spanned<Vec<Spanned<StructInitField>>>,
    },
    MemberAccess {
        base: Box<Spanned<Expr>>,
        member: Spanned<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructInitField {
    pub ident: Spanned<String>,
    pub value: Spanned<Expr>,
}
