//! The checked program representation.
//!
//! Everything is resolved to indices: types to [`TypeIndex`], calls to
//! [`FnId`], variables to local slots. The evaluator never looks anything up
//! by name.

use crate::builtins::BuiltinFn;
use crate::types::{TypeContext, TypeIndex};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FnId {
    Builtin(usize),
    UserDefined(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ident: String,
    pub ty: TypeIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnSignature {
    pub ident: String,
    pub params: Vec<Param>,
    pub return_type: TypeIndex,
}

impl FnSignature {
    pub fn param_types(&self) -> Vec<TypeIndex> {
        self.params.iter().map(|param| param.ty).collect()
    }

    /// Whether `self` and `other` would be ambiguous at a call site. The
    /// return type is not part of the key.
    pub fn overlaps(&self, other: &FnSignature) -> bool {
        self.ident == other.ident
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }
}

/// A user-defined function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fn {
    pub signature: FnSignature,
    /// Parameters followed by every `let` in the body, across all scopes.
    pub local_count: usize,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Expr),
    If(IfStmt),
    /// `None` returns `Void`.
    Return(Option<Expr>),
    Let(VarDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfBlock {
    pub condition: Expr,
    pub block: Vec<Stmt>,
}

/// A flattened `if` / `else if` / `else` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfStmt {
    pub if_block: IfBlock,
    pub else_if_blocks: Vec<IfBlock>,
    pub else_block: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub local_index: usize,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeIndex,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeIndex) -> Self {
        Expr { kind, ty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Constant(Value),
    FnCall { id: FnId, args: Vec<Expr> },
    LocalVar(usize),
    StructInit { struct_id: usize, fields: Vec<Expr> },
    FieldAccess { base: Box<Expr>, field_index: usize },
}

#[derive(Debug, Clone)]
pub struct CheckedAst {
    pub types: TypeContext,
    pub builtin_fns: Vec<BuiltinFn>,
    pub fns: Vec<Fn>,
}

impl CheckedAst {
    /// The user-defined function with exactly these parameter types.
    pub fn fn_named(&self, ident: &str, param_types: &[TypeIndex]) -> Option<(usize, &Fn)> {
        self.fns.iter().enumerate().find(|(_, f)| {
            f.signature.ident == ident
                && f.signature.params.len() == param_types.len()
                && f
                    .signature
                    .params
                    .iter()
                    .zip(param_types)
                    .all(|(param, ty)| param.ty == *ty)
        })
    }

    pub fn fns_named<'a>(&'a self, ident: &'a str) -> impl Iterator<Item = &'a Fn> + 'a {
        self.fns.iter().filter(move |f| f.signature.ident == ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuiltinType;

    fn signature(ident: &str, params: &[TypeIndex], return_type: TypeIndex) -> FnSignature {
        FnSignature {
            ident: ident.into(),
            params: params
                .iter()
                .enumerate()
                .map(|(index, &ty)| Param {
                    ident: format!("p{index}"),
                    ty,
                })
                .collect(),
            return_type,
        }
    }

    #[test]
    fn overload_key_ignores_return_type() {
        let int = TypeIndex::Builtin(1);
        let void = TypeIndex::Builtin(0);
        let a = signature("f", &[int], int);
        assert!(a.overlaps(&signature("f", &[int], void)));
        assert!(!a.overlaps(&signature("f", &[int, int], int)));
        assert!(!a.overlaps(&signature("g", &[int], int)));
    }

    #[test]
    fn looks_up_functions_by_name_and_parameter_types() {
        let void = TypeIndex::Builtin(0);
        let int = TypeIndex::Builtin(1);
        let types = TypeContext::new(
            ["Void", "Int", "String"].into_iter().map(BuiltinType::new).collect(),
            Vec::new(),
        )
        .expect("type context");
        let ast = CheckedAst {
            types,
            builtin_fns: Vec::new(),
            fns: vec![
                Fn {
                    signature: signature("f", &[], void),
                    local_count: 0,
                    stmts: Vec::new(),
                },
                Fn {
                    signature: signature("f", &[int], int),
                    local_count: 1,
                    stmts: Vec::new(),
                },
            ],
        };

        assert_eq!(ast.fn_named("f", &[int]).map(|(index, _)| index), Some(1));
        assert_eq!(ast.fn_named("f", &[]).map(|(index, _)| index), Some(0));
        assert!(ast.fn_named("f", &[int, int]).is_none());
        assert_eq!(ast.fns_named("f").count(), 2);
    }
}
