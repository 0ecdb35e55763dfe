//! Resolved types.
//!
//! After checking, a type is never referred to by name. It is a
//! [`TypeIndex`] into either the builtin type table or the struct table of a
//! [`TypeContext`], so type equality is an integer comparison.

use crate::ast;
use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeIndex {
    Builtin(usize),
    Struct(usize),
}

/// A type provided by the embedder, such as `Int`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinType {
    pub ident: String,
}

impl BuiltinType {
    pub fn new(ident: impl Into<String>) -> Self {
        BuiltinType {
            ident: ident.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub ident: String,
    pub ty: TypeIndex,
}

/// A checked struct declaration. Fields keep their declared order, which
/// is also the layout of struct values at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub ident: String,
    pub fields: Vec<Field>,
}

impl Struct {
    pub fn field_index(&self, ident: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.ident == ident)
    }
}

pub const VOID: &str = "Void";
pub const INT: &str = "Int";
pub const STRING: &str = "String";

/// Every type known to a program, plus the builtin types the language
/// itself relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeContext {
    pub builtin_types: Vec<BuiltinType>,
    pub structs: Vec<Struct>,
    /// Return type of functions without one.
    pub void: TypeIndex,
    /// Type of integer literals and `if` conditions.
    pub int: TypeIndex,
    /// Type of string literals.
    pub string: TypeIndex,
}

impl TypeContext {
    pub fn new(
        builtin_types: Vec<BuiltinType>,
        structs: Vec<Struct>,
    ) -> Result<TypeContext, Vec<Diagnostic>> {
        let void = Self::builtin(VOID, &builtin_types);
        let int = Self::builtin(INT, &builtin_types);
        let string = Self::builtin(STRING, &builtin_types);

        match (void, int, string) {
            (Ok(void), Ok(int), Ok(string)) => Ok(TypeContext {
                builtin_types,
                structs,
                void,
                int,
                string,
            }),
            (void, int, string) => Err([void.err(), int.err(), string.err()]
                .into_iter()
                .flatten()
                .collect()),
        }
    }

    fn builtin(name: &str, builtin_types: &[BuiltinType]) -> Result<TypeIndex, Diagnostic> {
        builtin_types
            .iter()
            .position(|ty| ty.ident == name)
            .map(TypeIndex::Builtin)
            .ok_or_else(|| {
                Diagnostic::error(
                    format!("Expected to find builtin type named '{name}'"),
                    Span::Builtin,
                )
            })
    }

    /// The name of a type as written in source.
    pub fn describe(&self, ty: TypeIndex) -> &str {
        match ty {
            TypeIndex::Builtin(index) => &self.builtin_types[index].ident,
            TypeIndex::Struct(index) => &self.structs[index].ident,
        }
    }

    /// A parameter list such as `Int, String`, without parentheses.
    pub fn describe_list(&self, types: &[TypeIndex]) -> String {
        types
            .iter()
            .map(|&ty| self.describe(ty))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn struct_type(&self, ty: TypeIndex) -> Option<&Struct> {
        match ty {
            TypeIndex::Struct(index) => self.structs.get(index),
            TypeIndex::Builtin(_) => None,
        }
    }

    pub fn builtin_named(&self, name: &str) -> Option<TypeIndex> {
        self.builtin_types
            .iter()
            .position(|ty| ty.ident == name)
            .map(TypeIndex::Builtin)
    }

    pub fn check_type(&self, ty: &Spanned<ast::Type>) -> Result<TypeIndex, Vec<Diagnostic>> {
        resolve_type(
            ty,
            self.builtin_types.iter().map(|ty| ty.ident.as_str()),
            self.structs.iter().map(|ty| ty.ident.as_str()),
        )
    }
}

/// Resolves a type name against builtin type names first and struct names
/// second.
pub fn resolve_type<'a>(
    ty: &Spanned<ast::Type>,
    builtin_idents: impl IntoIterator<Item = &'a str>,
    struct_idents: impl IntoIterator<Item = &'a str>,
) -> Result<TypeIndex, Vec<Diagnostic>> {
    let name = ty.name();
    if let Some(index) = builtin_idents.into_iter().position(|ident| ident == name) {
        Ok(TypeIndex::Builtin(index))
    } else if let Some(index) = struct_idents.into_iter().position(|ident| ident == name) {
        Ok(TypeIndex::Struct(index))
    } else {
        Err(vec![Diagnostic::error(
            format!("No such type '{name}'"),
            ty.span,
        )])
    }
}
