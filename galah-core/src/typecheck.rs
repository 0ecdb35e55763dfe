//! Type checking: from the untyped [`Ast`] to a [`CheckedAst`].
//!
//! Checking runs in three phases, each depending on the names resolved by
//! the previous one:
//!
//! 1. struct declarations, followed by a search for structs that contain
//!    themselves,
//! 2. builtin and user-defined function signatures,
//! 3. function bodies.
//!
//! Independent computations (sibling statements, the fields of a struct,
//! the functions of a program) are all checked and their diagnostics
//! concatenated. A computation that needs a previous result stops at the
//! first failure.

use crate::ast::{self, Ast, ElseBlock};
use crate::builtins::BuiltinFn;
use crate::checked::{
    self, CheckedAst, Expr, ExprKind, FnId, FnSignature, IfBlock, IfStmt, Param, Stmt, VarDecl,
};
use crate::diagnostic::{Diagnostic, collect};
use crate::graph::Graph;
use crate::span::{Span, Spanned};
use crate::types::{BuiltinType, Field, Struct, TypeContext, TypeIndex, resolve_type};
use crate::value::Value;

type CheckResult<T> = Result<T, Vec<Diagnostic>>;

/// A successfully checked program and the warnings found on the way.
#[derive(Debug, Clone)]
pub struct Checked {
    pub ast: CheckedAst,
    pub warnings: Vec<Diagnostic>,
}

/// Checks `ast` against the given builtins.
///
/// Fails with every error found; warnings only ever accompany a success.
pub fn check(
    ast: &Ast,
    builtin_types: &[BuiltinType],
    builtin_fns: &[BuiltinFn],
) -> Result<Checked, Vec<Diagnostic>> {
    TypeChecker {
        ast,
        builtin_types,
        builtin_fns,
    }
    .check()
}

struct TypeChecker<'a> {
    ast: &'a Ast,
    builtin_types: &'a [BuiltinType],
    builtin_fns: &'a [BuiltinFn],
}

impl<'a> TypeChecker<'a> {
    fn check(&self) -> CheckResult<Checked> {
        let structs = self.check_structs()?;
        let types = TypeContext::new(self.builtin_types.to_vec(), structs)?;

        let mut signatures = self.check_builtin_signatures(&types)?;
        let user_signatures = self.check_fn_signatures(&types, &signatures)?;
        signatures.extend(user_signatures.iter().cloned());

        let globals = GlobalContext {
            types: &types,
            fns: signatures,
        };
        let checked_fns = collect(
            self.ast
                .fn_decls
                .iter()
                .zip(user_signatures)
                .map(|(decl, (_, signature))| check_fn(decl, signature, &globals)),
        )?;

        let mut fns = Vec::with_capacity(checked_fns.len());
        let mut warnings = Vec::new();
        for (f, fn_warnings) in checked_fns {
            fns.push(f);
            warnings.extend(fn_warnings);
        }

        Ok(Checked {
            ast: CheckedAst {
                types,
                builtin_fns: self.builtin_fns.to_vec(),
                fns,
            },
            warnings,
        })
    }

    /// Struct `i` of the result is the struct declared `i`th. Any failure is
    /// fatal, so that ordering is never broken by a missing struct.
    fn check_structs(&self) -> CheckResult<Vec<Struct>> {
        let builtin_idents = || self.builtin_types.iter().map(|ty| ty.ident.as_str());
        let struct_idents: Vec<&str> = self
            .ast
            .struct_decls
            .iter()
            .map(|decl| decl.ident.as_str())
            .collect();

        let mut seen_structs: Vec<&str> = Vec::new();
        let structs = collect(self.ast.struct_decls.iter().map(|decl| {
            let ident = &decl.ident;
            if builtin_idents().any(|builtin| builtin == ident.as_str()) {
                return Err(vec![Diagnostic::error(
                    format!("Duplicate definition of builtin type '{}'", ident.inner),
                    ident.span,
                )]);
            }
            if seen_structs.contains(&ident.as_str()) {
                return Err(vec![Diagnostic::error(
                    format!("Duplicate definition of struct '{}'", ident.inner),
                    ident.span,
                )]);
            }
            seen_structs.push(ident.as_str());

            let mut seen_fields: Vec<&str> = Vec::new();
            let fields = collect(decl.fields.iter().map(|field| {
                if seen_fields.contains(&field.ident.as_str()) {
                    return Err(vec![Diagnostic::error(
                        format!(
                            "Duplicate definition of field '{}.{}'",
                            ident.inner, field.ident.inner
                        ),
                        field.span,
                    )]);
                }
                seen_fields.push(field.ident.as_str());
                let ty = resolve_type(&field.ty, builtin_idents(), struct_idents.iter().copied())?;
                Ok(Field {
                    ident: field.ident.inner.clone(),
                    ty,
                })
            }))?;

            Ok(Struct {
                ident: ident.inner.clone(),
                fields,
            })
        }))?;

        self.check_struct_cycles(&structs)?;
        Ok(structs)
    }

    /// A struct that contains itself, directly or through other structs,
    /// has no finite layout.
    fn check_struct_cycles(&self, structs: &[Struct]) -> CheckResult<()> {
        let builtin_count = self.builtin_types.len();
        let node = |ty: TypeIndex| match ty {
            TypeIndex::Builtin(index) => index,
            TypeIndex::Struct(index) => builtin_count + index,
        };

        let mut graph = Graph::new(builtin_count + structs.len());
        for (index, s) in structs.iter().enumerate() {
            for field in &s.fields {
                graph.add_edge(
                    node(TypeIndex::Struct(index)),
                    node(field.ty),
                    field.ident.as_str(),
                );
            }
        }

        let cycles = graph.cycles();
        if cycles.is_empty() {
            return Ok(());
        }

        let mut diagnostics = Vec::new();
        let mut diagnosed: Vec<usize> = Vec::new();
        for cycle in &cycles {
            for offset in 0..cycle.nodes.len() - 1 {
                let rotated = cycle.rotated(offset);
                let first = rotated.first_node();
                if diagnosed.contains(&first) {
                    continue;
                }
                // Builtins have no fields, so cycles only pass through structs.
                let Some(decl) = first
                    .checked_sub(builtin_count)
                    .and_then(|index| self.ast.struct_decls.get(index))
                else {
                    continue;
                };

                let accesses = rotated
                    .edges
                    .iter()
                    .map(|&edge| *graph.label(edge))
                    .collect::<Vec<_>>()
                    .join(".");
                diagnostics.push(Diagnostic::error(
                    format!(
                        "Struct '{0}' references itself via '{0}.{1}'",
                        decl.ident.inner, accesses
                    ),
                    decl.span,
                ));
                diagnosed.push(first);
            }
        }

        Err(diagnostics)
    }

    fn check_builtin_signatures(
        &self,
        types: &TypeContext,
    ) -> CheckResult<Vec<(FnId, FnSignature)>> {
        let mut checked: Vec<(FnId, FnSignature)> = Vec::new();
        for (index, builtin) in self.builtin_fns.iter().enumerate() {
            let params = collect(builtin.params.iter().map(|param| {
                let ty = types.check_type(&builtin_type(&param.ty))?;
                Ok(Param {
                    ident: param.ident.clone(),
                    ty,
                })
            }));
            let return_type = types.check_type(&builtin_type(&builtin.return_type));
            let signature = match (params, return_type) {
                (Ok(params), Ok(return_type)) => FnSignature {
                    ident: builtin.ident.clone(),
                    params,
                    return_type,
                },
                (params, return_type) => {
                    return Err([errors(params), errors(return_type)].concat());
                }
            };

            if checked.iter().any(|(_, other)| other.overlaps(&signature)) {
                return Err(vec![duplicate_fn(types, &signature, Span::Builtin)]);
            }
            checked.push((FnId::Builtin(index), signature));
        }
        Ok(checked)
    }

    fn check_fn_signatures(
        &self,
        types: &TypeContext,
        builtins: &[(FnId, FnSignature)],
    ) -> CheckResult<Vec<(FnId, FnSignature)>> {
        let mut checked: Vec<(FnId, FnSignature)> = Vec::new();
        collect(
            self.ast
                .fn_decls
                .iter()
                .enumerate()
                .map(|(index, decl)| {
                    let signature = check_fn_signature(&decl.signature, types)?;
                    let duplicate = builtins
                        .iter()
                        .chain(&checked)
                        .any(|(_, other)| other.overlaps(&signature));
                    if duplicate {
                        return Err(vec![duplicate_fn(
                            types,
                            &signature,
                            decl.signature.ident.span,
                        )]);
                    }
                    checked.push((FnId::UserDefined(index), signature.clone()));
                    Ok((FnId::UserDefined(index), signature))
                }),
        )
    }
}

fn check_fn_signature(
    signature: &Spanned<ast::FnSignature>,
    types: &TypeContext,
) -> CheckResult<FnSignature> {
    let mut seen_params: Vec<&str> = Vec::new();
    let params = collect(signature.params.iter().map(|param| {
        if seen_params.contains(&param.ident.as_str()) {
            return Err(vec![Diagnostic::error(
                format!("Duplicate definition of parameter '{}'", param.ident.inner),
                param.span,
            )]);
        }
        seen_params.push(param.ident.as_str());
        Ok(Param {
            ident: param.ident.inner.clone(),
            ty: types.check_type(&param.ty)?,
        })
    }));
    let return_type = signature
        .return_type
        .as_ref()
        .map(|ty| types.check_type(ty))
        .transpose();

    match (params, return_type) {
        (Ok(params), Ok(return_type)) => Ok(FnSignature {
            ident: signature.ident.inner.clone(),
            params,
            return_type: return_type.unwrap_or(types.void),
        }),
        (params, return_type) => Err([errors(params), errors(return_type)].concat()),
    }
}

fn check_fn(
    decl: &Spanned<ast::FnDecl>,
    signature: FnSignature,
    globals: &GlobalContext<'_>,
) -> CheckResult<(checked::Fn, Vec<Diagnostic>)> {
    let mut context = FnContext::new(globals, signature.return_type);
    for param in &signature.params {
        context.new_local(&param.ident, param.ty);
    }

    let body = context.check_stmts(&decl.stmts)?;
    if signature.return_type != globals.types.void && !body.returns_on_all_paths {
        return Err(vec![Diagnostic::error(
            "Non-void function must return on all paths",
            decl.span,
        )]);
    }

    Ok((
        checked::Fn {
            signature,
            local_count: context.locals.len(),
            stmts: body.inner,
        },
        context.warnings,
    ))
}

fn builtin_type(name: &str) -> Spanned<ast::Type> {
    Spanned::builtin(ast::Type::Nominal(name.to_string()))
}

fn duplicate_fn(types: &TypeContext, signature: &FnSignature, span: Span) -> Diagnostic {
    Diagnostic::error(
        format!(
            "Duplicate definition of function '{}' with parameter types '({})'",
            signature.ident,
            types.describe_list(&signature.param_types())
        ),
        span,
    )
}

fn errors<T>(result: CheckResult<T>) -> Vec<Diagnostic> {
    result.err().unwrap_or_default()
}

/// Every type and function signature of the program.
struct GlobalContext<'a> {
    types: &'a TypeContext,
    fns: Vec<(FnId, FnSignature)>,
}

impl GlobalContext<'_> {
    /// Overload resolution: the function with this name and exactly these
    /// parameter types.
    fn resolve_fn_call(
        &self,
        ident: &str,
        argument_types: &[TypeIndex],
        span: Span,
    ) -> CheckResult<(FnId, TypeIndex)> {
        let found = self.fns.iter().find(|(_, signature)| {
            signature.ident == ident && signature.param_types() == argument_types
        });
        if let Some((id, signature)) = found {
            return Ok((*id, signature.return_type));
        }

        let alternatives = self
            .fns
            .iter()
            .filter(|(_, signature)| signature.ident == ident)
            .count();
        let context = match alternatives {
            0 => String::new(),
            1 => ". Found 1 function with the same name but incompatible parameter types"
                .to_string(),
            n => format!(
                ". Found {n} functions with the same name but incompatible parameter types"
            ),
        };
        Err(vec![Diagnostic::error(
            format!(
                "No such function '{ident}' with parameters '({})'{context}",
                self.types.describe_list(argument_types)
            ),
            span,
        )])
    }
}

/// Result of checking a statement or block.
struct Analyzed<T> {
    inner: T,
    returns_on_all_paths: bool,
}

impl<T> Analyzed<T> {
    fn new(inner: T, returns_on_all_paths: bool) -> Self {
        Analyzed {
            inner,
            returns_on_all_paths,
        }
    }
}

/// Names visible in one block, innermost last.
#[derive(Debug, Default)]
struct Scope {
    entries: Vec<(String, usize)>,
}

impl Scope {
    fn lookup(&self, ident: &str) -> Option<usize> {
        self.entries
            .iter()
            .rev()
            .find_map(|(name, index)| (name == ident).then_some(*index))
    }
}

/// State for checking a single function body.
struct FnContext<'g> {
    globals: &'g GlobalContext<'g>,
    expected_return_type: TypeIndex,
    /// Type of every local slot, parameters first.
    locals: Vec<TypeIndex>,
    /// The root scope holds the parameters.
    scopes: Vec<Scope>,
    warnings: Vec<Diagnostic>,
}

impl<'g> FnContext<'g> {
    fn new(globals: &'g GlobalContext<'g>, expected_return_type: TypeIndex) -> Self {
        FnContext {
            globals,
            expected_return_type,
            locals: Vec::new(),
            scopes: vec![Scope::default()],
            warnings: Vec::new(),
        }
    }

    fn types(&self) -> &'g TypeContext {
        self.globals.types
    }

    fn new_local(&mut self, ident: &str, ty: TypeIndex) -> usize {
        let index = self.locals.len();
        self.locals.push(ty);
        if let Some(scope) = self.scopes.last_mut() {
            scope.entries.push((ident.to_string(), index));
        }
        index
    }

    fn local(&self, ident: &str) -> Option<usize> {
        self.scopes.iter().rev().find_map(|scope| scope.lookup(ident))
    }

    fn local_in_innermost_scope(&self, ident: &str) -> Option<usize> {
        self.scopes.last().and_then(|scope| scope.lookup(ident))
    }

    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "attempted to pop the root scope");
        self.scopes.pop();
    }

    /// Checks a block in its own scope. Statements after one that returns
    /// on all paths are dropped with a warning.
    fn check_stmts(&mut self, stmts: &[Spanned<ast::Stmt>]) -> CheckResult<Analyzed<Vec<Stmt>>> {
        self.push_scope();
        let analyzed = collect(stmts.iter().map(|stmt| self.check_stmt(stmt)));
        self.pop_scope();
        let analyzed = analyzed?;

        let first_returning = analyzed.iter().position(|stmt| stmt.returns_on_all_paths);
        if let Some(index) = first_returning {
            if let (Some(first), Some(last)) = (stmts.get(index + 1), stmts.last()) {
                self.warnings.push(Diagnostic::warning(
                    "Unreachable statements",
                    first.span.join(last.span),
                ));
            }
        }

        let reachable = first_returning.map_or(analyzed.len(), |index| index + 1);
        Ok(Analyzed::new(
            analyzed
                .into_iter()
                .take(reachable)
                .map(|stmt| stmt.inner)
                .collect(),
            first_returning.is_some(),
        ))
    }

    fn check_stmt(&mut self, stmt: &Spanned<ast::Stmt>) -> CheckResult<Analyzed<Stmt>> {
        match &stmt.inner {
            ast::Stmt::Expr(expr) => Ok(Analyzed::new(Stmt::Expr(self.check_expr(expr)?), false)),
            ast::Stmt::If(if_stmt) => {
                let analyzed = self.check_if_stmt(if_stmt)?;
                Ok(Analyzed::new(Stmt::If(analyzed.inner), analyzed.returns_on_all_paths))
            }
            ast::Stmt::Return(value) => {
                let checked = value.as_ref().map(|value| self.check_expr(value)).transpose()?;
                let ty = checked.as_ref().map_or(self.types().void, |value| value.ty);
                if ty != self.expected_return_type {
                    let expected = self.types().describe(self.expected_return_type);
                    let diagnostic = match value {
                        Some(value) => Diagnostic::error(
                            format!(
                                "Function expected to return '{expected}', got expression of type '{}'",
                                self.types().describe(ty)
                            ),
                            value.span,
                        ),
                        None => Diagnostic::error(
                            format!(
                                "Function expected to return '{expected}', got '{}'",
                                self.types().describe(self.types().void)
                            ),
                            stmt.span,
                        ),
                    };
                    return Err(vec![diagnostic]);
                }
                Ok(Analyzed::new(Stmt::Return(checked), true))
            }
            ast::Stmt::Let(decl) => {
                let annotation = decl
                    .ty
                    .as_ref()
                    .map(|ty| self.types().check_type(ty))
                    .transpose()?;
                let value = self.check_expr(&decl.value)?;

                if let Some(annotation) = annotation {
                    if value.ty != annotation {
                        return Err(vec![Diagnostic::error(
                            format!(
                                "Let binding '{}' expected expression of type '{}', got expression of type '{}'",
                                decl.ident.inner,
                                self.types().describe(annotation),
                                self.types().describe(value.ty)
                            ),
                            decl.value.span,
                        )]);
                    }
                }

                if self.local_in_innermost_scope(&decl.ident).is_some() {
                    return Err(vec![Diagnostic::error(
                        format!(
                            "Duplicate definition of '{}' within current scope",
                            decl.ident.inner
                        ),
                        decl.ident.span,
                    )]);
                }

                let local_index = self.new_local(&decl.ident, value.ty);
                Ok(Analyzed::new(Stmt::Let(VarDecl { local_index, value }), false))
            }
        }
    }

    /// Checks an `if` chain, flattening `else if`s into one list.
    fn check_if_stmt(&mut self, if_stmt: &ast::IfStmt) -> CheckResult<Analyzed<IfStmt>> {
        let mut else_ifs: Vec<&ast::IfStmt> = Vec::new();
        let mut else_stmts = None;
        let mut next = &if_stmt.else_block;
        loop {
            match next {
                Some(ElseBlock::ElseIf(else_if)) => {
                    else_ifs.push(&else_if.inner);
                    next = &else_if.else_block;
                }
                Some(ElseBlock::Else(stmts)) => {
                    else_stmts = Some(stmts);
                    break;
                }
                None => break,
            }
        }

        let condition = self.check_condition(&if_stmt.condition);
        let if_block = self.check_stmts(&if_stmt.if_block);
        let else_if_blocks = collect(else_ifs.into_iter().map(|else_if| {
            let condition = self.check_condition(&else_if.condition)?;
            let block = self.check_stmts(&else_if.if_block)?;
            Ok(Analyzed::new(
                IfBlock {
                    condition,
                    block: block.inner,
                },
                block.returns_on_all_paths,
            ))
        }));
        let else_block = else_stmts
            .map(|stmts| self.check_stmts(stmts))
            .transpose();

        let (condition, if_block, else_if_blocks, else_block) =
            match (condition, if_block, else_if_blocks, else_block) {
                (Ok(condition), Ok(if_block), Ok(else_if_blocks), Ok(else_block)) => {
                    (condition, if_block, else_if_blocks, else_block)
                }
                (condition, if_block, else_if_blocks, else_block) => {
                    return Err([
                        errors(condition),
                        errors(if_block),
                        errors(else_if_blocks),
                        errors(else_block),
                    ]
                    .concat());
                }
            };

        let returns_on_all_paths = if_block.returns_on_all_paths
            && else_if_blocks.iter().all(|block| block.returns_on_all_paths)
            && else_block
                .as_ref()
                .is_some_and(|block| block.returns_on_all_paths);

        Ok(Analyzed::new(
            IfStmt {
                if_block: IfBlock {
                    condition,
                    block: if_block.inner,
                },
                else_if_blocks: else_if_blocks.into_iter().map(|block| block.inner).collect(),
                else_block: else_block.map(|block| block.inner),
            },
            returns_on_all_paths,
        ))
    }

    fn check_condition(&mut self, condition: &Spanned<ast::Expr>) -> CheckResult<Expr> {
        let checked = self.check_expr(condition)?;
        if checked.ty != self.types().int {
            return Err(vec![Diagnostic::error(
                format!(
                    "If statement condition must be of type '{}', got '{}'",
                    self.types().describe(self.types().int),
                    self.types().describe(checked.ty)
                ),
                condition.span,
            )]);
        }
        Ok(checked)
    }

    fn check_expr(&mut self, expr: &Spanned<ast::Expr>) -> CheckResult<Expr> {
        match &expr.inner {
            ast::Expr::StringLiteral(value) => Ok(Expr::new(
                ExprKind::Constant(Value::Str(value.clone())),
                self.types().string,
            )),
            ast::Expr::IntegerLiteral(value) => Ok(Expr::new(
                ExprKind::Constant(Value::Int(*value)),
                self.types().int,
            )),
            ast::Expr::FnCall { ident, arguments } => {
                let args = collect(arguments.iter().map(|argument| self.check_expr(argument)))?;
                self.call(ident, args, expr.span)
            }
            ast::Expr::Ident(ident) => match self.local(ident) {
                Some(index) => Ok(Expr::new(ExprKind::LocalVar(index), self.locals[index])),
                None => Err(vec![Diagnostic::error(
                    format!("No such variable '{ident}'"),
                    expr.span,
                )]),
            },
            ast::Expr::UnaryOp { op, operand } => {
                let operand = self.check_expr(operand)?;
                self.call(op, vec![operand], expr.span)
            }
            ast::Expr::BinaryOp { op, left, right } => {
                let operands = collect([left, right].map(|operand| self.check_expr(operand)))?;
                self.call(op, operands, expr.span)
            }
            ast::Expr::Parenthesized(inner) => self.check_expr(inner),
            ast::Expr::StructInit { ident, fields } => {
                self.check_struct_init(ident, fields, expr.span)
            }
            ast::Expr::MemberAccess { base, member } => {
                let base = self.check_expr(base)?;
                let Some(s) = self.types().struct_type(base.ty) else {
                    return Err(vec![Diagnostic::error(
                        format!(
                            "Member accesses cannot be performed on builtin types, got type '{}'",
                            self.types().describe(base.ty)
                        ),
                        expr.span,
                    )]);
                };
                let Some(field_index) = s.field_index(member) else {
                    return Err(vec![Diagnostic::error(
                        format!(
                            "Value of type '{}' has no such field '{}'",
                            s.ident, member.inner
                        ),
                        expr.span,
                    )]);
                };

                let ty = s.fields[field_index].ty;
                Ok(Expr::new(
                    ExprKind::FieldAccess {
                        base: Box::new(base),
                        field_index,
                    },
                    ty,
                ))
            }
        }
    }

    fn call(&self, ident: &Spanned<String>, args: Vec<Expr>, span: Span) -> CheckResult<Expr> {
        let argument_types: Vec<TypeIndex> = args.iter().map(|arg| arg.ty).collect();
        let (id, return_type) = self
            .globals
            .resolve_fn_call(ident, &argument_types, span)?;
        Ok(Expr::new(ExprKind::FnCall { id, args }, return_type))
    }

    fn check_struct_init(
        &mut self,
        ident: &Spanned<String>,
        fields: &Spanned<Vec<Spanned<ast::StructInitField>>>,
        span: Span,
    ) -> CheckResult<Expr> {
        let types = self.types();
        let ty = types.check_type(&ident.as_ref().map(|name| ast::Type::Nominal(name.clone())))?;
        let TypeIndex::Struct(struct_id) = ty else {
            return Err(vec![Diagnostic::error(
                format!(
                    "Struct initialization syntax can only be used for struct types, got '{}'",
                    ident.inner
                ),
                ident.span,
            )]);
        };
        let decl = &types.structs[struct_id];

        let mut duplicates = Vec::new();
        for (index, field) in fields.iter().enumerate() {
            if fields[..index]
                .iter()
                .any(|earlier| earlier.ident.inner == field.ident.inner)
            {
                duplicates.push(Diagnostic::error(
                    format!(
                        "Duplicate field '{}' in initialization of struct '{}'",
                        field.ident.inner, decl.ident
                    ),
                    field.ident.span,
                ));
            }
        }
        if !duplicates.is_empty() {
            return Err(duplicates);
        }

        let matches_declaration = fields.len() == decl.fields.len()
            && fields
                .iter()
                .zip(&decl.fields)
                .all(|(field, declared)| field.ident.inner == declared.ident);
        if !matches_declaration {
            return Err(diagnose_field_mismatch(decl, fields, span));
        }

        let values = collect(fields.iter().map(|field| self.check_expr(&field.value)))?;
        let mismatches: Vec<Diagnostic> = fields
            .iter()
            .zip(&values)
            .zip(&decl.fields)
            .filter(|((_, value), declared)| value.ty != declared.ty)
            .map(|((field, value), declared)| {
                Diagnostic::error(
                    format!(
                        "Expected expression of type '{}' for field '{}', got '{}'",
                        types.describe(declared.ty),
                        field.ident.inner,
                        types.describe(value.ty)
                    ),
                    field.value.span,
                )
            })
            .collect();
        if !mismatches.is_empty() {
            return Err(mismatches);
        }

        Ok(Expr::new(
            ExprKind::StructInit {
                struct_id,
                fields: values,
            },
            ty,
        ))
    }
}

/// Explains why the fields of a struct initialization don't match the
/// declaration: missing and unexpected fields, or else the first field out
/// of order.
fn diagnose_field_mismatch(
    decl: &Struct,
    fields: &[Spanned<ast::StructInitField>],
    span: Span,
) -> Vec<Diagnostic> {
    let missing = decl
        .fields
        .iter()
        .filter(|declared| !fields.iter().any(|field| field.ident.inner == declared.ident))
        .map(|declared| {
            Diagnostic::error(
                format!(
                    "Missing field '{}' in initialization of struct '{}'",
                    declared.ident, decl.ident
                ),
                span,
            )
        });
    let unexpected = fields
        .iter()
        .filter(|field| decl.field_index(&field.ident).is_none())
        .map(|field| {
            Diagnostic::error(
                format!(
                    "Unexpected field '{}' in initialization of struct '{}'",
                    field.ident.inner, decl.ident
                ),
                field.ident.span,
            )
        });
    let diagnostics: Vec<Diagnostic> = missing.chain(unexpected).collect();
    if !diagnostics.is_empty() {
        return diagnostics;
    }

    fields
        .iter()
        .zip(&decl.fields)
        .find(|(field, declared)| field.ident.inner != declared.ident)
        .map(|(field, declared)| {
            Diagnostic::error(
                format!(
                    "'{}' must precede '{}' in initialization of '{}'",
                    declared.ident, field.ident.inner, decl.ident
                ),
                field.ident.span,
            )
        })
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Builtins;
    use crate::parser::parse_source;

    fn check_source(source: &str) -> Result<Checked, Vec<Diagnostic>> {
        let ast = parse_source(source).expect("parse");
        let builtins = Builtins::default();
        check(&ast, &builtins.types, &builtins.fns)
    }

    fn error_messages(source: &str) -> Vec<String> {
        check_source(source)
            .expect_err("checking should fail")
            .into_iter()
            .map(|diagnostic| diagnostic.message)
            .collect()
    }

    fn checked(source: &str) -> Checked {
        check_source(source).expect("check")
    }

    #[test]
    fn reports_each_struct_cycle_once_per_starting_struct() {
        let messages = error_messages(
            "struct Chicken {\n    egg: Egg,\n}\n\nstruct Nest {\n    stickCount: Int,\n    egg1: Egg,\n    egg2: Egg\n}\n\nstruct Fish {\n    chicken: Chicken\n}\n\nstruct Egg {\n    chicken: Chicken,\n    fish: Fish\n}\n",
        );
        assert_eq!(
            messages,
            vec![
                "Struct 'Chicken' references itself via 'Chicken.egg.chicken'",
                "Struct 'Egg' references itself via 'Egg.chicken.egg'",
                "Struct 'Fish' references itself via 'Fish.chicken.egg.fish'",
            ]
        );
    }

    #[test]
    fn reports_cycles_reached_through_converging_fields() {
        let messages = error_messages(
            "struct A {\n    b: B,\n    c: C\n}\nstruct B {\n    d: D\n}\nstruct C {\n    d: D\n}\nstruct D {\n    c: C\n}\nfn main() {\n}",
        );
        assert_eq!(
            messages,
            vec![
                "Struct 'C' references itself via 'C.d.c'",
                "Struct 'D' references itself via 'D.c.d'",
            ]
        );
    }

    #[test]
    fn cycle_diagnostics_point_at_the_struct() {
        let errors = check_source("struct List {\n    next: List\n}").expect_err("cycle");
        assert_eq!(
            errors[0].to_string(),
            "error:1:1~3:2: Struct 'List' references itself via 'List.next'"
        );
    }

    #[test]
    fn structs_may_reference_later_structs() {
        let checked = checked("struct Line {\n    a: Point,\n    b: Point\n}\nstruct Point {\n    x: Int,\n    y: Int\n}");
        let line = &checked.ast.types.structs[0];
        assert_eq!(line.fields[0].ty, TypeIndex::Struct(1));
    }

    #[test]
    fn reports_duplicate_type_definitions() {
        let messages = error_messages(
            "struct Int {\n}\nstruct A {\n    x: Int,\n    x: Int\n}\nstruct A {\n}\nstruct B {\n    y: Float\n}",
        );
        assert_eq!(
            messages,
            vec![
                "Duplicate definition of builtin type 'Int'",
                "Duplicate definition of field 'A.x'",
                "Duplicate definition of struct 'A'",
                "No such type 'Float'",
            ]
        );
    }

    #[test]
    fn non_void_function_must_return_on_all_paths() {
        let missing_else = "fn sign(n: Int) -> Int {\n    if n < 0 {\n        return -1\n    } else if n > 0 {\n        return 1\n    }\n}";
        assert_eq!(
            error_messages(missing_else),
            vec!["Non-void function must return on all paths"]
        );

        let with_else = "fn sign(n: Int) -> Int {\n    if n < 0 {\n        return -1\n    } else if n > 0 {\n        return 1\n    } else {\n        return 0\n    }\n}";
        let checked = checked(with_else);
        assert_eq!(checked.ast.fns.len(), 1);
        assert!(checked.warnings.is_empty());
    }

    #[test]
    fn drops_unreachable_statements_with_a_warning() {
        let checked = checked(
            "fn main() {\n    return\n    print(1)\n    print(2)\n}",
        );
        assert_eq!(checked.ast.fns[0].stmts.len(), 1);
        assert_eq!(checked.warnings.len(), 1);
        assert_eq!(
            checked.warnings[0].to_string(),
            "warning:3:5~4:13: Unreachable statements"
        );
    }

    #[test]
    fn counts_near_miss_overloads() {
        let messages = error_messages("fn main() {\n    print(\"a\", 1)\n}");
        assert_eq!(
            messages,
            vec![
                "No such function 'print' with parameters '(String, Int)'. Found 2 functions with the same name but incompatible parameter types"
            ]
        );

        let messages = error_messages("fn f(a: Int) {\n}\nfn main() {\n    f()\n    g(1)\n}");
        assert_eq!(
            messages,
            vec![
                "No such function 'f' with parameters '()'. Found 1 function with the same name but incompatible parameter types",
                "No such function 'g' with parameters '(Int)'",
            ]
        );
    }

    #[test]
    fn operators_resolve_like_functions() {
        let messages = error_messages("fn main() {\n    let x = \"a\" + 1\n}");
        assert_eq!(
            messages,
            vec![
                "No such function '+' with parameters '(String, Int)'. Found 1 function with the same name but incompatible parameter types"
            ]
        );
    }

    #[test]
    fn return_type_is_not_part_of_the_overload_key() {
        let messages = error_messages("fn f() -> Int {\n    return 1\n}\nfn f() {\n}");
        assert_eq!(
            messages,
            vec!["Duplicate definition of function 'f' with parameter types '()'"]
        );

        let checked = checked("fn f(a: Int) {\n}\nfn f(a: String) {\n}\nfn f() {\n}");
        assert_eq!(checked.ast.fns.len(), 3);
    }

    #[test]
    fn user_functions_cannot_redefine_builtins() {
        let messages = error_messages("fn print(x: Int) {\n}");
        assert_eq!(
            messages,
            vec!["Duplicate definition of function 'print' with parameter types '(Int)'"]
        );
    }

    #[test]
    fn reports_duplicate_parameters() {
        let messages = error_messages("fn f(a: Int, a: Int) {\n}");
        assert_eq!(messages, vec!["Duplicate definition of parameter 'a'"]);
    }

    #[test]
    fn checks_let_bindings_and_scopes() {
        let messages = error_messages(
            "fn main() {\n    let a: String = 1\n    let b = 1\n    let b = 2\n    print(c)\n}",
        );
        assert_eq!(
            messages,
            vec![
                "Let binding 'a' expected expression of type 'String', got expression of type 'Int'",
                "Duplicate definition of 'b' within current scope",
                "No such variable 'c'",
            ]
        );

        let checked = checked(
            "fn main(a: Int) {\n    let a = \"shadow\"\n    if 1 {\n        let a = 2\n        let b = a\n    }\n    print(a)\n}",
        );
        assert_eq!(checked.ast.fns[0].local_count, 4);
    }

    #[test]
    fn conditions_must_be_integers() {
        let messages = error_messages(
            "fn main() {\n    if \"yes\" {\n    } else if 1 {\n    }\n}",
        );
        assert_eq!(
            messages,
            vec!["If statement condition must be of type 'Int', got 'String'"]
        );
    }

    #[test]
    fn return_types_must_match() {
        let messages = error_messages(
            "fn f() -> Int {\n    return \"a\"\n}\nfn g() -> Int {\n    return\n}\nfn h() {\n    return 1\n}",
        );
        assert_eq!(
            messages,
            vec![
                "Function expected to return 'Int', got expression of type 'String'",
                "Function expected to return 'Int', got 'Void'",
                "Function expected to return 'Void', got expression of type 'Int'",
            ]
        );
    }

    const POINT: &str = "struct Point {\n    x: Int,\n    y: Int\n}\n";

    #[test]
    fn checks_struct_initialization_fields() {
        let source = format!(
            "{POINT}fn main() {{\n    let a = Point {{ x: 1 }}\n    let b = Point {{ x: 1, y: 2, z: 3 }}\n    let c = Point {{ y: 1, x: 2 }}\n    let d = Point {{ x: 1, y: \"2\" }}\n    let e = Point {{ x: 1, x: 2 }}\n    let f = Int {{ }}\n}}"
        );
        assert_eq!(
            error_messages(&source),
            vec![
                "Missing field 'y' in initialization of struct 'Point'",
                "Unexpected field 'z' in initialization of struct 'Point'",
                "'x' must precede 'y' in initialization of 'Point'",
                "Expected expression of type 'Int' for field 'y', got 'String'",
                "Duplicate field 'x' in initialization of struct 'Point'",
                "Struct initialization syntax can only be used for struct types, got 'Int'",
            ]
        );
    }

    #[test]
    fn resolves_member_accesses() {
        let source = format!(
            "{POINT}struct Line {{\n    a: Point,\n    b: Point\n}}\nfn main() {{\n    let line = Line {{ a: Point {{ x: 1, y: 2 }}, b: Point {{ x: 3, y: 4 }} }}\n    print(line.b.y)\n}}"
        );
        let checked = checked(&source);
        let Stmt::Expr(print) = &checked.ast.fns[0].stmts[1] else {
            panic!("expected an expression statement");
        };
        let ExprKind::FnCall { args, .. } = &print.kind else {
            panic!("expected a call");
        };
        assert_eq!(args[0].ty, checked.ast.types.int);
        assert!(matches!(
            &args[0].kind,
            ExprKind::FieldAccess { base, field_index: 1 }
                if matches!(base.kind, ExprKind::FieldAccess { field_index: 1, .. })
        ));

        let source = format!("{POINT}fn main() {{\n    let p = Point {{ x: 1, y: 2 }}\n    print(p.z)\n    print(p.x.y)\n}}");
        assert_eq!(
            error_messages(&source),
            vec![
                "Value of type 'Point' has no such field 'z'",
                "Member accesses cannot be performed on builtin types, got type 'Int'",
            ]
        );
    }

    #[test]
    fn accumulates_errors_across_functions() {
        let messages = error_messages("fn a() {\n    x()\n}\nfn b() {\n    y()\n}");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn requires_core_builtin_types() {
        let ast = parse_source("fn main() {\n}").expect("parse");
        let builtins = Builtins::default();
        let types: Vec<BuiltinType> = builtins
            .types
            .iter()
            .filter(|ty| ty.ident != "Void")
            .cloned()
            .collect();
        let errors = check(&ast, &types, &[]).expect_err("missing Void");
        assert_eq!(
            errors[0].to_string(),
            "error: Expected to find builtin type named 'Void'"
        );
    }

    #[test]
    fn checking_is_deterministic() {
        let source = format!(
            "{POINT}fn norm(p: Point) -> Int {{\n    return p.x * p.x + p.y * p.y\n}}\nfn main() {{\n    print(norm(Point {{ x: 3, y: 4 }}))\n    return\n    print(0)\n}}"
        );
        let ast = parse_source(&source).expect("parse");
        let builtins = Builtins::default();
        let first = check(&ast, &builtins.types, &builtins.fns).expect("check");
        let second = check(&ast, &builtins.types, &builtins.fns).expect("check");
        assert_eq!(format!("{:?}", first.ast), format!("{:?}", second.ast));
        assert_eq!(first.warnings, second.warnings);

        let broken = parse_source("fn main() {\n    x(y)\n    z()\n}").expect("parse");
        let first = check(&broken, &builtins.types, &builtins.fns).expect_err("errors");
        let second = check(&broken, &builtins.types, &builtins.fns).expect_err("errors");
        assert_eq!(first, second);
    }
}
