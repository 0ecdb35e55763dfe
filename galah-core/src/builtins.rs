//! Builtin types and functions supplied by the embedder.
//!
//! Builtins are declared with host types implementing [`Representable`];
//! the Galah signature is derived from those types and checked like any
//! user-defined signature. Operators are builtin functions named after the
//! operator, e.g. `+` or `!`.

use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::types::BuiltinType;
use crate::value::{Representable, Value};

/// Native implementation of a builtin function.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>;

/// A builtin parameter: a label for messages and the name of its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinParam {
    pub ident: String,
    pub ty: String,
}

impl BuiltinParam {
    pub fn new(ident: impl Into<String>, ty: impl Into<String>) -> Self {
        BuiltinParam {
            ident: ident.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Clone)]
pub struct BuiltinFn {
    pub ident: String,
    pub params: Vec<BuiltinParam>,
    pub return_type: String,
    native: NativeFn,
}

impl BuiltinFn {
    /// An untyped builtin. `native` is only ever called with as many
    /// arguments as there are `params`.
    pub fn new(
        ident: impl Into<String>,
        params: Vec<BuiltinParam>,
        return_type: impl Into<String>,
        native: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        BuiltinFn {
            ident: ident.into(),
            params,
            return_type: return_type.into(),
            native: Rc::new(native),
        }
    }

    pub fn function1<A: Representable, R: Representable>(
        ident: impl Into<String>,
        label: &str,
        f: impl Fn(A) -> R + 'static,
    ) -> Self {
        let ident = ident.into();
        let name = ident.clone();
        Self::new(
            ident,
            vec![BuiltinParam::new(label, A::TYPE_NAME)],
            R::TYPE_NAME,
            move |args| Ok(f(argument(&name, args, 0)?).into_value()),
        )
    }

    pub fn function2<A: Representable, B: Representable, R: Representable>(
        ident: impl Into<String>,
        labels: (&str, &str),
        f: impl Fn(A, B) -> R + 'static,
    ) -> Self {
        Self::try_function2(ident, labels, move |a, b| Ok(f(a, b)))
    }

    fn try_function2<A: Representable, B: Representable, R: Representable>(
        ident: impl Into<String>,
        labels: (&str, &str),
        f: impl Fn(A, B) -> Result<R, RuntimeError> + 'static,
    ) -> Self {
        let ident = ident.into();
        let name = ident.clone();
        Self::new(
            ident,
            vec![
                BuiltinParam::new(labels.0, A::TYPE_NAME),
                BuiltinParam::new(labels.1, B::TYPE_NAME),
            ],
            R::TYPE_NAME,
            move |args| {
                let a = argument(&name, args, 0)?;
                let b = argument(&name, args, 1)?;
                Ok(f(a, b)?.into_value())
            },
        )
    }

    /// A prefix operator such as `!`.
    pub fn unary_op<A: Representable, R: Representable>(
        op: impl Into<String>,
        f: impl Fn(A) -> R + 'static,
    ) -> Self {
        Self::function1(op, "operand", f)
    }

    /// An infix operator such as `+`.
    pub fn binary_op<A: Representable, B: Representable, R: Representable>(
        op: impl Into<String>,
        f: impl Fn(A, B) -> R + 'static,
    ) -> Self {
        Self::function2(op, ("lhs", "rhs"), f)
    }

    /// An infix operator that can fail at runtime, such as `/`.
    pub fn try_binary_op<A: Representable, B: Representable, R: Representable>(
        op: impl Into<String>,
        f: impl Fn(A, B) -> Result<R, RuntimeError> + 'static,
    ) -> Self {
        Self::try_function2(op, ("lhs", "rhs"), f)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        if args.len() != self.arity() {
            return Err(RuntimeError::ArityMismatch {
                ident: self.ident.clone(),
                expected: self.arity(),
                got: args.len(),
            });
        }
        (self.native)(args)
    }
}

impl fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinFn")
            .field("ident", &self.ident)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

fn argument<A: Representable>(
    ident: &str,
    args: &[Value],
    index: usize,
) -> Result<A, RuntimeError> {
    args.get(index)
        .cloned()
        .and_then(A::from_value)
        .ok_or_else(|| RuntimeError::ArgumentType {
            ident: ident.to_string(),
            index,
            expected: A::TYPE_NAME,
        })
}

/// The builtin environment a program is checked and run against.
#[derive(Debug, Clone)]
pub struct Builtins {
    pub types: Vec<BuiltinType>,
    pub fns: Vec<BuiltinFn>,
}

impl Builtins {
    /// The default environment with `print` writing lines to `sink`.
    pub fn with_output(sink: impl Fn(&str) + 'static) -> Self {
        let sink: Rc<dyn Fn(&str)> = Rc::new(sink);
        let print_int = {
            let sink = Rc::clone(&sink);
            BuiltinFn::function1("print", "value", move |value: i64| {
                sink(value.to_string().as_str())
            })
        };
        let print_string =
            BuiltinFn::function1("print", "value", move |value: String| sink(value.as_str()));

        Builtins {
            types: ["Void", "Int", "Bool", "String"]
                .into_iter()
                .map(BuiltinType::new)
                .collect(),
            fns: vec![
                BuiltinFn::binary_op("+", |a: i64, b: i64| a.wrapping_add(b)),
                BuiltinFn::binary_op("-", |a: i64, b: i64| a.wrapping_sub(b)),
                BuiltinFn::binary_op("*", |a: i64, b: i64| a.wrapping_mul(b)),
                BuiltinFn::try_binary_op("/", |a: i64, b: i64| {
                    if b == 0 {
                        Err(RuntimeError::DivisionByZero)
                    } else {
                        Ok(a.wrapping_div(b))
                    }
                }),
                BuiltinFn::binary_op("==", |a: i64, b: i64| flag(a == b)),
                BuiltinFn::binary_op("||", |a: i64, b: i64| flag(a != 0 || b != 0)),
                BuiltinFn::binary_op("&&", |a: i64, b: i64| flag(a != 0 && b != 0)),
                BuiltinFn::unary_op("!", |x: i64| flag(x == 0)),
                BuiltinFn::unary_op("-", |x: i64| x.wrapping_neg()),
                BuiltinFn::binary_op(">", |a: i64, b: i64| flag(a > b)),
                BuiltinFn::binary_op("<", |a: i64, b: i64| flag(a < b)),
                BuiltinFn::binary_op(">=", |a: i64, b: i64| flag(a >= b)),
                BuiltinFn::binary_op("<=", |a: i64, b: i64| flag(a <= b)),
                print_int,
                print_string,
            ],
        }
    }

    pub fn push(&mut self, builtin: BuiltinFn) -> &mut Self {
        self.fns.push(builtin);
        self
    }

    pub fn find(&self, ident: &str) -> impl Iterator<Item = &BuiltinFn> {
        self.fns.iter().filter(move |builtin| builtin.ident == ident)
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Builtins::with_output(|line| println!("{line}"))
    }
}

/// Comparisons produce `1` or `0`.
fn flag(condition: bool) -> i64 {
    i64::from(condition)
}
