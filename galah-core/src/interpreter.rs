//! Tree-walking evaluator for checked programs.
//!
//! Each call gets one flat array of local slots, sized by the checker.
//! Parameters occupy the first slots; every other slot starts out as
//! [`Value::Void`] and is overwritten when its `let` runs.

use std::iter;

use crate::builtins::Builtins;
use crate::checked::{self, CheckedAst, Expr, ExprKind, FnId, IfStmt, Stmt};
use crate::compiler::compile;
use crate::diagnostic::Diagnostic;
use crate::error::{CoreError, RuntimeError};
use crate::types::TypeIndex;
use crate::value::{Representable, Value};

/// A checked program ready to run.
#[derive(Debug, Clone)]
pub struct Interpreter {
    ast: CheckedAst,
}

/// `Some` when a `return` ran.
type Flow = Option<Value>;

impl Interpreter {
    /// Compiles `source` against the default builtins, discarding warnings.
    pub fn new(source: &str) -> Result<Self, CoreError> {
        Self::with_builtins(source, Builtins::default(), |_| {})
    }

    pub fn with_builtins(
        source: &str,
        builtins: Builtins,
        on_diagnostic: impl FnMut(&Diagnostic),
    ) -> Result<Self, CoreError> {
        let ast = compile(source, &builtins, on_diagnostic)?;
        Ok(Self::from_checked(ast))
    }

    pub fn from_checked(ast: CheckedAst) -> Self {
        Interpreter { ast }
    }

    /// Runs `fn main()`.
    pub fn evaluate_main(&self) -> Result<(), CoreError> {
        self.evaluate_entry("main")
    }

    /// Runs the zero-argument function `name`, which must return `Void`.
    pub fn evaluate_entry(&self, name: &str) -> Result<(), CoreError> {
        let (_, entry) = self
            .ast
            .fn_named(name, &[])
            .ok_or_else(|| CoreError::MissingEntry(name.to_string()))?;
        if entry.signature.return_type != self.ast.types.void {
            return Err(CoreError::EntryNotVoid(name.to_string()));
        }
        self.evaluate(entry, Vec::new())?;
        Ok(())
    }

    /// Calls the user-defined function `name` whose parameter types match
    /// `args` and whose return type is `R`.
    ///
    /// ```
    /// use galah_core::{Interpreter, Value};
    ///
    /// let interpreter = Interpreter::new("fn double(n: Int) -> Int {\n    return n * 2\n}")?;
    /// let doubled: i64 = interpreter.call("double", vec![Value::Int(21)])?;
    /// assert_eq!(doubled, 42);
    /// # Ok::<(), galah_core::CoreError>(())
    /// ```
    pub fn call<R: Representable>(&self, name: &str, args: Vec<Value>) -> Result<R, CoreError> {
        let types = &self.ast.types;
        let param_types = args
            .iter()
            .enumerate()
            .map(|(index, arg)| self.host_type(name, index, arg))
            .collect::<Result<Vec<_>, _>>()?;

        let (_, f) = self
            .ast
            .fn_named(name, &param_types)
            .ok_or_else(|| CoreError::NoSuchFunction {
                name: name.to_string(),
                params: types.describe_list(&param_types),
            })?;
        if types.builtin_named(R::TYPE_NAME) != Some(f.signature.return_type) {
            return Err(CoreError::NoSuchReturnType {
                name: name.to_string(),
                return_type: R::TYPE_NAME.to_string(),
            });
        }

        let value = self.evaluate(f, args)?;
        R::from_value(value).ok_or_else(|| {
            CoreError::from(RuntimeError::ReturnType {
                ident: name.to_string(),
                expected: R::TYPE_NAME,
            })
        })
    }

    /// The builtin type of a value passed in from the host.
    fn host_type(&self, name: &str, index: usize, arg: &Value) -> Result<TypeIndex, CoreError> {
        let type_name = match arg {
            Value::Int(_) => i64::TYPE_NAME,
            Value::Str(_) => String::TYPE_NAME,
            Value::Bool(_) => bool::TYPE_NAME,
            Value::Void => <()>::TYPE_NAME,
            Value::Struct(_) => {
                return Err(CoreError::UnsupportedArgument {
                    name: name.to_string(),
                    index,
                    reason: "struct values cannot be passed from the host".to_string(),
                });
            }
        };
        self.ast
            .types
            .builtin_named(type_name)
            .ok_or_else(|| CoreError::UnsupportedArgument {
                name: name.to_string(),
                index,
                reason: format!("no builtin type named '{type_name}'"),
            })
    }

    /// Runs `f` with `args` in its first local slots.
    pub fn evaluate(&self, f: &checked::Fn, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if args.len() != f.signature.params.len() {
            return Err(RuntimeError::ArityMismatch {
                ident: f.signature.ident.clone(),
                expected: f.signature.params.len(),
                got: args.len(),
            });
        }

        let mut locals = args;
        locals.resize(f.local_count.max(locals.len()), Value::Void);
        Ok(self.execute_block(&f.stmts, &mut locals)?.unwrap_or(Value::Void))
    }

    fn execute_block(&self, stmts: &[Stmt], locals: &mut [Value]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Some(value) = self.execute_stmt(stmt, locals)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn execute_stmt(&self, stmt: &Stmt, locals: &mut [Value]) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.evaluate_expr(expr, locals)?;
                Ok(None)
            }
            Stmt::If(if_stmt) => self.execute_if(if_stmt, locals),
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate_expr(value, locals)?,
                    None => Value::Void,
                };
                Ok(Some(value))
            }
            Stmt::Let(decl) => {
                let value = self.evaluate_expr(&decl.value, locals)?;
                let slot = locals.get_mut(decl.local_index).ok_or_else(|| {
                    RuntimeError::Precondition(format!("no local slot {}", decl.local_index))
                })?;
                *slot = value;
                Ok(None)
            }
        }
    }

    fn execute_if(&self, if_stmt: &IfStmt, locals: &mut [Value]) -> Result<Flow, RuntimeError> {
        for block in iter::once(&if_stmt.if_block).chain(&if_stmt.else_if_blocks) {
            if self.evaluate_expr(&block.condition, locals)?.is_truthy() {
                return self.execute_block(&block.block, locals);
            }
        }
        match &if_stmt.else_block {
            Some(stmts) => self.execute_block(stmts, locals),
            None => Ok(None),
        }
    }

    fn evaluate_expr(&self, expr: &Expr, locals: &[Value]) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Constant(value) => Ok(value.clone()),
            ExprKind::FnCall { id, args } => {
                let args = self.evaluate_all(args, locals)?;
                self.call_fn(*id, args)
            }
            ExprKind::LocalVar(index) => locals
                .get(*index)
                .cloned()
                .ok_or_else(|| RuntimeError::Precondition(format!("no local slot {index}"))),
            ExprKind::StructInit { fields, .. } => {
                Ok(Value::Struct(self.evaluate_all(fields, locals)?))
            }
            ExprKind::FieldAccess { base, field_index } => {
                let value = self.evaluate_expr(base, locals)?;
                value.field(*field_index).cloned().ok_or_else(|| {
                    RuntimeError::Precondition(format!(
                        "expected a struct value with a field {field_index}, got '{value}'"
                    ))
                })
            }
        }
    }

    /// Evaluates left to right.
    fn evaluate_all(&self, exprs: &[Expr], locals: &[Value]) -> Result<Vec<Value>, RuntimeError> {
        exprs
            .iter()
            .map(|expr| self.evaluate_expr(expr, locals))
            .collect()
    }

    fn call_fn(&self, id: FnId, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match id {
            FnId::Builtin(index) => {
                let builtin = self.ast.builtin_fns.get(index).ok_or_else(|| {
                    RuntimeError::Precondition(format!("no builtin function {index}"))
                })?;
                builtin.call(&args)
            }
            FnId::UserDefined(index) => {
                let f = self.ast.fns.get(index).ok_or_else(|| {
                    RuntimeError::Precondition(format!("no user-defined function {index}"))
                })?;
                self.evaluate(f, args)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn run(source: &str) -> (Result<(), CoreError>, Vec<String>) {
        let output = Rc::new(RefCell::new(Vec::new()));
        let builtins = {
            let output = Rc::clone(&output);
            Builtins::with_output(move |line| output.borrow_mut().push(line.to_string()))
        };
        let result = Interpreter::with_builtins(source, builtins, |_| {})
            .and_then(|interpreter| interpreter.evaluate_main());
        let lines = output.borrow().clone();
        (result, lines)
    }

    fn output_of(source: &str) -> Vec<String> {
        let (result, output) = run(source);
        result.expect("run");
        output
    }

    const FIBONACCI: &str = "fn fibonacci(n: Int) -> Int {\n    if (n == 1) || (n == 2) {\n        return 1\n    }\n    return fibonacci(n - 1) + fibonacci(n - 2)\n}\n";

    #[test]
    fn evaluates_recursive_fibonacci() {
        let interpreter = Interpreter::new(FIBONACCI).expect("compile");
        let result: i64 = interpreter
            .call("fibonacci", vec![Value::Int(20)])
            .expect("call");
        assert_eq!(result, 6765);
    }

    #[test]
    fn runs_main_and_prints() {
        let output = output_of(&format!(
            "{FIBONACCI}fn main() {{\n    print(\"fib:\")\n    print(fibonacci(10))\n}}"
        ));
        assert_eq!(output, vec!["fib:", "55"]);
    }

    #[test]
    fn takes_the_first_true_branch() {
        let source = "fn classify(n: Int) {\n    if n < 0 {\n        print(\"negative\")\n    } else if n == 0 {\n        print(\"zero\")\n    } else if n < 10 {\n        print(\"small\")\n    } else {\n        print(\"large\")\n    }\n}\nfn main() {\n    classify(-5)\n    classify(0)\n    classify(3)\n    classify(100)\n}";
        assert_eq!(output_of(source), vec!["negative", "zero", "small", "large"]);
    }

    #[test]
    fn return_stops_the_enclosing_function() {
        let source = "fn first(n: Int) -> Int {\n    if n > 0 {\n        if n > 5 {\n            return 2\n        }\n        return 1\n    }\n    return 0\n}\nfn main() {\n    print(first(9))\n    print(first(3))\n    print(first(0))\n    return\n    print(99)\n}";
        assert_eq!(output_of(source), vec!["2", "1", "0"]);
    }

    #[test]
    fn locals_get_their_own_slots() {
        let source = "fn main() {\n    let x = 1\n    if 1 {\n        let x = 2\n        print(x)\n    }\n    print(x)\n}";
        assert_eq!(output_of(source), vec!["2", "1"]);
    }

    #[test]
    fn builds_and_reads_struct_values() {
        let source = "struct Point {\n    x: Int,\n    y: Int\n}\nstruct Line {\n    from: Point,\n    to: Point\n}\nfn length2(line: Line) -> Int {\n    let dx = line.to.x - line.from.x\n    let dy = line.to.y - line.from.y\n    return (dx * dx) + (dy * dy)\n}\nfn main() {\n    let line = Line { from: Point { x: 1, y: 1 }, to: Point { x: 4, y: 5 } }\n    print(length2(line))\n}";
        assert_eq!(output_of(source), vec!["25"]);
    }

    #[test]
    fn arguments_evaluate_left_to_right() {
        let source = "fn trace(n: Int) -> Int {\n    print(n)\n    return n\n}\nfn main() {\n    print(trace(1) + trace(2))\n}";
        assert_eq!(output_of(source), vec!["1", "2", "3"]);
    }

    #[test]
    fn runtime_errors_propagate() {
        let (result, output) = run("fn main() {\n    print(1)\n    print(1 / 0)\n    print(2)\n}");
        assert!(matches!(
            result,
            Err(CoreError::Runtime(RuntimeError::DivisionByZero))
        ));
        assert_eq!(output, vec!["1"]);
    }

    #[test]
    fn entry_must_exist_and_return_void() {
        let (result, _) = run("fn start() {\n}");
        assert!(matches!(result, Err(CoreError::MissingEntry(name)) if name == "main"));

        let (result, _) = run("fn main() -> Int {\n    return 1\n}");
        assert!(matches!(result, Err(CoreError::EntryNotVoid(_))));

        let interpreter = Interpreter::new("fn start() {\n}").expect("compile");
        interpreter.evaluate_entry("start").expect("run start");
    }

    #[test]
    fn host_calls_match_the_full_signature() {
        let interpreter = Interpreter::new(
            "fn greet(name: String) -> String {\n    return name\n}\nfn nothing() {\n}",
        )
        .expect("compile");

        let greeting: String = interpreter
            .call("greet", vec![Value::from("galah")])
            .expect("call");
        assert_eq!(greeting, "galah");
        interpreter.call::<()>("nothing", Vec::new()).expect("call");

        let err = interpreter
            .call::<String>("greet", vec![Value::Int(1)])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "no such function 'greet' with parameter types '(Int)'"
        );

        let err = interpreter
            .call::<i64>("greet", vec![Value::from("galah")])
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NoSuchReturnType { return_type, .. } if return_type == "Int"
        ));

        let err = interpreter
            .call::<()>("greet", vec![Value::Struct(Vec::new())])
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedArgument { index: 0, .. }));
    }

    #[test]
    fn custom_builtins_are_callable() {
        let mut builtins = Builtins::with_output(|_| {});
        builtins.push(crate::builtins::BuiltinFn::function1(
            "length",
            "text",
            |text: String| text.chars().count() as i64,
        ));
        let interpreter = Interpreter::with_builtins(
            "fn size() -> Int {\n    return length(\"galah\")\n}",
            builtins,
            |_| {},
        )
        .expect("compile");
        assert_eq!(interpreter.call::<i64>("size", Vec::new()).expect("call"), 5);
    }
}
