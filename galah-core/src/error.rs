use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Lex(Diagnostic),
    #[error("{0}")]
    Parse(Diagnostic),
    #[error("type checking failed with {} error(s)", .0.len())]
    Check(Vec<Diagnostic>),
    #[error("missing '{0}' function")]
    MissingEntry(String),
    #[error("'{0}' function must return 'Void'")]
    EntryNotVoid(String),
    #[error("no such function '{name}' with parameter types '({params})'")]
    NoSuchFunction { name: String, params: String },
    #[error("no such function '{name}' with return type '{return_type}'")]
    NoSuchReturnType { name: String, return_type: String },
    #[error("argument {index} of '{name}' cannot be passed from the host: {reason}")]
    UnsupportedArgument {
        name: String,
        index: usize,
        reason: String,
    },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl CoreError {
    /// Every diagnostic carried by this error, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            CoreError::Lex(diagnostic) | CoreError::Parse(diagnostic) => vec![diagnostic.clone()],
            CoreError::Check(diagnostics) => diagnostics.clone(),
            other => vec![Diagnostic::error_without_source(other.to_string())],
        }
    }
}

/// Failures raised while evaluating a checked program.
///
/// Arity and argument type mismatches can't happen for a program that went
/// through the type checker; they guard builtins called directly by an
/// embedder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("'{ident}' expects {expected} arguments, got {got}")]
    ArityMismatch {
        ident: String,
        expected: usize,
        got: usize,
    },
    #[error("'{ident}' expects argument {index} to be of type '{expected}'")]
    ArgumentType {
        ident: String,
        index: usize,
        expected: &'static str,
    },
    #[error("'{ident}' returned a value that is not of type '{expected}'")]
    ReturnType {
        ident: String,
        expected: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("precondition failed: {0}")]
    Precondition(String),
}
