//! Core toolchain for the Galah scripting language.
//!
//! The pipeline is roughly:
//!
//!   source text
//!     -> lexer       (tokens, trivia included)
//!     -> parser      (untyped AST)
//!     -> typecheck   (checked program + warnings)
//!     -> interpreter (tree-walking evaluation)
//!
//! Embedders supply the builtin types and functions ([`Builtins`]) a
//! program is checked and run against. Higher-level tools such as the CLI
//! should depend on this crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, checked program, type checking
// ---------------------------------------------------------------------

pub mod types;
pub mod checked;
pub mod graph;
pub mod typecheck;

// ---------------------------------------------------------------------
// Runtime: values, builtins and evaluation
// ---------------------------------------------------------------------

pub mod value;
pub mod builtins;
pub mod compiler;
pub mod interpreter;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use builtins::{BuiltinFn, Builtins};
pub use checked::CheckedAst;
pub use compiler::{check_source, compile};
pub use diagnostic::{DEFAULT_MAX_CODE_LINES, Diagnostic, Level};
pub use error::{CoreError, RuntimeError};
pub use interpreter::Interpreter;
pub use span::{Location, Span};
pub use value::{Representable, Value};
