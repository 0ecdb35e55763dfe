//! The front-end pipeline: source text to a checked program.

use crate::builtins::Builtins;
use crate::checked::CheckedAst;
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::parser::parse_source;
use crate::typecheck::{Checked, check};

/// Lexes, parses and checks `source` against `builtins`.
///
/// Every diagnostic is handed to `on_diagnostic` once: the warnings of a
/// successful check, or the errors of a failed stage before that stage's
/// error is returned.
pub fn compile(
    source: &str,
    builtins: &Builtins,
    mut on_diagnostic: impl FnMut(&Diagnostic),
) -> Result<CheckedAst, CoreError> {
    match check_source(source, builtins) {
        Ok(Checked { ast, warnings }) => {
            warnings.iter().for_each(&mut on_diagnostic);
            Ok(ast)
        }
        Err(err) => {
            err.diagnostics().iter().for_each(&mut on_diagnostic);
            Err(err)
        }
    }
}

/// Like [`compile`], but returns the warnings instead of reporting them.
pub fn check_source(source: &str, builtins: &Builtins) -> Result<Checked, CoreError> {
    let ast = parse_source(source)?;
    check(&ast, &builtins.types, &builtins.fns).map_err(CoreError::Check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_program() {
        let builtins = Builtins::default();
        let mut reported = Vec::new();
        let ast = compile(
            "fn main() {\n    print(\"hi\")\n}",
            &builtins,
            |diagnostic| reported.push(diagnostic.clone()),
        )
        .expect("compile");
        assert_eq!(ast.fns.len(), 1);
        assert!(reported.is_empty());
    }

    #[test]
    fn reports_warnings_through_the_callback() {
        let builtins = Builtins::default();
        let mut reported = Vec::new();
        compile(
            "fn main() {\n    return\n    print(1)\n}",
            &builtins,
            |diagnostic| reported.push(diagnostic.clone()),
        )
        .expect("compile");
        assert_eq!(reported.len(), 1);
        assert!(!reported[0].is_error());
    }

    #[test]
    fn stops_at_the_first_failing_stage() {
        let builtins = Builtins::default();
        let err = compile("fn main() {\n    \"open\n}", &builtins, |_| {}).unwrap_err();
        assert!(matches!(err, CoreError::Lex(_)));

        let err = compile("fn main() {\n    print(1) print(2)\n}", &builtins, |_| {}).unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));

        let err = compile("fn main() {\n    a()\n    b()\n}", &builtins, |_| {}).unwrap_err();
        assert!(matches!(&err, CoreError::Check(diagnostics) if diagnostics.len() == 2));
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn reports_errors_through_the_callback() {
        let builtins = Builtins::default();
        let mut reported = Vec::new();
        let err = compile(
            "fn main() {\n    a()\n    b()\n}",
            &builtins,
            |diagnostic| reported.push(diagnostic.clone()),
        )
        .unwrap_err();
        assert_eq!(reported, err.diagnostics());
        assert!(reported.iter().all(Diagnostic::is_error));
    }

    #[test]
    fn lone_carriage_returns_keep_later_lines_in_place() {
        let source = "fn main() {\n    print(\"\r\")\n}\nfoo";
        let err = compile(source, &Builtins::default(), |_| {}).unwrap_err();
        let CoreError::Parse(diagnostic) = &err else {
            panic!("expected a parse error");
        };
        assert!(diagnostic.to_string().starts_with("error:4:1: "));
        assert!(diagnostic.formatted(source, 5).ends_with("\n    foo\n    ^"));
    }
}
