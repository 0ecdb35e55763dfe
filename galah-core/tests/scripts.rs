use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use galah_core::{Builtins, CoreError, Diagnostic, Interpreter, Level};

struct Run {
    result: Result<(), CoreError>,
    output: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

fn run_source(source: &str) -> Run {
    let output = Rc::new(RefCell::new(Vec::new()));
    let builtins = {
        let output = Rc::clone(&output);
        Builtins::with_output(move |line| output.borrow_mut().push(line.to_string()))
    };

    let mut diagnostics = Vec::new();
    let result = Interpreter::with_builtins(source, builtins, |diagnostic| {
        diagnostics.push(diagnostic.clone())
    })
    .and_then(|interpreter| interpreter.evaluate_main());

    let output = output.borrow().clone();
    Run {
        result,
        output,
        diagnostics,
    }
}

fn run_script(name: &str) -> Run {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scripts")
        .join(name);
    let source = fs::read_to_string(&path).expect("read script");
    run_source(&source)
}

#[test]
fn fibonacci_script() {
    let run = run_script("fibonacci.galah");
    run.result.expect("run");
    assert_eq!(run.output, vec!["1", "1", "55", "6765"]);
    assert!(run.diagnostics.is_empty());
}

#[test]
fn shapes_script() {
    let run = run_script("shapes.galah");
    run.result.expect("run");
    assert_eq!(run.output, vec!["small", "20", "large", "empty"]);
}

#[test]
fn unreachable_script_warns_and_skips() {
    let run = run_script("unreachable.galah");
    run.result.expect("run");
    assert_eq!(run.output, vec!["before"]);
    assert_eq!(run.diagnostics.len(), 1);
    assert_eq!(run.diagnostics[0].level, Level::Warning);
    assert_eq!(run.diagnostics[0].message, "Unreachable statements");
}

#[test]
fn check_errors_do_not_run_anything() {
    let run = run_source("fn main() {\n    print(1)\n    print(x)\n}");
    let Err(CoreError::Check(errors)) = run.result else {
        panic!("expected check errors");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "error:3:11~3:12: No such variable 'x'");
    assert!(run.output.is_empty());
    assert_eq!(run.diagnostics, errors);
}

#[test]
fn parse_errors_stop_the_pipeline() {
    let run = run_source("fn main() {\n    print(1) print(2)\n}");
    let Err(CoreError::Parse(error)) = run.result else {
        panic!("expected a parse error");
    };
    assert!(error.message.starts_with("Expected a newline"));
}

#[test]
fn operators_group_to_the_right_without_precedence() {
    let run = run_source("fn main() {\n    print(2 * 3 + 4)\n    print((2 * 3) + 4)\n    print(10 - 4 - 3)\n}");
    run.result.expect("run");
    assert_eq!(run.output, vec!["14", "10", "9"]);
}

#[test]
fn struct_literals_need_parentheses_in_conditions() {
    let source = "struct Flag {\n    on: Int\n}\nfn main() {\n    if (Flag { on: 1 }).on {\n        print(\"on\")\n    }\n}";
    let run = run_source(source);
    run.result.expect("run");
    assert_eq!(run.output, vec!["on"]);
}

#[test]
fn integer_arithmetic_wraps() {
    let run = run_source(
        "fn main() {\n    print(9223372036854775807 + 1)\n    print((-9223372036854775807) - 1)\n}",
    );
    run.result.expect("run");
    assert_eq!(
        run.output,
        vec!["-9223372036854775808", "-9223372036854775808"]
    );
}

#[test]
fn out_of_range_literals_are_lex_errors() {
    let run = run_source("fn main() {\n    print(9223372036854775808)\n}");
    let Err(CoreError::Lex(error)) = run.result else {
        panic!("expected a lex error");
    };
    assert_eq!(
        error.message,
        "Integer literal '9223372036854775808' is out of range"
    );
}
