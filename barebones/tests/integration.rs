//! Integration tests for the BareBones interpreter
//!
//! Runs whole programs through the public API:
//! - Statement fetching
//! - Loops, branches and functions
//! - Fatal errors and where they are reported
//! - Configuration

use barebones::config::{Config, EngineConfig};
use barebones::interp::{Capture, ErrorKind, Step};
use barebones::{Cursor, Dispatcher, Machine, Program, TextProgram};
use std::rc::Rc;

/// Output and final machine of a program run to completion
struct Run {
    machine: Machine,
    output: String,
}

fn execute_with(source: &str, config: EngineConfig) -> Result<Run, barebones::RuntimeError> {
    let capture = Capture::new();
    let mut machine = Machine::builder(Rc::new(TextProgram::new(source)))
        .output(capture.output())
        .config(config)
        .build();
    machine.run()?;
    Ok(Run {
        machine,
        output: capture.contents(),
    })
}

fn execute(source: &str) -> Run {
    execute_with(source, EngineConfig::default()).expect("program should run")
}

fn failure(source: &str) -> barebones::RuntimeError {
    match execute_with(source, EngineConfig::default()) {
        Ok(_) => panic!("program should fail"),
        Err(e) => e,
    }
}

fn value(run: &Run, name: &str) -> i64 {
    run.machine.state().value_of(name).expect("variable should exist")
}

// ============================================
// Statement source
// ============================================

#[test]
fn test_fetch_splits_and_trims() {
    let program = TextProgram::new("init X;\n  incr X ;\n\tprint X;");
    assert_eq!(program.fetch(Cursor::new(0)).as_deref(), Some("init X"));
    assert_eq!(program.fetch(Cursor::new(1)).as_deref(), Some("incr X"));
    assert_eq!(program.fetch(Cursor::new(2)).as_deref(), Some("print X"));
    assert_eq!(program.fetch(Cursor::new(3)), None);
}

#[test]
fn test_fetch_trailing_statement_without_terminator() {
    let program = TextProgram::new("init X; incr X");
    assert_eq!(program.fetch(Cursor::new(1)).as_deref(), Some("incr X"));
    assert_eq!(program.statement_count(), 2);
}

#[test]
fn test_empty_program_finishes_immediately() {
    let mut machine = Machine::builder(Rc::new(TextProgram::new("")))
        .output(Capture::new().output())
        .build();
    assert_eq!(machine.step().unwrap(), Step::Finished);
    assert!(machine.is_finished());
}

// ============================================
// Loops
// ============================================

#[test]
fn test_while_counts_down_to_zero() {
    let run = execute("init X; set X 100; while X not 0 do; decr X; end;");
    assert_eq!(value(&run, "X"), 0);
    assert_eq!(run.machine.state().depth(), 1);
}

#[test]
fn test_multiplication_by_repeated_addition() {
    let run = execute(
        "set A 6; set B 7; init R;
         while B not 0 do;
           add R A into R;
           decr B;
         end;
         print R;",
    );
    insta::assert_snapshot!(run.output, @"R = 42");
}

#[test]
fn test_while_then_following_statements() {
    let run = execute("set X 3; init Y; while X > 0 do; decr X; incr Y; end; incr Y;");
    assert_eq!(value(&run, "Y"), 4);
}

// ============================================
// Branches
// ============================================

#[test]
fn test_if_elif() {
    let run = execute("set X 1; if X is 0 do; set X 10; elif X is 1 do; set X 20; end;");
    assert_eq!(value(&run, "X"), 20);
}

#[test]
fn test_if_elif_else_runs_exactly_one_branch() {
    let source = "set X 1; init HITS;
                  if X is 1 do; incr HITS; elif X is 1 do; incr HITS; else; incr HITS; end;";
    let run = execute(source);
    assert_eq!(value(&run, "HITS"), 1);
}

#[test]
fn test_branch_inside_loop() {
    let run = execute(
        "set I 4;
         while I > 0 do;
           if I > 2 do; print I; else; decr I; end;
           decr I;
         end;",
    );
    insta::assert_snapshot!(run.output, @r"
    I = 4
    I = 3
    ");
}

// ============================================
// Functions
// ============================================

#[test]
fn test_function_receives_copies() {
    let run = execute(
        "function clobber(A, B) do; clear A; clear B; end;
         set X 5; set Y 6; clobber X Y;",
    );
    assert_eq!(value(&run, "X"), 5);
    assert_eq!(value(&run, "Y"), 6);
}

#[test]
fn test_arity_mismatch_leaves_state_unchanged() {
    let capture = Capture::new();
    let mut machine = Machine::builder(Rc::new(TextProgram::new(
        "function pair(A, B) do; print A; end; set X 5; pair X; incr X;",
    )))
    .output(capture.output())
    .build();
    let err = machine.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArityMismatch);
    assert_eq!(err.at, Some(Cursor::new(4)));
    assert_eq!(machine.state().value_of("X").unwrap(), 5);
    assert_eq!(capture.contents(), "");
}

#[test]
fn test_recursive_function() {
    let run = execute(
        "function evens(N) do;
           if N > 0 do;
             print N; decr N; decr N; evens N;
           end;
         end;
         set X 6; evens X;",
    );
    insta::assert_snapshot!(run.output, @r"
    N = 6
    N = 4
    N = 2
    ");
}

#[test]
fn test_function_defined_in_loop_is_callable_afterwards() {
    let run = execute(
        "set X 1;
         while X not 0 do;
           function twice(A) do; add A A into A; print A; end;
           decr X;
         end;
         set Y 21; twice Y;",
    );
    insta::assert_snapshot!(run.output, @"A = 42");
}

#[test]
fn test_custom_dispatcher_without_functions() {
    let dispatcher = Dispatcher::builder()
        .map("init", barebones::interp::statements::Init)
        .finish();
    let mut machine = Machine::builder(Rc::new(TextProgram::new("init X; incr X;")))
        .dispatcher(dispatcher)
        .output(Capture::new().output())
        .build();
    let err = machine.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownInstruction);
    assert_eq!(err.at, Some(Cursor::new(1)));
}

// ============================================
// Errors
// ============================================

#[test]
fn test_error_points_at_innermost_statement() {
    let err = failure("set X 1; while X not 0 do; decr X; incr Y; end;");
    assert_eq!(err.kind, ErrorKind::UnresolvedVariable);
    assert_eq!(err.at, Some(Cursor::new(3)));
    assert!(err.to_string().ends_with("(statement 3)"));
}

#[test]
fn test_unmatched_end() {
    let err = failure("init X; end;");
    assert_eq!(err.kind, ErrorKind::UnmatchedTerminator);
    assert_eq!(err.at, Some(Cursor::new(1)));
}

#[test]
fn test_unterminated_function() {
    let err = failure("function f(A) do; print A;");
    assert_eq!(err.kind, ErrorKind::UnterminatedBlock);
    assert_eq!(err.at, Some(Cursor::new(0)));
}

#[test]
fn test_malformed_signature() {
    assert_eq!(failure("function f A do; end;").kind, ErrorKind::MalformedSignature);
    assert_eq!(failure("function (A) do; end;").kind, ErrorKind::MalformedSignature);
}

#[test]
fn test_unknown_instruction_hint() {
    let err = failure("init X; pritn X;");
    assert_eq!(err.kind, ErrorKind::UnknownInstruction);
    assert!(err.message.contains("did you mean `print`"), "{}", err.message);
}

#[test]
fn test_duplicate_variable_across_scopes() {
    let err = failure("init X; if X is 0 do; init X; end;");
    assert_eq!(err.kind, ErrorKind::DuplicateVariable);
}

#[test]
fn test_nesting_limit_from_config() {
    let config = Config::from_toml("[engine]\nmax_nesting = 3\n").unwrap();
    let source = "set X 1;
                  while X is 1 do; while X is 1 do; while X is 1 do; while X is 1 do;
                  clear X; end; end; end; end;";
    let err = match execute_with(source, config.engine) {
        Ok(_) => panic!("nesting limit should be hit"),
        Err(e) => e,
    };
    assert_eq!(err.kind, ErrorKind::NestingTooDeep);

    let run = execute_with(source, EngineConfig::default()).unwrap();
    assert_eq!(value(&run, "X"), 0);
}

#[test]
fn test_deep_recursion_within_limit() {
    let run = execute(
        "function down(N) do; if N > 0 do; decr N; down N; end; end;
         set X 200; down X; print X;",
    );
    insta::assert_snapshot!(run.output, @"X = 200");
}

// ============================================
// Stepping
// ============================================

#[test]
fn test_top_level_steps_hide_block_bodies() {
    let mut machine = Machine::builder(Rc::new(TextProgram::new(
        "set X 2; while X not 0 do; decr X; end; print X;",
    )))
    .output(Capture::new().output())
    .build();

    let mut keywords = Vec::new();
    while let Step::Executed(record) = machine.step().unwrap() {
        keywords.push(record.keyword);
    }
    assert_eq!(keywords, vec!["set", "while", "print"]);
}

#[test]
fn test_step_record_json() {
    let mut machine = Machine::builder(Rc::new(TextProgram::new("init X;")))
        .output(Capture::new().output())
        .build();
    let Step::Executed(record) = machine.step().unwrap() else {
        panic!("expected a step");
    };
    let json = serde_json::to_string(&record).unwrap();
    insta::assert_snapshot!(json, @r#"{"keyword":"init","args":["X"],"mode":"execute","cursor_before":0,"cursor_after":1,"depth_before":1,"depth_after":1}"#);
}
