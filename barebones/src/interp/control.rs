//! Block statements: `while`, `if`/`elif`/`else`, `function` and calls
//!
//! Blocks have no static extent. Each handler forks a sub-machine over the
//! same program and steps it until a statement reports [`Flow::Terminator`];
//! whatever the sub-machine consumed on the way is the block body.

use super::condition::Condition;
use super::error::{InterpResult, RuntimeError};
use super::machine::{BlockEnd, Flow, Machine, Mode, Statement, Step};
use crate::parser::is_builtin;
use crate::program::Cursor;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::debug;

/// Consume a disabled block up to its terminator on `machine` itself, which
/// is already in skip mode.
fn scan_block(machine: &mut Machine, keyword: &str, must_close: bool) -> InterpResult<Flow> {
    let _guard = machine.enter_block()?;
    match machine.run_block()? {
        BlockEnd::EndOfProgram if must_close => Err(RuntimeError::unterminated_block(keyword)),
        _ => Ok(Flow::Continue),
    }
}

// ============================================================================
// while
// ============================================================================

/// `while VAR OP LITERAL do ... end`
pub struct While;

impl Statement for While {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        let condition = Condition::parse("while", args)?;
        let _guard = machine.enter_block()?;

        let enabled = condition.eval(&machine.state())?;
        let fork = machine.fork();
        let mut body = if enabled {
            fork.finish()
        } else {
            fork.skipping().finish()
        };
        let body_start = body.cursor();

        let mut iterations = 0usize;
        loop {
            body.state_mut().push_scope();
            let end = body.run_block()?;
            // re-check while the iteration scope is still visible
            let again =
                enabled && end == BlockEnd::Terminator && condition.eval(&body.state())?;
            body.state_mut().pop_scope();
            if enabled {
                iterations += 1;
            }
            if !again {
                break;
            }
            body.state_mut().set_cursor(body_start);
        }

        debug!(var = %condition.var, iterations, "while done");
        Ok(Flow::Continue)
    }

    /// A missing `end` on a loop just runs to the end of the program.
    fn skip(&self, machine: &mut Machine, _at: Cursor, _args: &[String]) -> InterpResult<Flow> {
        scan_block(machine, "while", false)
    }
}

// ============================================================================
// if / elif / else
// ============================================================================

/// `if VAR OP LITERAL do ... [elif ... do ...] [else ...] end`
pub struct If;

fn is_continuation(keyword: &str) -> bool {
    keyword == "elif" || keyword == "else"
}

fn header_holds(machine: &Machine, keyword: &str, args: &[String]) -> InterpResult<bool> {
    if keyword == "else" {
        return Ok(true);
    }
    Condition::parse(keyword, args)?.eval(&machine.state())
}

impl Statement for If {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        let _guard = machine.enter_block()?;
        let mut shadow = machine.fork().skipping().finish();

        let mut header = Some(("if".to_string(), args.to_vec()));
        let mut selected = false;
        let mut pushed = false;
        loop {
            if let Some((keyword, args)) = header.take() {
                if pushed {
                    shadow.state_mut().pop_scope();
                    pushed = false;
                }
                if !selected && header_holds(&shadow, &keyword, &args)? {
                    debug!(%keyword, cursor = %shadow.cursor(), "branch taken");
                    selected = true;
                    shadow.set_mode(Mode::Execute);
                    shadow.state_mut().push_scope();
                    pushed = true;
                } else {
                    shadow.set_mode(Mode::Skip);
                }
            }

            match shadow.step()? {
                Step::Executed(record) if is_continuation(&record.keyword) => {
                    header = Some((record.keyword, record.args));
                }
                Step::Executed(_) => {}
                Step::Terminator(_) => break,
                Step::Finished => return Err(RuntimeError::unterminated_block("if")),
            }
        }

        if pushed {
            shadow.state_mut().pop_scope();
        }
        Ok(Flow::Continue)
    }

    fn skip(&self, machine: &mut Machine, _at: Cursor, _args: &[String]) -> InterpResult<Flow> {
        scan_block(machine, "if", true)
    }
}

/// `elif` and `else` outside an `if` being run do nothing.
pub struct BranchHeader;

impl Statement for BranchHeader {
    fn execute(&self, _machine: &mut Machine, _at: Cursor, _args: &[String]) -> InterpResult<Flow> {
        Ok(Flow::Continue)
    }
}

// ============================================================================
// end
// ============================================================================

/// Block terminator, identical in both modes
pub struct End;

impl Statement for End {
    fn execute(&self, _machine: &mut Machine, _at: Cursor, _args: &[String]) -> InterpResult<Flow> {
        Ok(Flow::Terminator)
    }

    fn skip(&self, _machine: &mut Machine, _at: Cursor, _args: &[String]) -> InterpResult<Flow> {
        Ok(Flow::Terminator)
    }
}

// ============================================================================
// function
// ============================================================================

/// Parsed `function NAME ( PARAMS ) do` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

impl Signature {
    /// Parentheses may touch the name or the parameters, and parameters may
    /// be separated by commas, whitespace or both. Words after `)` are
    /// ignored.
    pub fn parse(args: &[String]) -> InterpResult<Self> {
        let header = args.join(" ");
        let (Some(open), Some(close)) = (header.find('('), header.find(')')) else {
            return Err(RuntimeError::malformed_signature(
                "expected `function NAME ( PARAMETERS ) do`",
            ));
        };
        if close < open {
            return Err(RuntimeError::malformed_signature("`)` before `(`"));
        }

        let name = header[..open].trim();
        if name.is_empty() {
            return Err(RuntimeError::malformed_signature("missing function name"));
        }
        if name.split_whitespace().count() > 1 {
            return Err(RuntimeError::malformed_signature(&format!(
                "function name `{name}` must be a single word"
            )));
        }
        if is_builtin(name) {
            return Err(RuntimeError::malformed_signature(&format!(
                "`{name}` is a built-in statement"
            )));
        }

        let inner = &header[open + 1..close];
        if inner.contains('(') {
            return Err(RuntimeError::malformed_signature("nested `(`"));
        }
        if header[close + 1..].contains(['(', ')']) {
            return Err(RuntimeError::malformed_signature(
                "unexpected parenthesis after the parameter list",
            ));
        }

        let mut seen = HashSet::new();
        let mut params = Vec::new();
        for param in inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
        {
            if !seen.insert(param) {
                return Err(RuntimeError::malformed_signature(&format!(
                    "duplicate parameter `{param}`"
                )));
            }
            params.push(param.to_string());
        }

        Ok(Signature {
            name: name.to_string(),
            params,
        })
    }
}

/// `function NAME ( PARAMS ) do ... end`
pub struct FunctionDefinition;

impl Statement for FunctionDefinition {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        let Signature { name, params } = Signature::parse(args)?;
        let entry = machine.cursor();
        debug!(%name, arity = params.len(), %entry, "define function");

        // installed before the scan so the body may call itself
        let call = FunctionCall {
            name: name.clone(),
            params,
            entry,
        };
        machine.dispatcher().add_mapping(name, Rc::new(call));

        let _guard = machine.enter_block()?;
        let mut scanner = machine.fork().skipping().finish();
        match scanner.run_block()? {
            BlockEnd::Terminator => Ok(Flow::Continue),
            BlockEnd::EndOfProgram => Err(RuntimeError::unterminated_block("function")),
        }
    }

    fn skip(&self, machine: &mut Machine, _at: Cursor, _args: &[String]) -> InterpResult<Flow> {
        scan_block(machine, "function", true)
    }
}

/// Handler installed under a defined function's name
#[derive(Debug, Clone)]
pub struct FunctionCall {
    name: String,
    params: Vec<String>,
    entry: Cursor,
}

impl Statement for FunctionCall {
    /// Arguments are variable names, bound by value. The body runs on a
    /// disconnected state, so the caller's cursor is already its return
    /// address when the body ends.
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        if args.len() != self.params.len() {
            return Err(RuntimeError::arity_mismatch(
                &self.name,
                self.params.len(),
                args.len(),
            ));
        }
        let values = {
            let state = machine.state();
            args.iter()
                .map(|arg| state.value_of(arg))
                .collect::<InterpResult<Vec<_>>>()?
        };

        let _guard = machine.enter_block()?;
        debug!(name = %self.name, return_to = %machine.cursor(), "call");
        let mut callee = machine.fork().with_new_base_scope().finish();
        {
            let mut state = callee.state_mut();
            state.push_scope();
            for (param, value) in self.params.iter().zip(values) {
                state.create_variable(param)?.set(value);
            }
            state.set_cursor(self.entry);
        }

        // running off the end of the program returns as well
        callee.run_block()?;
        callee.state_mut().pop_scope();
        Ok(Flow::Continue)
    }
}
