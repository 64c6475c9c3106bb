//! Single-effect statements
//!
//! None of these open a block, so they keep the default `skip` and do
//! nothing while the machine scans a disabled region.

use super::condition::parse_literal;
use super::error::{InterpResult, RuntimeError};
use super::machine::{Flow, Machine, Statement};
use crate::program::Cursor;
use std::io::Write;

/// Word `index` of the argument list
fn arg<'a>(keyword: &str, args: &'a [String], index: usize, usage: &str) -> InterpResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| RuntimeError::malformed_statement(keyword, &format!("expected `{usage}`")))
}

/// Replace the value of an existing variable with `f(value)`
fn update(
    machine: &Machine,
    keyword: &str,
    args: &[String],
    f: impl FnOnce(i64) -> Option<i64>,
) -> InterpResult<Flow> {
    let name = arg(keyword, args, 0, &format!("{keyword} VARIABLE"))?;
    let mut state = machine.state_mut();
    let value = state.value_of(name)?;
    let next = f(value).ok_or_else(|| RuntimeError::overflow(keyword))?;
    state.assign(name, next)?;
    Ok(Flow::Continue)
}

/// `init X`
pub struct Init;

impl Statement for Init {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        let name = arg("init", args, 0, "init VARIABLE")?;
        machine.state_mut().create_variable(name)?;
        Ok(Flow::Continue)
    }
}

/// `incr X`
pub struct Incr;

impl Statement for Incr {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        update(machine, "incr", args, |v| v.checked_add(1))
    }
}

/// `decr X`
pub struct Decr;

impl Statement for Decr {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        update(machine, "decr", args, |v| v.checked_sub(1))
    }
}

/// `clear X`
pub struct Clear;

impl Statement for Clear {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        update(machine, "clear", args, |_| Some(0))
    }
}

/// `copy X to Y`. Both variables must exist.
pub struct CopyValue;

impl Statement for CopyValue {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        const USAGE: &str = "copy SOURCE to DESTINATION";
        let src = arg("copy", args, 0, USAGE)?;
        let dst = arg("copy", args, 2, USAGE)?;
        let mut state = machine.state_mut();
        let value = state.value_of(src)?;
        state.assign(dst, value)?;
        Ok(Flow::Continue)
    }
}

/// `set X N`, creating X in the current scope when it is not visible
pub struct Set;

impl Statement for Set {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        const USAGE: &str = "set VARIABLE NUMBER";
        let name = arg("set", args, 0, USAGE)?;
        let value = parse_literal("set", arg("set", args, 1, USAGE)?)?;
        let mut state = machine.state_mut();
        if state.variable(name).is_some() {
            state.assign(name, value)?;
        } else {
            state.create_variable(name)?.set(value);
        }
        Ok(Flow::Continue)
    }
}

/// `print X` writes `X = <value>` to the output sink
pub struct Print;

impl Statement for Print {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        let name = arg("print", args, 0, "print VARIABLE")?;
        let value = machine.state().value_of(name)?;
        writeln!(machine.output().borrow_mut(), "{name} = {value}")
            .map_err(|e| RuntimeError::output(&e))?;
        Ok(Flow::Continue)
    }
}

/// Binary operators of the `OP X Y into Z` statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn keyword(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }

    /// Checked application; division truncates toward zero
    pub fn apply(self, lhs: i64, rhs: i64) -> InterpResult<i64> {
        let result = match self {
            ArithOp::Add => lhs.checked_add(rhs),
            ArithOp::Sub => lhs.checked_sub(rhs),
            ArithOp::Mul => lhs.checked_mul(rhs),
            ArithOp::Div | ArithOp::Mod if rhs == 0 => {
                return Err(RuntimeError::division_by_zero());
            }
            ArithOp::Div => lhs.checked_div(rhs),
            ArithOp::Mod => lhs.checked_rem(rhs),
        };
        result.ok_or_else(|| RuntimeError::overflow(self.keyword()))
    }
}

/// `add|sub|mul|div|mod X Y into Z`. Z must exist.
pub struct Arithmetic(pub ArithOp);

impl Statement for Arithmetic {
    fn execute(&self, machine: &mut Machine, _at: Cursor, args: &[String]) -> InterpResult<Flow> {
        let keyword = self.0.keyword();
        let usage = format!("{keyword} X Y into Z");
        let lhs = arg(keyword, args, 0, &usage)?;
        let rhs = arg(keyword, args, 1, &usage)?;
        if arg(keyword, args, 2, &usage)? != "into" {
            return Err(RuntimeError::malformed_statement(
                keyword,
                &format!("expected `into` in `{usage}`"),
            ));
        }
        let into = arg(keyword, args, 3, &usage)?;

        let mut state = machine.state_mut();
        let result = self.0.apply(state.value_of(lhs)?, state.value_of(rhs)?)?;
        state.assign(into, result)?;
        Ok(Flow::Continue)
    }
}
