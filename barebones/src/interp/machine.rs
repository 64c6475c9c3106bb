//! The stepping machine
//!
//! A [`Machine`] fetches the statement at its cursor, advances the cursor and
//! dispatches the statement in the machine's [`Mode`]. There is no block
//! structure: handlers for `while`, `if` and `function` fork sub-machines
//! over the same program and step them until a statement reports
//! [`Flow::Terminator`].

use super::error::{InterpResult, RuntimeError};
use super::output::{self, Output};
use super::state::{ExecutionState, StateRef};
use crate::config::EngineConfig;
use crate::parser::{DispatchRef, Dispatcher, Parsed};
use crate::program::{Cursor, Program};
use crate::util::format_suggestion_hint;
use serde::Serialize;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Stack growth parameters for deeply nested blocks
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Whether statements take effect or are only scanned past
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Execute,
    Skip,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Execute => write!(f, "execute"),
            Mode::Skip => write!(f, "skip"),
        }
    }
}

/// What a statement asks of the machine that ran it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The statement closes the enclosing block
    Terminator,
}

/// A statement handler.
///
/// `execute` performs the statement. `skip` runs while the machine is
/// scanning a disabled region and must not touch visible state; statements
/// that open a block override it to consume their body.
pub trait Statement {
    fn execute(&self, machine: &mut Machine, at: Cursor, args: &[String]) -> InterpResult<Flow>;

    fn skip(&self, _machine: &mut Machine, _at: Cursor, _args: &[String]) -> InterpResult<Flow> {
        Ok(Flow::Continue)
    }
}

/// One dispatched statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub keyword: String,
    pub args: Vec<String>,
    pub mode: Mode,
    pub cursor_before: Cursor,
    pub cursor_after: Cursor,
    pub depth_before: usize,
    pub depth_after: usize,
}

/// Outcome of [`Machine::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Executed(StepRecord),
    Terminator(StepRecord),
    /// The cursor is past the last statement
    Finished,
}

/// How [`Machine::run_block`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEnd {
    Terminator,
    EndOfProgram,
}

/// State shared by a root machine and every machine forked from it
struct Shared {
    program: Rc<dyn Program>,
    dispatcher: DispatchRef,
    output: Output,
    config: EngineConfig,
    nesting: Cell<usize>,
}

/// The machine
pub struct Machine {
    shared: Rc<Shared>,
    state: StateRef,
    mode: Mode,
    finished: bool,
}

impl Machine {
    /// Machine over `program` with a fresh state, writing to stdout
    pub fn new(program: Rc<dyn Program>, dispatcher: Dispatcher) -> Self {
        Machine::builder(program).dispatcher(dispatcher).build()
    }

    pub fn builder(program: Rc<dyn Program>) -> MachineBuilder {
        MachineBuilder {
            program,
            dispatcher: None,
            output: None,
            config: EngineConfig::default(),
            state: None,
        }
    }

    pub fn state(&self) -> Ref<'_, ExecutionState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, ExecutionState> {
        self.state.borrow_mut()
    }

    /// Alias handle to this machine's state
    pub fn state_ref(&self) -> StateRef {
        Rc::clone(&self.state)
    }

    pub fn dispatcher(&self) -> RefMut<'_, Dispatcher> {
        self.shared.dispatcher.borrow_mut()
    }

    pub fn dispatcher_ref(&self) -> DispatchRef {
        Rc::clone(&self.shared.dispatcher)
    }

    pub fn output(&self) -> &Output {
        &self.shared.output
    }

    pub fn config(&self) -> EngineConfig {
        self.shared.config
    }

    pub fn cursor(&self) -> Cursor {
        self.state.borrow().cursor()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Start building a sub-machine over the same program
    pub fn fork(&self) -> Fork<'_> {
        Fork {
            origin: self,
            kind: ForkKind::Alias,
            mode: Mode::Execute,
        }
    }

    /// Count one more level of block nesting until the guard drops.
    pub fn enter_block(&self) -> InterpResult<NestingGuard> {
        let depth = self.shared.nesting.get() + 1;
        let limit = self.shared.config.max_nesting;
        if depth > limit {
            return Err(RuntimeError::nesting_too_deep(limit));
        }
        self.shared.nesting.set(depth);
        Ok(NestingGuard {
            shared: Rc::clone(&self.shared),
        })
    }

    /// Current block nesting of the whole run
    pub fn nesting(&self) -> usize {
        self.shared.nesting.get()
    }

    /// Fetch, advance, dispatch
    pub fn step(&mut self) -> InterpResult<Step> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.step_inner())
    }

    fn step_inner(&mut self) -> InterpResult<Step> {
        let (cursor_before, depth_before) = {
            let state = self.state.borrow();
            (state.cursor(), state.depth())
        };

        let Some(line) = self.shared.program.fetch(cursor_before) else {
            trace!(cursor = %cursor_before, "end of program");
            self.finished = true;
            return Ok(Step::Finished);
        };
        self.state.borrow_mut().advance();

        let parsed = self.shared.dispatcher.borrow().parse(&line);
        let Some(Parsed {
            keyword,
            handler,
            args,
        }) = parsed
        else {
            let hint = format_suggestion_hint(self.shared.dispatcher.borrow().suggest(&line).as_deref());
            return Err(RuntimeError::unknown_instruction(&line, &hint).at(cursor_before));
        };

        trace!(cursor = %cursor_before, mode = %self.mode, %keyword, "step");
        let flow = match self.mode {
            Mode::Execute => handler.execute(self, cursor_before, &args),
            Mode::Skip => handler.skip(self, cursor_before, &args),
        }
        .map_err(|e| e.at(cursor_before))?;

        let (cursor_after, depth_after) = {
            let state = self.state.borrow();
            (state.cursor(), state.depth())
        };
        let record = StepRecord {
            keyword,
            args,
            mode: self.mode,
            cursor_before,
            cursor_after,
            depth_before,
            depth_after,
        };
        Ok(match flow {
            Flow::Continue => Step::Executed(record),
            Flow::Terminator => Step::Terminator(record),
        })
    }

    /// Run to the end of the program. A terminator reaching this level has
    /// no enclosing block.
    pub fn run(&mut self) -> InterpResult<()> {
        loop {
            match self.step()? {
                Step::Executed(_) => {}
                Step::Finished => return Ok(()),
                Step::Terminator(record) => {
                    return Err(RuntimeError::unmatched_terminator().at(record.cursor_before));
                }
            }
        }
    }

    /// Step until the current block's terminator or the end of the program.
    pub fn run_block(&mut self) -> InterpResult<BlockEnd> {
        loop {
            match self.step()? {
                Step::Executed(_) => {}
                Step::Terminator(_) => return Ok(BlockEnd::Terminator),
                Step::Finished => return Ok(BlockEnd::EndOfProgram),
            }
        }
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("finished", &self.finished)
            .field("nesting", &self.shared.nesting.get())
            .finish()
    }
}

/// Builder for a root machine
pub struct MachineBuilder {
    program: Rc<dyn Program>,
    dispatcher: Option<DispatchRef>,
    output: Option<Output>,
    config: EngineConfig,
    state: Option<StateRef>,
}

impl MachineBuilder {
    /// Dispatch table; defaults to the built-in statements
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher.into_ref());
        self
    }

    /// Reuse a dispatch table from an earlier run (functions stay defined)
    pub fn shared_dispatcher(mut self, dispatcher: DispatchRef) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Continue from an existing state instead of a fresh one
    pub fn state(mut self, state: StateRef) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> Machine {
        let shared = Shared {
            program: self.program,
            dispatcher: self
                .dispatcher
                .unwrap_or_else(|| Dispatcher::with_builtins().into_ref()),
            output: self.output.unwrap_or_else(output::stdout),
            config: self.config,
            nesting: Cell::new(0),
        };
        Machine {
            shared: Rc::new(shared),
            state: self
                .state
                .unwrap_or_else(|| ExecutionState::new().into_ref()),
            mode: Mode::Execute,
            finished: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForkKind {
    /// Same underlying state as the origin
    Alias,
    /// Deep copy of the origin's state
    Copy,
    /// Fresh single-scope state at the origin's cursor
    NewBaseScope,
}

/// Builder for a sub-machine, see [`Machine::fork`]
pub struct Fork<'a> {
    origin: &'a Machine,
    kind: ForkKind,
    mode: Mode,
}

impl Fork<'_> {
    /// Isolated clone of the origin's state
    pub fn copied(mut self) -> Self {
        self.kind = ForkKind::Copy;
        self
    }

    /// Disconnected state holding a single empty scope
    pub fn with_new_base_scope(mut self) -> Self {
        self.kind = ForkKind::NewBaseScope;
        self
    }

    /// Start in skip mode
    pub fn skipping(mut self) -> Self {
        self.mode = Mode::Skip;
        self
    }

    pub fn finish(self) -> Machine {
        let origin = self.origin;
        let state = match self.kind {
            ForkKind::Alias => origin.state_ref(),
            ForkKind::Copy => origin.state().deep_copy().into_ref(),
            ForkKind::NewBaseScope => ExecutionState::at(origin.cursor()).into_ref(),
        };
        debug!(kind = ?self.kind, mode = %self.mode, cursor = %origin.cursor(), "fork");
        Machine {
            shared: Rc::clone(&origin.shared),
            state,
            mode: self.mode,
            finished: false,
        }
    }
}

/// Releases one level of nesting on drop
#[must_use = "the nesting level is released as soon as the guard drops"]
pub struct NestingGuard {
    shared: Rc<Shared>,
}

impl std::fmt::Debug for NestingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestingGuard").finish_non_exhaustive()
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        let depth = self.shared.nesting.get();
        self.shared.nesting.set(depth.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;
    use crate::program::TextProgram;

    fn machine(text: &str) -> Machine {
        let capture = crate::interp::Capture::new();
        Machine::builder(Rc::new(TextProgram::new(text)))
            .output(capture.output())
            .build()
    }

    #[test]
    fn test_step_advances_and_records() {
        let mut m = machine("init X;incr X;");
        let Step::Executed(record) = m.step().unwrap() else {
            panic!("expected an executed step");
        };
        assert_eq!(record.keyword, "init");
        assert_eq!(record.args, vec!["X".to_string()]);
        assert_eq!(record.mode, Mode::Execute);
        assert_eq!(record.cursor_before, Cursor::new(0));
        assert_eq!(record.cursor_after, Cursor::new(1));
        assert_eq!(record.depth_before, 1);
        assert_eq!(record.depth_after, 1);
        assert!(!m.is_finished());
    }

    #[test]
    fn test_step_past_end_finishes() {
        let mut m = machine("init X;");
        m.step().unwrap();
        assert_eq!(m.step().unwrap(), Step::Finished);
        assert!(m.is_finished());
    }

    #[test]
    fn test_unknown_instruction_is_fatal() {
        let mut m = machine("init X;incx X;");
        m.step().unwrap();
        let err = m.step().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownInstruction);
        assert_eq!(err.at, Some(Cursor::new(1)));
        assert!(err.message.contains("did you mean `incr`"));
    }

    #[test]
    fn test_skip_mode_has_no_effect() {
        let mut m = machine("init X;");
        m.set_mode(Mode::Skip);
        let Step::Executed(record) = m.step().unwrap() else {
            panic!("expected an executed step");
        };
        assert_eq!(record.mode, Mode::Skip);
        assert!(m.state().variable("X").is_none());
        assert_eq!(m.cursor(), Cursor::new(1));
    }

    #[test]
    fn test_terminator_in_both_modes() {
        let mut m = machine("end;end;");
        assert!(matches!(m.step().unwrap(), Step::Terminator(_)));
        m.set_mode(Mode::Skip);
        assert!(matches!(m.step().unwrap(), Step::Terminator(_)));
    }

    #[test]
    fn test_run_rejects_top_level_terminator() {
        let mut m = machine("init X;end;");
        let err = m.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnmatchedTerminator);
        assert_eq!(err.at, Some(Cursor::new(1)));
    }

    #[test]
    fn test_run_block_stops_at_terminator() {
        let mut m = machine("init X;end;incr X;");
        assert_eq!(m.run_block().unwrap(), BlockEnd::Terminator);
        assert_eq!(m.cursor(), Cursor::new(2));
        assert_eq!(m.run_block().unwrap(), BlockEnd::EndOfProgram);
        assert_eq!(m.state().value_of("X").unwrap(), 1);
    }

    #[test]
    fn test_alias_fork_shares_state() {
        let mut m = machine("incr X;");
        m.state_mut().create_variable("X").unwrap();
        let mut alias = m.fork().finish();
        alias.run().unwrap();
        assert_eq!(m.state().value_of("X").unwrap(), 1);
        assert_eq!(m.cursor(), Cursor::new(1));
    }

    #[test]
    fn test_copy_fork_is_isolated() {
        let m = machine("incr X;");
        m.state_mut().create_variable("X").unwrap();
        let mut copy = m.fork().copied().finish();
        copy.run().unwrap();
        assert_eq!(copy.state().value_of("X").unwrap(), 1);
        assert_eq!(m.state().value_of("X").unwrap(), 0);
        assert_eq!(m.cursor(), Cursor::new(0));
    }

    #[test]
    fn test_new_base_scope_fork() {
        let m = machine("init Y;");
        m.state_mut().create_variable("X").unwrap();
        m.state_mut().push_scope();
        let fork = m.fork().with_new_base_scope().skipping().finish();
        assert_eq!(fork.mode(), Mode::Skip);
        assert_eq!(fork.state().depth(), 1);
        assert!(fork.state().variable("X").is_none());
        assert_eq!(fork.cursor(), m.cursor());
    }

    #[test]
    fn test_nesting_guard_limit() {
        let m = Machine::builder(Rc::new(TextProgram::new("")))
            .config(EngineConfig { max_nesting: 2 })
            .build();
        let first = m.enter_block().unwrap();
        let second = m.enter_block().unwrap();
        assert_eq!(m.nesting(), 2);
        let err = m.enter_block().unwrap_err();
        assert_eq!(err.kind, ErrorKind::NestingTooDeep);
        drop(second);
        drop(first);
        assert_eq!(m.nesting(), 0);
    }

    #[test]
    fn test_forks_share_nesting_counter() {
        let m = machine("");
        let _guard = m.enter_block().unwrap();
        let fork = m.fork().finish();
        assert_eq!(fork.nesting(), 1);
    }
}
