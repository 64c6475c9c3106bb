//! Execution engine
//!
//! Programs run directly from their text: [`Machine`] fetches one statement
//! at a time and the statement handlers in [`statements`] and [`control`]
//! give it meaning.

pub mod condition;
pub mod control;
mod error;
pub mod machine;
mod output;
mod scope;
mod state;
pub mod statements;

pub use condition::{Comparison, Condition};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use machine::{
    BlockEnd, Flow, Fork, Machine, MachineBuilder, Mode, NestingGuard, Statement, Step, StepRecord,
};
pub use output::{Capture, Output, stdout};
pub use scope::{Scope, ScopeStack, Variable};
pub use state::{ExecutionState, StateRef};
