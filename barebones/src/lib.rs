//! BareBones interpreter library
//!
//! A teaching language with no static block structure: `while`, `if` and
//! function bodies are found while the program runs, by stepping forked
//! machines forward to their `end`.

pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod repl;
pub mod util;

pub use config::Config;
pub use error::{Error, Result};
pub use interp::{Machine, Mode, RuntimeError};
pub use parser::Dispatcher;
pub use program::{Cursor, Program, TextProgram};
