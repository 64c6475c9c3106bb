//! REPL (Read-Eval-Print Loop) for BareBones
//!
//! Input is collected until every `while`, `if` and `function` it opens has
//! its `end`, then appended to the session text and run from where the
//! previous input stopped. Keeping one growing text means functions defined
//! earlier still point at their bodies.

use crate::config::EngineConfig;
use crate::error::{Result, report_error};
use crate::interp::{self, ExecutionState, Machine, Output, StateRef};
use crate::lexer;
use crate::parser::{DispatchRef, Dispatcher};
use crate::program::{Cursor, TERMINATOR, TextProgram};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

const PROMPT: &str = "> ";
const CONTINUATION_PROMPT: &str = "... ";
const HISTORY_FILE: &str = ".barebones_history";
const SOURCE_NAME: &str = "<repl>";

/// Result of feeding one line to a [`Session`]
#[derive(Debug)]
pub enum Feed {
    /// A block is still open
    Incomplete,
    /// The collected input ran
    Ran(Result<()>),
}

/// Interpreter state that outlives a single input
pub struct Session {
    source: String,
    pending: String,
    dispatcher: DispatchRef,
    state: StateRef,
    output: Output,
    config: EngineConfig,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_output(config, interp::stdout())
    }

    pub fn with_output(config: EngineConfig, output: Output) -> Self {
        Session {
            source: String::new(),
            pending: String::new(),
            dispatcher: Dispatcher::with_builtins().into_ref(),
            state: ExecutionState::new().into_ref(),
            output,
            config,
        }
    }

    /// Text of every input accepted so far
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Global variables and their values
    pub fn bindings(&self) -> std::collections::BTreeMap<String, i64> {
        self.state.borrow().visible_bindings()
    }

    /// Add a line of input; runs it once all blocks it opens are closed.
    pub fn feed(&mut self, line: &str) -> Feed {
        self.pending.push_str(line.trim());
        self.pending.push('\n');
        if open_blocks(&self.pending) > 0 {
            return Feed::Incomplete;
        }

        let mut input = std::mem::take(&mut self.pending);
        if !input.trim_end().ends_with(TERMINATOR) {
            input = format!("{}{TERMINATOR}\n", input.trim_end());
        }
        Feed::Ran(self.run_input(&input))
    }

    /// Drop a half-entered block
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    fn run_input(&mut self, input: &str) -> Result<()> {
        self.source.push_str(input);
        let program = Rc::new(TextProgram::new(self.source.as_str()));
        let snapshot = self.state.borrow().deep_copy();
        debug!(from = %snapshot.cursor(), statements = program.statement_count(), "run input");

        let mut machine = Machine::builder(program.clone())
            .shared_dispatcher(Rc::clone(&self.dispatcher))
            .state(Rc::clone(&self.state))
            .output(Rc::clone(&self.output))
            .config(self.config)
            .build();
        let result = machine.run();

        if result.is_err() {
            // roll variables back, leave the failed text behind
            let mut state = snapshot;
            state.set_cursor(Cursor::new(program.statement_count()));
            *self.state.borrow_mut() = state;
        }
        result.map_err(Into::into)
    }
}

/// Blocks opened minus blocks closed, counted by leading keyword
fn open_blocks(text: &str) -> i64 {
    text.split(TERMINATOR)
        .filter_map(|statement| lexer::words(statement).first().copied())
        .map(|keyword| match keyword {
            "while" | "if" | "function" => 1,
            "end" => -1,
            _ => 0,
        })
        .sum()
}

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL
    pub fn new(config: EngineConfig) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            session: Session::new(config),
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL
    pub fn run(&mut self) -> RlResult<()> {
        println!("BareBones REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            let prompt = if self.session.is_pending() {
                CONTINUATION_PROMPT
            } else {
                PROMPT
            };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') && !self.session.is_pending() {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    self.session.discard_pending();
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle REPL commands (starting with :)
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":state" | ":s" => {
                match serde_json::to_string_pretty(&self.session.bindings()) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    /// Print help message
    fn print_help(&self) {
        println!("BareBones REPL Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :state, :s      Show global variables as JSON");
        println!();
        println!("Statements end with `;`. A `while`, `if` or `function` block");
        println!("runs once its `end` has been entered:");
        println!("  init X; incr X; print X;");
        println!("  while X not 0 do; decr X; end;");
        println!("  function show(A) do; print A; end; show X;");
        println!("Ctrl-C drops an unfinished block.");
    }

    fn eval_input(&mut self, line: &str) {
        if let Feed::Ran(Err(e)) = self.session.feed(line) {
            let source = self.session.source().to_string();
            let program = TextProgram::new(source.as_str());
            report_error(SOURCE_NAME, &source, &program, &e);
        }
    }
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
