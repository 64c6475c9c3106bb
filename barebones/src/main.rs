//! BareBones interpreter CLI

use barebones::error::report_error;
use barebones::interp::Step;
use barebones::{Config, Error, Machine, RuntimeError, TextProgram};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barebones", version, about = "BareBones interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a BareBones program
    Run {
        /// Program file
        file: PathBuf,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Deepest allowed block nesting (overrides the config file)
        #[arg(long)]
        max_nesting: Option<usize>,
        /// Print the final global variables as JSON
        #[arg(long)]
        dump_state: bool,
    },
    /// Run a program and print every top-level step as a JSON line
    Steps {
        /// Program file
        file: PathBuf,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Start an interactive session
    Repl {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BAREBONES_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Command::Run {
            file,
            config,
            max_nesting,
            dump_state,
        } => load_config(config.as_deref()).is_some_and(|mut config| {
            if let Some(limit) = max_nesting {
                config.engine.max_nesting = limit;
            }
            config.run.dump_state |= dump_state;
            run_file(&file, &config)
        }),
        Command::Steps { file, config } => {
            load_config(config.as_deref()).is_some_and(|config| step_file(&file, &config))
        }
        Command::Repl { config } => load_config(config.as_deref()).is_some_and(|config| {
            match barebones::repl::Repl::new(config.engine) {
                Ok(mut repl) => repl.run().map_err(|e| eprintln!("Error: {e}")).is_ok(),
                Err(e) => {
                    eprintln!("Error: cannot start the REPL: {e}");
                    false
                }
            }
        }),
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn load_config(path: Option<&Path>) -> Option<Config> {
    let Some(path) = path else {
        return Some(Config::default());
    };
    match Config::load(path) {
        Ok(config) => {
            info!(path = %path.display(), ?config, "loaded config");
            Some(config)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            None
        }
    }
}

fn load_program(path: &Path) -> Option<Rc<TextProgram>> {
    match TextProgram::from_file(path) {
        Ok(program) => Some(Rc::new(program)),
        Err(e) => {
            eprintln!("Error: {e}");
            None
        }
    }
}

fn report(path: &Path, program: &TextProgram, error: Error) {
    let filename = path.display().to_string();
    report_error(&filename, program.text(), program, &error);
}

fn run_file(path: &Path, config: &Config) -> bool {
    let Some(program) = load_program(path) else {
        return false;
    };
    let mut machine = Machine::builder(program.clone())
        .config(config.engine)
        .build();

    if let Err(e) = machine.run() {
        report(path, &program, e.into());
        return false;
    }

    if config.run.dump_state {
        let bindings = machine.state().visible_bindings();
        match serde_json::to_string_pretty(&bindings) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: cannot serialize state: {e}");
                return false;
            }
        }
    }
    true
}

/// Print machine steps as JSON lines. Steps taken by nested machines inside
/// a block are not listed, only the block header that ran them.
fn step_file(path: &Path, config: &Config) -> bool {
    let Some(program) = load_program(path) else {
        return false;
    };
    let mut machine = Machine::builder(program.clone())
        .config(config.engine)
        .build();

    loop {
        let record = match machine.step() {
            Ok(Step::Executed(record)) => record,
            Ok(Step::Terminator(record)) => {
                let error = RuntimeError::unmatched_terminator().at(record.cursor_before);
                report(path, &program, error.into());
                return false;
            }
            Ok(Step::Finished) => return true,
            Err(e) => {
                report(path, &program, e.into());
                return false;
            }
        };
        match serde_json::to_string(&record) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("Error: cannot serialize step: {e}");
                return false;
            }
        }
    }
}
