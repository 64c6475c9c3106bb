//! Error types and reporting

use crate::interp::{ErrorKind, RuntimeError};
use crate::program::Program;
use std::ops::Range;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Program or config file could not be read
    #[error("IO error: cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Config file did not parse
    #[error("Config error: {message}")]
    Config { message: String },

    /// Fatal condition raised while running a program
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Source span of the failing statement, when the program knows it.
    pub fn span(&self, program: &dyn Program) -> Option<Range<usize>> {
        match self {
            Self::Runtime(err) => err.at.and_then(|cursor| program.span(cursor)),
            Self::Io { .. } | Self::Config { .. } => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO",
            Self::Config { .. } => "Config",
            Self::Runtime(err) => match err.kind {
                ErrorKind::UnresolvedVariable | ErrorKind::DuplicateVariable => "Variable",
                ErrorKind::UnknownInstruction | ErrorKind::MalformedStatement => "Statement",
                ErrorKind::MalformedSignature | ErrorKind::ArityMismatch => "Function",
                ErrorKind::UnknownOperator => "Condition",
                ErrorKind::DivisionByZero | ErrorKind::Overflow => "Arithmetic",
                ErrorKind::Output => "Output",
                ErrorKind::NestingTooDeep
                | ErrorKind::UnterminatedBlock
                | ErrorKind::UnmatchedTerminator => "Block",
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Runtime(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, program: &dyn Program, error: &Error) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = error.kind_name();

    let printed = if let Some(span) = error.span(program) {
        Report::build(ReportKind::Error, (filename, span.clone()))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, span))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .eprint((filename, Source::from(source)))
    };

    if let Err(e) = printed {
        eprintln!("Error: {error} (diagnostic rendering failed: {e})");
    }
}
