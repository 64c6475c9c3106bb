//! Runtime errors for the engine

use crate::program::Cursor;
use std::fmt;

/// Runtime error during execution
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Statement that raised the error, filled in by the innermost step
    pub at: Option<Cursor>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Variable accessed before creation
    UnresolvedVariable,
    /// Variable created while the name is visible in the scope chain
    DuplicateVariable,
    /// Keyword with no dispatch mapping
    UnknownInstruction,
    /// Bad function header
    MalformedSignature,
    /// Argument count mismatch on a function call
    ArityMismatch,
    /// Statement is missing words or has an invalid literal
    MalformedStatement,
    /// Comparison operator not in the operator table
    UnknownOperator,
    /// Division or remainder by zero
    DivisionByZero,
    /// Integer overflow
    Overflow,
    /// Block nesting exceeded the configured limit
    NestingTooDeep,
    /// Block with no terminator before the end of the program
    UnterminatedBlock,
    /// Terminator with no enclosing block
    UnmatchedTerminator,
    /// Writing to the output sink failed
    Output,
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError {
            kind,
            message,
            at: None,
        }
    }

    pub fn unresolved_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UnresolvedVariable,
            format!("variable `{name}` does not exist"),
        )
    }

    pub fn duplicate_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::DuplicateVariable,
            format!("variable `{name}` already exists"),
        )
    }

    pub fn unknown_instruction(statement: &str, hint: &str) -> Self {
        let message = if statement.is_empty() {
            "empty statement".to_string()
        } else {
            format!("instruction `{statement}` is not recognised{hint}")
        };
        Self::new(ErrorKind::UnknownInstruction, message)
    }

    pub fn malformed_signature(reason: &str) -> Self {
        Self::new(
            ErrorKind::MalformedSignature,
            format!("malformed function definition: {reason}"),
        )
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("function {name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn malformed_statement(keyword: &str, reason: &str) -> Self {
        Self::new(
            ErrorKind::MalformedStatement,
            format!("malformed `{keyword}` statement: {reason}"),
        )
    }

    pub fn unknown_operator(op: &str) -> Self {
        Self::new(
            ErrorKind::UnknownOperator,
            format!("unknown comparison operator `{op}`"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn overflow(keyword: &str) -> Self {
        Self::new(
            ErrorKind::Overflow,
            format!("integer overflow in `{keyword}`"),
        )
    }

    pub fn nesting_too_deep(limit: usize) -> Self {
        Self::new(
            ErrorKind::NestingTooDeep,
            format!("block nesting exceeded the limit of {limit}"),
        )
    }

    pub fn unterminated_block(keyword: &str) -> Self {
        Self::new(
            ErrorKind::UnterminatedBlock,
            format!("`{keyword}` block has no matching `end`"),
        )
    }

    pub fn unmatched_terminator() -> Self {
        Self::new(
            ErrorKind::UnmatchedTerminator,
            "`end` without an enclosing block".to_string(),
        )
    }

    pub fn output(err: &std::io::Error) -> Self {
        Self::new(ErrorKind::Output, format!("output error: {err}"))
    }

    /// Attach the statement position unless an inner step already did.
    pub fn at(mut self, cursor: Cursor) -> Self {
        self.at.get_or_insert(cursor);
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)?;
        if let Some(cursor) = self.at {
            write!(f, " (statement {})", cursor.ordinal())?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for engine operations
pub type InterpResult<T> = Result<T, RuntimeError>;
