//! Loop and branch conditions: `VAR OP LITERAL`

use super::error::{InterpResult, RuntimeError};
use super::state::ExecutionState;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Is,
    Not,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

static OPERATORS: LazyLock<HashMap<&'static str, Comparison>> = LazyLock::new(|| {
    HashMap::from([
        ("is", Comparison::Is),
        ("not", Comparison::Not),
        ("<", Comparison::Less),
        ("<=", Comparison::LessEq),
        (">", Comparison::Greater),
        (">=", Comparison::GreaterEq),
    ])
});

impl Comparison {
    pub fn lookup(op: &str) -> InterpResult<Self> {
        OPERATORS
            .get(op)
            .copied()
            .ok_or_else(|| RuntimeError::unknown_operator(op))
    }

    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::Is => lhs == rhs,
            Comparison::Not => lhs != rhs,
            Comparison::Less => lhs < rhs,
            Comparison::LessEq => lhs <= rhs,
            Comparison::Greater => lhs > rhs,
            Comparison::GreaterEq => lhs >= rhs,
        }
    }
}

/// Parsed header condition. Words after the literal (usually `do`) are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub var: String,
    pub op: Comparison,
    pub literal: i64,
}

impl Condition {
    pub fn parse(keyword: &str, args: &[String]) -> InterpResult<Self> {
        let [var, op, literal, ..] = args else {
            return Err(RuntimeError::malformed_statement(
                keyword,
                "expected `VARIABLE OPERATOR NUMBER`",
            ));
        };
        let op = Comparison::lookup(op)?;
        let literal = parse_literal(keyword, literal)?;
        Ok(Condition {
            var: var.clone(),
            op,
            literal,
        })
    }

    /// Evaluate against the variables visible in `state`
    pub fn eval(&self, state: &ExecutionState) -> InterpResult<bool> {
        let value = state.value_of(&self.var)?;
        Ok(self.op.holds(value, self.literal))
    }
}

/// Integer literal in a statement
pub fn parse_literal(keyword: &str, word: &str) -> InterpResult<i64> {
    word.parse().map_err(|_| {
        RuntimeError::malformed_statement(keyword, &format!("`{word}` is not an integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_operator_table() {
        assert_eq!(Comparison::lookup("is").unwrap(), Comparison::Is);
        assert_eq!(Comparison::lookup(">=").unwrap(), Comparison::GreaterEq);
        let err = Comparison::lookup("==").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOperator);
    }

    #[test]
    fn test_comparisons() {
        assert!(Comparison::Is.holds(3, 3));
        assert!(Comparison::Not.holds(3, 0));
        assert!(Comparison::Less.holds(-1, 0));
        assert!(!Comparison::LessEq.holds(2, 1));
        assert!(Comparison::Greater.holds(2, 1));
        assert!(Comparison::GreaterEq.holds(1, 1));
    }

    #[test]
    fn test_parse_ignores_trailing_do() {
        let cond = Condition::parse("while", &words("X not 0 do")).unwrap();
        assert_eq!(cond.var, "X");
        assert_eq!(cond.op, Comparison::Not);
        assert_eq!(cond.literal, 0);
    }

    #[test]
    fn test_parse_negative_literal() {
        let cond = Condition::parse("if", &words("X > -5 do")).unwrap();
        assert_eq!(cond.literal, -5);
    }

    #[test]
    fn test_parse_errors() {
        let err = Condition::parse("while", &words("X not")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedStatement);

        let err = Condition::parse("if", &words("X is ten do")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedStatement);
        assert!(err.message.contains("`ten`"));

        let err = Condition::parse("if", &words("X equals 1")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOperator);
    }

    #[test]
    fn test_eval() {
        let mut state = ExecutionState::new();
        state.create_variable("X").unwrap().set(4);
        let cond = Condition::parse("while", &words("X < 5")).unwrap();
        assert!(cond.eval(&state).unwrap());
        state.assign("X", 5).unwrap();
        assert!(!cond.eval(&state).unwrap());
    }

    #[test]
    fn test_eval_unresolved() {
        let state = ExecutionState::new();
        let cond = Condition::parse("while", &words("Y is 0")).unwrap();
        assert_eq!(
            cond.eval(&state).unwrap_err().kind,
            ErrorKind::UnresolvedVariable
        );
    }
}
