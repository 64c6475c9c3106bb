//! Token definitions

use logos::Logos;

/// Statement token. Statements have no punctuation of their own: every run
/// of non-whitespace characters is one word.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    #[regex(r"[^ \t\n\r\f]+")]
    Word,
}
