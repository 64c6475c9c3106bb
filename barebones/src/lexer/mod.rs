//! Statement word splitting using logos

mod token;

pub use token::Token;

use logos::Logos;

/// Split a statement into whitespace-delimited words. Repeated separators
/// never produce empty words.
pub fn words(statement: &str) -> Vec<&str> {
    let mut lexer = Token::lexer(statement);
    let mut out = Vec::new();
    // every non-blank character matches `Word`, so there is no error arm
    while lexer.next().is_some() {
        out.push(lexer.slice());
    }
    out
}
