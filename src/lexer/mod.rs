//! Lexical analysis.
//!
//! Converts source text into a token stream using an ordered table of
//! anchored regex patterns. Whitespace and `//` comments are dropped; string
//! and character literals have their escapes resolved here.

pub mod lexer;
pub mod tokens;

#[cfg(test)]
mod tests;
