//! Parser building the module AST from the token stream.
//!
//! Expressions (type constructors included) go through a Pratt parser with
//! NUD/LED lookup tables and binding powers. Statements dispatch on their
//! leading token; top-level items are parsed in `parser.rs`.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod tests;
