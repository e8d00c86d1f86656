//! Semantic analysis and lowering.
//!
//! This module turns a parsed [`Module`](crate::ast::ast::Module) into the
//! basic-block IR. It handles:
//!
//! - Resolution of type expressions and named representations
//! - Lowering of expressions into typed values and instructions
//! - Braced initializers, for both runtime storage and constants
//! - Call ABI classification, calls and returns
//! - Control flow: if chains, loops, break/continue and function epilogues

pub mod call;
pub mod compiler;
pub mod constant;
pub mod expr;
pub mod init;
pub mod recast;
pub mod resolve;
pub mod stmt;
pub mod symbols;
pub mod value;

#[cfg(test)]
mod tests;
