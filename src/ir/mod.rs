//! Control-flow graph IR produced by the compiler.
//!
//! - `ir`: modules, functions, blocks, instructions and constants
//! - `builder`: the insertion cursor used while lowering one function
//! - `display`: the textual dump printed by the driver

pub mod builder;
pub mod display;
pub mod ir;

#[cfg(test)]
mod tests;
