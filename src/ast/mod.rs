//! Abstract Syntax Tree definitions.
//!
//! - `ast`: the module and its three item collections
//! - `expressions`: expression and type-constructor nodes
//! - `statements`: statement nodes

pub mod ast;
pub mod expressions;
pub mod statements;
