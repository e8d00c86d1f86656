//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout the compilation
//! process. It includes:
//!
//! - Error structures with source span information
//! - Specific error variants for every compilation phase
//! - Error categories (syntax, resolution, typing, constants, static UB,
//!   control flow)
//! - `file:line:col` rendering for the driver

pub mod errors;

#[cfg(test)]
mod tests;
