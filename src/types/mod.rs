//! The canonical type graph: a table of types addressed by handle, with
//! two-phase construction for named types and the layout rules used by
//! lowering.

pub mod layout;
pub mod types;

#[cfg(test)]
mod tests;
