//! # Language Module
//!
//! The symbolic surface of the query language: the value [`types`] lattice,
//! the immutable [`expression`] tree, [`symbol`] declarations with their
//! argument signatures, and the canonical built-in symbol [`table`].
//!
//! Nothing in this module evaluates anything; it only describes what a query
//! may look like. Validation against these declarations happens in the
//! engine's type checker, and execution happens in the engine runtime.

pub mod expression;
pub mod symbol;
pub mod table;
pub mod types;
