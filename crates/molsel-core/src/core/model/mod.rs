//! # Structure Model Module
//!
//! Columnar, read-only representation of a molecular structure and its
//! construction utilities.
//!
//! The hierarchy entity > chain > residue > atom is stored as flat column
//! vectors with per-level offset arrays ([`structure`]), so traversal over
//! any level is a contiguous index range. [`builder`] assembles these tables
//! row by row, [`topology`] derives bonded-ring information from the bond
//! table, and [`elements`] carries the static chemical element data backing
//! element-derived atom properties.

pub mod builder;
pub mod elements;
pub mod structure;
pub mod topology;
