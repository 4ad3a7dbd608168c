//! # Engine Module
//!
//! This module implements the evaluation pipeline for the selection language
//! in MolSel, turning symbolic expression trees into selections over a
//! molecular structure.
//!
//! ## Overview
//!
//! A query passes through three stages. The checker validates the tree
//! against the symbol table and infers its type. The compiler resolves every
//! application to its registered runtime body and produces a tree of lazy
//! closures. Evaluation then runs those closures against an environment
//! holding the structure, the candidate-atom mask, and the iteration slots.
//!
//! ## Architecture
//!
//! The module is organized into specialized submodules that handle different
//! aspects of the pipeline:
//!
//! - **Type Checking** ([`check`]) - Structural validation of expression trees
//! - **Compilation** ([`compiler`]) - Lazy closures, argument handling, the runtime registry
//! - **Evaluation State** ([`environment`]) - The structure view, candidate mask, and lockable slots
//! - **Runtime Values** ([`value`]) - The dynamic value type and its scalar keys
//! - **Operator Bodies** ([`runtime`]) - Implementations of every built-in symbol
//! - **Error Handling** ([`error`]) - Query-level error types and propagation
//!
//! ## Key Capabilities
//!
//! - **Lazy argument evaluation** enabling short-circuit logic and per-atom tests
//! - **Slot locking discipline** surfacing re-entrant iteration as typed errors
//! - **Universe narrowing** through child environments with restricted masks
//! - **Complete symbol coverage** checked at registration time, not mid-query

pub mod check;
pub mod compiler;
pub mod environment;
pub mod error;
pub mod runtime;
pub mod value;
