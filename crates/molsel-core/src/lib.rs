//! # MolSel Core Library
//!
//! A typed symbolic query language for selecting groups of atoms in
//! hierarchical molecular structures, evaluated by a compile-then-run
//! pipeline over an immutable columnar model.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** The language itself (expression trees, the
//!   type system, symbol declarations), the columnar structure model, and the
//!   selection data structures (`AtomSet`, `AtomSelection`, `Mask`).
//!
//! - **[`engine`]: The Logic Core.** The type checker, the compiler producing
//!   lazy closures, the evaluation environment with its lockable slots, and
//!   the runtime bodies of every built-in operator.
//!
//! - **[`workflows`]: The Public API.** The user-facing `QueryEngine`:
//!   assemble the default language once, compile expression trees into
//!   reusable queries, and run them against structures.

pub mod core;
pub mod engine;
pub mod workflows;
