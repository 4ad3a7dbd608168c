//! # Workflows Module
//!
//! This module provides the high-level entry points for users of MolSel,
//! wrapping the full check-compile-evaluate pipeline behind a small API.
//!
//! ## Overview
//!
//! Workflows own the engine assembly: building the default symbol and
//! runtime tables, validating expression trees, and evaluating compiled
//! queries against structures. Callers that need finer control (custom
//! symbol tables, pre-narrowed universes) can drop down to the engine
//! module directly.
//!
//! ## Architecture
//!
//! - **Query Workflow** ([`query`]) - The [`query::QueryEngine`] facade:
//!   compile once, run against any number of structures, with optional
//!   candidate masks.
//!
//! ## Key Capabilities
//!
//! - **One-call engine assembly** with the complete default language
//! - **Reusable compiled queries** independent of any structure
//! - **Typed results** for selection- and scalar-valued queries

pub mod query;
