//! # Core Module
//!
//! This module provides the fundamental building blocks for the molecular
//! selection language in MolSel, serving as the foundation layer of the
//! library.
//!
//! ## Overview
//!
//! The core module defines the symbolic language itself and the data it
//! operates on. It contains no evaluation logic; the engine layer builds on
//! these definitions to check, compile, and run queries.
//!
//! ## Architecture
//!
//! The module is organized into specialized submodules that handle different
//! aspects of the language and its data:
//!
//! - **Language Definition** ([`lang`]) - Expression trees, types, symbol signatures, and the built-in symbol table
//! - **Molecular Representation** ([`model`]) - Columnar hierarchical structures, bonds, and ring perception
//! - **Selection Data** ([`data`]) - Atom sets, ordered selections, masks, and spatial indexes
//!
//! ## Key Capabilities
//!
//! - **Serializable expression trees** with positional and named arguments
//! - **Structural type system** with variables, unions, and container types
//! - **Declarative symbol signatures** carrying arity, defaults, and documentation
//! - **Compact columnar structure model** with entity/chain/residue/atom hierarchy
//! - **Order-independent atom set hashing** for content-based deduplication
//! - **Adaptive membership masks** and kd-tree spatial lookup

pub mod data;
pub mod lang;
pub mod model;
