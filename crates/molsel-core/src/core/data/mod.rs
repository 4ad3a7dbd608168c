//! # Selection Data Structures
//!
//! Runtime representations of query results and the spatial indexes built
//! over them.
//!
//! An [`atom_set::AtomSet`] is one sorted, deduplicated group of atom
//! indices with a precomputed order-independent content hash; an
//! [`selection::AtomSelection`] is an ordered sequence of such sets and is
//! the general result type of structure queries. [`mask::Mask`] is the
//! membership view used while evaluating per-atom tests, with an adaptive
//! dense or sparse representation chosen from the population density.
//! [`lookup`] wraps kd-trees over atoms and over set bounding spheres for
//! radius queries.

pub mod atom_set;
pub mod lookup;
pub mod mask;
pub mod selection;
