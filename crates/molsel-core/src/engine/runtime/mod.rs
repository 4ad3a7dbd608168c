//! # Runtime Operators
//!
//! Bodies for every symbol declared in the default table, grouped the same
//! way the language groups them:
//!
//! - **Core operators** ([`core_ops`]) - type conversions, logic, comparisons, arithmetic, strings, sets
//! - **Atom properties** ([`properties`]) - per-atom and per-bond property readers
//! - **Generators** ([`generators`]) - queries that produce selections from the structure
//! - **Modifiers** ([`modifiers`]) - selection-to-selection transformations
//! - **Filters** ([`filters`]) - predicates over whole atom sets
//! - **Combinators** ([`combinators`]) - operators over multiple selections
//! - **Atom-set operators** ([`atom_sets`]) - reductions inside one atom set
//!
//! Registration is fallible only on configuration mistakes (duplicate ids);
//! a successful [`default_runtime`] covers the full default symbol table.

pub mod atom_sets;
pub mod combinators;
pub mod core_ops;
pub mod filters;
pub mod generators;
pub mod modifiers;
pub mod properties;
mod support;

use crate::engine::compiler::RuntimeTable;
use crate::engine::error::QueryError;

/// Builds the runtime table implementing the default symbol set.
pub fn default_runtime() -> Result<RuntimeTable, QueryError> {
    let mut table = RuntimeTable::new();
    core_ops::register(&mut table)?;
    properties::register(&mut table)?;
    generators::register(&mut table)?;
    modifiers::register(&mut table)?;
    filters::register(&mut table)?;
    combinators::register(&mut table)?;
    atom_sets::register(&mut table)?;
    tracing::debug!(bodies = table.len(), "built default runtime table");
    Ok(table)
}
