//! Slot-scoped evaluation helpers shared by the structure operators.

use crate::core::data::atom_set::AtomSet;
use crate::core::model::structure::Structure;
use crate::engine::compiler::CompiledExpression;
use crate::engine::environment::{BondAddress, ElementAddress, Environment};
use crate::engine::error::QueryError;

/// Runs `f` with the element slot locked to `address`, unlocking on every
/// exit path.
pub(crate) fn with_element<T>(
    env: &mut Environment<'_>,
    address: ElementAddress,
    f: impl FnOnce(&mut Environment<'_>) -> Result<T, QueryError>,
) -> Result<T, QueryError> {
    env.element.lock(address)?;
    let result = f(env);
    env.element.unlock();
    result
}

/// Runs `f` with the atom-set slot locked to `set`.
pub(crate) fn with_atom_set<T>(
    env: &mut Environment<'_>,
    set: AtomSet,
    f: impl FnOnce(&mut Environment<'_>) -> Result<T, QueryError>,
) -> Result<T, QueryError> {
    env.atom_set.lock(set)?;
    let result = f(env);
    env.atom_set.unlock();
    result
}

/// Runs `f` with the bond slot locked to `bond`.
pub(crate) fn with_bond<T>(
    env: &mut Environment<'_>,
    bond: BondAddress,
    f: impl FnOnce(&mut Environment<'_>) -> Result<T, QueryError>,
) -> Result<T, QueryError> {
    env.bond.lock(bond)?;
    let result = f(env);
    env.bond.unlock();
    result
}

/// Evaluates a per-atom test with the element slot pointing at `atom`.
pub(crate) fn atom_test(
    env: &mut Environment<'_>,
    test: &CompiledExpression,
    atom: usize,
) -> Result<bool, QueryError> {
    let address = ElementAddress::of_atom(env.structure, atom);
    with_element(env, address, |env| Ok(test.eval(env)?.is_truthy()))
}

/// Evaluates a per-set test with the atom-set slot holding `set`.
pub(crate) fn set_test(
    env: &mut Environment<'_>,
    test: &CompiledExpression,
    set: &AtomSet,
) -> Result<bool, QueryError> {
    with_atom_set(env, set.clone(), |env| Ok(test.eval(env)?.is_truthy()))
}

/// Evaluates a bond test with the bond slot holding `bond`.
pub(crate) fn bond_test(
    env: &mut Environment<'_>,
    test: &CompiledExpression,
    bond: BondAddress,
) -> Result<bool, QueryError> {
    with_bond(env, bond, |env| Ok(test.eval(env)?.is_truthy()))
}

/// Expands a sorted atom list to the full residues touched by it.
pub(crate) fn whole_residues(structure: &Structure, atoms: &[usize]) -> Vec<usize> {
    let mut expanded = Vec::new();
    let mut last_residue = usize::MAX;
    for &atom in atoms {
        let residue = structure.residue_of_atom(atom);
        if residue != last_residue {
            expanded.extend(structure.atom_range(residue));
            last_residue = residue;
        }
    }
    expanded
}
