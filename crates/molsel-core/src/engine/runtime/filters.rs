use crate::core::data::atom_set::AtomSet;
use crate::core::data::lookup::AtomLookup;
use crate::core::data::selection::AtomSelection;
use crate::core::lang::table::ids;
use crate::engine::compiler::{Arguments, CompiledExpression, RuntimeTable};
use crate::engine::environment::{BondAddress, ElementAddress, Environment};
use crate::engine::error::QueryError;
use crate::engine::value::{Key, Value};

fn pick(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::FILTER_PICK)?;
    let test = args.require("test")?.clone();

    let mut builder = AtomSelection::linear_builder();
    for set in selection.sets() {
        if super::support::set_test(env, &test, set)? {
            builder.add(set.clone());
        }
    }
    Ok(Value::Selection(builder.build()))
}

fn property_values(
    env: &mut Environment<'_>,
    property: &CompiledExpression,
    atoms: &[usize],
    id: &str,
) -> Result<Vec<Key>, QueryError> {
    let mut keys = Vec::with_capacity(atoms.len());
    for &atom in atoms {
        let address = ElementAddress::of_atom(env.structure, atom);
        let value =
            super::support::with_element(env, address, |env| property.eval(env))?;
        keys.push(value.key().ok_or_else(|| {
            QueryError::Internal(format!("{}: property produced a non-scalar {}", id, value.kind()))
        })?);
    }
    // Keys order deterministically: booleans, then numbers by bits, then strings.
    keys.sort_unstable_by(|a, b| key_rank(a).cmp(&key_rank(b)));
    Ok(keys)
}

fn key_rank(key: &Key) -> (u8, u64, &str) {
    match key {
        Key::Bool(b) => (0, *b as u64, ""),
        Key::Number(bits) => (1, *bits, ""),
        Key::Str(s) => (2, 0, s),
    }
}

fn with_same_atom_properties(
    args: &Arguments,
    env: &mut Environment<'_>,
) -> Result<Value, QueryError> {
    let selection = args
        .eval_pos(env, 0)?
        .as_selection(ids::FILTER_SAME_PROPERTIES)?;
    let source = args
        .eval_named(env, "source")?
        .as_selection(ids::FILTER_SAME_PROPERTIES)?;
    let property = args.require("property")?.clone();

    let source_values = property_values(
        env,
        &property,
        source.to_atom_set().indices(),
        ids::FILTER_SAME_PROPERTIES,
    )?;

    let mut builder = AtomSelection::linear_builder();
    for set in selection.sets() {
        let values = property_values(env, &property, set.indices(), ids::FILTER_SAME_PROPERTIES)?;
        if values == source_values {
            builder.add(set.clone());
        }
    }
    Ok(Value::Selection(builder.build()))
}

fn intersected_by(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args
        .eval_pos(env, 0)?
        .as_selection(ids::FILTER_INTERSECTED_BY)?;
    let by = args
        .eval_named(env, "by")?
        .as_selection(ids::FILTER_INTERSECTED_BY)?;
    let invert = args.eval_named(env, "invert")?.is_truthy();

    let mask = by.mask(env.structure.atom_count());
    let mut builder = AtomSelection::linear_builder();
    for set in selection.sets() {
        if mask.has_any(set.indices()) != invert {
            builder.add(set.clone());
        }
    }
    Ok(Value::Selection(builder.build()))
}

fn within(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::FILTER_WITHIN)?;
    let target = args
        .eval_named(env, "target")?
        .as_selection(ids::FILTER_WITHIN)?;
    let max_radius = args.eval_named(env, "max-radius")?.as_number(ids::FILTER_WITHIN)?;
    let min_radius = args.eval_named(env, "min-radius")?.as_number(ids::FILTER_WITHIN)?;
    let invert = args.eval_named(env, "invert")?.is_truthy();

    let structure = env.structure;
    let target_set = target.to_atom_set();
    let lookup = AtomLookup::new(structure, &target_set.mask(structure.atom_count()));

    let mut builder = AtomSelection::linear_builder();
    for set in selection.sets() {
        let mut distance = f64::INFINITY;
        for &atom in set.indices() {
            let position = structure.position(atom);
            // Tight prefilter; the exact minimum only matters for min-radius.
            for candidate in lookup.atoms_within(&position, max_radius) {
                let d = (structure.position(candidate) - position).norm();
                if d < distance {
                    distance = d;
                }
            }
        }
        let inside = distance <= max_radius && distance >= min_radius;
        if inside != invert {
            builder.add(set.clone());
        }
    }
    Ok(Value::Selection(builder.build()))
}

fn is_connected_to(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args
        .eval_pos(env, 0)?
        .as_selection(ids::FILTER_IS_CONNECTED_TO)?;
    let target = args
        .eval_named(env, "target")?
        .as_selection(ids::FILTER_IS_CONNECTED_TO)?;
    let bond_test = args.require("bond-test")?.clone();
    let disjunct = args.eval_named(env, "disjunct")?.is_truthy();
    let invert = args.eval_named(env, "invert")?.is_truthy();

    let structure = env.structure;
    let target_mask = target.mask(structure.atom_count());

    let mut builder = AtomSelection::linear_builder();
    for set in selection.sets() {
        let connected = is_set_connected(env, set, &target_mask, &bond_test, disjunct)?;
        if connected != invert {
            builder.add(set.clone());
        }
    }
    Ok(Value::Selection(builder.build()))
}

fn is_set_connected(
    env: &mut Environment<'_>,
    set: &AtomSet,
    target_mask: &crate::core::data::mask::Mask,
    bond_test: &CompiledExpression,
    disjunct: bool,
) -> Result<bool, QueryError> {
    let Some(bonds) = env.structure.bonds() else {
        return Ok(false);
    };
    for &atom in set.indices() {
        for &(neighbor, bond_index) in bonds.neighbors(atom) {
            if !target_mask.has(neighbor) {
                continue;
            }
            if disjunct && set.contains(neighbor) {
                continue;
            }
            let address = BondAddress {
                atom_a: atom,
                atom_b: neighbor,
                order: bonds.order[bond_index],
            };
            if super::support::bond_test(env, bond_test, address)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

pub fn register(table: &mut RuntimeTable) -> Result<(), QueryError> {
    table.register(ids::FILTER_PICK, pick)?;
    table.register(ids::FILTER_SAME_PROPERTIES, with_same_atom_properties)?;
    table.register(ids::FILTER_INTERSECTED_BY, intersected_by)?;
    table.register(ids::FILTER_WITHIN, within)?;
    table.register(ids::FILTER_IS_CONNECTED_TO, is_connected_to)?;
    Ok(())
}
