use crate::core::data::atom_set::AtomSet;
use crate::core::data::mask::Mask;
use crate::core::data::selection::AtomSelection;
use crate::core::lang::table::ids;
use crate::core::model::topology;
use crate::engine::compiler::RuntimeTable;
use crate::engine::environment::{ElementAddress, Environment};
use crate::engine::error::QueryError;
use crate::engine::value::{Key, Value};
use indexmap::IndexMap;

fn atom_groups(
    args: &crate::engine::compiler::Arguments,
    env: &mut Environment<'_>,
) -> Result<Value, QueryError> {
    let entity_test = args.require("entity-test")?.clone();
    let chain_test = args.require("chain-test")?.clone();
    let residue_test = args.require("residue-test")?.clone();
    let atom_test = args.require("atom-test")?.clone();
    let group_by = args.named("group-by").cloned();

    let structure = env.structure;

    // Every group is a single atom when no hierarchy test was written and
    // nothing groups the result; scan the atom table instead of descending
    // entity/chain/residue levels.
    if group_by.is_none()
        && !args.is_explicit("entity-test")
        && !args.is_explicit("chain-test")
        && !args.is_explicit("residue-test")
    {
        let mut builder = AtomSelection::linear_builder();
        for atom in 0..structure.atom_count() {
            if !env.candidates.has(atom) {
                continue;
            }
            if super::support::atom_test(env, &atom_test, atom)? {
                builder.add(AtomSet::singleton(atom));
            }
        }
        return Ok(Value::Selection(builder.build()));
    }

    env.element.lock(ElementAddress::default())?;
    let result = (|| {
        let mut groups: IndexMap<Key, Vec<usize>> = IndexMap::new();
        let mut singles = AtomSelection::linear_builder();

        for entity in 0..structure.entities.count {
            let mut address = ElementAddress {
                entity,
                ..ElementAddress::default()
            };
            env.element.set(address)?;
            if !entity_test.eval(env)?.is_truthy() {
                continue;
            }
            for chain in structure.chain_range(entity) {
                address.chain = chain;
                env.element.set(address)?;
                if !chain_test.eval(env)?.is_truthy() {
                    continue;
                }
                for residue in structure.residue_range(chain) {
                    address.residue = residue;
                    env.element.set(address)?;
                    if !residue_test.eval(env)?.is_truthy() {
                        continue;
                    }
                    for atom in structure.atom_range(residue) {
                        if !env.candidates.has(atom) {
                            continue;
                        }
                        address.atom = atom;
                        env.element.set(address)?;
                        if !atom_test.eval(env)?.is_truthy() {
                            continue;
                        }
                        match &group_by {
                            Some(key_expr) => {
                                let value = key_expr.eval(env)?;
                                let key = value.key().ok_or_else(|| {
                                    QueryError::Internal(format!(
                                        "{}: group-by produced a non-scalar {}",
                                        ids::GEN_ATOM_GROUPS,
                                        value.kind()
                                    ))
                                })?;
                                groups.entry(key).or_default().push(atom);
                            }
                            None => singles.add(AtomSet::singleton(atom)),
                        }
                    }
                }
            }
        }

        let selection = if group_by.is_some() {
            let mut builder = AtomSelection::linear_builder();
            for (_, atoms) in groups {
                builder.add(AtomSet::new(atoms));
            }
            builder.build()
        } else {
            singles.build()
        };
        Ok(Value::Selection(selection))
    })();
    env.element.unlock();
    result
}

pub fn register(table: &mut RuntimeTable) -> Result<(), QueryError> {
    table.register(ids::GEN_ATOM_GROUPS, atom_groups)?;

    table.register(ids::GEN_QUERY_IN_SELECTION, |args, env| {
        env.assert_no_locked_slots(ids::GEN_QUERY_IN_SELECTION)?;
        let selection = args
            .eval_pos(env, 0)?
            .as_selection(ids::GEN_QUERY_IN_SELECTION)?;
        let in_complement = args.eval_named(env, "in-complement")?.is_truthy();
        let query = args.require("query")?;

        let universe = env.structure.atom_count();
        let mask = selection.mask(universe);
        let candidates = if in_complement {
            let indices = mask.complement_within(&env.candidates, universe);
            Mask::from_indices(universe, &indices)
        } else {
            let indices: Vec<usize> = (0..universe)
                .filter(|&i| mask.has(i) && env.candidates.has(i))
                .collect();
            Mask::from_indices(universe, &indices)
        };

        let mut inner = Environment::with_candidates(env.structure, candidates);
        query.eval(&mut inner)
    })?;

    table.register(ids::GEN_RINGS, |_, env| {
        let mut builder = AtomSelection::linear_builder();
        for ring in topology::find_rings(env.structure) {
            if ring.iter().all(|&atom| env.candidates.has(atom)) {
                builder.add(AtomSet::new(ring));
            }
        }
        Ok(Value::Selection(builder.build()))
    })?;

    table.register(ids::GEN_EMPTY, |_, _| {
        Ok(Value::Selection(AtomSelection::empty()))
    })?;

    Ok(())
}
