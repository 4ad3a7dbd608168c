use crate::core::lang::table::ids;
use crate::engine::compiler::{Arguments, RuntimeTable};
use crate::engine::environment::{ElementAddress, Environment};
use crate::engine::error::QueryError;
use crate::engine::value::Value;
use std::collections::HashSet;
use std::sync::Arc;

fn current_set(
    env: &Environment<'_>,
    id: &str,
) -> Result<crate::core::data::atom_set::AtomSet, QueryError> {
    env.atom_set
        .get()
        .cloned()
        .map_err(|_| QueryError::InvalidContext {
            symbol: id.to_string(),
            message: "atom-set operations require an enclosing atom-set scope".to_string(),
        })
}

fn reduce(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let set = current_set(env, ids::ATOM_SET_REDUCE)?;
    let value = args.require("value")?.clone();
    let initial = args.eval_named(env, "initial")?;

    env.accumulator.lock(initial)?;
    let result = (|| {
        for &atom in set.indices() {
            let address = ElementAddress::of_atom(env.structure, atom);
            let next = super::support::with_element(env, address, |env| value.eval(env))?;
            env.accumulator.set(next)?;
        }
        env.accumulator.get().cloned()
    })();
    env.accumulator.unlock();
    result
}

pub fn register(table: &mut RuntimeTable) -> Result<(), QueryError> {
    table.register(ids::ATOM_SET_ATOM_COUNT, |_, env| {
        let set = current_set(env, ids::ATOM_SET_ATOM_COUNT)?;
        Ok(Value::Number(set.count() as f64))
    })?;

    table.register(ids::ATOM_SET_COUNT_QUERY, |args, env| {
        let set = current_set(env, ids::ATOM_SET_COUNT_QUERY)?;
        let query = args.pos(0)?;
        let mask = set.mask(env.structure.atom_count());
        let mut inner = Environment::with_candidates(env.structure, mask);
        let result = query
            .eval(&mut inner)?
            .as_selection(ids::ATOM_SET_COUNT_QUERY)?;
        Ok(Value::Number(result.len() as f64))
    })?;

    table.register(ids::ATOM_SET_REDUCE, reduce)?;

    table.register(ids::ATOM_SET_PROPERTY_SET, |args, env| {
        let set = current_set(env, ids::ATOM_SET_PROPERTY_SET)?;
        let property = args.pos(0)?.clone();
        let mut keys = HashSet::new();
        for &atom in set.indices() {
            let address = ElementAddress::of_atom(env.structure, atom);
            let value =
                super::support::with_element(env, address, |env| property.eval(env))?;
            keys.insert(value.key().ok_or_else(|| {
                QueryError::Internal(format!(
                    "{}: property produced a non-scalar {}",
                    ids::ATOM_SET_PROPERTY_SET,
                    value.kind()
                ))
            })?);
        }
        Ok(Value::Set(Arc::new(keys)))
    })?;

    table.register(ids::SLOT_ACCUMULATOR, |_, env| {
        env.accumulator
            .get()
            .cloned()
            .map_err(|_| QueryError::InvalidContext {
                symbol: ids::SLOT_ACCUMULATOR.to_string(),
                message: "the accumulator can only be read inside atom-set.reduce".to_string(),
            })
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lang::expression::Expression;
    use crate::core::lang::table::default_symbols;
    use crate::core::model::builder::StructureBuilder;
    use crate::core::model::structure::Structure;
    use crate::engine::compiler::compile;
    use nalgebra::Point3;

    fn create_test_structure() -> Structure {
        let mut builder = StructureBuilder::new();
        builder.entity("1", "polymer");
        builder.chain("A").unwrap();
        builder.residue(1, "ALA").unwrap();
        builder.atom("N", "N", Point3::new(0.0, 0.0, 0.0)).unwrap();
        builder.atom("CA", "C", Point3::new(1.5, 0.0, 0.0)).unwrap();
        builder.atom("CB", "C", Point3::new(2.0, 1.0, 0.0)).unwrap();
        builder.residue(2, "HOH").unwrap();
        builder.atom("O", "O", Point3::new(9.0, 0.0, 0.0)).unwrap();
        builder.build().unwrap()
    }

    fn eval(structure: &Structure, expr: &Expression) -> Value {
        let symbols = default_symbols().unwrap();
        let runtime = super::super::default_runtime().unwrap();
        let compiled = compile(&symbols, &runtime, expr).unwrap();
        let mut env = Environment::new(structure);
        compiled.eval(&mut env).unwrap()
    }

    fn residues() -> Expression {
        Expression::apply(ids::GEN_ATOM_GROUPS)
            .named("group-by", Expression::apply(ids::PROP_RESIDUE_KEY).build())
            .build()
    }

    #[test]
    fn count_query_counts_result_sets_inside_each_set() {
        let structure = create_test_structure();
        // Keep residues containing at least two carbons.
        let carbons = Expression::apply(ids::GEN_ATOM_GROUPS)
            .named(
                "atom-test",
                Expression::apply(ids::REL_EQ)
                    .arg(Expression::apply(ids::PROP_ELEMENT_SYMBOL).build())
                    .arg(Expression::string("C"))
                    .build(),
            )
            .build();
        let expr = Expression::apply(ids::FILTER_PICK)
            .arg(residues())
            .named(
                "test",
                Expression::apply(ids::REL_GRE)
                    .arg(Expression::apply(ids::ATOM_SET_COUNT_QUERY).arg(carbons).build())
                    .arg(Expression::number(2.0))
                    .build(),
            )
            .build();
        let selection = eval(&structure, &expr).as_selection("t").unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[0, 1, 2]);
    }

    #[test]
    fn reduce_folds_a_value_over_set_atoms() {
        let structure = create_test_structure();
        // Sum the atomic numbers of each residue, keep those over 20.
        let sum = Expression::apply(ids::ATOM_SET_REDUCE)
            .named("initial", Expression::number(0.0))
            .named(
                "value",
                Expression::apply(ids::MATH_ADD)
                    .arg(Expression::apply(ids::SLOT_ACCUMULATOR).build())
                    .arg(Expression::apply(ids::PROP_ATOMIC_NUMBER).build())
                    .build(),
            )
            .build();
        let expr = Expression::apply(ids::FILTER_PICK)
            .arg(residues())
            .named(
                "test",
                Expression::apply(ids::REL_LT)
                    .arg(sum)
                    .arg(Expression::number(10.0))
                    .build(),
            )
            .build();
        let selection = eval(&structure, &expr).as_selection("t").unwrap();
        // ALA: 7 + 6 + 6 = 19; water: 8.
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[3]);
    }

    #[test]
    fn nested_reduce_is_a_reentrancy_error() {
        let structure = create_test_structure();
        let inner = Expression::apply(ids::ATOM_SET_REDUCE)
            .named("initial", Expression::number(0.0))
            .named("value", Expression::apply(ids::SLOT_ACCUMULATOR).build())
            .build();
        let outer = Expression::apply(ids::ATOM_SET_REDUCE)
            .named("initial", Expression::number(0.0))
            .named("value", inner)
            .build();
        let expr = Expression::apply(ids::FILTER_PICK)
            .arg(residues())
            .named(
                "test",
                Expression::apply(ids::REL_GRE)
                    .arg(outer)
                    .arg(Expression::number(0.0))
                    .build(),
            )
            .build();
        let symbols = default_symbols().unwrap();
        let runtime = super::super::default_runtime().unwrap();
        let compiled = compile(&symbols, &runtime, &expr).unwrap();
        let mut env = Environment::new(&structure);
        let err = compiled.eval(&mut env).unwrap_err();
        assert!(matches!(err, QueryError::ReentrantSlot("accumulator")));
    }

    #[test]
    fn accumulator_outside_reduce_is_invalid_context() {
        let structure = create_test_structure();
        let symbols = default_symbols().unwrap();
        let runtime = super::super::default_runtime().unwrap();
        let compiled = compile(
            &symbols,
            &runtime,
            &Expression::apply(ids::SLOT_ACCUMULATOR).build(),
        )
        .unwrap();
        let mut env = Environment::new(&structure);
        let err = compiled.eval(&mut env).unwrap_err();
        assert!(matches!(err, QueryError::InvalidContext { .. }));
    }

    #[test]
    fn property_set_collects_distinct_values() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::FILTER_PICK)
            .arg(residues())
            .named(
                "test",
                Expression::apply(ids::SET_HAS)
                    .arg(
                        Expression::apply(ids::ATOM_SET_PROPERTY_SET)
                            .arg(Expression::apply(ids::PROP_ELEMENT_SYMBOL).build())
                            .build(),
                    )
                    .arg(Expression::string("O"))
                    .build(),
            )
            .build();
        let selection = eval(&structure, &expr).as_selection("t").unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[3]);
    }

    #[test]
    fn atom_count_matches_set_size() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::FILTER_PICK)
            .arg(residues())
            .named(
                "test",
                Expression::apply(ids::REL_EQ)
                    .arg(Expression::apply(ids::ATOM_SET_ATOM_COUNT).build())
                    .arg(Expression::number(3.0))
                    .build(),
            )
            .build();
        let selection = eval(&structure, &expr).as_selection("t").unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].count(), 3);
    }
}
