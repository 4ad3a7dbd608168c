use crate::core::lang::table::ids;
use crate::core::model::elements;
use crate::core::model::structure::PropertyColumn;
use crate::engine::compiler::RuntimeTable;
use crate::engine::environment::{ElementAddress, Environment};
use crate::engine::error::QueryError;
use crate::engine::value::Value;

fn current(env: &Environment<'_>, id: &str) -> Result<ElementAddress, QueryError> {
    env.element.get().map(|a| *a).map_err(|_| QueryError::InvalidContext {
        symbol: id.to_string(),
        message: "atom properties can only be read inside a per-atom test".to_string(),
    })
}

fn atom_number(
    table: &mut RuntimeTable,
    id: &'static str,
    read: impl Fn(&Environment<'_>, ElementAddress) -> f64 + Send + Sync + 'static,
) -> Result<(), QueryError> {
    table.register(id, move |_, env| {
        let address = current(env, id)?;
        Ok(Value::Number(read(env, address)))
    })
}

fn atom_string(
    table: &mut RuntimeTable,
    id: &'static str,
    read: impl Fn(&Environment<'_>, ElementAddress) -> String + Send + Sync + 'static,
) -> Result<(), QueryError> {
    table.register(id, move |_, env| {
        let address = current(env, id)?;
        Ok(Value::str(&read(env, address)))
    })
}

pub fn register(table: &mut RuntimeTable) -> Result<(), QueryError> {
    atom_number(table, ids::PROP_ATOM_KEY, |_, a| a.atom as f64)?;
    atom_number(table, ids::PROP_X, |env, a| env.structure.atoms.x[a.atom])?;
    atom_number(table, ids::PROP_Y, |env, a| env.structure.atoms.y[a.atom])?;
    atom_number(table, ids::PROP_Z, |env, a| env.structure.atoms.z[a.atom])?;
    atom_number(table, ids::PROP_VDW, |env, a| {
        elements::vdw_radius(&env.structure.atoms.type_symbol[a.atom])
    })?;
    atom_number(table, ids::PROP_MASS, |env, a| {
        elements::atomic_mass(&env.structure.atoms.type_symbol[a.atom])
    })?;
    atom_number(table, ids::PROP_ATOMIC_NUMBER, |env, a| {
        elements::atomic_number(&env.structure.atoms.type_symbol[a.atom]) as f64
    })?;
    atom_number(table, ids::PROP_LABEL_SEQ_ID, |env, a| {
        env.structure.residues.label_seq_id[a.residue] as f64
    })?;
    atom_number(table, ids::PROP_AUTH_SEQ_ID, |env, a| {
        env.structure.residues.auth_seq_id[a.residue] as f64
    })?;
    atom_number(table, ids::PROP_RESIDUE_KEY, |_, a| a.residue as f64)?;
    atom_number(table, ids::PROP_CHAIN_KEY, |_, a| a.chain as f64)?;
    atom_number(table, ids::PROP_ENTITY_KEY, |_, a| a.entity as f64)?;
    atom_number(table, ids::PROP_OCCUPANCY, |env, a| {
        env.structure.atoms.occupancy[a.atom]
    })?;
    atom_number(table, ids::PROP_B_FACTOR, |env, a| {
        env.structure.atoms.b_iso[a.atom]
    })?;

    atom_string(table, ids::PROP_ELEMENT_SYMBOL, |env, a| {
        env.structure.atoms.type_symbol[a.atom].clone()
    })?;
    atom_string(table, ids::PROP_LABEL_ATOM_ID, |env, a| {
        env.structure.atoms.label_atom_id[a.atom].clone()
    })?;
    atom_string(table, ids::PROP_LABEL_COMP_ID, |env, a| {
        env.structure.residues.label_comp_id[a.residue].clone()
    })?;
    atom_string(table, ids::PROP_AUTH_COMP_ID, |env, a| {
        env.structure.residues.auth_comp_id[a.residue].clone()
    })?;
    atom_string(table, ids::PROP_LABEL_ASYM_ID, |env, a| {
        env.structure.chains.label_asym_id[a.chain].clone()
    })?;
    atom_string(table, ids::PROP_AUTH_ASYM_ID, |env, a| {
        env.structure.chains.auth_asym_id[a.chain].clone()
    })?;
    atom_string(table, ids::PROP_ENTITY_TYPE, |env, a| {
        env.structure.entities.entity_type[a.entity].clone()
    })?;

    table.register(ids::PROP_CUSTOM, |args, env| {
        let name = args.eval_pos(env, 0)?.as_str(ids::PROP_CUSTOM)?;
        let address = current(env, ids::PROP_CUSTOM)?;
        let column = env.structure.property(&name).ok_or_else(|| {
            QueryError::InvalidContext {
                symbol: ids::PROP_CUSTOM.to_string(),
                message: format!("structure has no property column '{}'", name),
            }
        })?;
        Ok(match column {
            PropertyColumn::Int(v) => Value::Number(v[address.atom] as f64),
            PropertyColumn::Float(v) => Value::Number(v[address.atom]),
            PropertyColumn::Str(v) => Value::str(&v[address.atom]),
        })
    })?;

    table.register(ids::BOND_PROP_ORDER, |_, env| {
        let bond = env.bond.get().map_err(|_| QueryError::InvalidContext {
            symbol: ids::BOND_PROP_ORDER.to_string(),
            message: "bond properties can only be read inside a bond test".to_string(),
        })?;
        Ok(Value::Number(bond.order as f64))
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
        builder.residue(10, "HIS").unwrap();
        builder.atom("N", "N", Point3::new(0.0, 0.0, 0.0)).unwrap();
        builder.atom("CA", "C", Point3::new(1.5, 0.5, -0.5)).unwrap();
        builder.property(
            "charge",
            PropertyColumn::Float(vec![-0.3, 0.1]),
        );
        builder.build().unwrap()
    }

    fn eval_at(structure: &Structure, atom: usize, expr: &Expression) -> Value {
        let symbols = default_symbols().unwrap();
        let mut runtime = RuntimeTable::new();
        super::super::core_ops::register(&mut runtime).unwrap();
        register(&mut runtime).unwrap();
        let compiled = compile(&symbols, &runtime, expr).unwrap();
        let mut env = Environment::new(structure);
        env.element
            .lock(ElementAddress::of_atom(structure, atom))
            .unwrap();
        compiled.eval(&mut env).unwrap()
    }

    #[test]
    fn hierarchy_properties_read_through_the_address() {
        let structure = create_test_structure();
        let comp = Expression::apply(ids::PROP_AUTH_COMP_ID).build();
        assert_eq!(&*eval_at(&structure, 1, &comp).as_str("t").unwrap(), "HIS");
        let seq = Expression::apply(ids::PROP_AUTH_SEQ_ID).build();
        assert_eq!(eval_at(&structure, 0, &seq).as_number("t").unwrap(), 10.0);
        let asym = Expression::apply(ids::PROP_AUTH_ASYM_ID).build();
        assert_eq!(&*eval_at(&structure, 0, &asym).as_str("t").unwrap(), "A");
    }

    #[test]
    fn element_derived_properties_use_the_periodic_table() {
        let structure = create_test_structure();
        let z = Expression::apply(ids::PROP_ATOMIC_NUMBER).build();
        assert_eq!(eval_at(&structure, 0, &z).as_number("t").unwrap(), 7.0);
        assert_eq!(eval_at(&structure, 1, &z).as_number("t").unwrap(), 6.0);
    }

    #[test]
    fn custom_property_reads_named_column() {
        let structure = create_test_structure();
        let e = Expression::apply(ids::PROP_CUSTOM)
            .arg(Expression::string("charge"))
            .build();
        assert_eq!(eval_at(&structure, 0, &e).as_number("t").unwrap(), -0.3);
    }

    #[test]
    fn property_outside_atom_scope_is_invalid_context() {
        let structure = create_test_structure();
        let symbols = default_symbols().unwrap();
        let mut runtime = RuntimeTable::new();
        register(&mut runtime).unwrap();
        let compiled = compile(
            &symbols,
            &runtime,
            &Expression::apply(ids::PROP_X).build(),
        )
        .unwrap();
        let mut env = Environment::new(&structure);
        let err = compiled.eval(&mut env).unwrap_err();
        assert!(matches!(err, QueryError::InvalidContext { .. }));
    }
}
