use crate::core::data::atom_set::AtomSet;
use crate::core::data::lookup::{AtomLookup, SelectionLookup};
use crate::core::data::selection::AtomSelection;
use crate::core::lang::table::ids;
use crate::engine::compiler::{Arguments, CompiledExpression, RuntimeTable};
use crate::engine::environment::{BondAddress, ElementAddress, Environment};
use crate::engine::error::QueryError;
use crate::engine::value::Value;
use std::collections::{HashMap, HashSet};

fn eval_per_atom(
    env: &mut Environment<'_>,
    expr: &CompiledExpression,
    atom: usize,
) -> Result<Value, QueryError> {
    let address = ElementAddress::of_atom(env.structure, atom);
    super::support::with_element(env, address, |env| expr.eval(env))
}

fn query_each(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::MOD_QUERY_EACH)?;
    let query = args.require("query")?;
    let universe = env.structure.atom_count();

    let mut builder = AtomSelection::unique_builder();
    for set in selection.sets() {
        let mut inner = Environment::with_candidates(env.structure, set.mask(universe));
        let result = query.eval(&mut inner)?.as_selection(ids::MOD_QUERY_EACH)?;
        for mapped in result.sets() {
            builder.add(mapped.clone());
        }
    }
    Ok(Value::Selection(builder.build()))
}

fn intersect_by(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::MOD_INTERSECT_BY)?;
    let by = args.eval_named(env, "by")?.as_selection(ids::MOD_INTERSECT_BY)?;
    let mask = by.mask(env.structure.atom_count());

    let mut builder = AtomSelection::unique_builder();
    for set in selection.sets() {
        let kept: Vec<usize> = set.indices().iter().copied().filter(|&a| mask.has(a)).collect();
        if kept.is_empty() {
            continue;
        }
        builder.add(AtomSet::new(kept));
    }
    Ok(Value::Selection(builder.build()))
}

fn except_by(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::MOD_EXCEPT_BY)?;
    let by = args.eval_named(env, "by")?.as_selection(ids::MOD_EXCEPT_BY)?;
    let mask = by.mask(env.structure.atom_count());

    // Cardinality is preserved: a fully subtracted set stays as an empty set.
    let mut builder = AtomSelection::linear_builder();
    for set in selection.sets() {
        let kept: Vec<usize> = set.indices().iter().copied().filter(|&a| !mask.has(a)).collect();
        builder.add(AtomSet::new(kept));
    }
    Ok(Value::Selection(builder.build()))
}

fn union_by(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::MOD_UNION_BY)?;
    let glue = args.eval_named(env, "by")?.as_selection(ids::MOD_UNION_BY)?;

    let mut membership: HashMap<usize, Vec<usize>> = HashMap::new();
    for (set_index, set) in selection.sets().iter().enumerate() {
        for &atom in set.indices() {
            membership.entry(atom).or_default().push(set_index);
        }
    }

    let mut builder = AtomSelection::unique_builder();
    for glue_set in glue.sets() {
        let mut seen_sets = HashSet::new();
        let mut atoms = Vec::new();
        for &atom in glue_set.indices() {
            let Some(owners) = membership.get(&atom) else {
                continue;
            };
            for &owner in owners {
                if seen_sets.insert(owner) {
                    atoms.extend_from_slice(selection.sets()[owner].indices());
                }
            }
        }
        if atoms.is_empty() {
            continue;
        }
        builder.add(AtomSet::new(atoms));
    }
    Ok(Value::Selection(builder.build()))
}

fn union(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::MOD_UNION)?;
    Ok(Value::Selection(AtomSelection::new(vec![
        selection.to_atom_set(),
    ])))
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> UnionFind {
        UnionFind {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cursor = i;
        while self.parent[cursor] != root {
            let next = self.parent[cursor];
            self.parent[cursor] = root;
            cursor = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

fn cluster(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args.eval_pos(env, 0)?.as_selection(ids::MOD_CLUSTER)?;
    let max_distance = args.eval_named(env, "max-distance")?.as_number(ids::MOD_CLUSTER)?;
    let min_distance = args.eval_named(env, "min-distance")?.as_number(ids::MOD_CLUSTER)?;
    let min_size = args.eval_named(env, "min-size")?.as_number(ids::MOD_CLUSTER)? as usize;
    let max_size = match args.eval_named_opt(env, "max-size")? {
        Some(v) => Some(v.as_number(ids::MOD_CLUSTER)? as usize),
        None => None,
    };

    let structure = env.structure;
    let lookup = SelectionLookup::new(structure, &selection);
    let mut components = UnionFind::new(selection.len());
    for (i, set) in selection.sets().iter().enumerate() {
        for j in lookup.sets_within(structure, &selection, set, max_distance) {
            if j <= i {
                continue;
            }
            let distance = AtomSet::distance(structure, set, &selection.sets()[j]);
            if distance >= min_distance && distance <= max_distance {
                components.union(i, j);
            }
        }
    }

    let mut grouped: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut order = Vec::new();
    for i in 0..selection.len() {
        let root = components.find(i);
        let members = grouped.entry(root).or_insert_with(|| {
            order.push(root);
            Vec::new()
        });
        members.push(i);
    }

    let mut builder = AtomSelection::linear_builder();
    for root in order {
        let members = &grouped[&root];
        if members.len() < min_size {
            continue;
        }
        if let Some(max_size) = max_size {
            if members.len() > max_size {
                continue;
            }
        }
        let mut atoms = Vec::new();
        for &member in members {
            atoms.extend_from_slice(selection.sets()[member].indices());
        }
        builder.add(AtomSet::new(atoms));
    }
    Ok(Value::Selection(builder.build()))
}

fn include_surroundings(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args
        .eval_pos(env, 0)?
        .as_selection(ids::MOD_INCLUDE_SURROUNDINGS)?;
    let radius = args
        .eval_named(env, "radius")?
        .as_number(ids::MOD_INCLUDE_SURROUNDINGS)?;
    let atom_radius = args.named("atom-radius").cloned();
    let as_whole_residues = args
        .eval_named(env, "as-whole-residues")?
        .is_truthy();

    let structure = env.structure;
    let lookup = AtomLookup::new(structure, &env.candidates);
    let mut builder = AtomSelection::unique_builder();

    for set in selection.sets() {
        let mut atoms: HashSet<usize> = set.indices().iter().copied().collect();
        for &atom in set.indices() {
            let query_radius = match &atom_radius {
                Some(expr) => {
                    radius
                        + eval_per_atom(env, expr, atom)?
                            .as_number(ids::MOD_INCLUDE_SURROUNDINGS)?
                }
                None => radius,
            };
            let position = structure.position(atom);
            atoms.extend(lookup.atoms_within(&position, query_radius));
        }
        let mut atoms: Vec<usize> = atoms.into_iter().collect();
        atoms.sort_unstable();
        if as_whole_residues {
            atoms = super::support::whole_residues(structure, &atoms)
                .into_iter()
                .filter(|&a| env.candidates.has(a) || set.contains(a))
                .collect();
        }
        builder.add(AtomSet::new(atoms));
    }
    Ok(Value::Selection(builder.build()))
}

fn include_connected(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args
        .eval_pos(env, 0)?
        .as_selection(ids::MOD_INCLUDE_CONNECTED)?;
    let bond_test = args.require("bond-test")?.clone();
    let layer_count = args
        .eval_named(env, "layer-count")?
        .as_number(ids::MOD_INCLUDE_CONNECTED)? as usize;
    let as_whole_residues = args.eval_named(env, "as-whole-residues")?.is_truthy();

    let structure = env.structure;
    let mut builder = AtomSelection::unique_builder();
    for set in selection.sets() {
        let mut included: HashSet<usize> = set.indices().iter().copied().collect();
        let mut frontier: Vec<usize> = set.indices().to_vec();

        for _ in 0..layer_count {
            let mut next = Vec::new();
            if let Some(bonds) = structure.bonds() {
                for &atom in &frontier {
                    for &(neighbor, bond_index) in bonds.neighbors(atom) {
                        if included.contains(&neighbor) || !env.candidates.has(neighbor) {
                            continue;
                        }
                        let address = BondAddress {
                            atom_a: atom,
                            atom_b: neighbor,
                            order: bonds.order[bond_index],
                        };
                        if super::support::bond_test(env, &bond_test, address)? {
                            included.insert(neighbor);
                            next.push(neighbor);
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let mut atoms: Vec<usize> = included.into_iter().collect();
        atoms.sort_unstable();
        if as_whole_residues {
            atoms = super::support::whole_residues(structure, &atoms)
                .into_iter()
                .filter(|&a| env.candidates.has(a) || set.contains(a))
                .collect();
        }
        builder.add(AtomSet::new(atoms));
    }
    Ok(Value::Selection(builder.build()))
}

fn expand_property(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selection = args
        .eval_pos(env, 0)?
        .as_selection(ids::MOD_EXPAND_PROPERTY)?;
    let property = args.require("property")?.clone();

    let universe = env.structure.atom_count();
    let mut by_value: HashMap<crate::engine::value::Key, Vec<usize>> = HashMap::new();
    let mut key_of_atom = vec![None; universe];
    for atom in 0..universe {
        if !env.candidates.has(atom) {
            continue;
        }
        let value = eval_per_atom(env, &property, atom)?;
        let key = value.key().ok_or_else(|| {
            QueryError::Internal(format!(
                "{}: property produced a non-scalar {}",
                ids::MOD_EXPAND_PROPERTY,
                value.kind()
            ))
        })?;
        by_value.entry(key.clone()).or_default().push(atom);
        key_of_atom[atom] = Some(key);
    }

    let mut builder = AtomSelection::unique_builder();
    for set in selection.sets() {
        let mut atoms: HashSet<usize> = set.indices().iter().copied().collect();
        for &atom in set.indices() {
            if let Some(Some(key)) = key_of_atom.get(atom) {
                atoms.extend(by_value[key].iter().copied());
            }
        }
        let mut atoms: Vec<usize> = atoms.into_iter().collect();
        atoms.sort_unstable();
        builder.add(AtomSet::new(atoms));
    }
    Ok(Value::Selection(builder.build()))
}

pub fn register(table: &mut RuntimeTable) -> Result<(), QueryError> {
    table.register(ids::MOD_QUERY_EACH, query_each)?;
    table.register(ids::MOD_INTERSECT_BY, intersect_by)?;
    table.register(ids::MOD_EXCEPT_BY, except_by)?;
    table.register(ids::MOD_UNION_BY, union_by)?;
    table.register(ids::MOD_UNION, union)?;
    table.register(ids::MOD_CLUSTER, cluster)?;
    table.register(ids::MOD_INCLUDE_SURROUNDINGS, include_surroundings)?;
    table.register(ids::MOD_INCLUDE_CONNECTED, include_connected)?;
    table.register(ids::MOD_EXPAND_PROPERTY, expand_property)?;
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
        builder.residue(2, "GLY").unwrap();
        builder.atom("N", "N", Point3::new(3.0, 0.0, 0.0)).unwrap();
        builder.atom("CA", "C", Point3::new(4.5, 0.0, 0.0)).unwrap();
        builder.residue(3, "HOH").unwrap();
        builder.atom("O", "O", Point3::new(20.0, 0.0, 0.0)).unwrap();
        builder.bond(0, 1, 1).unwrap();
        builder.bond(1, 2, 1).unwrap();
        builder.bond(2, 3, 1).unwrap();
        builder.build().unwrap()
    }

    fn eval(structure: &Structure, expr: &Expression) -> AtomSelection {
        let symbols = default_symbols().unwrap();
        let runtime = super::super::default_runtime().unwrap();
        let compiled = compile(&symbols, &runtime, expr).unwrap();
        let mut env = Environment::new(structure);
        compiled.eval(&mut env).unwrap().as_selection("test").unwrap()
    }

    fn residues() -> Expression {
        Expression::apply(ids::GEN_ATOM_GROUPS)
            .named("group-by", Expression::apply(ids::PROP_RESIDUE_KEY).build())
            .build()
    }

    fn element(symbol: &str) -> Expression {
        Expression::apply(ids::GEN_ATOM_GROUPS)
            .named(
                "atom-test",
                Expression::apply(ids::REL_EQ)
                    .arg(Expression::apply(ids::PROP_ELEMENT_SYMBOL).build())
                    .arg(Expression::string(symbol))
                    .build(),
            )
            .build()
    }

    #[test]
    fn query_each_runs_inside_each_set() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_QUERY_EACH)
            .arg(residues())
            .named("query", element("N"))
            .build();
        let selection = eval(&structure, &expr);
        // One nitrogen singleton per amino-acid residue; the water has none.
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.sets()[0].indices(), &[0]);
        assert_eq!(selection.sets()[1].indices(), &[2]);
    }

    #[test]
    fn intersect_by_drops_empty_intersections() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_INTERSECT_BY)
            .arg(residues())
            .named("by", element("N"))
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.sets()[0].indices(), &[0]);
        assert_eq!(selection.sets()[1].indices(), &[2]);
    }

    #[test]
    fn except_by_preserves_set_cardinality() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_EXCEPT_BY)
            .arg(residues())
            .named("by", element("O"))
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 3);
        assert_eq!(selection.sets()[0].indices(), &[0, 1]);
        assert!(selection.sets()[2].is_empty());
    }

    #[test]
    fn union_by_glues_intersecting_source_sets() {
        let structure = create_test_structure();
        // Glue: all heavy backbone nitrogens as one set.
        let glue = Expression::apply(ids::MOD_UNION)
            .arg(element("N"))
            .build();
        let expr = Expression::apply(ids::MOD_UNION_BY)
            .arg(residues())
            .named("by", glue)
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn union_flattens_to_a_single_set() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_UNION).arg(element("N")).build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[0, 2]);
    }

    #[test]
    fn cluster_merges_nearby_sets_and_honors_min_size() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_CLUSTER)
            .arg(residues())
            .named("max-distance", Expression::number(2.0))
            .build();
        let selection = eval(&structure, &expr);
        // Residues 1 and 2 are 1.5 apart; the water is isolated and a
        // singleton component falls under the default min-size of 2.
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn cluster_min_size_one_keeps_isolated_sets() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_CLUSTER)
            .arg(residues())
            .named("max-distance", Expression::number(2.0))
            .named("min-size", Expression::number(1.0))
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.sets()[1].indices(), &[4]);
    }

    #[test]
    fn include_surroundings_with_zero_radius_is_identity() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_INCLUDE_SURROUNDINGS)
            .arg(residues())
            .named("radius", Expression::number(0.0))
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 3);
        assert_eq!(selection.sets()[0].indices(), &[0, 1]);
    }

    #[test]
    fn include_surroundings_pulls_in_nearby_atoms() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_INCLUDE_SURROUNDINGS)
            .arg(element("O"))
            .named("radius", Expression::number(16.0))
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[3, 4]);
    }

    #[test]
    fn include_surroundings_as_whole_residues_completes_residues() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_INCLUDE_SURROUNDINGS)
            .arg(element("O"))
            .named("radius", Expression::number(16.0))
            .named("as-whole-residues", Expression::bool(true))
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.sets()[0].indices(), &[2, 3, 4]);
    }

    #[test]
    fn include_connected_walks_one_bond_layer() {
        let structure = create_test_structure();
        let expr = Expression::apply(ids::MOD_INCLUDE_CONNECTED)
            .arg(element("O"))
            .named("layer-count", Expression::number(0.0))
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.sets()[0].indices(), &[4]);

        let one_layer = Expression::apply(ids::MOD_INCLUDE_CONNECTED)
            .arg(
                Expression::apply(ids::MOD_UNION)
                    .arg(element("N"))
                    .build(),
            )
            .build();
        let selection = eval(&structure, &one_layer);
        assert_eq!(selection.sets()[0].indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn include_connected_bond_test_restricts_traversal() {
        let mut builder = StructureBuilder::new();
        builder.entity("1", "non-polymer");
        builder.chain("A").unwrap();
        builder.residue(1, "LIG").unwrap();
        builder.atom("C1", "C", Point3::new(0.0, 0.0, 0.0)).unwrap();
        builder.atom("C2", "C", Point3::new(1.4, 0.0, 0.0)).unwrap();
        builder.atom("C3", "C", Point3::new(2.8, 0.0, 0.0)).unwrap();
        builder.bond(0, 1, 2).unwrap();
        builder.bond(1, 2, 1).unwrap();
        let structure = builder.build().unwrap();

        let expr = Expression::apply(ids::MOD_INCLUDE_CONNECTED)
            .arg(Expression::apply(ids::GEN_ATOM_GROUPS)
                .named(
                    "atom-test",
                    Expression::apply(ids::REL_EQ)
                        .arg(Expression::apply(ids::PROP_ATOM_KEY).build())
                        .arg(Expression::number(0.0))
                        .build(),
                )
                .build())
            .named(
                "bond-test",
                Expression::apply(ids::REL_EQ)
                    .arg(Expression::apply(ids::BOND_PROP_ORDER).build())
                    .arg(Expression::number(2.0))
                    .build(),
            )
            .named("layer-count", Expression::number(5.0))
            .build();
        let selection = eval(&structure, &expr);
        // Only the double bond may be crossed.
        assert_eq!(selection.sets()[0].indices(), &[0, 1]);
    }

    #[test]
    fn expand_property_adds_atoms_sharing_a_value() {
        let structure = create_test_structure();
        let first_nitrogen = Expression::apply(ids::GEN_ATOM_GROUPS)
            .named(
                "atom-test",
                Expression::apply(ids::REL_EQ)
                    .arg(Expression::apply(ids::PROP_ATOM_KEY).build())
                    .arg(Expression::number(0.0))
                    .build(),
            )
            .build();
        let expr = Expression::apply(ids::MOD_EXPAND_PROPERTY)
            .arg(first_nitrogen)
            .named(
                "property",
                Expression::apply(ids::PROP_ELEMENT_SYMBOL).build(),
            )
            .build();
        let selection = eval(&structure, &expr);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].indices(), &[0, 2]);
    }
}
