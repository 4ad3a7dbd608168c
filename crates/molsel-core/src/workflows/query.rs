use crate::core::data::mask::Mask;
use crate::core::data::selection::AtomSelection;
use crate::core::lang::expression::Expression;
use crate::core::lang::symbol::SymbolTable;
use crate::core::lang::table::default_symbols;
use crate::core::lang::types::Type;
use crate::core::model::structure::Structure;
use crate::engine::check::check;
use crate::engine::compiler::{CompiledExpression, RuntimeTable, compile};
use crate::engine::environment::Environment;
use crate::engine::error::QueryError;
use crate::engine::runtime::default_runtime;
use crate::engine::value::Value;
use tracing::{debug, instrument};

/// The assembled query pipeline: symbol declarations plus runtime bodies.
///
/// Building the engine validates the full default language once; compiled
/// queries borrow nothing from it and can outlive it. The engine itself is
/// immutable and shareable between threads.
pub struct QueryEngine {
    symbols: SymbolTable,
    runtime: RuntimeTable,
}

impl QueryEngine {
    pub fn new() -> Result<QueryEngine, QueryError> {
        let symbols = default_symbols()?;
        let runtime = default_runtime()?;
        Ok(QueryEngine { symbols, runtime })
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Type-checks an expression without compiling it.
    pub fn check(&self, expression: &Expression) -> Result<Type, QueryError> {
        check(&self.symbols, expression)
    }

    /// Type-checks and compiles an expression into a reusable query.
    #[instrument(skip_all)]
    pub fn compile(&self, expression: &Expression) -> Result<CompiledQuery, QueryError> {
        let return_type = check(&self.symbols, expression)?;
        let compiled = compile(&self.symbols, &self.runtime, expression)?;
        debug!(%return_type, "query compiled");
        Ok(CompiledQuery {
            compiled,
            return_type,
        })
    }
}

/// A checked, compiled query bound to no particular structure.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    compiled: CompiledExpression,
    return_type: Type,
}

impl CompiledQuery {
    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// Evaluates the query against a structure with all atoms visible.
    pub fn run(&self, structure: &Structure) -> Result<Value, QueryError> {
        let mut env = Environment::new(structure);
        self.compiled.eval(&mut env)
    }

    /// Evaluates the query with the candidate universe restricted to `mask`.
    pub fn run_masked(&self, structure: &Structure, mask: Mask) -> Result<Value, QueryError> {
        let mut env = Environment::with_candidates(structure, mask);
        self.compiled.eval(&mut env)
    }

    /// Runs the query and requires an atom selection result.
    pub fn select(&self, structure: &Structure) -> Result<AtomSelection, QueryError> {
        self.run(structure)?.as_selection("query result")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lang::table::ids;
    use crate::core::model::builder::StructureBuilder;
    use nalgebra::Point3;

    fn create_three_residue_structure() -> Structure {
        let mut builder = StructureBuilder::new();
        builder.entity("1", "polymer");
        builder.chain("A").unwrap();
        for (i, comp) in ["GLY", "ALA", "SER"].iter().enumerate() {
            builder.residue(i as i64 + 1, comp).unwrap();
            builder
                .atom("CA", "C", Point3::new(i as f64 * 4.0, 0.0, 0.0))
                .unwrap();
        }
        builder.build().unwrap()
    }

    fn engine() -> QueryEngine {
        QueryEngine::new().unwrap()
    }

    #[test]
    fn groups_by_atom_key_into_singletons() {
        // Three one-atom residues, atom-test always true.
        let structure = create_three_residue_structure();
        let expr = Expression::apply(ids::GEN_ATOM_GROUPS)
            .named("atom-test", Expression::bool(true))
            .named("group-by", Expression::apply(ids::PROP_ATOM_KEY).build())
            .build();
        let selection = engine().compile(&expr).unwrap().select(&structure).unwrap();
        assert_eq!(selection.len(), 3);
        for (i, set) in selection.sets().iter().enumerate() {
            assert_eq!(set.indices(), &[i]);
        }
    }

    #[test]
    fn residue_test_selects_matching_residue_atoms() {
        let structure = create_three_residue_structure();
        let expr = Expression::apply(ids::GEN_ATOM_GROUPS)
            .named(
                "residue-test",
                Expression::apply(ids::REL_EQ)
                    .arg(Expression::apply(ids::PROP_AUTH_COMP_ID).build())
                    .arg(Expression::string("ALA"))
                    .build(),
            )
            .build();
        let selection = engine().compile(&expr).unwrap().select(&structure).unwrap();
        assert_eq!(selection.to_atom_set().indices(), &[1]);
    }

    #[test]
    fn zero_radius_surroundings_change_nothing() {
        let structure = create_three_residue_structure();
        let base = Expression::apply(ids::GEN_ATOM_GROUPS)
            .named("group-by", Expression::apply(ids::PROP_RESIDUE_KEY).build())
            .build();
        let expr = Expression::apply(ids::MOD_INCLUDE_SURROUNDINGS)
            .arg(base.clone())
            .named("radius", Expression::number(0.0))
            .build();
        let engine = engine();
        let expanded = engine.compile(&expr).unwrap().select(&structure).unwrap();
        let original = engine.compile(&base).unwrap().select(&structure).unwrap();
        assert_eq!(expanded.to_atom_set(), original.to_atom_set());
        assert_eq!(expanded.len(), original.len());
    }

    #[test]
    fn self_intersection_is_identity_and_self_subtraction_empties() {
        let structure = create_three_residue_structure();
        let base = Expression::apply(ids::GEN_ATOM_GROUPS)
            .named("group-by", Expression::apply(ids::PROP_RESIDUE_KEY).build())
            .build();
        let engine = engine();

        let intersected = Expression::apply(ids::MOD_INTERSECT_BY)
            .arg(base.clone())
            .named("by", base.clone())
            .build();
        let result = engine
            .compile(&intersected)
            .unwrap()
            .select(&structure)
            .unwrap();
        let original = engine.compile(&base).unwrap().select(&structure).unwrap();
        assert_eq!(result, original);

        let subtracted = Expression::apply(ids::MOD_EXCEPT_BY)
            .arg(base.clone())
            .named("by", base)
            .build();
        let result = engine
            .compile(&subtracted)
            .unwrap()
            .select(&structure)
            .unwrap();
        assert_eq!(result.len(), original.len());
        assert!(result.sets().iter().all(|set| set.is_empty()));
    }

    #[test]
    fn counting_reduce_returns_the_set_size() {
        // A single seven-atom residue, folded with value = accumulator + 1.
        let mut builder = StructureBuilder::new();
        builder.entity("1", "polymer");
        builder.chain("A").unwrap();
        builder.residue(1, "LYS").unwrap();
        for i in 0..7 {
            builder
                .atom("C", "C", Point3::new(i as f64, 0.0, 0.0))
                .unwrap();
        }
        let structure = builder.build().unwrap();

        let count = Expression::apply(ids::ATOM_SET_REDUCE)
            .named("initial", Expression::number(0.0))
            .named(
                "value",
                Expression::apply(ids::MATH_ADD)
                    .arg(Expression::apply(ids::SLOT_ACCUMULATOR).build())
                    .arg(Expression::number(1.0))
                    .build(),
            )
            .build();
        let expr = Expression::apply(ids::FILTER_PICK)
            .arg(
                Expression::apply(ids::GEN_ATOM_GROUPS)
                    .named("group-by", Expression::apply(ids::PROP_RESIDUE_KEY).build())
                    .build(),
            )
            .named(
                "test",
                Expression::apply(ids::REL_EQ)
                    .arg(count)
                    .arg(Expression::number(7.0))
                    .build(),
            )
            .build();
        let selection = engine().compile(&expr).unwrap().select(&structure).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.sets()[0].count(), 7);
    }

    #[test]
    fn grouping_is_deterministic_across_evaluations() {
        let structure = create_three_residue_structure();
        let expr = Expression::apply(ids::GEN_ATOM_GROUPS)
            .named(
                "group-by",
                Expression::apply(ids::PROP_ELEMENT_SYMBOL).build(),
            )
            .build();
        let engine = engine();
        let query = engine.compile(&expr).unwrap();
        let first = query.select(&structure).unwrap();
        let second = query.select(&structure).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn scalar_queries_are_allowed_at_the_top_level() {
        let structure = create_three_residue_structure();
        let expr = Expression::apply(ids::MATH_ADD)
            .arg(Expression::number(2.0))
            .arg(Expression::number(3.0))
            .build();
        let engine = engine();
        let query = engine.compile(&expr).unwrap();
        assert_eq!(query.run(&structure).unwrap().as_number("t").unwrap(), 5.0);
    }

    #[test]
    fn run_masked_restricts_the_candidate_universe() {
        let structure = create_three_residue_structure();
        let expr = Expression::apply(ids::GEN_ATOM_GROUPS).build();
        let engine = engine();
        let query = engine.compile(&expr).unwrap();
        let mask = Mask::from_indices(structure.atom_count(), &[0, 2]);
        let selection = query
            .run_masked(&structure, mask)
            .unwrap()
            .as_selection("t")
            .unwrap();
        assert_eq!(selection.to_atom_set().indices(), &[0, 2]);
    }

    #[test]
    fn compile_rejects_ill_typed_queries_before_evaluation() {
        let expr = Expression::apply(ids::MATH_ADD)
            .arg(Expression::apply(ids::GEN_EMPTY).build())
            .build();
        let err = engine().compile(&expr).unwrap_err();
        assert!(matches!(err, QueryError::Type { .. }));
    }
}
