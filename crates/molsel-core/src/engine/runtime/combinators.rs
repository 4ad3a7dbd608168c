use crate::core::data::atom_set::AtomSet;
use crate::core::data::selection::AtomSelection;
use crate::core::lang::table::ids;
use crate::core::model::structure::Structure;
use crate::engine::compiler::{Arguments, RuntimeTable};
use crate::engine::environment::Environment;
use crate::engine::error::QueryError;
use crate::engine::value::Value;

fn eval_selections(
    args: &Arguments,
    env: &mut Environment<'_>,
    id: &str,
) -> Result<Vec<AtomSelection>, QueryError> {
    let mut selections = Vec::with_capacity(args.positional_count());
    for i in 0..args.positional_count() {
        selections.push(args.eval_pos(env, i)?.as_selection(id)?);
    }
    Ok(selections)
}

fn intersect(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selections = eval_selections(args, env, ids::COMB_INTERSECT)?;
    let universe = env.structure.atom_count();

    let mut iter = selections.iter();
    let first = iter
        .next()
        .ok_or_else(|| QueryError::Internal("core.combinator.intersect: no arguments".into()))?;
    let mut atoms: Vec<usize> = first.to_atom_set().indices().to_vec();
    for selection in iter {
        let mask = selection.mask(universe);
        atoms.retain(|&a| mask.has(a));
        if atoms.is_empty() {
            break;
        }
    }
    if atoms.is_empty() {
        return Ok(Value::Selection(AtomSelection::empty()));
    }
    Ok(Value::Selection(AtomSelection::new(vec![AtomSet::new(atoms)])))
}

fn merge(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let selections = eval_selections(args, env, ids::COMB_MERGE)?;
    let mut builder = AtomSelection::unique_builder();
    for selection in selections {
        for set in selection.sets() {
            builder.add(set.clone());
        }
    }
    Ok(Value::Selection(builder.build()))
}

/// Depth-first search for one set per selection whose pairwise distances fit
/// the matrix bounds. Row `i`, column `j` with `i < j` is the maximal
/// distance between picks `i` and `j`; the mirrored entry is the minimal one.
fn assign_cluster(
    structure: &Structure,
    matrix: &[Vec<f64>],
    selections: &[AtomSelection],
    picks: &mut Vec<AtomSet>,
    out: &mut Vec<Vec<AtomSet>>,
) {
    let depth = picks.len();
    if depth == selections.len() {
        out.push(picks.clone());
        return;
    }
    'candidates: for candidate in selections[depth].sets() {
        for (i, earlier) in picks.iter().enumerate() {
            let distance = AtomSet::distance(structure, earlier, candidate);
            let (lo, hi) = (matrix[depth][i], matrix[i][depth]);
            if !(distance >= lo && distance <= hi) {
                continue 'candidates;
            }
        }
        picks.push(candidate.clone());
        assign_cluster(structure, matrix, selections, picks, out);
        picks.pop();
    }
}

fn distance_cluster(args: &Arguments, env: &mut Environment<'_>) -> Result<Value, QueryError> {
    let matrix_value = args
        .eval_named(env, "matrix")?
        .as_list(ids::COMB_DISTANCE_CLUSTER)?;
    let selections_value = args
        .eval_named(env, "selections")?
        .as_list(ids::COMB_DISTANCE_CLUSTER)?;

    let mut matrix = Vec::with_capacity(matrix_value.len());
    for row in matrix_value.iter() {
        let row = row.as_list(ids::COMB_DISTANCE_CLUSTER)?;
        let mut numbers = Vec::with_capacity(row.len());
        for cell in row.iter() {
            numbers.push(cell.as_number(ids::COMB_DISTANCE_CLUSTER)?);
        }
        matrix.push(numbers);
    }
    let mut selections = Vec::with_capacity(selections_value.len());
    for value in selections_value.iter() {
        selections.push(value.as_selection(ids::COMB_DISTANCE_CLUSTER)?);
    }

    if matrix.len() != selections.len() || matrix.iter().any(|row| row.len() != selections.len()) {
        return Err(QueryError::Internal(format!(
            "{}: matrix must be square with one row per selection",
            ids::COMB_DISTANCE_CLUSTER
        )));
    }

    let mut assignments = Vec::new();
    let mut picks = Vec::new();
    assign_cluster(env.structure, &matrix, &selections, &mut picks, &mut assignments);

    let mut builder = AtomSelection::unique_builder();
    for assignment in assignments {
        let mut atoms = Vec::new();
        for set in assignment {
            atoms.extend_from_slice(set.indices());
        }
        builder.add(AtomSet::new(atoms));
    }
    Ok(Value::Selection(builder.build()))
}

pub fn register(table: &mut RuntimeTable) -> Result<(), QueryError> {
    table.register(ids::COMB_INTERSECT, intersect)?;
    table.register(ids::COMB_MERGE, merge)?;
    table.register(ids::COMB_DISTANCE_CLUSTER, distance_cluster)?;
    Ok(())
}
