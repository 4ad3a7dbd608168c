use super::expression::Literal;
use super::symbol::{ArgumentEntry, ArgumentSpec, RegistrationError, Symbol, SymbolTable};
use super::types::{ATOM_SELECTION, BOOL, NUMBER, REGEX, STRING, Type};

/// Symbol ids of the built-in language.
///
/// Kept as constants so the declaration table and the runtime registrations
/// cannot drift apart.
pub mod ids {
    pub const TYPE_BOOL: &str = "core.type.bool";
    pub const TYPE_NUM: &str = "core.type.num";
    pub const TYPE_STR: &str = "core.type.str";
    pub const TYPE_REGEX: &str = "core.type.regex";
    pub const TYPE_LIST: &str = "core.type.list";
    pub const TYPE_SET: &str = "core.type.set";

    pub const LOGIC_NOT: &str = "core.logic.not";
    pub const LOGIC_AND: &str = "core.logic.and";
    pub const LOGIC_OR: &str = "core.logic.or";

    pub const REL_EQ: &str = "core.rel.eq";
    pub const REL_NEQ: &str = "core.rel.neq";
    pub const REL_LT: &str = "core.rel.lt";
    pub const REL_LTE: &str = "core.rel.lte";
    pub const REL_GR: &str = "core.rel.gr";
    pub const REL_GRE: &str = "core.rel.gre";
    pub const REL_IN_RANGE: &str = "core.rel.in-range";

    pub const CTRL_IF: &str = "core.ctrl.if";

    pub const MATH_ADD: &str = "core.math.add";
    pub const MATH_SUB: &str = "core.math.sub";
    pub const MATH_MULT: &str = "core.math.mult";
    pub const MATH_DIV: &str = "core.math.div";
    pub const MATH_MOD: &str = "core.math.mod";
    pub const MATH_POW: &str = "core.math.pow";
    pub const MATH_MIN: &str = "core.math.min";
    pub const MATH_MAX: &str = "core.math.max";
    pub const MATH_FLOOR: &str = "core.math.floor";
    pub const MATH_CEIL: &str = "core.math.ceil";
    pub const MATH_ROUND: &str = "core.math.round";
    pub const MATH_ABS: &str = "core.math.abs";
    pub const MATH_SQRT: &str = "core.math.sqrt";

    pub const STR_CONCAT: &str = "core.str.concat";
    pub const STR_MATCH: &str = "core.str.match";

    pub const SET_HAS: &str = "core.set.has";

    pub const GEN_ATOM_GROUPS: &str = "structure.generator.atom-groups";
    pub const GEN_QUERY_IN_SELECTION: &str = "structure.generator.query-in-selection";
    pub const GEN_RINGS: &str = "structure.generator.rings";
    pub const GEN_EMPTY: &str = "structure.generator.empty";

    pub const MOD_QUERY_EACH: &str = "structure.modifier.query-each";
    pub const MOD_INTERSECT_BY: &str = "structure.modifier.intersect-by";
    pub const MOD_EXCEPT_BY: &str = "structure.modifier.except-by";
    pub const MOD_UNION_BY: &str = "structure.modifier.union-by";
    pub const MOD_UNION: &str = "structure.modifier.union";
    pub const MOD_CLUSTER: &str = "structure.modifier.cluster";
    pub const MOD_INCLUDE_SURROUNDINGS: &str = "structure.modifier.include-surroundings";
    pub const MOD_INCLUDE_CONNECTED: &str = "structure.modifier.include-connected";
    pub const MOD_EXPAND_PROPERTY: &str = "structure.modifier.expand-property";

    pub const FILTER_PICK: &str = "structure.filter.pick";
    pub const FILTER_SAME_PROPERTIES: &str = "structure.filter.with-same-atom-properties";
    pub const FILTER_INTERSECTED_BY: &str = "structure.filter.intersected-by";
    pub const FILTER_WITHIN: &str = "structure.filter.within";
    pub const FILTER_IS_CONNECTED_TO: &str = "structure.filter.is-connected-to";

    pub const COMB_INTERSECT: &str = "structure.combinator.intersect";
    pub const COMB_MERGE: &str = "structure.combinator.merge";
    pub const COMB_DISTANCE_CLUSTER: &str = "structure.combinator.distance-cluster";

    pub const ATOM_SET_ATOM_COUNT: &str = "structure.atom-set.atom-count";
    pub const ATOM_SET_COUNT_QUERY: &str = "structure.atom-set.count-query";
    pub const ATOM_SET_REDUCE: &str = "structure.atom-set.reduce";
    pub const ATOM_SET_PROPERTY_SET: &str = "structure.atom-set.property-set";

    pub const SLOT_ACCUMULATOR: &str = "structure.slot.accumulator";

    pub const PROP_ATOM_KEY: &str = "structure.atom-property.atom-key";
    pub const PROP_X: &str = "structure.atom-property.x";
    pub const PROP_Y: &str = "structure.atom-property.y";
    pub const PROP_Z: &str = "structure.atom-property.z";
    pub const PROP_ELEMENT_SYMBOL: &str = "structure.atom-property.element-symbol";
    pub const PROP_VDW: &str = "structure.atom-property.vdw";
    pub const PROP_MASS: &str = "structure.atom-property.mass";
    pub const PROP_ATOMIC_NUMBER: &str = "structure.atom-property.atomic-number";
    pub const PROP_LABEL_ATOM_ID: &str = "structure.atom-property.label_atom_id";
    pub const PROP_LABEL_COMP_ID: &str = "structure.atom-property.label_comp_id";
    pub const PROP_LABEL_ASYM_ID: &str = "structure.atom-property.label_asym_id";
    pub const PROP_LABEL_SEQ_ID: &str = "structure.atom-property.label_seq_id";
    pub const PROP_AUTH_COMP_ID: &str = "structure.atom-property.auth_comp_id";
    pub const PROP_AUTH_ASYM_ID: &str = "structure.atom-property.auth_asym_id";
    pub const PROP_AUTH_SEQ_ID: &str = "structure.atom-property.auth_seq_id";
    pub const PROP_RESIDUE_KEY: &str = "structure.atom-property.residue-key";
    pub const PROP_CHAIN_KEY: &str = "structure.atom-property.chain-key";
    pub const PROP_ENTITY_KEY: &str = "structure.atom-property.entity-key";
    pub const PROP_ENTITY_TYPE: &str = "structure.atom-property.entity-type";
    pub const PROP_OCCUPANCY: &str = "structure.atom-property.occupancy";
    pub const PROP_B_FACTOR: &str = "structure.atom-property.B_iso_or_equiv";
    pub const PROP_CUSTOM: &str = "structure.atom-property.custom";

    pub const BOND_PROP_ORDER: &str = "structure.bond-property.order";
}

fn scalar() -> Type {
    Type::scalar()
}

fn selection_arg(index: usize) -> ArgumentEntry {
    ArgumentEntry::positional(index, ATOM_SELECTION)
}

fn binary(a: Type, b: Type) -> ArgumentSpec {
    ArgumentSpec::dictionary(vec![
        ArgumentEntry::positional(0, a),
        ArgumentEntry::positional(1, b),
    ])
}

fn unary(a: Type) -> ArgumentSpec {
    ArgumentSpec::dictionary(vec![ArgumentEntry::positional(0, a)])
}

fn register_core(table: &mut SymbolTable) -> Result<(), RegistrationError> {
    use ids::*;

    let value = || Type::variable("v", Type::Any);
    let comparable = || Type::variable("a", scalar());

    for (id, desc) in [
        (TYPE_BOOL, "Converts a value to a boolean."),
        (TYPE_NUM, "Converts a value to a number."),
        (TYPE_STR, "Converts a value to a string."),
    ] {
        let ret = match id {
            TYPE_BOOL => BOOL,
            TYPE_NUM => NUMBER,
            _ => STRING,
        };
        table.register(Symbol::new(id, unary(value()), ret).stat().describe(desc))?;
    }
    table.register(
        Symbol::new(
            TYPE_REGEX,
            ArgumentSpec::dictionary(vec![
                ArgumentEntry::positional(0, STRING).describe("pattern"),
                ArgumentEntry::positional(1, STRING)
                    .optional()
                    .describe("flags, e.g. 'i' for case-insensitive"),
            ]),
            REGEX,
        )
        .stat()
        .describe("Compiles a regular expression."),
    )?;
    table.register(
        Symbol::new(
            TYPE_LIST,
            ArgumentSpec::list(value()),
            Type::list_of(Type::Any),
        )
        .stat()
        .describe("Builds a list from its arguments."),
    )?;
    table.register(
        Symbol::new(
            TYPE_SET,
            ArgumentSpec::list(comparable()),
            Type::set_of(scalar()),
        )
        .stat()
        .describe("Builds a set from its arguments."),
    )?;

    table.register(Symbol::new(LOGIC_NOT, unary(BOOL), BOOL).stat())?;
    table.register(Symbol::new(LOGIC_AND, ArgumentSpec::non_empty_list(BOOL), BOOL).stat())?;
    table.register(Symbol::new(LOGIC_OR, ArgumentSpec::non_empty_list(BOOL), BOOL).stat())?;

    table.register(Symbol::new(REL_EQ, binary(comparable(), comparable()), BOOL).stat())?;
    table.register(Symbol::new(REL_NEQ, binary(comparable(), comparable()), BOOL).stat())?;
    for id in [REL_LT, REL_LTE, REL_GR, REL_GRE] {
        table.register(Symbol::new(id, binary(NUMBER, NUMBER), BOOL).stat())?;
    }
    table.register(
        Symbol::new(
            REL_IN_RANGE,
            ArgumentSpec::dictionary(vec![
                ArgumentEntry::positional(0, NUMBER).describe("value"),
                ArgumentEntry::positional(1, NUMBER).describe("inclusive minimum"),
                ArgumentEntry::positional(2, NUMBER).describe("inclusive maximum"),
            ]),
            BOOL,
        )
        .stat(),
    )?;

    table.register(
        Symbol::new(
            CTRL_IF,
            ArgumentSpec::dictionary(vec![
                ArgumentEntry::positional(0, BOOL).describe("condition"),
                ArgumentEntry::positional(1, value()).describe("if-true"),
                ArgumentEntry::positional(2, value()).describe("if-false"),
            ]),
            Type::Any,
        )
        .stat()
        .describe("Lazy conditional; only the taken branch is evaluated."),
    )?;

    for id in [MATH_ADD, MATH_SUB, MATH_MULT, MATH_MIN, MATH_MAX] {
        table.register(Symbol::new(id, ArgumentSpec::non_empty_list(NUMBER), NUMBER).stat())?;
    }
    for id in [MATH_DIV, MATH_MOD, MATH_POW] {
        table.register(Symbol::new(id, binary(NUMBER, NUMBER), NUMBER).stat())?;
    }
    for id in [MATH_FLOOR, MATH_CEIL, MATH_ROUND, MATH_ABS, MATH_SQRT] {
        table.register(Symbol::new(id, unary(NUMBER), NUMBER).stat())?;
    }

    table.register(Symbol::new(STR_CONCAT, ArgumentSpec::non_empty_list(scalar()), STRING).stat())?;
    table.register(Symbol::new(STR_MATCH, binary(REGEX, STRING), BOOL).stat())?;
    table.register(Symbol::new(SET_HAS, binary(Type::set_of(scalar()), comparable()), BOOL).stat())?;

    Ok(())
}

fn register_structure(table: &mut SymbolTable) -> Result<(), RegistrationError> {
    use ids::*;

    table.register(
        Symbol::new(
            GEN_ATOM_GROUPS,
            ArgumentSpec::dictionary(vec![
                ArgumentEntry::named("entity-test", BOOL)
                    .default_value(Literal::Bool(true))
                    .describe("Test applied at the entity level."),
                ArgumentEntry::named("chain-test", BOOL)
                    .default_value(Literal::Bool(true))
                    .describe("Test applied at the chain level."),
                ArgumentEntry::named("residue-test", BOOL)
                    .default_value(Literal::Bool(true))
                    .describe("Test applied at the residue level."),
                ArgumentEntry::named("atom-test", BOOL)
                    .default_value(Literal::Bool(true))
                    .describe("Test applied to each visible atom."),
                ArgumentEntry::named("group-by", Type::scalar())
                    .optional()
                    .describe("Grouping key; defaults to one group per atom."),
            ]),
            ATOM_SELECTION,
        )
        .describe("Enumerates the structural hierarchy, collecting passing atoms into groups."),
    )?;
    table.register(
        Symbol::new(
            GEN_QUERY_IN_SELECTION,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("query", ATOM_SELECTION)
                    .describe("Query evaluated inside the narrowed universe."),
                ArgumentEntry::named("in-complement", BOOL).default_value(Literal::Bool(false)),
            ]),
            ATOM_SELECTION,
        )
        .describe("Evaluates a query with the universe restricted to a selection or its complement."),
    )?;
    table.register(
        Symbol::new(GEN_RINGS, ArgumentSpec::none(), ATOM_SELECTION)
            .describe("Finds closed bonded cycles."),
    )?;
    table.register(Symbol::new(GEN_EMPTY, ArgumentSpec::none(), ATOM_SELECTION))?;

    table.register(
        Symbol::new(
            MOD_QUERY_EACH,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("query", ATOM_SELECTION),
            ]),
            ATOM_SELECTION,
        )
        .describe("Evaluates a query inside each atom set, concatenating unique results."),
    )?;
    for (id, desc) in [
        (MOD_INTERSECT_BY, "Keeps only atoms present in the 'by' selection."),
        (MOD_EXCEPT_BY, "Keeps only atoms absent from the 'by' selection."),
        (MOD_UNION_BY, "Merges source sets glued together by the 'by' selection."),
    ] {
        table.register(
            Symbol::new(
                id,
                ArgumentSpec::dictionary(vec![
                    selection_arg(0),
                    ArgumentEntry::named("by", ATOM_SELECTION),
                ]),
                ATOM_SELECTION,
            )
            .describe(desc),
        )?;
    }
    table.register(
        Symbol::new(MOD_UNION, unary(ATOM_SELECTION), ATOM_SELECTION)
            .describe("Flattens a selection into a single atom set."),
    )?;
    table.register(
        Symbol::new(
            MOD_CLUSTER,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("max-distance", NUMBER),
                ArgumentEntry::named("min-distance", NUMBER).default_value(Literal::Number(0.0)),
                ArgumentEntry::named("min-size", NUMBER)
                    .default_value(Literal::Number(2.0))
                    .describe("Minimal number of sets merged into a cluster."),
                ArgumentEntry::named("max-size", NUMBER).optional(),
            ]),
            ATOM_SELECTION,
        )
        .describe("Groups atom sets into connected clusters by pairwise distance."),
    )?;
    table.register(
        Symbol::new(
            MOD_INCLUDE_SURROUNDINGS,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("radius", NUMBER),
                ArgumentEntry::named("atom-radius", NUMBER)
                    .optional()
                    .describe("Optional per-atom radius added to the query radius."),
                ArgumentEntry::named("as-whole-residues", BOOL).default_value(Literal::Bool(false)),
            ]),
            ATOM_SELECTION,
        )
        .describe("Extends each set with all atoms within the given radius."),
    )?;
    table.register(
        Symbol::new(
            MOD_INCLUDE_CONNECTED,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("bond-test", BOOL).default_value(Literal::Bool(true)),
                ArgumentEntry::named("layer-count", NUMBER).default_value(Literal::Number(1.0)),
                ArgumentEntry::named("as-whole-residues", BOOL).default_value(Literal::Bool(false)),
            ]),
            ATOM_SELECTION,
        )
        .describe("Expands each set across bonds for a fixed number of layers."),
    )?;
    table.register(
        Symbol::new(
            MOD_EXPAND_PROPERTY,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("property", Type::scalar()),
            ]),
            ATOM_SELECTION,
        )
        .describe("Adds all atoms sharing a property value with an atom already in the set."),
    )?;

    table.register(
        Symbol::new(
            FILTER_PICK,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("test", BOOL),
            ]),
            ATOM_SELECTION,
        )
        .describe("Keeps atom sets for which the test holds."),
    )?;
    table.register(
        Symbol::new(
            FILTER_SAME_PROPERTIES,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("source", ATOM_SELECTION),
                ArgumentEntry::named("property", Type::scalar()),
            ]),
            ATOM_SELECTION,
        )
        .describe("Keeps sets whose sorted property values equal those of the source."),
    )?;
    table.register(
        Symbol::new(
            FILTER_INTERSECTED_BY,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("by", ATOM_SELECTION),
                ArgumentEntry::named("invert", BOOL).default_value(Literal::Bool(false)),
            ]),
            ATOM_SELECTION,
        )
        .describe("Keeps sets sharing at least one atom with the 'by' selection."),
    )?;
    table.register(
        Symbol::new(
            FILTER_WITHIN,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("target", ATOM_SELECTION),
                ArgumentEntry::named("max-radius", NUMBER),
                ArgumentEntry::named("min-radius", NUMBER).default_value(Literal::Number(0.0)),
                ArgumentEntry::named("invert", BOOL).default_value(Literal::Bool(false)),
            ]),
            ATOM_SELECTION,
        )
        .describe("Keeps sets within a distance range of the target selection."),
    )?;
    table.register(
        Symbol::new(
            FILTER_IS_CONNECTED_TO,
            ArgumentSpec::dictionary(vec![
                selection_arg(0),
                ArgumentEntry::named("target", ATOM_SELECTION),
                ArgumentEntry::named("bond-test", BOOL).default_value(Literal::Bool(true)),
                ArgumentEntry::named("disjunct", BOOL)
                    .default_value(Literal::Bool(true))
                    .describe("Require target atoms strictly outside the candidate set."),
                ArgumentEntry::named("invert", BOOL).default_value(Literal::Bool(false)),
            ]),
            ATOM_SELECTION,
        )
        .describe("Keeps sets bonded to the target selection."),
    )?;

    table.register(
        Symbol::new(
            COMB_INTERSECT,
            ArgumentSpec::non_empty_list(ATOM_SELECTION),
            ATOM_SELECTION,
        )
        .describe("Atoms common to every input selection, as a single set."),
    )?;
    table.register(
        Symbol::new(
            COMB_MERGE,
            ArgumentSpec::non_empty_list(ATOM_SELECTION),
            ATOM_SELECTION,
        )
        .describe("Unique concatenation of the input selections' sets."),
    )?;
    table.register(
        Symbol::new(
            COMB_DISTANCE_CLUSTER,
            ArgumentSpec::dictionary(vec![
                ArgumentEntry::named("matrix", Type::list_of(Type::list_of(NUMBER)))
                    .describe("Pairwise distance bounds; upper triangle max, lower triangle min."),
                ArgumentEntry::named("selections", Type::list_of(ATOM_SELECTION)),
            ]),
            ATOM_SELECTION,
        )
        .describe("Clusters one set from each selection under a pairwise distance matrix."),
    )?;

    table.register(Symbol::new(ATOM_SET_ATOM_COUNT, ArgumentSpec::none(), NUMBER))?;
    table.register(
        Symbol::new(ATOM_SET_COUNT_QUERY, unary(ATOM_SELECTION), NUMBER)
            .describe("Counts the sets a query yields inside the current atom set."),
    )?;
    table.register(
        Symbol::new(
            ATOM_SET_REDUCE,
            ArgumentSpec::dictionary(vec![
                ArgumentEntry::named("initial", Type::scalar()),
                ArgumentEntry::named("value", Type::scalar())
                    .describe("Evaluated per atom; reads the accumulator slot."),
            ]),
            Type::scalar(),
        )
        .describe("Folds a value over the atoms of the current atom set."),
    )?;
    table.register(
        Symbol::new(
            ATOM_SET_PROPERTY_SET,
            ArgumentSpec::dictionary(vec![ArgumentEntry::positional(0, Type::scalar())]),
            Type::set_of(Type::scalar()),
        )
        .describe("Distinct property values over the current atom set."),
    )?;

    table.register(
        Symbol::new(SLOT_ACCUMULATOR, ArgumentSpec::none(), Type::scalar())
            .describe("Current value of the reduce accumulator."),
    )?;

    for id in [
        PROP_ATOM_KEY,
        PROP_X,
        PROP_Y,
        PROP_Z,
        PROP_VDW,
        PROP_MASS,
        PROP_ATOMIC_NUMBER,
        PROP_LABEL_SEQ_ID,
        PROP_AUTH_SEQ_ID,
        PROP_RESIDUE_KEY,
        PROP_CHAIN_KEY,
        PROP_ENTITY_KEY,
        PROP_OCCUPANCY,
        PROP_B_FACTOR,
    ] {
        table.register(Symbol::new(id, ArgumentSpec::none(), NUMBER))?;
    }
    for id in [
        PROP_ELEMENT_SYMBOL,
        PROP_LABEL_ATOM_ID,
        PROP_LABEL_COMP_ID,
        PROP_LABEL_ASYM_ID,
        PROP_AUTH_COMP_ID,
        PROP_AUTH_ASYM_ID,
        PROP_ENTITY_TYPE,
    ] {
        table.register(Symbol::new(id, ArgumentSpec::none(), STRING))?;
    }
    table.register(
        Symbol::new(PROP_CUSTOM, unary(STRING), Type::scalar())
            .describe("Reads a named custom per-atom property column."),
    )?;

    table.register(Symbol::new(BOND_PROP_ORDER, ArgumentSpec::none(), NUMBER))?;

    Ok(())
}

/// Builds the symbol table of the built-in language.
pub fn default_symbols() -> Result<SymbolTable, RegistrationError> {
    let mut table = SymbolTable::new();
    register_core(&mut table)?;
    register_structure(&mut table)?;
    tracing::debug!(symbols = table.len(), "built default symbol table");
    Ok(table)
}
