use crate::core::lang::expression::{ArgKey, Expression, Literal};
use crate::core::lang::symbol::{ArgumentEntry, ArgumentSpec, SymbolTable};
use crate::core::lang::types::{BOOL, NUMBER, STRING, Type};
use crate::engine::error::QueryError;

/// Validates an expression tree against a symbol table and returns its type.
///
/// Every application is checked for a known head, complete required
/// arguments, no unknown arguments, and argument types assignable to the
/// declared signature. Checking is purely structural; no evaluation happens.
pub fn check(table: &SymbolTable, expression: &Expression) -> Result<Type, QueryError> {
    match expression {
        Expression::Literal(literal) => Ok(literal_type(literal)),
        Expression::Apply(apply) => {
            let symbol = table
                .get(&apply.head)
                .ok_or_else(|| QueryError::SymbolNotFound(apply.head.clone()))?;

            // BTreeMap iteration yields positions in ascending order, so a
            // simple counter detects gaps.
            let mut next_position = 0;
            for key in apply.args.keys() {
                if let ArgKey::Position(index) = key {
                    if *index != next_position {
                        return Err(type_error(
                            &apply.head,
                            &index.to_string(),
                            "positional arguments must be contiguous from 0",
                        ));
                    }
                    next_position += 1;
                }
            }

            match &symbol.arguments {
                ArgumentSpec::List { element, non_empty } => {
                    if *non_empty && apply.args.is_empty() {
                        return Err(type_error(
                            &apply.head,
                            "0",
                            "at least one argument is required",
                        ));
                    }
                    for (key, value) in &apply.args {
                        if let ArgKey::Name(name) = key {
                            return Err(type_error(
                                &apply.head,
                                name,
                                "symbol takes positional arguments only",
                            ));
                        }
                        check_assignable(table, &apply.head, key, element, value)?;
                    }
                }
                ArgumentSpec::Dictionary(entries) => {
                    for (key, value) in &apply.args {
                        let entry = resolve_entry(entries, key).ok_or_else(|| {
                            type_error(&apply.head, &key.to_string(), "unknown argument")
                        })?;
                        check_assignable(table, &apply.head, key, &entry.ty, value)?;
                    }
                    for entry in entries {
                        if entry.optional || apply.args.contains_key(&entry.key) {
                            continue;
                        }
                        return Err(type_error(
                            &apply.head,
                            &entry.key.to_string(),
                            "required argument is missing",
                        ));
                    }
                }
            }

            Ok(symbol.return_type.clone())
        }
    }
}

pub fn literal_type(literal: &Literal) -> Type {
    match literal {
        Literal::Bool(_) => BOOL,
        Literal::Number(_) => NUMBER,
        Literal::Str(_) => STRING,
    }
}

/// Maps a provided argument key onto its signature entry. A trailing rest
/// entry declared at position `k` absorbs every position at or beyond `k`.
fn resolve_entry<'a>(entries: &'a [ArgumentEntry], key: &ArgKey) -> Option<&'a ArgumentEntry> {
    if let Some(entry) = entries.iter().find(|entry| entry.key == *key) {
        return Some(entry);
    }
    if let ArgKey::Position(index) = key {
        return entries.iter().find(|entry| {
            entry.rest
                && matches!(entry.key, ArgKey::Position(start) if start <= *index)
        });
    }
    None
}

fn check_assignable(
    table: &SymbolTable,
    head: &str,
    key: &ArgKey,
    expected: &Type,
    value: &Expression,
) -> Result<(), QueryError> {
    let actual = check(table, value)?;
    if expected.is_assignable_from(&actual) {
        return Ok(());
    }
    Err(type_error(
        head,
        &key.to_string(),
        &format!("expected {}, got {}", expected, actual),
    ))
}

fn type_error(symbol: &str, argument: &str, message: &str) -> QueryError {
    QueryError::Type {
        symbol: symbol.to_string(),
        argument: argument.to_string(),
        message: message.to_string(),
    }
}
