use crate::core::data::selection::AtomSelection;
use crate::engine::error::QueryError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

/// A runtime value produced by evaluating a compiled expression.
///
/// Compound variants are reference counted so that evaluation can hand the
/// same value to many per-atom test invocations without copying.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
    Regex(Arc<Regex>),
    List(Arc<Vec<Value>>),
    Set(Arc<HashSet<Key>>),
    Selection(AtomSelection),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    /// Truthiness for test positions: `false`, `0`, and `NaN` are falsy,
    /// everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            _ => true,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "str",
            Value::Regex(_) => "regex",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Selection(_) => "atom-selection",
        }
    }

    pub fn as_bool(&self, context: &str) -> Result<bool, QueryError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
            other => Err(coercion_error(context, "bool", other)),
        }
    }

    pub fn as_number(&self, context: &str) -> Result<f64, QueryError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(coercion_error(context, "number", other)),
        }
    }

    pub fn as_str(&self, context: &str) -> Result<Arc<str>, QueryError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            other => Err(coercion_error(context, "str", other)),
        }
    }

    pub fn as_regex(&self, context: &str) -> Result<Arc<Regex>, QueryError> {
        match self {
            Value::Regex(r) => Ok(r.clone()),
            other => Err(coercion_error(context, "regex", other)),
        }
    }

    pub fn as_list(&self, context: &str) -> Result<Arc<Vec<Value>>, QueryError> {
        match self {
            Value::List(l) => Ok(l.clone()),
            other => Err(coercion_error(context, "list", other)),
        }
    }

    pub fn as_set(&self, context: &str) -> Result<Arc<HashSet<Key>>, QueryError> {
        match self {
            Value::Set(s) => Ok(s.clone()),
            other => Err(coercion_error(context, "set", other)),
        }
    }

    pub fn as_selection(&self, context: &str) -> Result<AtomSelection, QueryError> {
        match self {
            Value::Selection(s) => Ok(s.clone()),
            other => Err(coercion_error(context, "atom-selection", other)),
        }
    }

    /// Scalar projection usable as a hash key; `None` for compound values.
    pub fn key(&self) -> Option<Key> {
        match self {
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Number(n) => Some(Key::number(*n)),
            Value::Str(s) => Some(Key::Str(s.clone())),
            _ => None,
        }
    }
}

fn coercion_error(context: &str, expected: &str, got: &Value) -> QueryError {
    QueryError::Internal(format!(
        "{}: expected {}, got {}",
        context,
        expected,
        got.kind()
    ))
}

/// A hashable scalar value, used for set membership and grouping keys.
///
/// Numbers are keyed by their bit pattern with `-0.0` normalized to `0.0`,
/// so equal finite numbers always collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Bool(bool),
    Number(u64),
    Str(Arc<str>),
}

impl Key {
    pub fn number(n: f64) -> Key {
        let normalized = if n == 0.0 { 0.0 } else { n };
        Key::Number(normalized.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_of_scalars() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(2.5).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::str("").is_truthy());
    }

    #[test]
    fn numeric_keys_normalize_negative_zero() {
        assert_eq!(Key::number(0.0), Key::number(-0.0));
        assert_ne!(Key::number(1.0), Key::number(2.0));
    }

    #[test]
    fn bool_coerces_to_number() {
        assert_eq!(Value::Bool(true).as_number("test").unwrap(), 1.0);
        assert_eq!(Value::Bool(false).as_number("test").unwrap(), 0.0);
    }

    #[test]
    fn selection_does_not_coerce_to_scalar() {
        let value = Value::Selection(AtomSelection::empty());
        assert!(value.as_number("test").is_err());
        assert!(value.key().is_none());
    }
}
