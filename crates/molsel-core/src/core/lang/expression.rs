use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A literal value appearing as a leaf of an expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Str(String),
}

/// Identifies an argument position within an application node.
///
/// Positional arguments use ascending indices; named arguments use the
/// parameter names declared by the symbol's signature. The ordering places
/// all positions before all names, so argument iteration is deterministic.
/// Serialized as a plain string key ("0", "1", ... or the name), so argument
/// maps stay valid JSON objects.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgKey {
    Position(usize),
    Name(String),
}

impl ArgKey {
    fn parse(s: &str) -> ArgKey {
        match s.parse::<usize>() {
            Ok(i) => ArgKey::Position(i),
            Err(_) => ArgKey::Name(s.to_string()),
        }
    }
}

impl Serialize for ArgKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArgKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ArgKey::parse(&s))
    }
}

impl fmt::Display for ArgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKey::Position(i) => write!(f, "{}", i),
            ArgKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// An immutable symbolic expression tree.
///
/// An expression is either a [`Literal`] or the application of a symbol id to
/// a keyed set of sub-expressions. Trees are constructed through
/// [`Expression::apply`] and never mutated afterwards; there are no
/// back-references, so sharing a tree between evaluations is safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expression {
    Literal(Literal),
    Apply(Apply),
}

/// Application of a symbol to its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apply {
    pub head: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<ArgKey, Expression>,
}

impl Expression {
    pub fn bool(value: bool) -> Expression {
        Expression::Literal(Literal::Bool(value))
    }

    pub fn number(value: f64) -> Expression {
        Expression::Literal(Literal::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Expression {
        Expression::Literal(Literal::Str(value.into()))
    }

    /// Starts building an application of the symbol `head`.
    pub fn apply(head: impl Into<String>) -> ApplyBuilder {
        ApplyBuilder {
            head: head.into(),
            args: BTreeMap::new(),
            next_position: 0,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expression::Literal(_))
    }
}

impl From<Literal> for Expression {
    fn from(value: Literal) -> Self {
        Expression::Literal(value)
    }
}

/// Validating builder for application nodes.
///
/// Positional arguments are assigned ascending indices in the order they are
/// added; named arguments overwrite is not permitted, so a malformed tree
/// with a duplicated key cannot be represented.
#[derive(Debug)]
pub struct ApplyBuilder {
    head: String,
    args: BTreeMap<ArgKey, Expression>,
    next_position: usize,
}

impl ApplyBuilder {
    /// Appends the next positional argument.
    pub fn arg(mut self, value: impl Into<Expression>) -> Self {
        self.args
            .insert(ArgKey::Position(self.next_position), value.into());
        self.next_position += 1;
        self
    }

    /// Adds a named argument.
    ///
    /// # Panics
    ///
    /// Panics if the name was already supplied; duplicate argument keys are a
    /// construction bug, not a runtime condition.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Expression>) -> Self {
        let key = ArgKey::Name(name.into());
        if self.args.contains_key(&key) {
            panic!("duplicate argument key '{}'", key);
        }
        self.args.insert(key, value.into());
        self
    }

    pub fn build(self) -> Expression {
        Expression::Apply(Apply {
            head: self.head,
            args: self.args,
        })
    }
}

impl From<ApplyBuilder> for Expression {
    fn from(builder: ApplyBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_ascending_positions() {
        let e = Expression::apply("core.math.add")
            .arg(Expression::number(1.0))
            .arg(Expression::number(2.0))
            .build();
        match e {
            Expression::Apply(apply) => {
                assert_eq!(apply.head, "core.math.add");
                assert!(apply.args.contains_key(&ArgKey::Position(0)));
                assert!(apply.args.contains_key(&ArgKey::Position(1)));
            }
            _ => panic!("expected an application"),
        }
    }

    #[test]
    fn positional_keys_sort_before_named_keys() {
        let e = Expression::apply("f")
            .named("query", Expression::bool(true))
            .arg(Expression::number(0.0))
            .build();
        match e {
            Expression::Apply(apply) => {
                let keys: Vec<&ArgKey> = apply.args.keys().collect();
                assert_eq!(keys[0], &ArgKey::Position(0));
                assert_eq!(keys[1], &ArgKey::Name("query".to_string()));
            }
            _ => panic!("expected an application"),
        }
    }

    #[test]
    #[should_panic(expected = "duplicate argument key")]
    fn duplicate_named_argument_panics() {
        let _ = Expression::apply("f")
            .named("by", Expression::bool(true))
            .named("by", Expression::bool(false));
    }

    #[test]
    fn expression_round_trips_through_serde() {
        let e = Expression::apply("core.rel.eq")
            .arg(Expression::apply("structure.atom-property.auth_comp_id").build())
            .arg(Expression::string("ALA"))
            .build();
        let json = serde_json::to_string(&e).unwrap();
        let back: Expression = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn literal_serde_uses_plain_values() {
        let json = serde_json::to_string(&Expression::number(5.0)).unwrap();
        assert_eq!(json, "5.0");
    }
}
