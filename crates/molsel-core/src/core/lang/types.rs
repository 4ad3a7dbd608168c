use std::fmt;

/// Describes the kind of value a symbol argument or return position accepts.
///
/// Types form a small structural lattice rather than a nominal hierarchy:
/// compatibility is decided by [`Type::is_assignable_from`], with `Any` acting
/// as the top element and unions matching when any member matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Matches every value.
    Any,
    /// A named primitive value type (e.g. "bool", "number", "string").
    Value(&'static str),
    /// A named type variable constrained by a bound.
    Variable {
        name: &'static str,
        bound: Box<Type>,
    },
    /// A homogeneous container (e.g. "list", "set") over an element type.
    Container {
        name: &'static str,
        element: Box<Type>,
    },
    /// Matches when any of the member types match.
    Union(Vec<Type>),
}

pub const BOOL: Type = Type::Value("bool");
pub const NUMBER: Type = Type::Value("number");
pub const STRING: Type = Type::Value("string");
pub const REGEX: Type = Type::Value("regex");
pub const ATOM_SELECTION: Type = Type::Value("atom-selection");

impl Type {
    pub fn variable(name: &'static str, bound: Type) -> Type {
        Type::Variable {
            name,
            bound: Box::new(bound),
        }
    }

    pub fn list_of(element: Type) -> Type {
        Type::Container {
            name: "list",
            element: Box::new(element),
        }
    }

    pub fn set_of(element: Type) -> Type {
        Type::Container {
            name: "set",
            element: Box::new(element),
        }
    }

    pub fn union(types: Vec<Type>) -> Type {
        Type::Union(types)
    }

    /// A union of the scalar value types, used for grouping keys and
    /// property values.
    pub fn scalar() -> Type {
        Type::Union(vec![BOOL, NUMBER, STRING])
    }

    /// Checks whether a value of type `actual` may be supplied where `self`
    /// is expected.
    ///
    /// `Any` on either side matches everything; variables are transparent and
    /// compare through their bound; a union on either side matches if any of
    /// its members do.
    pub fn is_assignable_from(&self, actual: &Type) -> bool {
        match (self, actual) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Variable { bound, .. }, _) => bound.is_assignable_from(actual),
            (_, Type::Variable { bound, .. }) => self.is_assignable_from(bound),
            (Type::Union(members), _) => members.iter().any(|m| m.is_assignable_from(actual)),
            (_, Type::Union(members)) => members.iter().any(|m| self.is_assignable_from(m)),
            (
                Type::Container { name, element },
                Type::Container {
                    name: other_name,
                    element: other_element,
                },
            ) => name == other_name && element.is_assignable_from(other_element),
            (Type::Value(name), Type::Value(other)) => name == other,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "?"),
            Type::Value(name) => write!(f, "{}", name),
            Type::Variable { name, bound } => write!(f, "{}: {}", name, bound),
            Type::Container { name, element } => write!(f, "{}<{}>", name, element),
            Type::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "({})", parts.join(" | "))
            }
        }
    }
}
