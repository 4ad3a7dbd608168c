use super::expression::{ArgKey, Literal};
use super::types::Type;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while assembling a [`SymbolTable`].
///
/// These are configuration faults detected at startup, before any query is
/// accepted; they are never produced during evaluation.
#[derive(Debug, Error, PartialEq)]
pub enum RegistrationError {
    #[error("symbol '{0}' is already registered")]
    DuplicateSymbol(String),

    #[error("symbol '{id}': argument '{argument}' is marked rest but is not the trailing entry")]
    RestNotTrailing { id: String, argument: String },
}

/// One entry of a dictionary argument signature.
#[derive(Debug, Clone)]
pub struct ArgumentEntry {
    pub key: ArgKey,
    pub ty: Type,
    /// The argument may be omitted.
    pub optional: bool,
    /// The argument absorbs all remaining positional arguments. Must be the
    /// trailing entry of the signature.
    pub rest: bool,
    /// Value assumed by the runtime when an optional argument is omitted.
    pub default: Option<Literal>,
    pub description: &'static str,
}

impl ArgumentEntry {
    pub fn positional(index: usize, ty: Type) -> ArgumentEntry {
        ArgumentEntry {
            key: ArgKey::Position(index),
            ty,
            optional: false,
            rest: false,
            default: None,
            description: "",
        }
    }

    pub fn named(name: &str, ty: Type) -> ArgumentEntry {
        ArgumentEntry {
            key: ArgKey::Name(name.to_string()),
            ty,
            optional: false,
            rest: false,
            default: None,
            description: "",
        }
    }

    pub fn optional(mut self) -> ArgumentEntry {
        self.optional = true;
        self
    }

    pub fn rest(mut self) -> ArgumentEntry {
        self.rest = true;
        self.optional = true;
        self
    }

    pub fn default_value(mut self, value: Literal) -> ArgumentEntry {
        self.default = Some(value);
        self.optional = true;
        self
    }

    pub fn describe(mut self, description: &'static str) -> ArgumentEntry {
        self.description = description;
        self
    }
}

/// The argument shape accepted by a symbol.
#[derive(Debug, Clone)]
pub enum ArgumentSpec {
    /// A homogeneous positional list (variadic forms).
    List { element: Type, non_empty: bool },
    /// A keyed dictionary of entries, positional-by-index or named.
    Dictionary(Vec<ArgumentEntry>),
}

impl ArgumentSpec {
    pub fn none() -> ArgumentSpec {
        ArgumentSpec::Dictionary(Vec::new())
    }

    pub fn list(element: Type) -> ArgumentSpec {
        ArgumentSpec::List {
            element,
            non_empty: false,
        }
    }

    pub fn non_empty_list(element: Type) -> ArgumentSpec {
        ArgumentSpec::List {
            element,
            non_empty: true,
        }
    }

    pub fn dictionary(entries: Vec<ArgumentEntry>) -> ArgumentSpec {
        ArgumentSpec::Dictionary(entries)
    }
}

/// A symbol declaration: globally unique id, argument signature, return type
/// and descriptive metadata.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: String,
    pub arguments: ArgumentSpec,
    pub return_type: Type,
    /// A static symbol depends only on its arguments, never on the traversal
    /// cursor or slots of the evaluation environment.
    pub is_static: bool,
    pub description: &'static str,
}

impl Symbol {
    pub fn new(id: impl Into<String>, arguments: ArgumentSpec, return_type: Type) -> Symbol {
        Symbol {
            id: id.into(),
            arguments,
            return_type,
            is_static: false,
            description: "",
        }
    }

    pub fn stat(mut self) -> Symbol {
        self.is_static = true;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Symbol {
        self.description = description;
        self
    }
}

/// A flat, namespaced registry of symbol declarations.
///
/// Registered once at startup and immutable afterwards; lookup is by id.
/// Duplicate registration is a configuration error.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn register(&mut self, symbol: Symbol) -> Result<(), RegistrationError> {
        if let ArgumentSpec::Dictionary(entries) = &symbol.arguments {
            for (i, entry) in entries.iter().enumerate() {
                if entry.rest && i + 1 != entries.len() {
                    return Err(RegistrationError::RestNotTrailing {
                        id: symbol.id.clone(),
                        argument: entry.key.to_string(),
                    });
                }
            }
        }
        if self.symbols.contains_key(&symbol.id) {
            return Err(RegistrationError::DuplicateSymbol(symbol.id));
        }
        self.symbols.insert(symbol.id.clone(), symbol);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}
