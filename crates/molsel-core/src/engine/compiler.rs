use crate::core::lang::expression::{ArgKey, Expression, Literal};
use crate::core::lang::symbol::{ArgumentSpec, SymbolTable};
use crate::engine::environment::Environment;
use crate::engine::error::QueryError;
use crate::engine::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A compiled expression: a shareable closure over the evaluation
/// environment.
///
/// Evaluation is lazy throughout; a compiled argument runs only when the
/// symbol implementation holding it decides to invoke it, which is what
/// makes short-circuiting logic and per-element tests work.
#[derive(Clone)]
pub struct CompiledExpression {
    run: Arc<dyn for<'a> Fn(&mut Environment<'a>) -> Result<Value, QueryError> + Send + Sync>,
}

impl CompiledExpression {
    pub fn new(
        run: impl for<'a> Fn(&mut Environment<'a>) -> Result<Value, QueryError>
        + Send
        + Sync
        + 'static,
    ) -> CompiledExpression {
        CompiledExpression { run: Arc::new(run) }
    }

    pub fn constant(value: Value) -> CompiledExpression {
        CompiledExpression::new(move |_| Ok(value.clone()))
    }

    pub fn eval(&self, env: &mut Environment<'_>) -> Result<Value, QueryError> {
        (self.run)(env)
    }
}

impl std::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CompiledExpression")
    }
}

/// The compiled arguments handed to a symbol implementation.
///
/// Positional arguments are contiguous from zero; named arguments with a
/// declared default are materialized at compile time, so implementations may
/// treat them as always present.
#[derive(Debug, Default)]
pub struct Arguments {
    positional: Vec<CompiledExpression>,
    named: HashMap<String, CompiledExpression>,
    explicit: HashSet<String>,
}

impl Arguments {
    pub fn positional_count(&self) -> usize {
        self.positional.len()
    }

    pub fn pos(&self, index: usize) -> Result<&CompiledExpression, QueryError> {
        self.positional
            .get(index)
            .ok_or_else(|| QueryError::Internal(format!("missing positional argument {}", index)))
    }

    pub fn named(&self, name: &str) -> Option<&CompiledExpression> {
        self.named.get(name)
    }

    /// Whether a named argument was written in the query, as opposed to
    /// materialized from the symbol's declared default.
    pub fn is_explicit(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    pub fn require(&self, name: &str) -> Result<&CompiledExpression, QueryError> {
        self.named
            .get(name)
            .ok_or_else(|| QueryError::Internal(format!("missing named argument '{}'", name)))
    }

    pub fn eval_pos(&self, env: &mut Environment<'_>, index: usize) -> Result<Value, QueryError> {
        self.pos(index)?.eval(env)
    }

    pub fn eval_named(&self, env: &mut Environment<'_>, name: &str) -> Result<Value, QueryError> {
        self.require(name)?.eval(env)
    }

    pub fn eval_named_opt(
        &self,
        env: &mut Environment<'_>,
        name: &str,
    ) -> Result<Option<Value>, QueryError> {
        match self.named.get(name) {
            Some(arg) => Ok(Some(arg.eval(env)?)),
            None => Ok(None),
        }
    }
}

/// The body of one symbol: invoked with its compiled arguments and the
/// evaluation environment.
pub type SymbolImpl =
    Arc<dyn for<'a> Fn(&Arguments, &mut Environment<'a>) -> Result<Value, QueryError> + Send + Sync>;

/// Registry mapping symbol ids to their runtime bodies.
///
/// Populated once at startup, mirroring the declarations in the symbol
/// table. A declared symbol without a body is reported at compile time as
/// [`QueryError::RuntimeNotImplemented`], not at evaluation time.
#[derive(Default)]
pub struct RuntimeTable {
    bodies: HashMap<String, SymbolImpl>,
}

impl RuntimeTable {
    pub fn new() -> RuntimeTable {
        RuntimeTable::default()
    }

    pub fn register(
        &mut self,
        id: &str,
        body: impl for<'a> Fn(&Arguments, &mut Environment<'a>) -> Result<Value, QueryError>
        + Send
        + Sync
        + 'static,
    ) -> Result<(), QueryError> {
        if self.bodies.contains_key(id) {
            return Err(QueryError::Internal(format!(
                "runtime body for '{}' is already registered",
                id
            )));
        }
        self.bodies.insert(id.to_string(), Arc::new(body));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SymbolImpl> {
        self.bodies.get(id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl std::fmt::Debug for RuntimeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeTable")
            .field("bodies", &self.bodies.len())
            .finish()
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) => Value::str(s),
    }
}

/// Compiles an expression tree into an executable closure.
///
/// The tree is assumed to have passed [`check`](crate::engine::check::check);
/// symbol and body lookups still fail cleanly here so that compiling an
/// unchecked tree cannot panic.
pub fn compile(
    symbols: &SymbolTable,
    runtime: &RuntimeTable,
    expression: &Expression,
) -> Result<CompiledExpression, QueryError> {
    match expression {
        Expression::Literal(literal) => Ok(CompiledExpression::constant(literal_value(literal))),
        Expression::Apply(apply) => {
            let symbol = symbols
                .get(&apply.head)
                .ok_or_else(|| QueryError::SymbolNotFound(apply.head.clone()))?;
            let body = runtime
                .get(&apply.head)
                .ok_or_else(|| QueryError::RuntimeNotImplemented(apply.head.clone()))?
                .clone();

            let mut args = Arguments::default();
            for (key, value) in &apply.args {
                let compiled = compile(symbols, runtime, value)?;
                match key {
                    ArgKey::Position(_) => args.positional.push(compiled),
                    ArgKey::Name(name) => {
                        args.named.insert(name.clone(), compiled);
                        args.explicit.insert(name.clone());
                    }
                }
            }
            if let ArgumentSpec::Dictionary(entries) = &symbol.arguments {
                for entry in entries {
                    let ArgKey::Name(name) = &entry.key else {
                        continue;
                    };
                    if args.named.contains_key(name) {
                        continue;
                    }
                    if let Some(default) = &entry.default {
                        args.named.insert(
                            name.clone(),
                            CompiledExpression::constant(literal_value(default)),
                        );
                    }
                }
            }

            Ok(CompiledExpression::new(move |env| body(&args, env)))
        }
    }
}
