use crate::core::lang::table::ids;
use crate::engine::compiler::{Arguments, RuntimeTable};
use crate::engine::environment::Environment;
use crate::engine::error::QueryError;
use crate::engine::value::{Key, Value};
use regex::RegexBuilder;
use std::collections::HashSet;
use std::sync::Arc;

fn scalar_to_string(id: &str, value: &Value) -> Result<String, QueryError> {
    match value {
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
            Ok(format!("{}", *n as i64))
        }
        Value::Number(n) => Ok(n.to_string()),
        Value::Str(s) => Ok(s.to_string()),
        other => Err(QueryError::Internal(format!(
            "{}: cannot convert {} to a string",
            id,
            other.kind()
        ))),
    }
}

fn to_number(id: &str, value: &Value) -> Result<f64, QueryError> {
    match value {
        Value::Str(s) => Ok(s.trim().parse::<f64>().unwrap_or(f64::NAN)),
        other => other.as_number(id),
    }
}

fn scalar_key(id: &str, value: &Value) -> Result<Key, QueryError> {
    value
        .key()
        .ok_or_else(|| QueryError::Internal(format!("{}: {} is not a scalar", id, value.kind())))
}

/// Scalar equality for `eq`/`neq`. Two numbers compare by IEEE 754 value,
/// so `NaN` never equals itself; everything else compares by hash key.
fn scalars_equal(id: &str, a: &Value, b: &Value) -> Result<bool, QueryError> {
    if let (Value::Number(x), Value::Number(y)) = (a, b) {
        return Ok(x == y);
    }
    Ok(scalar_key(id, a)? == scalar_key(id, b)?)
}

fn eval_numbers(
    args: &Arguments,
    env: &mut Environment<'_>,
    id: &'static str,
) -> Result<Vec<f64>, QueryError> {
    let mut numbers = Vec::with_capacity(args.positional_count());
    for i in 0..args.positional_count() {
        numbers.push(args.eval_pos(env, i)?.as_number(id)?);
    }
    Ok(numbers)
}

fn fold(
    table: &mut RuntimeTable,
    id: &'static str,
    op: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
) -> Result<(), QueryError> {
    table.register(id, move |args, env| {
        let numbers = eval_numbers(args, env, id)?;
        let mut iter = numbers.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| QueryError::Internal(format!("{}: no arguments", id)))?;
        Ok(Value::Number(iter.fold(first, &op)))
    })
}

fn binary_math(
    table: &mut RuntimeTable,
    id: &'static str,
    op: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
) -> Result<(), QueryError> {
    table.register(id, move |args, env| {
        let a = args.eval_pos(env, 0)?.as_number(id)?;
        let b = args.eval_pos(env, 1)?.as_number(id)?;
        Ok(Value::Number(op(a, b)))
    })
}

fn unary_math(
    table: &mut RuntimeTable,
    id: &'static str,
    op: impl Fn(f64) -> f64 + Send + Sync + 'static,
) -> Result<(), QueryError> {
    table.register(id, move |args, env| {
        let a = args.eval_pos(env, 0)?.as_number(id)?;
        Ok(Value::Number(op(a)))
    })
}

fn comparison(
    table: &mut RuntimeTable,
    id: &'static str,
    op: impl Fn(f64, f64) -> bool + Send + Sync + 'static,
) -> Result<(), QueryError> {
    table.register(id, move |args, env| {
        let a = args.eval_pos(env, 0)?.as_number(id)?;
        let b = args.eval_pos(env, 1)?.as_number(id)?;
        Ok(Value::Bool(op(a, b)))
    })
}

pub fn register(table: &mut RuntimeTable) -> Result<(), QueryError> {
    table.register(ids::TYPE_BOOL, |args, env| {
        Ok(Value::Bool(args.eval_pos(env, 0)?.is_truthy()))
    })?;
    table.register(ids::TYPE_NUM, |args, env| {
        let value = args.eval_pos(env, 0)?;
        Ok(Value::Number(to_number(ids::TYPE_NUM, &value)?))
    })?;
    table.register(ids::TYPE_STR, |args, env| {
        let value = args.eval_pos(env, 0)?;
        Ok(Value::str(&scalar_to_string(ids::TYPE_STR, &value)?))
    })?;
    table.register(ids::TYPE_REGEX, |args, env| {
        let pattern = args.eval_pos(env, 0)?.as_str(ids::TYPE_REGEX)?;
        let flags = if args.positional_count() > 1 {
            args.eval_pos(env, 1)?.as_str(ids::TYPE_REGEX)?.to_string()
        } else {
            String::new()
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(flags.contains('i'))
            .build()
            .map_err(|e| QueryError::Internal(format!("invalid regular expression: {}", e)))?;
        Ok(Value::Regex(Arc::new(regex)))
    })?;
    table.register(ids::TYPE_LIST, |args, env| {
        let mut values = Vec::with_capacity(args.positional_count());
        for i in 0..args.positional_count() {
            values.push(args.eval_pos(env, i)?);
        }
        Ok(Value::List(Arc::new(values)))
    })?;
    table.register(ids::TYPE_SET, |args, env| {
        let mut keys = HashSet::with_capacity(args.positional_count());
        for i in 0..args.positional_count() {
            let value = args.eval_pos(env, i)?;
            keys.insert(scalar_key(ids::TYPE_SET, &value)?);
        }
        Ok(Value::Set(Arc::new(keys)))
    })?;

    table.register(ids::LOGIC_NOT, |args, env| {
        Ok(Value::Bool(!args.eval_pos(env, 0)?.is_truthy()))
    })?;
    table.register(ids::LOGIC_AND, |args, env| {
        for i in 0..args.positional_count() {
            if !args.eval_pos(env, i)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })?;
    table.register(ids::LOGIC_OR, |args, env| {
        for i in 0..args.positional_count() {
            if args.eval_pos(env, i)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    })?;

    table.register(ids::REL_EQ, |args, env| {
        let a = args.eval_pos(env, 0)?;
        let b = args.eval_pos(env, 1)?;
        Ok(Value::Bool(scalars_equal(ids::REL_EQ, &a, &b)?))
    })?;
    table.register(ids::REL_NEQ, |args, env| {
        let a = args.eval_pos(env, 0)?;
        let b = args.eval_pos(env, 1)?;
        Ok(Value::Bool(!scalars_equal(ids::REL_NEQ, &a, &b)?))
    })?;
    comparison(table, ids::REL_LT, |a, b| a < b)?;
    comparison(table, ids::REL_LTE, |a, b| a <= b)?;
    comparison(table, ids::REL_GR, |a, b| a > b)?;
    comparison(table, ids::REL_GRE, |a, b| a >= b)?;
    table.register(ids::REL_IN_RANGE, |args, env| {
        let value = args.eval_pos(env, 0)?.as_number(ids::REL_IN_RANGE)?;
        let min = args.eval_pos(env, 1)?.as_number(ids::REL_IN_RANGE)?;
        let max = args.eval_pos(env, 2)?.as_number(ids::REL_IN_RANGE)?;
        Ok(Value::Bool(value >= min && value <= max))
    })?;

    table.register(ids::CTRL_IF, |args, env| {
        if args.eval_pos(env, 0)?.is_truthy() {
            args.eval_pos(env, 1)
        } else {
            args.eval_pos(env, 2)
        }
    })?;

    fold(table, ids::MATH_ADD, |a, b| a + b)?;
    table.register(ids::MATH_SUB, |args, env| {
        let numbers = eval_numbers(args, env, ids::MATH_SUB)?;
        let mut iter = numbers.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| QueryError::Internal("core.math.sub: no arguments".to_string()))?;
        // A single argument negates.
        let mut rest = iter.peekable();
        if rest.peek().is_none() {
            return Ok(Value::Number(-first));
        }
        Ok(Value::Number(rest.fold(first, |a, b| a - b)))
    })?;
    fold(table, ids::MATH_MULT, |a, b| a * b)?;
    fold(table, ids::MATH_MIN, f64::min)?;
    fold(table, ids::MATH_MAX, f64::max)?;
    binary_math(table, ids::MATH_DIV, |a, b| a / b)?;
    binary_math(table, ids::MATH_MOD, |a, b| a % b)?;
    binary_math(table, ids::MATH_POW, f64::powf)?;
    unary_math(table, ids::MATH_FLOOR, f64::floor)?;
    unary_math(table, ids::MATH_CEIL, f64::ceil)?;
    unary_math(table, ids::MATH_ROUND, f64::round)?;
    unary_math(table, ids::MATH_ABS, f64::abs)?;
    unary_math(table, ids::MATH_SQRT, f64::sqrt)?;

    table.register(ids::STR_CONCAT, |args, env| {
        let mut out = String::new();
        for i in 0..args.positional_count() {
            let value = args.eval_pos(env, i)?;
            out.push_str(&scalar_to_string(ids::STR_CONCAT, &value)?);
        }
        Ok(Value::str(&out))
    })?;
    table.register(ids::STR_MATCH, |args, env| {
        let regex = args.eval_pos(env, 0)?.as_regex(ids::STR_MATCH)?;
        let text = args.eval_pos(env, 1)?.as_str(ids::STR_MATCH)?;
        Ok(Value::Bool(regex.is_match(&text)))
    })?;

    table.register(ids::SET_HAS, |args, env| {
        let set = args.eval_pos(env, 0)?.as_set(ids::SET_HAS)?;
        let value = args.eval_pos(env, 1)?;
        Ok(Value::Bool(set.contains(&scalar_key(ids::SET_HAS, &value)?)))
    })?;

    Ok(())
}
