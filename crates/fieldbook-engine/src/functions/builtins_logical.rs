use crate::error::EvalError;
use crate::eval::values_equal;
use crate::functions::{arg, FunctionContext, FunctionSpec};
use crate::functions::{Volatility, VAR_ARGS};
use crate::value::Value;

inventory::submit! {
    FunctionSpec {
        name: "IF",
        min_args: 2,
        max_args: 3,
        volatility: Volatility::NonVolatile,
        implementation: if_fn,
    }
}

/// Both branches arrive already evaluated (the language has no side effects);
/// only the selected branch's value is used.
fn if_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    if arg(args, 0).is_truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(Value::Null))
    }
}

inventory::submit! {
    FunctionSpec {
        name: "AND",
        min_args: 1,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: and_fn,
    }
}

fn and_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args.iter().all(Value::is_truthy)))
}

inventory::submit! {
    FunctionSpec {
        name: "OR",
        min_args: 1,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: or_fn,
    }
}

fn or_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args.iter().any(Value::is_truthy)))
}

inventory::submit! {
    FunctionSpec {
        name: "NOT",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: not_fn,
    }
}

fn not_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!arg(args, 0).is_truthy()))
}

inventory::submit! {
    FunctionSpec {
        name: "ISBLANK",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: isblank_fn,
    }
}

fn isblank_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(arg(args, 0).is_blank()))
}

inventory::submit! {
    FunctionSpec {
        name: "BLANK",
        min_args: 0,
        max_args: 0,
        volatility: Volatility::NonVolatile,
        implementation: blank_fn,
    }
}

/// The canonical null literal.
fn blank_fn(_ctx: &dyn FunctionContext, _args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Null)
}

inventory::submit! {
    FunctionSpec {
        name: "SWITCH",
        min_args: 3,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: switch_fn,
    }
}

/// `SWITCH(expr, pattern1, result1, ..., [default])` — patterns compare with
/// the same equality semantics as the `=` operator.
fn switch_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let subject = arg(args, 0);
    let rest = &args[1..];
    let mut pairs = rest.chunks_exact(2);
    for pair in &mut pairs {
        if values_equal(subject, &pair[0]) {
            return Ok(pair[1].clone());
        }
    }
    Ok(pairs.remainder().first().cloned().unwrap_or(Value::Null))
}
