use crate::error::EvalError;
use crate::eval::values_equal;
use crate::functions::{arg, flattened, FunctionContext, FunctionSpec};
use crate::functions::Volatility;
use crate::value::Value;

/// List argument for the ARRAY* functions: lists pass through, null becomes
/// the empty list, and a bare scalar is treated as a one-element list.
fn list_arg(args: &[Value], index: usize) -> Vec<Value> {
    match arg(args, index) {
        Value::List(items) => items.clone(),
        Value::Null => Vec::new(),
        scalar => vec![scalar.clone()],
    }
}

inventory::submit! {
    FunctionSpec {
        name: "ARRAYCOMPACT",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: arraycompact_fn,
    }
}

/// Drops null and empty-string entries; nested lists are kept intact.
fn arraycompact_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let items = list_arg(args, 0)
        .into_iter()
        .filter(|v| !v.is_blank())
        .collect();
    Ok(Value::List(items))
}

inventory::submit! {
    FunctionSpec {
        name: "ARRAYFLATTEN",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: arrayflatten_fn,
    }
}

/// Recursively flattens nested sequences of arbitrary depth.
fn arrayflatten_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let items = list_arg(args, 0);
    Ok(Value::List(flattened(&items)))
}

inventory::submit! {
    FunctionSpec {
        name: "ARRAYUNIQUE",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: arrayunique_fn,
    }
}

/// Deduplicates with the `=` operator's equality semantics, keeping the first
/// occurrence of each value.
fn arrayunique_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let mut out: Vec<Value> = Vec::new();
    for item in list_arg(args, 0) {
        if !out.iter().any(|seen| values_equal(seen, &item)) {
            out.push(item);
        }
    }
    Ok(Value::List(out))
}

inventory::submit! {
    FunctionSpec {
        name: "ARRAYJOIN",
        min_args: 1,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: arrayjoin_fn,
    }
}

/// Joins entries with the separator (default `", "`), skipping nulls.
fn arrayjoin_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let separator = match args.get(1) {
        None | Some(Value::Null) => ", ".to_string(),
        Some(value) => value.to_display_string(),
    };
    let joined = list_arg(args, 0)
        .iter()
        .filter(|v| !v.is_null())
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::Text(joined))
}
