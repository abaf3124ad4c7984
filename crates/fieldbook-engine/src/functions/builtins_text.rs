use crate::error::EvalError;
use crate::functions::{number_arg, opt_number_arg, text_arg, FunctionContext, FunctionSpec};
use crate::functions::{Volatility, VAR_ARGS};
use crate::value::Value;

inventory::submit! {
    FunctionSpec {
        name: "CONCAT",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: concat_fn,
    }
}

fn concat_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    // Null arguments contribute nothing.
    let mut out = String::new();
    for value in args {
        out.push_str(&value.to_display_string());
    }
    Ok(Value::Text(out))
}

inventory::submit! {
    FunctionSpec {
        name: "LEFT",
        min_args: 1,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: left_fn,
    }
}

fn left_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let count = opt_number_arg("LEFT", args, 1)?.unwrap_or(1.0);
    let count = clamp_count("LEFT", count)?;
    Ok(Value::Text(text.chars().take(count).collect()))
}

inventory::submit! {
    FunctionSpec {
        name: "RIGHT",
        min_args: 1,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: right_fn,
    }
}

fn right_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let count = opt_number_arg("RIGHT", args, 1)?.unwrap_or(1.0);
    let count = clamp_count("RIGHT", count)?;
    let len = text.chars().count();
    Ok(Value::Text(text.chars().skip(len.saturating_sub(count)).collect()))
}

inventory::submit! {
    FunctionSpec {
        name: "MID",
        min_args: 3,
        max_args: 3,
        volatility: Volatility::NonVolatile,
        implementation: mid_fn,
    }
}

fn mid_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let start = number_arg("MID", args, 1)?;
    if start < 1.0 {
        return Err(EvalError::Failed {
            name: "MID",
            message: "start position is 1-based",
        });
    }
    let count = clamp_count("MID", number_arg("MID", args, 2)?)?;
    let start = start.trunc() as usize - 1;
    Ok(Value::Text(text.chars().skip(start).take(count).collect()))
}

inventory::submit! {
    FunctionSpec {
        name: "LEN",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: len_fn,
    }
}

fn len_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    // LEN(null) = 0 via the null-renders-empty rule.
    Ok(Value::Number(text_arg(args, 0).chars().count() as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "TRIM",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: trim_fn,
    }
}

fn trim_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Text(text_arg(args, 0).trim().to_string()))
}

inventory::submit! {
    FunctionSpec {
        name: "UPPER",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: upper_fn,
    }
}

fn upper_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Text(text_arg(args, 0).to_uppercase()))
}

inventory::submit! {
    FunctionSpec {
        name: "LOWER",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: lower_fn,
    }
}

fn lower_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Text(text_arg(args, 0).to_lowercase()))
}

inventory::submit! {
    FunctionSpec {
        name: "PROPER",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: proper_fn,
    }
}

/// Capitalize the first letter of every word, lowercasing the rest.
fn proper_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    Ok(Value::Text(out))
}

inventory::submit! {
    FunctionSpec {
        name: "SUBSTITUTE",
        min_args: 3,
        max_args: 3,
        volatility: Volatility::NonVolatile,
        implementation: substitute_fn,
    }
}

fn substitute_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let pattern = text_arg(args, 1);
    let replacement = text_arg(args, 2);
    if pattern.is_empty() {
        return Ok(Value::Text(text));
    }
    Ok(Value::Text(text.replace(&pattern, &replacement)))
}

inventory::submit! {
    FunctionSpec {
        name: "REPT",
        min_args: 2,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: rept_fn,
    }
}

fn rept_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0);
    let count = clamp_count("REPT", number_arg("REPT", args, 1)?)?;
    if text.len().saturating_mul(count) > MAX_REPT_BYTES {
        return Err(EvalError::Failed {
            name: "REPT",
            message: "result too large",
        });
    }
    Ok(Value::Text(text.repeat(count)))
}

/// Upper bound on REPT output so a formula cannot balloon memory.
const MAX_REPT_BYTES: usize = 1 << 20;

fn clamp_count(name: &'static str, count: f64) -> Result<usize, EvalError> {
    if count.is_nan() {
        return Err(EvalError::ArgType { name, index: 1 });
    }
    Ok(count.max(0.0).trunc() as usize)
}
