use crate::error::EvalError;
use crate::functions::{flattened, number_arg, opt_number_arg, FunctionContext, FunctionSpec};
use crate::functions::{Volatility, VAR_ARGS};
use crate::value::Value;

/// Numeric inputs contributed by an aggregate's arguments.
///
/// Scalar arguments must coerce (a non-numeric scalar is an error, which the
/// dispatch boundary turns into null); values inside list arguments are
/// skipped when they are null or non-numeric, mirroring how spreadsheet
/// aggregates treat ranges more leniently than scalar arguments.
fn numeric_inputs(name: &'static str, args: &[Value]) -> Result<Vec<f64>, EvalError> {
    let mut out = Vec::new();
    for (index, value) in args.iter().enumerate() {
        match value {
            Value::Null => {}
            Value::List(_) => {
                for item in flattened(std::slice::from_ref(value)) {
                    if let Some(n) = item.coerce_to_number() {
                        out.push(n);
                    }
                }
            }
            scalar => match scalar.coerce_to_number() {
                Some(n) => out.push(n),
                None => return Err(EvalError::ArgType { name, index }),
            },
        }
    }
    Ok(out)
}

inventory::submit! {
    FunctionSpec {
        name: "SUM",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: sum_fn,
    }
}

fn sum_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(numeric_inputs("SUM", args)?.iter().sum()))
}

inventory::submit! {
    FunctionSpec {
        name: "AVG",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: avg_fn,
    }
}

fn avg_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let inputs = numeric_inputs("AVG", args)?;
    if inputs.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Number(inputs.iter().sum::<f64>() / inputs.len() as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "MIN",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: min_fn,
    }
}

fn min_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let inputs = numeric_inputs("MIN", args)?;
    Ok(inputs
        .into_iter()
        .fold(None, |acc: Option<f64>, n| {
            Some(acc.map_or(n, |a| a.min(n)))
        })
        .map_or(Value::Null, Value::Number))
}

inventory::submit! {
    FunctionSpec {
        name: "MAX",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: max_fn,
    }
}

fn max_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let inputs = numeric_inputs("MAX", args)?;
    Ok(inputs
        .into_iter()
        .fold(None, |acc: Option<f64>, n| {
            Some(acc.map_or(n, |a| a.max(n)))
        })
        .map_or(Value::Null, Value::Number))
}

inventory::submit! {
    FunctionSpec {
        name: "COUNT",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: count_fn,
    }
}

/// Count numeric inputs (numbers and numeric-looking text).
fn count_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let count = flattened(args)
        .iter()
        .filter(|v| matches!(v, Value::Number(_) | Value::Text(_)) && v.coerce_to_number().is_some())
        .count();
    Ok(Value::Number(count as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "COUNTA",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: counta_fn,
    }
}

fn counta_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let count = flattened(args).iter().filter(|v| !v.is_blank()).count();
    Ok(Value::Number(count as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "COUNTBLANK",
        min_args: 0,
        max_args: VAR_ARGS,
        volatility: Volatility::NonVolatile,
        implementation: countblank_fn,
    }
}

fn countblank_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let count = flattened(args).iter().filter(|v| v.is_blank()).count();
    Ok(Value::Number(count as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "ROUND",
        min_args: 1,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: round_fn,
    }
}

/// Standard half-adjust rounding (half away from zero).
fn round_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let n = number_arg("ROUND", args, 0)?;
    let places = opt_number_arg("ROUND", args, 1)?.unwrap_or(0.0).trunc() as i32;
    let factor = 10f64.powi(places);
    Ok(Value::Number((n * factor).round() / factor))
}

inventory::submit! {
    FunctionSpec {
        name: "ABS",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: abs_fn,
    }
}

fn abs_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(number_arg("ABS", args, 0)?.abs()))
}

inventory::submit! {
    FunctionSpec {
        name: "SQRT",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: sqrt_fn,
    }
}

fn sqrt_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let n = number_arg("SQRT", args, 0)?;
    if n < 0.0 {
        return Err(EvalError::Failed {
            name: "SQRT",
            message: "negative input",
        });
    }
    Ok(Value::Number(n.sqrt()))
}

inventory::submit! {
    FunctionSpec {
        name: "POWER",
        min_args: 2,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: power_fn,
    }
}

fn power_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let base = number_arg("POWER", args, 0)?;
    let exponent = number_arg("POWER", args, 1)?;
    let result = base.powf(exponent);
    if !result.is_finite() {
        return Err(EvalError::Failed {
            name: "POWER",
            message: "result out of range",
        });
    }
    Ok(Value::Number(result))
}

inventory::submit! {
    FunctionSpec {
        name: "LOG",
        min_args: 1,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: log_fn,
    }
}

fn log_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let n = number_arg("LOG", args, 0)?;
    let base = opt_number_arg("LOG", args, 1)?.unwrap_or(10.0);
    if n <= 0.0 || base <= 0.0 || base == 1.0 {
        return Err(EvalError::Failed {
            name: "LOG",
            message: "input out of domain",
        });
    }
    Ok(Value::Number(n.log(base)))
}

inventory::submit! {
    FunctionSpec {
        name: "LN",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: ln_fn,
    }
}

fn ln_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let n = number_arg("LN", args, 0)?;
    if n <= 0.0 {
        return Err(EvalError::Failed {
            name: "LN",
            message: "input out of domain",
        });
    }
    Ok(Value::Number(n.ln()))
}

inventory::submit! {
    FunctionSpec {
        name: "MOD",
        min_args: 2,
        max_args: 2,
        volatility: Volatility::NonVolatile,
        implementation: mod_fn,
    }
}

fn mod_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let a = number_arg("MOD", args, 0)?;
    let b = number_arg("MOD", args, 1)?;
    if b == 0.0 {
        return Err(EvalError::Failed {
            name: "MOD",
            message: "division by zero",
        });
    }
    Ok(Value::Number(a % b))
}

inventory::submit! {
    FunctionSpec {
        name: "INT",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: int_fn,
    }
}

fn int_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(number_arg("INT", args, 0)?.floor()))
}
