use crate::ast::Expr;
use crate::error::EvalError;
use crate::value::Value;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::OnceLock;

// Built-in functions live in dedicated category modules.
mod builtins_array;
mod builtins_date_time;
mod builtins_logical;
mod builtins_math;
mod builtins_text;

/// Host services available to builtin implementations.
///
/// Evaluation is pure apart from the clock, which the evaluator captures once
/// per pass so TODAY/NOW are stable within a single evaluation.
pub trait FunctionContext {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    NonVolatile,
    Volatile,
}

pub type FunctionImpl = fn(&dyn FunctionContext, &[Value]) -> Result<Value, EvalError>;

/// Registration record for one builtin.
///
/// Arguments are evaluated left-to-right by the evaluator before dispatch, so
/// implementations receive plain values. Any `Err` (including argument-count
/// violations checked here) is converted to `Value::Null` by
/// [`call_function`] — functions never raise to the caller.
#[derive(Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub volatility: Volatility,
    pub implementation: FunctionImpl,
}

inventory::collect!(FunctionSpec);

pub(crate) const VAR_ARGS: usize = 255;

fn registry() -> &'static HashMap<String, &'static FunctionSpec> {
    static REGISTRY: OnceLock<HashMap<String, &'static FunctionSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        for spec in inventory::iter::<FunctionSpec> {
            map.insert(spec.name.to_ascii_uppercase(), spec);
        }
        map
    })
}

/// Iterate all registered builtins, e.g. for documentation or coverage tests.
pub fn iter_function_specs() -> impl Iterator<Item = &'static FunctionSpec> {
    inventory::iter::<FunctionSpec>.into_iter()
}

/// Function names are case-insensitive.
pub fn lookup_function(name: &str) -> Option<&'static FunctionSpec> {
    registry().get(&name.to_ascii_uppercase()).copied()
}

/// Dispatch a builtin by name over already-evaluated arguments.
///
/// This is the single safe-mode boundary: unknown names, argument-count
/// violations and every failure inside a function body yield `Value::Null`.
pub fn call_function(ctx: &dyn FunctionContext, name: &str, args: &[Value]) -> Value {
    let result = match lookup_function(name) {
        Some(spec) => {
            if args.len() < spec.min_args || args.len() > spec.max_args {
                Err(EvalError::ArgCount {
                    name: spec.name,
                    min: spec.min_args,
                    max: spec.max_args,
                    got: args.len(),
                })
            } else {
                (spec.implementation)(ctx, args)
            }
        }
        None => Err(EvalError::UnknownFunction(name.to_string())),
    };
    result.unwrap_or(Value::Null)
}

/// True when the expression calls any volatile builtin (TODAY/NOW), directly
/// or in a nested argument. Hosts use this to refuse to cache such results.
#[must_use]
pub fn formula_is_volatile(expr: &Expr) -> bool {
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match node {
            Expr::FunctionCall { name, args } => {
                if lookup_function(name)
                    .is_some_and(|spec| spec.volatility == Volatility::Volatile)
                {
                    return true;
                }
                stack.extend(args.iter());
            }
            Expr::Binary { left, right, .. } => {
                stack.push(left);
                stack.push(right);
            }
            Expr::Unary { operand, .. } => stack.push(operand),
            Expr::Number(_) | Expr::String(_) | Expr::Boolean(_) | Expr::FieldRef(_) => {}
        }
    }
    false
}

// Shared argument helpers for the builtin modules.

static NULL: Value = Value::Null;

pub(crate) fn arg<'a>(args: &'a [Value], index: usize) -> &'a Value {
    args.get(index).unwrap_or(&NULL)
}

pub(crate) fn number_arg(
    name: &'static str,
    args: &[Value],
    index: usize,
) -> Result<f64, EvalError> {
    arg(args, index)
        .coerce_to_number()
        .ok_or(EvalError::ArgType { name, index })
}

/// Optional numeric argument: absent or null means `None`.
pub(crate) fn opt_number_arg(
    name: &'static str,
    args: &[Value],
    index: usize,
) -> Result<Option<f64>, EvalError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .coerce_to_number()
            .map(Some)
            .ok_or(EvalError::ArgType { name, index }),
    }
}

/// Text argument; null renders as the empty string (so e.g. `LEN(BLANK())`
/// is 0 rather than an error).
pub(crate) fn text_arg(args: &[Value], index: usize) -> String {
    arg(args, index).to_display_string()
}

/// Flatten arguments for the aggregate functions: nested lists are expanded
/// recursively, scalars pass through. Nulls are preserved (the aggregates
/// decide what to skip).
pub(crate) fn flattened(args: &[Value]) -> Vec<Value> {
    let mut out = Vec::new();
    let mut stack: Vec<&Value> = args.iter().rev().collect();
    while let Some(value) = stack.pop() {
        match value {
            Value::List(items) => stack.extend(items.iter().rev()),
            other => out.push(other.clone()),
        }
    }
    out
}
