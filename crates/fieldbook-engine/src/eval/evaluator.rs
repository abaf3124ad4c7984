use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::functions::{self, FunctionContext};
use crate::value::Value;
use chrono::{DateTime, Days, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Resolves field names against the already-resolved values of one record.
///
/// The evaluator neither mutates nor retains the context beyond a single
/// evaluation call; a missing field resolves to `Value::Null`, not an error.
pub trait FieldResolver {
    fn field_value(&self, name: &str) -> Option<Value>;
}

impl FieldResolver for HashMap<String, Value> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl FieldResolver for BTreeMap<String, Value> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<R: FieldResolver + ?Sized> FieldResolver for &R {
    fn field_value(&self, name: &str) -> Option<Value> {
        (**self).field_value(name)
    }
}

/// Evaluate an AST against a field-value context.
///
/// Total: every runtime failure (unknown function, coercion failure, division
/// by zero, missing field) resolves the failing sub-expression to
/// `Value::Null` and evaluation continues.
pub fn evaluate<R: FieldResolver>(expr: &Expr, resolver: &R) -> Value {
    Evaluator::new(resolver).eval(expr)
}

pub struct Evaluator<'a, R: FieldResolver> {
    resolver: &'a R,
    /// Captured once per evaluation so TODAY/NOW are stable within a pass.
    now: DateTime<Utc>,
}

impl<'a, R: FieldResolver> Evaluator<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            now: Utc::now(),
        }
    }

    /// Pin the clock; used by tests and hosts that need reproducible output.
    pub fn with_clock(resolver: &'a R, now: DateTime<Utc>) -> Self {
        Self { resolver, now }
    }

    pub fn eval(&self, expr: &Expr) -> Value {
        match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::String(s) => Value::Text(s.clone()),
            Expr::Boolean(b) => Value::Bool(*b),
            Expr::FieldRef(name) => self
                .resolver
                .field_value(name)
                .unwrap_or(Value::Null),
            Expr::FunctionCall { name, args } => {
                let values: Vec<Value> = args.iter().map(|arg| self.eval(arg)).collect();
                functions::call_function(self, name, &values)
            }
            Expr::Unary { op, operand } => {
                let v = self.eval(operand);
                match op {
                    UnaryOp::Neg => match v {
                        Value::Null => Value::Null,
                        other => match other.coerce_to_number() {
                            Some(n) => Value::Number(-n),
                            None => Value::Null,
                        },
                    },
                    UnaryOp::Not => Value::Bool(!v.is_truthy()),
                }
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left);
                let r = self.eval(right);
                self.eval_binary(*op, l, r)
            }
        }
    }

    fn eval_binary(&self, op: BinaryOp, l: Value, r: Value) -> Value {
        match op {
            BinaryOp::Add => eval_add(l, r),
            BinaryOp::Sub => eval_sub(l, r),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
                eval_numeric(op, l, r)
            }
            BinaryOp::Concat => {
                // Null operands concatenate as the empty string.
                Value::Text(format!("{}{}", l.to_display_string(), r.to_display_string()))
            }
            BinaryOp::Eq => Value::Bool(values_equal(&l, &r)),
            BinaryOp::Ne => Value::Bool(!values_equal(&l, &r)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let Some(ord) = value_order(&l, &r) else {
                    return Value::Bool(false);
                };
                let result = match op {
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    BinaryOp::Le => ord != Ordering::Greater,
                    BinaryOp::Ge => ord != Ordering::Less,
                    _ => unreachable!("handled above"),
                };
                Value::Bool(result)
            }
            // Both sides are always evaluated; only the boolean combination
            // short-circuits (the language has no side effects).
            BinaryOp::And => Value::Bool(l.is_truthy() && r.is_truthy()),
            BinaryOp::Or => Value::Bool(l.is_truthy() || r.is_truthy()),
        }
    }
}

impl<'a, R: FieldResolver> FunctionContext for Evaluator<'a, R> {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }
}

/// `+`: null is an additive identity; dates shift by days; numbers add;
/// anything else falls back to string concatenation.
fn eval_add(l: Value, r: Value) -> Value {
    if l.is_null() {
        return r;
    }
    if r.is_null() {
        return l;
    }

    if let Some(shifted) = shift_date_like(&l, &r).or_else(|| shift_date_like(&r, &l)) {
        return shifted;
    }

    match (l.coerce_to_number(), r.coerce_to_number()) {
        (Some(a), Some(b)) => finite_number(a + b),
        _ => Value::Text(format!("{}{}", l.to_display_string(), r.to_display_string())),
    }
}

fn eval_sub(l: Value, r: Value) -> Value {
    if l.is_null() || r.is_null() {
        return Value::Null;
    }

    // date - date: integer day difference.
    if let (Some(a), Some(b)) = (l.as_date(), r.as_date()) {
        return Value::Number((a - b).num_days() as f64);
    }
    // date - number: shift back by that many days.
    if l.as_date().is_some() {
        if let Some(n) = r.coerce_to_number() {
            return shift_date_value(&l, -n).unwrap_or(Value::Null);
        }
        return Value::Null;
    }

    match (l.coerce_to_number(), r.coerce_to_number()) {
        (Some(a), Some(b)) => finite_number(a - b),
        _ => Value::Null,
    }
}

fn eval_numeric(op: BinaryOp, l: Value, r: Value) -> Value {
    if l.is_null() || r.is_null() {
        return Value::Null;
    }
    let (Some(a), Some(b)) = (l.coerce_to_number(), r.coerce_to_number()) else {
        return Value::Null;
    };

    match op {
        BinaryOp::Mul => finite_number(a * b),
        BinaryOp::Div => {
            if b == 0.0 {
                Value::Null
            } else {
                finite_number(a / b)
            }
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                Value::Null
            } else {
                finite_number(a % b)
            }
        }
        BinaryOp::Pow => finite_number(a.powf(b)),
        _ => unreachable!("eval_numeric only receives arithmetic operators"),
    }
}

/// Overflow and 0^-1 style results are runtime failures, so they become null
/// like every other evaluation error.
fn finite_number(n: f64) -> Value {
    if n.is_finite() {
        Value::Number(n)
    } else {
        Value::Null
    }
}

fn shift_date_like(date: &Value, amount: &Value) -> Option<Value> {
    date.as_date()?;
    let n = amount.coerce_to_number()?;
    shift_date_value(date, n)
}

/// Shift a date-like value by whole days (fractions truncate toward zero).
/// Shared with DATEADD's day granularity.
pub(crate) fn shift_date_value(date: &Value, days: f64) -> Option<Value> {
    let whole = days.trunc() as i64;
    match date {
        Value::Date(d) => {
            if whole >= 0 {
                d.checked_add_days(Days::new(whole as u64)).map(Value::Date)
            } else {
                d.checked_sub_days(Days::new(whole.unsigned_abs()))
                    .map(Value::Date)
            }
        }
        Value::DateTime(dt) => {
            if whole >= 0 {
                dt.checked_add_days(Days::new(whole as u64))
                    .map(Value::DateTime)
            } else {
                dt.checked_sub_days(Days::new(whole.unsigned_abs()))
                    .map(Value::DateTime)
            }
        }
        _ => None,
    }
}

/// Equality: `null = null` holds, null never equals a value, numeric-looking
/// operands are compared numerically, and otherwise only same-shaped values
/// compare equal. Shared with SWITCH/ARRAYUNIQUE so `=` and the library agree.
pub(crate) fn values_equal(l: &Value, r: &Value) -> bool {
    match (l.is_null(), r.is_null()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    if let (Some(a), Some(b)) = (l.coerce_to_number(), r.coerce_to_number()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (l.as_datetime(), r.as_datetime()) {
        return a == b;
    }
    l == r
}

/// Ordering: null on either side never orders; numeric coercion first, then
/// chronological order for dates, then string comparison.
fn value_order(l: &Value, r: &Value) -> Option<Ordering> {
    if l.is_null() || r.is_null() {
        return None;
    }
    if let (Some(a), Some(b)) = (l.coerce_to_number(), r.coerce_to_number()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (l.as_datetime(), r.as_datetime()) {
        return Some(a.cmp(&b));
    }
    Some(l.to_display_string().cmp(&r.to_display_string()))
}
