use chrono::{Datelike, Months, NaiveDate};

use crate::error::EvalError;
use crate::functions::{arg, number_arg, text_arg, FunctionContext, FunctionSpec};
use crate::functions::Volatility;
use crate::value::Value;

inventory::submit! {
    FunctionSpec {
        name: "TODAY",
        min_args: 0,
        max_args: 0,
        volatility: Volatility::Volatile,
        implementation: today_fn,
    }
}

fn today_fn(ctx: &dyn FunctionContext, _args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Date(ctx.now_utc().date_naive()))
}

inventory::submit! {
    FunctionSpec {
        name: "NOW",
        min_args: 0,
        max_args: 0,
        volatility: Volatility::Volatile,
        implementation: now_fn,
    }
}

fn now_fn(ctx: &dyn FunctionContext, _args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::DateTime(ctx.now_utc()))
}

inventory::submit! {
    FunctionSpec {
        name: "YEAR",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: year_fn,
    }
}

fn year_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(date_arg("YEAR", args, 0)?.year() as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "MONTH",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: month_fn,
    }
}

fn month_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(date_arg("MONTH", args, 0)?.month() as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "DAY",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: day_fn,
    }
}

fn day_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(date_arg("DAY", args, 0)?.day() as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "WEEKDAY",
        min_args: 1,
        max_args: 1,
        volatility: Volatility::NonVolatile,
        implementation: weekday_fn,
    }
}

/// 0 = Sunday through 6 = Saturday.
fn weekday_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let date = date_arg("WEEKDAY", args, 0)?;
    Ok(Value::Number(date.weekday().num_days_from_sunday() as f64))
}

inventory::submit! {
    FunctionSpec {
        name: "DATEADD",
        min_args: 3,
        max_args: 3,
        volatility: Volatility::NonVolatile,
        implementation: dateadd_fn,
    }
}

/// `DATEADD(date, count, unit)` — calendar arithmetic for months/years
/// (end-of-month clamps), fixed-length only for days.
fn dateadd_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let value = arg(args, 0);
    let count = number_arg("DATEADD", args, 1)?.trunc() as i64;
    let unit = parse_unit("DATEADD", &text_arg(args, 2))?;

    let months = match unit {
        DateUnit::Days => {
            if !matches!(value, Value::Date(_) | Value::DateTime(_)) {
                return Err(EvalError::ArgType { name: "DATEADD", index: 0 });
            }
            return crate::eval::shift_date_value(value, count as f64).ok_or(EvalError::Failed {
                name: "DATEADD",
                message: "date out of range",
            });
        }
        DateUnit::Months => count,
        DateUnit::Years => count.saturating_mul(12),
    };

    let shift_date = |d: NaiveDate| {
        if months >= 0 {
            d.checked_add_months(Months::new(months as u32))
        } else {
            d.checked_sub_months(Months::new(months.unsigned_abs() as u32))
        }
    };
    let shifted = match value {
        Value::Date(d) => shift_date(*d).map(Value::Date),
        Value::DateTime(dt) => {
            if months >= 0 {
                dt.checked_add_months(Months::new(months as u32))
                    .map(Value::DateTime)
            } else {
                dt.checked_sub_months(Months::new(months.unsigned_abs() as u32))
                    .map(Value::DateTime)
            }
        }
        _ => return Err(EvalError::ArgType { name: "DATEADD", index: 0 }),
    };
    shifted.ok_or(EvalError::Failed {
        name: "DATEADD",
        message: "date out of range",
    })
}

inventory::submit! {
    FunctionSpec {
        name: "DATEDIFF",
        min_args: 3,
        max_args: 3,
        volatility: Volatility::NonVolatile,
        implementation: datediff_fn,
    }
}

/// `DATEDIFF(a, b, unit)` = `a - b` in whole units, truncated toward zero.
/// Month/year granularity is calendar arithmetic, not 30/365-day intervals.
fn datediff_fn(_ctx: &dyn FunctionContext, args: &[Value]) -> Result<Value, EvalError> {
    let a = date_arg("DATEDIFF", args, 0)?;
    let b = date_arg("DATEDIFF", args, 1)?;
    let unit = parse_unit("DATEDIFF", &text_arg(args, 2))?;

    let result = match unit {
        DateUnit::Days => (a - b).num_days(),
        DateUnit::Months => whole_months_between(a, b),
        DateUnit::Years => whole_months_between(a, b) / 12,
    };
    Ok(Value::Number(result as f64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateUnit {
    Days,
    Months,
    Years,
}

fn parse_unit(name: &'static str, unit: &str) -> Result<DateUnit, EvalError> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "day" | "days" => Ok(DateUnit::Days),
        "month" | "months" => Ok(DateUnit::Months),
        "year" | "years" => Ok(DateUnit::Years),
        other => Err(EvalError::BadUnit {
            name,
            unit: other.to_string(),
        }),
    }
}

fn date_arg(name: &'static str, args: &[Value], index: usize) -> Result<NaiveDate, EvalError> {
    arg(args, index)
        .as_date()
        .ok_or(EvalError::ArgType { name, index })
}

/// Complete calendar months from `b` to `a`, negative when `a` is earlier.
fn whole_months_between(a: NaiveDate, b: NaiveDate) -> i64 {
    let mut months =
        i64::from(a.year() - b.year()) * 12 + i64::from(a.month() as i32 - b.month() as i32);
    if months > 0 && a.day() < b.day() {
        months -= 1;
    } else if months < 0 && a.day() > b.day() {
        months += 1;
    }
    months
}
