use chrono::{NaiveDate, TimeZone, Utc};
use fieldbook_engine::{parse_formula, Evaluator, Value};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ctx(entries: &[(&str, Value)]) -> HashMap<String, Value> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Evaluate with the clock pinned to 2026-08-06 12:00:00 UTC.
fn eval_with(formula: &str, context: &HashMap<String, Value>) -> Value {
    let now = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
    let ast = parse_formula(formula).unwrap();
    Evaluator::with_clock(context, now).eval(&ast)
}

fn eval(formula: &str) -> Value {
    eval_with(formula, &HashMap::new())
}

#[test]
fn today_and_now_use_the_evaluation_clock() {
    assert_eq!(eval("TODAY()"), Value::Date(date(2026, 8, 6)));
    assert_eq!(
        eval("NOW()"),
        Value::DateTime(Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap())
    );
    assert_eq!(eval("YEAR(TODAY())"), Value::Number(2026.0));
}

#[test]
fn date_plus_number_shifts_days() {
    let context = ctx(&[("due", Value::Date(date(2026, 1, 30)))]);
    assert_eq!(
        eval_with("{due} + 3", &context),
        Value::Date(date(2026, 2, 2))
    );
    assert_eq!(
        eval_with("3 + {due}", &context),
        Value::Date(date(2026, 2, 2))
    );
    assert_eq!(
        eval_with("{due} - 30", &context),
        Value::Date(date(2025, 12, 31))
    );
}

#[test]
fn date_minus_date_is_day_difference() {
    let context = ctx(&[
        ("end", Value::Date(date(2026, 3, 1))),
        ("start", Value::Date(date(2026, 2, 1))),
    ]);
    assert_eq!(eval_with("{end} - {start}", &context), Value::Number(28.0));
    assert_eq!(eval_with("{start} - {end}", &context), Value::Number(-28.0));
}

#[test]
fn date_parts() {
    let context = ctx(&[("d", Value::Date(date(2026, 8, 6)))]);
    assert_eq!(eval_with("YEAR({d})", &context), Value::Number(2026.0));
    assert_eq!(eval_with("MONTH({d})", &context), Value::Number(8.0));
    assert_eq!(eval_with("DAY({d})", &context), Value::Number(6.0));
    // 2026-08-06 is a Thursday; WEEKDAY counts 0 = Sunday.
    assert_eq!(eval_with("WEEKDAY({d})", &context), Value::Number(4.0));
    // Date parts of a non-date are a runtime failure, so null.
    assert_eq!(eval("YEAR(\"tuesday\")"), Value::Null);
}

#[test]
fn dateadd_day_and_calendar_granularities() {
    let context = ctx(&[("d", Value::Date(date(2026, 1, 31)))]);
    assert_eq!(
        eval_with("DATEADD({d}, 7, \"days\")", &context),
        Value::Date(date(2026, 2, 7))
    );
    // Calendar month arithmetic clamps to the end of the month.
    assert_eq!(
        eval_with("DATEADD({d}, 1, \"months\")", &context),
        Value::Date(date(2026, 2, 28))
    );
    assert_eq!(
        eval_with("DATEADD({d}, -2, \"months\")", &context),
        Value::Date(date(2025, 11, 30))
    );
    assert_eq!(
        eval_with("DATEADD({d}, 1, \"years\")", &context),
        Value::Date(date(2027, 1, 31))
    );
    // Units are case-insensitive and accept the singular form.
    assert_eq!(
        eval_with("DATEADD({d}, 1, \"Day\")", &context),
        Value::Date(date(2026, 2, 1))
    );
    // Unknown units are a runtime failure.
    assert_eq!(eval_with("DATEADD({d}, 1, \"fortnights\")", &context), Value::Null);
}

#[test]
fn datediff_is_calendar_aware() {
    let context = ctx(&[
        ("a", Value::Date(date(2026, 3, 14))),
        ("b", Value::Date(date(2026, 1, 15))),
    ]);
    assert_eq!(
        eval_with("DATEDIFF({a}, {b}, \"days\")", &context),
        Value::Number(58.0)
    );
    // One day short of two whole months.
    assert_eq!(
        eval_with("DATEDIFF({a}, {b}, \"months\")", &context),
        Value::Number(1.0)
    );
    assert_eq!(
        eval_with("DATEDIFF({b}, {a}, \"months\")", &context),
        Value::Number(-1.0)
    );
    assert_eq!(
        eval_with("DATEDIFF({a}, {b}, \"years\")", &context),
        Value::Number(0.0)
    );
}

#[test]
fn datetime_values_shift_and_compare() {
    let context = ctx(&[(
        "ts",
        Value::DateTime(Utc.with_ymd_and_hms(2026, 8, 6, 9, 30, 0).unwrap()),
    )]);
    assert_eq!(
        eval_with("{ts} + 1", &context),
        Value::DateTime(Utc.with_ymd_and_hms(2026, 8, 7, 9, 30, 0).unwrap())
    );
    assert_eq!(eval_with("{ts} < NOW()", &context), Value::Bool(true));
    assert_eq!(eval_with("{ts} = {ts}", &context), Value::Bool(true));
}

#[test]
fn dates_order_chronologically() {
    let context = ctx(&[
        ("early", Value::Date(date(2026, 1, 1))),
        ("late", Value::Date(date(2026, 12, 31))),
    ]);
    assert_eq!(eval_with("{early} < {late}", &context), Value::Bool(true));
    assert_eq!(eval_with("{early} = {early}", &context), Value::Bool(true));
}
