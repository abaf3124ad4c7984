use fieldbook_engine::{evaluate, parse_formula, Value};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn ctx(entries: &[(&str, Value)]) -> HashMap<String, Value> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

fn eval_with(formula: &str, context: &HashMap<String, Value>) -> Value {
    evaluate(&parse_formula(formula).unwrap(), context)
}

fn eval(formula: &str) -> Value {
    eval_with(formula, &HashMap::new())
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn concat_treats_null_as_empty() {
    let context = ctx(&[("gap", Value::Null)]);
    assert_eq!(
        eval_with("CONCAT(\"a\", {gap}, \"b\")", &context),
        text("ab")
    );
    assert_eq!(eval("CONCAT()"), text(""));
    assert_eq!(eval("CONCAT(1, \" \", TRUE)"), text("1 true"));
}

#[test]
fn text_slicing() {
    assert_eq!(eval("LEFT(\"hello\", 3)"), text("hel"));
    assert_eq!(eval("LEFT(\"hello\")"), text("h"));
    assert_eq!(eval("RIGHT(\"hello\", 3)"), text("llo"));
    assert_eq!(eval("MID(\"hello\", 2, 3)"), text("ell"));
    // Counts beyond the string are clamped.
    assert_eq!(eval("LEFT(\"hi\", 10)"), text("hi"));
    // 1-based start below 1 is a runtime failure, so null.
    assert_eq!(eval("MID(\"hello\", 0, 2)"), Value::Null);
}

#[test]
fn len_of_blank_is_zero() {
    let context = ctx(&[("gap", Value::Null)]);
    assert_eq!(eval_with("LEN({gap})", &context), Value::Number(0.0));
    assert_eq!(eval("LEN(\"héllo\")"), Value::Number(5.0));
}

#[test]
fn casing_and_trimming() {
    assert_eq!(eval("TRIM(\"  pad  \")"), text("pad"));
    assert_eq!(eval("UPPER(\"mixed\")"), text("MIXED"));
    assert_eq!(eval("LOWER(\"MIXED\")"), text("mixed"));
    assert_eq!(eval("PROPER(\"john smith-jones\")"), text("John Smith-Jones"));
}

#[test]
fn substitute_and_rept() {
    assert_eq!(eval("SUBSTITUTE(\"a-b-c\", \"-\", \"+\")"), text("a+b+c"));
    assert_eq!(eval("REPT(\"ab\", 3)"), text("ababab"));
    assert_eq!(eval("REPT(\"ab\", 0)"), text(""));
}

#[test]
fn sum_and_avg_ignore_null_inputs() {
    let context = ctx(&[("gap", Value::Null)]);
    assert_eq!(eval("SUM(1, 2, 3)"), Value::Number(6.0));
    assert_eq!(eval_with("SUM(1, {gap}, 2)", &context), Value::Number(3.0));
    assert_eq!(eval_with("AVG(4, {gap}, 8)", &context), Value::Number(6.0));
    // No contributing values at all.
    assert_eq!(eval("AVG()"), Value::Null);
    assert_eq!(eval_with("AVG({gap})", &context), Value::Null);
    assert_eq!(eval("SUM()"), Value::Number(0.0));
}

#[test]
fn aggregates_flatten_list_inputs() {
    let context = ctx(&[(
        "amounts",
        Value::List(vec![
            Value::Number(1.0),
            Value::Null,
            Value::List(vec![Value::Number(2.0), Value::Number(3.0)]),
            text("skipped"),
        ]),
    )]);
    assert_eq!(eval_with("SUM({amounts})", &context), Value::Number(6.0));
    assert_eq!(eval_with("MIN({amounts})", &context), Value::Number(1.0));
    assert_eq!(eval_with("MAX({amounts})", &context), Value::Number(3.0));
    assert_eq!(eval_with("COUNT({amounts})", &context), Value::Number(3.0));
}

#[test]
fn count_family() {
    let context = ctx(&[(
        "mixed",
        Value::List(vec![
            Value::Number(1.0),
            text("2"),
            text("word"),
            text(""),
            Value::Null,
        ]),
    )]);
    // COUNT: numeric values only (numbers and numeric-looking text).
    assert_eq!(eval_with("COUNT({mixed})", &context), Value::Number(2.0));
    // COUNTA: everything that is not blank.
    assert_eq!(eval_with("COUNTA({mixed})", &context), Value::Number(3.0));
    // COUNTBLANK: null and empty string.
    assert_eq!(eval_with("COUNTBLANK({mixed})", &context), Value::Number(2.0));
}

#[test]
fn rounding_is_half_adjust() {
    assert_eq!(eval("ROUND(2.5)"), Value::Number(3.0));
    assert_eq!(eval("ROUND(-2.5)"), Value::Number(-3.0));
    assert_eq!(eval("ROUND(100.5)"), Value::Number(101.0));
    assert_eq!(eval("ROUND(1.2345, 2)"), Value::Number(1.23));
    assert_eq!(eval("INT(-1.5)"), Value::Number(-2.0));
}

#[test]
fn math_domain_failures_are_null() {
    assert_eq!(eval("SQRT(-1)"), Value::Null);
    assert_eq!(eval("LOG(-5)"), Value::Null);
    assert_eq!(eval("LOG(0)"), Value::Null);
    assert_eq!(eval("LN(0)"), Value::Null);
    assert_eq!(eval("MOD(5, 0)"), Value::Null);
}

#[test]
fn math_happy_paths() {
    assert_eq!(eval("ABS(-4)"), Value::Number(4.0));
    assert_eq!(eval("SQRT(9)"), Value::Number(3.0));
    assert_eq!(eval("POWER(2, 10)"), Value::Number(1024.0));
    assert_eq!(eval("LOG(100)"), Value::Number(2.0));
    assert_eq!(eval("LOG(8, 2)"), Value::Number(3.0));
    assert_eq!(eval("MOD(7, 3)"), Value::Number(1.0));
}

#[test]
fn if_defaults_to_null_without_else_branch() {
    assert_eq!(eval("IF(FALSE, 1)"), Value::Null);
    assert_eq!(eval("IF(TRUE, 1)"), Value::Number(1.0));
}

#[test]
fn logical_functions() {
    assert_eq!(eval("AND(TRUE, 1, \"x\")"), Value::Bool(true));
    assert_eq!(eval("AND(TRUE, 0)"), Value::Bool(false));
    assert_eq!(eval("OR(FALSE, BLANK(), 1)"), Value::Bool(true));
    assert_eq!(eval("NOT(1)"), Value::Bool(false));
    assert_eq!(eval("ISBLANK(BLANK())"), Value::Bool(true));
    assert_eq!(eval("ISBLANK(\"\")"), Value::Bool(true));
    assert_eq!(eval("ISBLANK(0)"), Value::Bool(false));
    assert_eq!(eval("BLANK()"), Value::Null);
}

#[test]
fn switch_matches_with_operator_equality() {
    let context = ctx(&[("status", text("active"))]);
    assert_eq!(
        eval_with(
            "SWITCH({status}, \"active\", 1, \"archived\", 2, 0)",
            &context
        ),
        Value::Number(1.0)
    );
    assert_eq!(
        eval_with("SWITCH(\"other\", \"active\", 1, \"archived\", 2, 0)", &context),
        Value::Number(0.0)
    );
    // No default and no match.
    assert_eq!(
        eval_with("SWITCH(\"other\", \"active\", 1, \"archived\", 2)", &context),
        Value::Null
    );
}

#[test]
fn wrong_argument_counts_become_null() {
    assert_eq!(eval("LEN()"), Value::Null);
    assert_eq!(eval("LEN(\"a\", \"b\")"), Value::Null);
    assert_eq!(eval("MID(\"abc\")"), Value::Null);
    // ... without failing the surrounding expression.
    assert_eq!(eval("LEN() + 1"), Value::Number(1.0));
}

#[test]
fn array_compact_drops_null_and_empty_entries() {
    let context = ctx(&[(
        "tags",
        Value::List(vec![text("a"), Value::Null, text(""), text("b")]),
    )]);
    assert_eq!(
        eval_with("ARRAYCOMPACT({tags})", &context),
        Value::List(vec![text("a"), text("b")])
    );
}

#[test]
fn array_flatten_recurses_to_arbitrary_depth() {
    let context = ctx(&[(
        "nested",
        Value::List(vec![
            Value::Number(1.0),
            Value::List(vec![
                Value::Number(2.0),
                Value::List(vec![Value::Number(3.0)]),
            ]),
        ]),
    )]);
    assert_eq!(
        eval_with("ARRAYFLATTEN({nested})", &context),
        Value::List(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0),
        ])
    );
}

#[test]
fn array_unique_keeps_first_occurrences() {
    let context = ctx(&[(
        "values",
        Value::List(vec![
            Value::Number(1.0),
            text("1"),
            text("x"),
            text("x"),
            Value::Null,
            Value::Null,
        ]),
    )]);
    // "1" equals 1 under operator equality, so it is a duplicate.
    assert_eq!(
        eval_with("ARRAYUNIQUE({values})", &context),
        Value::List(vec![Value::Number(1.0), text("x"), Value::Null])
    );
}

#[test]
fn registry_is_well_formed() {
    let mut names = std::collections::HashSet::new();
    let mut count = 0;
    for spec in fieldbook_engine::functions::iter_function_specs() {
        assert!(spec.min_args <= spec.max_args, "{}", spec.name);
        assert!(
            names.insert(spec.name.to_ascii_uppercase()),
            "duplicate registration for {}",
            spec.name
        );
        count += 1;
    }
    // Text, numeric, logical, date and array categories are all populated.
    assert!(count >= 40, "expected the full library, found {count}");
}

#[test]
fn array_join_skips_nulls() {
    let context = ctx(&[(
        "parts",
        Value::List(vec![text("a"), Value::Null, text("b")]),
    )]);
    assert_eq!(eval_with("ARRAYJOIN({parts})", &context), text("a, b"));
    assert_eq!(
        eval_with("ARRAYJOIN({parts}, \"-\")", &context),
        text("a-b")
    );
}
