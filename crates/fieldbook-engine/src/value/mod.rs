use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime value produced by evaluating a formula.
///
/// `Null` is a first-class value distinct from "error": every runtime failure
/// in the evaluator resolves to `Null`, and several operators give `Null`
/// special treatment (see the evaluator's operator semantics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
    Null,
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Blank means `Null` or the empty string. This is the notion used by
    /// ISBLANK, COUNTBLANK and ARRAYCOMPACT.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric coercion: numbers pass through, booleans map to 1/0, and
    /// numeric-looking text parses. Everything else (including `Null`) fails.
    #[must_use]
    pub fn coerce_to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Truthiness used by the logical operators: `Null`, `false`, `0` and the
    /// empty string are falsy; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Date(_) | Value::DateTime(_) => true,
        }
    }

    /// The calendar date carried by date-like values.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    /// Date-like values lifted to a UTC instant (dates become midnight UTC).
    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => {
                let midnight = d.and_hms_opt(0, 0, 0)?;
                Some(Utc.from_utc_datetime(&midnight))
            }
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// String rendering used by `&`, CONCAT and friends. `Null` renders as
    /// the empty string; list items are joined with `", "`, skipping nulls.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.to_rfc3339(),
            Value::List(items) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::Number(2.5).coerce_to_number(), Some(2.5));
        assert_eq!(Value::Bool(true).coerce_to_number(), Some(1.0));
        assert_eq!(Value::Text(" 42 ".into()).coerce_to_number(), Some(42.0));
        assert_eq!(Value::Text("abc".into()).coerce_to_number(), None);
        assert_eq!(Value::Null.coerce_to_number(), None);
    }

    #[test]
    fn display_trims_integral_numbers() {
        assert_eq!(Value::Number(500.0).to_string(), "500");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn blankness_covers_null_and_empty_text() {
        assert!(Value::Null.is_blank());
        assert!(Value::Text(String::new()).is_blank());
        assert!(!Value::Text(" ".into()).is_blank());
        assert!(!Value::Number(0.0).is_blank());
    }
}
