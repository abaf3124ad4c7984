use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, host-assigned identifier for a table field.
///
/// Field ids are stable across renames; formulas reference fields by display
/// name and the host resolves names to ids at registration time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(String);

impl FieldId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FieldId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Declared result type of a formula field.
///
/// `Auto` leaves the evaluator's value untouched; the other variants ask the
/// engine to convert the raw result before it is handed back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Text,
    Number,
    Date,
    DateTime,
    Boolean,
    Auto,
}

impl Default for ResultType {
    fn default() -> Self {
        Self::Auto
    }
}

/// Configuration supplied by the host when a formula field is created or
/// updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaFieldConfig {
    pub formula: String,
    #[serde(default)]
    pub result_type: ResultType,
    /// Decimal places applied when `result_type` is `Number`.
    #[serde(default)]
    pub precision: u8,
    /// `chrono` format string applied when `result_type` is `Date`/`DateTime`.
    #[serde(default)]
    pub date_format: Option<String>,
}

impl FormulaFieldConfig {
    #[must_use]
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            result_type: ResultType::Auto,
            precision: 0,
            date_format: None,
        }
    }

    #[must_use]
    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    #[must_use]
    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }
}

/// Configuration for a rollup field.
///
/// Rollups aggregate values reached through a link field. The aggregation
/// itself is the host's concern; the engine only needs the dependency pair so
/// the field participates in cycle detection and recomputation ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupFieldConfig {
    pub link_field_id: FieldId,
    pub rollup_field_id: FieldId,
}

impl RollupFieldConfig {
    #[must_use]
    pub fn new(link_field_id: impl Into<FieldId>, rollup_field_id: impl Into<FieldId>) -> Self {
        Self {
            link_field_id: link_field_id.into(),
            rollup_field_id: rollup_field_id.into(),
        }
    }

    /// The fields this rollup reads, in registration order.
    #[must_use]
    pub fn dependency_ids(&self) -> [&FieldId; 2] {
        [&self.link_field_id, &self.rollup_field_id]
    }
}
