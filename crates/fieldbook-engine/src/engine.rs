use crate::ast::ParseError;
use crate::cache::FormulaCache;
use crate::eval::{self, FieldResolver};
use crate::functions;
use crate::graph::{CycleError, DependencyGraph};
use crate::value::Value;
use fieldbook_model::{FieldId, FormulaFieldConfig, ResultType, RollupFieldConfig};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Definition-time rejection of a field configuration.
///
/// This is the only place errors propagate to the host; evaluation-time
/// failures all resolve to `Value::Null`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldConfigError {
    #[error("invalid formula: {0}")]
    Syntax(#[from] ParseError),
    #[error("{0}")]
    Cycle(#[from] CycleError),
}

/// Maps the display names appearing in `{Field Name}` tokens to field ids.
///
/// Owned by the host; the engine consults it only while registering a field.
pub trait FieldDirectory {
    fn field_id(&self, name: &str) -> Option<FieldId>;
}

impl FieldDirectory for HashMap<String, FieldId> {
    fn field_id(&self, name: &str) -> Option<FieldId> {
        self.get(name).cloned()
    }
}

/// Host-owned engine context: the formula cache, the dependency graph and
/// per-field configuration in one explicit object.
///
/// Mutating calls take `&mut self`, so the host serializes writers the same
/// way it serializes any other Rust value; reads work on `&self` and always
/// observe a consistent forward/reverse edge pair.
#[derive(Debug, Default)]
pub struct Engine {
    cache: FormulaCache,
    graph: DependencyGraph,
    formula_fields: HashMap<FieldId, FormulaFieldConfig>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a formula field.
    ///
    /// Parses the formula (through the cache), extracts its field references,
    /// resolves them to ids via `directory` and commits the dependency set.
    /// Fails on a syntax error or a would-be circular reference, leaving the
    /// graph and the field registration unchanged.
    ///
    /// Names the directory cannot resolve are skipped: an unresolved
    /// reference evaluates to null, which is not a definition-time error.
    pub fn register_formula_field(
        &mut self,
        field_id: FieldId,
        config: &FormulaFieldConfig,
        directory: &dyn FieldDirectory,
    ) -> Result<(), FieldConfigError> {
        let ast = self.cache.get_or_parse(&config.formula)?;
        let dependencies: HashSet<FieldId> = ast
            .field_references()
            .iter()
            .filter_map(|name| directory.field_id(name))
            .collect();

        self.graph.add_formula_field(field_id.clone(), dependencies)?;
        self.formula_fields.insert(field_id, config.clone());
        Ok(())
    }

    /// Register a rollup field's dependencies (its link field and the rolled-up
    /// field). The aggregation itself happens in the host; only the graph
    /// contract is shared.
    pub fn register_rollup_field(
        &mut self,
        field_id: FieldId,
        config: &RollupFieldConfig,
    ) -> Result<(), CycleError> {
        let dependencies: HashSet<FieldId> =
            config.dependency_ids().into_iter().cloned().collect();
        self.graph.add_formula_field(field_id, dependencies)
    }

    /// Remove a field from the graph and drop its configuration.
    pub fn remove_field(&mut self, field_id: &FieldId) {
        self.graph.remove_formula_field(field_id);
        self.formula_fields.remove(field_id);
    }

    /// Evaluate a registered formula field against one record's resolved
    /// values, applying the field's declared result type to the raw value.
    ///
    /// Unregistered fields evaluate to `Value::Null`, consistent with the
    /// evaluator's treatment of anything missing.
    pub fn evaluate_field<R: FieldResolver>(&self, field_id: &FieldId, record: &R) -> Value {
        let Some(config) = self.formula_fields.get(field_id) else {
            return Value::Null;
        };
        let Ok(ast) = self.cache.get_or_parse(&config.formula) else {
            // Registration already validated the text; stay safe regardless.
            return Value::Null;
        };
        let raw = eval::evaluate(&ast, record);
        apply_result_type(raw, config)
    }

    /// Evaluate an ad-hoc formula (not tied to a registered field) through the
    /// cache. Syntax errors propagate; runtime failures are null as usual.
    pub fn evaluate_formula<R: FieldResolver>(
        &self,
        text: &str,
        record: &R,
    ) -> Result<Value, ParseError> {
        let ast = self.cache.get_or_parse(text)?;
        Ok(eval::evaluate(&ast, record))
    }

    /// True when the field's formula calls a volatile function (TODAY/NOW):
    /// its value cannot be cached across reads.
    #[must_use]
    pub fn field_is_volatile(&self, field_id: &FieldId) -> bool {
        let Some(config) = self.formula_fields.get(field_id) else {
            return false;
        };
        self.cache
            .get_or_parse(&config.formula)
            .map(|ast| functions::formula_is_volatile(&ast))
            .unwrap_or(false)
    }

    /// The safe recomputation sequence after `changed` is written: every
    /// transitively affected computed field, in topological order.
    #[must_use]
    pub fn recalc_plan(&self, changed: &FieldId) -> Vec<FieldId> {
        let affected: HashSet<FieldId> =
            self.graph.affected_fields(changed).into_iter().collect();
        self.graph.evaluation_order(&affected)
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[must_use]
    pub fn cached_formula_count(&self) -> usize {
        self.cache.entry_count()
    }

    /// Drop all registrations (full rebuilds, tests). The parse cache is kept:
    /// entries stay valid for identical text.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.formula_fields.clear();
    }
}

/// Convert a raw evaluation result to the field's declared result type.
/// Conversions that do not apply resolve to null, like any runtime failure.
fn apply_result_type(value: Value, config: &FormulaFieldConfig) -> Value {
    match config.result_type {
        ResultType::Auto => value,
        ResultType::Text => {
            if value.is_null() {
                Value::Null
            } else {
                Value::Text(value.to_display_string())
            }
        }
        ResultType::Number => match value.coerce_to_number() {
            Some(n) => {
                let factor = 10f64.powi(i32::from(config.precision));
                Value::Number((n * factor).round() / factor)
            }
            None => Value::Null,
        },
        ResultType::Boolean => Value::Bool(value.is_truthy()),
        ResultType::Date => match value.as_date() {
            Some(date) => match &config.date_format {
                Some(format) => Value::Text(date.format(format).to_string()),
                None => Value::Date(date),
            },
            None => Value::Null,
        },
        ResultType::DateTime => match value.as_datetime() {
            Some(dt) => match &config.date_format {
                Some(format) => Value::Text(dt.format(format).to_string()),
                None => Value::DateTime(dt),
            },
            None => Value::Null,
        },
    }
}
