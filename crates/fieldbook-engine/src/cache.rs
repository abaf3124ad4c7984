use crate::ast::{Expr, ParseError};
use crate::parser;
use dashmap::DashMap;
use std::sync::Arc;

/// Memoizes formula text -> parsed AST so a formula is parsed once and
/// evaluated many times.
///
/// The cache is append-only and never evicted: the same text always parses
/// identically, so entries cannot go stale. Growth is bounded by the number of
/// distinct formula texts a deployment defines; hosts that generate formulas
/// dynamically should watch [`FormulaCache::entry_count`].
///
/// Concurrent first-time parses of the same text are deduplicated by the
/// underlying map; re-parsing is idempotent either way.
#[derive(Debug, Default)]
pub struct FormulaCache {
    asts: DashMap<Arc<str>, Arc<Expr>>,
}

impl FormulaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.asts.len()
    }

    /// Look up the AST for `text`, parsing and inserting on first sight.
    ///
    /// Parse failures are not cached; a formula that fails to parse is
    /// rejected at definition time and never reaches steady-state evaluation.
    pub fn get_or_parse(&self, text: &str) -> Result<Arc<Expr>, ParseError> {
        if let Some(ast) = self.asts.get(text) {
            return Ok(Arc::clone(&ast));
        }

        let ast = Arc::new(parser::parse_formula(text)?);
        let entry = self
            .asts
            .entry(Arc::from(text))
            .or_insert_with(|| Arc::clone(&ast));
        Ok(Arc::clone(&entry))
    }
}
