use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Byte range in the original formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Lexical or grammatical violation reported at definition time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (at {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Parsed formula expression.
///
/// Construction is the parser's sole responsibility; the tree is immutable
/// once built and contains no back-references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    String(String),
    Boolean(bool),
    /// Reference to another field's value, resolved at evaluation time.
    FieldRef(String),
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
}

impl Expr {
    /// Distinct field names referenced anywhere in the tree, including names
    /// nested inside function-call arguments.
    ///
    /// Walks with an explicit stack so adversarially deep trees cannot
    /// overflow the call stack.
    #[must_use]
    pub fn field_references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Expr::Number(_) | Expr::String(_) | Expr::Boolean(_) => {}
                Expr::FieldRef(name) => {
                    out.insert(name.clone());
                }
                Expr::FunctionCall { args, .. } => stack.extend(args.iter()),
                Expr::Binary { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
                Expr::Unary { operand, .. } => stack.push(operand),
            }
        }
        out
    }

    /// Stable JSON serialization useful for debugging/tests.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Expr should be JSON-serializable")
    }
}
