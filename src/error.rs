use crate::types::Dialect;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("empty field request")]
    EmptyRequest,
    #[error("invalid expression `{expr}`: {reason}")]
    Syntax { expr: String, reason: String },
    #[error("unknown operation `{name}` in {dialect} expressions")]
    UnknownOperation { name: String, dialect: Dialect },
    #[error("operation `{name}` requires {expected} args, got {actual}")]
    Arity {
        name: String,
        expected: String,
        actual: usize,
    },
    #[error("calculated field `{field}` is defined more than once")]
    DuplicateField { field: String },
    #[error("calculated fields depend on each other: {}", fields.join(", "))]
    CyclicFields { fields: Vec<String> },
}

impl CompileError {
    pub(crate) fn syntax(expr: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}
