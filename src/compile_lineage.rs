use crate::compile_expr::{InfoKind, Operation, Operator};
use std::collections::BTreeSet;

/// Stored data and record metadata read by an expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldReferences {
    /// `data.`-rooted paths.
    pub data: BTreeSet<String>,
    pub info: BTreeSet<InfoKind>,
}

impl FieldReferences {
    /// Whether the expression reads `path` itself or anything below it.
    pub fn reads(&self, path: &str) -> bool {
        self.data.iter().any(|read| {
            read == path
                || read
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
                || path
                    .strip_prefix(read.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

pub fn referenced_fields(operation: &Operation) -> FieldReferences {
    let mut refs = FieldReferences::default();
    collect(operation, &mut refs);
    refs
}

fn collect(operation: &Operation, out: &mut FieldReferences) {
    for operand in operation.operands() {
        match operand {
            Operator::Const(_) => {}
            Operator::Field { path } => {
                out.data.insert(path.clone());
            }
            Operator::Info(kind) => {
                out.info.insert(*kind);
            }
            Operator::Expression(inner) => collect(inner, out),
        }
    }
}
