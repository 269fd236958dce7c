use crate::error::CompileError;
use crate::ops::{Arity, OpCode, OpMeta, OperatorRegistry};
use crate::types::DialectSyntax;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Record metadata readable from expressions. Stored at the record top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InfoKind {
    CreatedAt,
    ModifiedAt,
    IncrementalId,
}

impl InfoKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(Self::CreatedAt),
            "modifiedAt" => Some(Self::ModifiedAt),
            "incrementalId" => Some(Self::IncrementalId),
            _ => None,
        }
    }

    #[inline]
    pub const fn record_path(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::ModifiedAt => "modifiedAt",
            Self::IncrementalId => "incrementalId",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Const(ConstValue),
    /// Stored record data; `path` is rooted at `data.`.
    Field { path: String },
    Info(InfoKind),
    Expression(Box<Operation>),
}

impl Operator {
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Self::Const(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Only `today`: an optional day offset.
    Nullary {
        op: OpCode,
        operand: Option<Operator>,
    },
    Unary {
        op: OpCode,
        operand: Operator,
    },
    Binary {
        op: OpCode,
        lhs: Operator,
        rhs: Operator,
    },
    /// Operand position is significant (`if`: condition, then, else).
    NAry {
        op: OpCode,
        operands: Vec<Operator>,
    },
}

impl Operation {
    /// Builds the variant matching the registry's arity class for `op`.
    pub fn new(op: OpCode, operands: Vec<Operator>) -> Result<Self, CompileError> {
        let meta = OperatorRegistry::meta(op);
        if !meta.arity.accepts(operands.len()) {
            return Err(arity_error(meta, operands.len()));
        }
        match meta.arity {
            Arity::NullaryOptional => Ok(Self::Nullary {
                op,
                operand: operands.into_iter().next(),
            }),
            Arity::Unary => {
                let [operand] = <[Operator; 1]>::try_from(operands)
                    .map_err(|rest| arity_error(meta, rest.len()))?;
                Ok(Self::Unary { op, operand })
            }
            Arity::Binary => {
                let [lhs, rhs] = <[Operator; 2]>::try_from(operands)
                    .map_err(|rest| arity_error(meta, rest.len()))?;
                Ok(Self::Binary { op, lhs, rhs })
            }
            Arity::NAry { .. } => Ok(Self::NAry { op, operands }),
        }
    }

    #[inline]
    pub fn op(&self) -> OpCode {
        match self {
            Self::Nullary { op, .. }
            | Self::Unary { op, .. }
            | Self::Binary { op, .. }
            | Self::NAry { op, .. } => *op,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        OperatorRegistry::meta(self.op()).name
    }

    pub fn operands(&self) -> Vec<&Operator> {
        match self {
            Self::Nullary { operand, .. } => operand.iter().collect(),
            Self::Unary { operand, .. } => vec![operand],
            Self::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Self::NAry { operands, .. } => operands.iter().collect(),
        }
    }

    /// Checks that a hand-built operation agrees with the registry.
    pub fn validate(&self) -> Result<(), CompileError> {
        let meta = OperatorRegistry::meta(self.op());
        let shape_matches = match (self, meta.arity) {
            (Self::Nullary { .. }, Arity::NullaryOptional)
            | (Self::Unary { .. }, Arity::Unary)
            | (Self::Binary { .. }, Arity::Binary) => true,
            (Self::NAry { operands, .. }, arity @ Arity::NAry { .. }) => {
                arity.accepts(operands.len())
            }
            _ => false,
        };
        if !shape_matches {
            return Err(arity_error(meta, self.operands().len()));
        }
        for operand in self.operands() {
            if let Operator::Expression(inner) = operand {
                inner.validate()?;
            }
        }
        Ok(())
    }
}

fn arity_error(meta: &OpMeta, actual: usize) -> CompileError {
    CompileError::Arity {
        name: meta.name.to_string(),
        expected: meta.arity.describe(),
        actual,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Splits an argument list on top-level `;`.
///
/// Separators inside quotes or inside `nesting` pairs are kept. Unbalanced
/// input is not rejected here.
pub fn split_args(input: &str, nesting: (char, char)) -> Vec<&str> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    let (open, close) = nesting;
    let mut args = Vec::new();
    let mut quote = Quote::None;
    let mut depth: isize = 0;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match (quote, ch) {
            (Quote::None, '\'') => quote = Quote::Single,
            (Quote::None, '"') => quote = Quote::Double,
            (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::None,
            (Quote::None, c) if c == open => depth += 1,
            (Quote::None, c) if c == close => depth -= 1,
            (Quote::None, ';') if depth == 0 => {
                args.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    args.push(&input[start..]);
    args
}

/// Parses the whole expression; its root must be an operation.
pub fn parse_expression(source: &str, syntax: &DialectSyntax) -> Result<Operation, CompileError> {
    match resolve_operand(source, syntax)? {
        Operator::Expression(operation) => Ok(*operation),
        _ => Err(CompileError::syntax(
            source,
            format!(
                "top-level expression must be an operation (`{}{}...{}`)",
                syntax.open, syntax.expression_prefix, syntax.close
            ),
        )),
    }
}

/// Parses `name(arg;arg;...)` with the delimiter and prefix already stripped.
pub fn parse_operation(token: &str, syntax: &DialectSyntax) -> Result<Operation, CompileError> {
    let token = token.trim();
    let Some(open) = token.find('(') else {
        return Err(CompileError::syntax(token, "missing argument list"));
    };
    let Some(body) = token[open + 1..].strip_suffix(')') else {
        return Err(CompileError::syntax(token, "unterminated argument list"));
    };
    let name = token[..open].trim();
    let meta = OperatorRegistry::get_for(name, syntax.dialect).ok_or_else(|| {
        CompileError::UnknownOperation {
            name: name.to_string(),
            dialect: syntax.dialect,
        }
    })?;

    let raw_args = split_args(body, syntax.nesting);
    let mut operands = Vec::with_capacity(raw_args.len());
    for raw in raw_args {
        if raw.trim().is_empty() {
            return Err(CompileError::syntax(token, "empty argument"));
        }
        operands.push(resolve_operand(raw, syntax)?);
    }
    Operation::new(meta.op, operands)
}

pub fn resolve_operand(token: &str, syntax: &DialectSyntax) -> Result<Operator, CompileError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CompileError::syntax(token, "empty operand"));
    }
    if let Some(rest) = token.strip_prefix(syntax.open) {
        let Some(inner) = rest.strip_suffix(syntax.close) else {
            return Err(CompileError::syntax(
                token,
                format!("unterminated `{}` delimiter", syntax.open),
            ));
        };
        return resolve_reference(inner.trim(), token, syntax);
    }
    if syntax.const_prefix.is_some() {
        return Err(CompileError::syntax(
            token,
            format!("operand must start with `{}`", syntax.open),
        ));
    }
    parse_literal(token)
        .map(Operator::Const)
        .ok_or_else(|| CompileError::syntax(token, format!("invalid literal `{token}`")))
}

fn resolve_reference(
    inner: &str,
    token: &str,
    syntax: &DialectSyntax,
) -> Result<Operator, CompileError> {
    if let Some(name) = inner.strip_prefix(syntax.field_prefix) {
        let name = name.trim();
        if name.is_empty() {
            return Err(CompileError::syntax(token, "empty field name"));
        }
        return Ok(Operator::Field {
            path: format!("data.{name}"),
        });
    }
    if let Some(kind) = syntax.info_prefix.and_then(|p| inner.strip_prefix(p)) {
        let kind = kind.trim();
        return InfoKind::parse(kind)
            .map(Operator::Info)
            .ok_or_else(|| CompileError::syntax(token, format!("unknown record info `{kind}`")));
    }
    if let Some(operation) = inner.strip_prefix(syntax.expression_prefix) {
        return parse_operation(operation, syntax).map(|op| Operator::Expression(Box::new(op)));
    }
    if let Some(rest) = syntax.const_prefix.and_then(|p| inner.strip_prefix(p)) {
        let Some(raw) = rest.strip_suffix(')') else {
            return Err(CompileError::syntax(token, "unterminated constant"));
        };
        let raw = raw.trim();
        let value = parse_literal(raw).unwrap_or_else(|| ConstValue::String(raw.to_string()));
        return Ok(Operator::Const(value));
    }
    Err(CompileError::syntax(
        token,
        format!("unknown reference `{inner}`"),
    ))
}

fn parse_literal(raw: &str) -> Option<ConstValue> {
    if let Some(text) = unquote(raw) {
        return Some(ConstValue::String(text.to_string()));
    }
    match raw {
        "true" => return Some(ConstValue::Bool(true)),
        "false" => return Some(ConstValue::Bool(false)),
        "null" => return Some(ConstValue::Null),
        _ => {}
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(ConstValue::Number)
}

fn unquote(raw: &str) -> Option<&str> {
    for quote in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some(&raw[1..raw.len() - 1]);
        }
    }
    None
}
