use serde::{Deserialize, Serialize};
use std::fmt;

/// Surface syntax family an expression is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `{{calc.add({{data.a}};2)}}`
    Calc,
    /// `@exp.add(@field.a;@const(2))`
    Derived,
}

impl Dialect {
    #[inline]
    pub const fn syntax(self) -> &'static DialectSyntax {
        match self {
            Self::Calc => &CALC_SYNTAX,
            Self::Derived => &DERIVED_SYNTAX,
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calc => "calc",
            Self::Derived => "derived",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token grammar shared by the parser and operand resolver.
///
/// Both dialects reference data, constants and nested operations through a
/// delimiter plus a prefix; only the concrete strings differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectSyntax {
    pub dialect: Dialect,
    /// Opening delimiter of a reference token (`{{` or `@`).
    pub open: &'static str,
    /// Closing delimiter of a reference token, empty when the dialect has none.
    pub close: &'static str,
    /// Prefix of a stored-data reference inside the delimiters.
    pub field_prefix: &'static str,
    /// Prefix of a record metadata reference, when the dialect supports it.
    pub info_prefix: Option<&'static str>,
    /// Prefix of a nested operation inside the delimiters.
    pub expression_prefix: &'static str,
    /// Constant wrapper (`const(`, closed by `)`). `None` means constants are bare literals.
    pub const_prefix: Option<&'static str>,
    /// Characters opening/closing a nested argument list, for the arg splitter.
    pub nesting: (char, char),
}

pub const CALC_SYNTAX: DialectSyntax = DialectSyntax {
    dialect: Dialect::Calc,
    open: "{{",
    close: "}}",
    field_prefix: "data.",
    info_prefix: Some("info."),
    expression_prefix: "calc.",
    const_prefix: None,
    nesting: ('{', '}'),
};

pub const DERIVED_SYNTAX: DialectSyntax = DialectSyntax {
    dialect: Dialect::Derived,
    open: "@",
    close: "",
    field_prefix: "field.",
    info_prefix: None,
    expression_prefix: "exp.",
    const_prefix: Some("const("),
    nesting: ('(', ')'),
};

/// Unit reported by `datediff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl DateUnit {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Millisecond => "millisecond",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Olson name or UTC offset passed through to date stages.
    pub timezone: String,
    /// `$dateToString` format used when `concat` receives a date.
    pub date_format: String,
    pub date_diff_unit: DateUnit,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            date_diff_unit: DateUnit::Minute,
        }
    }
}

impl CompileOptions {
    pub fn with_timezone(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            ..Self::default()
        }
    }

    /// Missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedField {
    /// Target field name; stored under `data.` unless it is already rooted.
    pub name: String,
    pub expression: String,
}

impl CalculatedField {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRequest {
    pub fields: Vec<CalculatedField>,
    pub dialect: Dialect,
    pub opts: CompileOptions,
}

impl FieldRequest {
    pub fn new(fields: Vec<CalculatedField>) -> Self {
        Self {
            fields,
            dialect: Dialect::Calc,
            opts: CompileOptions::default(),
        }
    }

    pub fn derived(fields: Vec<CalculatedField>) -> Self {
        Self {
            dialect: Dialect::Derived,
            ..Self::new(fields)
        }
    }

    pub fn with_options(mut self, opts: CompileOptions) -> Self {
        self.opts = opts;
        self
    }
}
