use crate::types::Dialect;

/// Declared result type of an operation. Documentation metadata, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Number,
    Boolean,
    Date,
    Text,
    /// Type of whichever operand is selected at runtime (`if`).
    Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Zero or one operand (`today`).
    NullaryOptional,
    Unary,
    Binary,
    /// Ordered operand list; `max: None` means unbounded.
    NAry { min: usize, max: Option<usize> },
}

impl Arity {
    #[inline]
    pub const fn min(self) -> usize {
        match self {
            Self::NullaryOptional => 0,
            Self::Unary => 1,
            Self::Binary => 2,
            Self::NAry { min, .. } => min,
        }
    }

    #[inline]
    pub const fn max(self) -> Option<usize> {
        match self {
            Self::NullaryOptional => Some(1),
            Self::Unary => Some(1),
            Self::Binary => Some(2),
            Self::NAry { max, .. } => max,
        }
    }

    #[inline]
    pub fn accepts(self, count: usize) -> bool {
        count >= self.min() && self.max().is_none_or(|max| count <= max)
    }

    /// Human-readable bound used in arity errors.
    pub fn describe(self) -> String {
        match (self.min(), self.max()) {
            (min, Some(max)) if min == max => format!("exactly {min}"),
            (min, Some(max)) => format!("{min} to {max}"),
            (min, None) => format!("at least {min}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectSupport {
    Both,
    CalcOnly,
}

impl DialectSupport {
    #[inline]
    pub const fn allows(self, dialect: Dialect) -> bool {
        match self {
            Self::Both => true,
            Self::CalcOnly => matches!(dialect, Dialect::Calc),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
    If,
    Concat,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Date,
    DateDiff,
    Today,
    Exists,
    Size,
    Includes,
    Length,
    Trim,
    ToInt,
    ToLong,
}

impl OpCode {
    pub const COUNT: usize = Self::ToLong as usize + 1;

    #[inline]
    pub const fn as_usize(self) -> usize {
        self as usize
    }
}
