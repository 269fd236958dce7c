use crate::ops::{Arity, DialectSupport, OpCode, ResultType};
use crate::types::Dialect;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct OpMeta {
    /// Surface operation name, used at parse/validation time.
    pub name: &'static str,
    /// Internal opcode carried by the AST.
    pub op: OpCode,
    /// Aggregation operator (or system variable) the stage is built around.
    pub symbol: &'static str,
    pub arity: Arity,
    pub result: ResultType,
    pub dialects: DialectSupport,
}

pub struct OperatorRegistry;

impl OperatorRegistry {
    pub fn get(name: &str) -> Option<&'static OpMeta> {
        let index = REGISTRY_INDEX.get_or_init(build_registry_index);
        index.by_name.get(name).map(|idx| &OP_METAS[*idx])
    }

    /// Lookup restricted to operations available in `dialect`.
    pub fn get_for(name: &str, dialect: Dialect) -> Option<&'static OpMeta> {
        Self::get(name).filter(|meta| meta.dialects.allows(dialect))
    }

    pub fn meta(op: OpCode) -> &'static OpMeta {
        let index = REGISTRY_INDEX.get_or_init(build_registry_index);
        &OP_METAS[index.by_op[op.as_usize()]]
    }

    pub fn all() -> &'static [OpMeta] {
        &OP_METAS
    }
}

struct RegistryIndex {
    by_name: HashMap<&'static str, usize>,
    by_op: [usize; OpCode::COUNT],
}

static REGISTRY_INDEX: OnceLock<RegistryIndex> = OnceLock::new();
const MISSING_IDX: usize = usize::MAX;

fn build_registry_index() -> RegistryIndex {
    let mut by_name = HashMap::with_capacity(OP_METAS.len());
    let mut by_op = [MISSING_IDX; OpCode::COUNT];

    for (idx, meta) in OP_METAS.iter().enumerate() {
        validate_meta(meta);
        if by_name.insert(meta.name, idx).is_some() {
            panic!("duplicate operation name in registry: {}", meta.name);
        }
        let op_slot = meta.op.as_usize();
        if by_op[op_slot] != MISSING_IDX {
            panic!("duplicate opcode in registry: {:?}", meta.op);
        }
        by_op[op_slot] = idx;
    }

    for (op_slot, idx) in by_op.iter().enumerate() {
        if *idx == MISSING_IDX {
            panic!("opcode slot not registered: {}", op_slot);
        }
    }

    RegistryIndex { by_name, by_op }
}

fn validate_meta(meta: &OpMeta) {
    if let Arity::NAry { min, max } = meta.arity {
        if min == 0 {
            panic!("operation `{}` declares an n-ary arity with min 0", meta.name);
        }
        if max.is_some_and(|max| max < min) {
            panic!("operation `{}` declares max arity below min", meta.name);
        }
    }
    if matches!(meta.arity, Arity::NullaryOptional) && meta.op != OpCode::Today {
        panic!(
            "operation `{}` is nullary-optional; only `today` may be",
            meta.name
        );
    }
    if !meta.symbol.starts_with('$') {
        panic!(
            "operation `{}` symbol `{}` is not an aggregation operator",
            meta.name, meta.symbol
        );
    }
}

const VARIADIC: Arity = Arity::NAry { min: 2, max: None };

const fn meta(
    name: &'static str,
    op: OpCode,
    symbol: &'static str,
    arity: Arity,
    result: ResultType,
) -> OpMeta {
    OpMeta {
        name,
        op,
        symbol,
        arity,
        result,
        dialects: DialectSupport::Both,
    }
}

const fn calc_only(meta: OpMeta) -> OpMeta {
    OpMeta {
        dialects: DialectSupport::CalcOnly,
        ..meta
    }
}

static OP_METAS: [OpMeta; OpCode::COUNT] = [
    meta("add", OpCode::Add, "$add", VARIADIC, ResultType::Number),
    meta("sub", OpCode::Sub, "$subtract", Arity::Binary, ResultType::Number),
    meta("mul", OpCode::Mul, "$multiply", VARIADIC, ResultType::Number),
    meta("div", OpCode::Div, "$divide", Arity::Binary, ResultType::Number),
    meta("eq", OpCode::Eq, "$eq", Arity::Binary, ResultType::Boolean),
    meta("ne", OpCode::Ne, "$ne", Arity::Binary, ResultType::Boolean),
    meta("gt", OpCode::Gt, "$gt", Arity::Binary, ResultType::Boolean),
    meta("gte", OpCode::Gte, "$gte", Arity::Binary, ResultType::Boolean),
    meta("lt", OpCode::Lt, "$lt", Arity::Binary, ResultType::Boolean),
    meta("lte", OpCode::Lte, "$lte", Arity::Binary, ResultType::Boolean),
    meta("and", OpCode::And, "$and", VARIADIC, ResultType::Boolean),
    meta("or", OpCode::Or, "$or", VARIADIC, ResultType::Boolean),
    meta(
        "if",
        OpCode::If,
        "$cond",
        Arity::NAry {
            min: 3,
            max: Some(3),
        },
        ResultType::Operand,
    ),
    meta("concat", OpCode::Concat, "$concat", VARIADIC, ResultType::Text),
    meta("year", OpCode::Year, "$year", Arity::Unary, ResultType::Number),
    meta("month", OpCode::Month, "$month", Arity::Unary, ResultType::Number),
    meta("day", OpCode::Day, "$dayOfMonth", Arity::Unary, ResultType::Number),
    meta("hour", OpCode::Hour, "$hour", Arity::Unary, ResultType::Number),
    meta("minute", OpCode::Minute, "$minute", Arity::Unary, ResultType::Number),
    meta("second", OpCode::Second, "$second", Arity::Unary, ResultType::Number),
    meta(
        "millisecond",
        OpCode::Millisecond,
        "$millisecond",
        Arity::Unary,
        ResultType::Number,
    ),
    meta("date", OpCode::Date, "$toDate", Arity::Unary, ResultType::Date),
    meta(
        "datediff",
        OpCode::DateDiff,
        "$dateDiff",
        Arity::Binary,
        ResultType::Number,
    ),
    meta(
        "today",
        OpCode::Today,
        "$$NOW",
        Arity::NullaryOptional,
        ResultType::Date,
    ),
    meta("exists", OpCode::Exists, "$ifNull", Arity::Unary, ResultType::Boolean),
    meta("size", OpCode::Size, "$size", Arity::Unary, ResultType::Number),
    calc_only(meta(
        "includes",
        OpCode::Includes,
        "$in",
        Arity::Binary,
        ResultType::Boolean,
    )),
    calc_only(meta(
        "length",
        OpCode::Length,
        "$strLenCP",
        Arity::Unary,
        ResultType::Number,
    )),
    calc_only(meta("trim", OpCode::Trim, "$trim", Arity::Unary, ResultType::Text)),
    calc_only(meta("toInt", OpCode::ToInt, "$toInt", Arity::Unary, ResultType::Number)),
    calc_only(meta(
        "toLong",
        OpCode::ToLong,
        "$toLong",
        Arity::Unary,
        ResultType::Number,
    )),
];
