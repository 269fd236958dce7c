use crate::compile_expr::ConstValue;
use crate::ops::{OpCode, OpMeta};
use crate::plan::OperandValue;
use crate::types::CompileOptions;
use serde_json::{json, Map, Number, Value};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Aggregation expression computing `meta` over already-resolved operands.
///
/// Operand counts were validated against the registry by the caller.
pub fn emit(meta: &OpMeta, operands: &[OperandValue], opts: &CompileOptions) -> Value {
    match meta.op {
        OpCode::Add
        | OpCode::Sub
        | OpCode::Mul
        | OpCode::Div
        | OpCode::Eq
        | OpCode::Ne
        | OpCode::Gt
        | OpCode::Gte
        | OpCode::Lt
        | OpCode::Lte
        | OpCode::And
        | OpCode::Or
        | OpCode::If => operator_list(meta.symbol, operands),
        OpCode::Concat => concat(meta.symbol, operands, opts),
        OpCode::Year
        | OpCode::Month
        | OpCode::Day
        | OpCode::Hour
        | OpCode::Minute
        | OpCode::Second
        | OpCode::Millisecond => date_part(meta.symbol, &operands[0], opts),
        OpCode::Date => single(meta.symbol, to_date(&operands[0])),
        OpCode::DateDiff => date_diff(meta.symbol, &operands[0], &operands[1], opts),
        OpCode::Today => today(meta.symbol, operands.first()),
        OpCode::Exists => exists(meta.symbol, &operands[0]),
        OpCode::Size => size(meta.symbol, &operands[0]),
        OpCode::Includes => includes(meta.symbol, &operands[0], &operands[1]),
        OpCode::Length => length(meta.symbol, &operands[0]),
        OpCode::Trim => single(meta.symbol, json!({ "input": operands[0].to_json() })),
        OpCode::ToInt | OpCode::ToLong => single(meta.symbol, operands[0].to_json()),
    }
}

/// Literal form of a constant as the pipeline engine must see it.
///
/// Strings starting with `$` would be read as field paths, so they are wrapped.
pub fn const_json(value: &ConstValue) -> Value {
    match value {
        ConstValue::Null => Value::Null,
        ConstValue::Bool(v) => Value::Bool(*v),
        ConstValue::Number(v) => number_json(*v),
        ConstValue::String(s) if s.starts_with('$') => json!({ "$literal": s }),
        ConstValue::String(s) => Value::String(s.clone()),
    }
}

/// Text rendering of a constant operand of `concat`.
pub fn const_text(value: &ConstValue) -> String {
    match value {
        ConstValue::Null => String::new(),
        ConstValue::Bool(v) => v.to_string(),
        ConstValue::Number(v) => match number_json(*v) {
            Value::Number(n) => n.to_string(),
            _ => v.to_string(),
        },
        ConstValue::String(s) => s.clone(),
    }
}

fn number_json(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::Number(Number::from(v as i64))
    } else {
        Number::from_f64(v).map_or(Value::Null, Value::Number)
    }
}

#[inline]
fn single(symbol: &str, arg: Value) -> Value {
    let mut out = Map::with_capacity(1);
    out.insert(symbol.to_string(), arg);
    Value::Object(out)
}

fn operator_list(symbol: &str, operands: &[OperandValue]) -> Value {
    single(
        symbol,
        Value::Array(operands.iter().map(OperandValue::to_json).collect()),
    )
}

#[inline]
fn to_date(operand: &OperandValue) -> Value {
    json!({ "$toDate": operand.to_json() })
}

fn concat(symbol: &str, operands: &[OperandValue], opts: &CompileOptions) -> Value {
    let parts = operands
        .iter()
        .map(|operand| match operand {
            OperandValue::Literal(value) => {
                let text = const_text(value);
                const_json(&ConstValue::String(text))
            }
            OperandValue::Reference(_) => to_text(operand.to_json(), opts),
        })
        .collect();
    single(symbol, Value::Array(parts))
}

fn to_text(value: Value, opts: &CompileOptions) -> Value {
    json!({
        "$cond": {
            "if": { "$eq": [{ "$type": value }, "date"] },
            "then": {
                "$dateToString": {
                    "date": value,
                    "format": opts.date_format,
                    "timezone": opts.timezone,
                }
            },
            "else": { "$toString": value },
        }
    })
}

fn date_part(symbol: &str, operand: &OperandValue, opts: &CompileOptions) -> Value {
    single(
        symbol,
        json!({
            "date": to_date(operand),
            "timezone": opts.timezone,
        }),
    )
}

fn date_diff(
    symbol: &str,
    start: &OperandValue,
    end: &OperandValue,
    opts: &CompileOptions,
) -> Value {
    single(
        symbol,
        json!({
            "startDate": to_date(start),
            "endDate": to_date(end),
            "unit": opts.date_diff_unit.as_str(),
            "timezone": opts.timezone,
        }),
    )
}

fn today(now: &str, offset_days: Option<&OperandValue>) -> Value {
    let Some(offset) = offset_days else {
        return Value::String(now.to_string());
    };
    let offset_ms = match offset {
        OperandValue::Literal(ConstValue::Number(days)) => number_json(days * MS_PER_DAY as f64),
        other => json!({ "$multiply": [other.to_json(), MS_PER_DAY] }),
    };
    json!({ "$add": [now, offset_ms] })
}

fn exists(symbol: &str, operand: &OperandValue) -> Value {
    json!({ "$ne": [single(symbol, json!([operand.to_json(), null])), null] })
}

fn size(symbol: &str, operand: &OperandValue) -> Value {
    let value = operand.to_json();
    single(
        symbol,
        json!({
            "$cond": {
                "if": { "$isArray": value },
                "then": value,
                "else": [],
            }
        }),
    )
}

fn includes(symbol: &str, array: &OperandValue, needle: &OperandValue) -> Value {
    let array = array.to_json();
    json!({
        "$cond": {
            "if": { "$isArray": array },
            "then": single(symbol, json!([needle.to_json(), array])),
            "else": false,
        }
    })
}

fn length(symbol: &str, operand: &OperandValue) -> Value {
    single(
        symbol,
        json!({ "$toString": { "$ifNull": [operand.to_json(), ""] } }),
    )
}
