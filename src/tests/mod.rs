use crate::compile::{
    build_calculated_field_pipeline, build_calculated_field_pipeline_with_options,
    build_derived_field_pipeline, Planner,
};
use crate::error::CompileError;
use crate::plan::Pipeline;
use crate::types::{CalculatedField, CompileOptions, DateUnit, FieldRequest};
use crate::SimplePlanner;
use serde_json::{json, Value};

mod compile;

fn calc(expression: &str, field: &str) -> Pipeline {
    build_calculated_field_pipeline(expression, field, "UTC").expect("compile should succeed")
}

fn stage_paths(pipeline: &Pipeline) -> Vec<&str> {
    pipeline
        .stages()
        .iter()
        .map(|stage| stage.path().as_str())
        .collect()
}

fn add_fields(path: &str, expression: Value) -> Value {
    json!({ "$addFields": { path: expression } })
}

/// Text coercion wrapped around dynamic `concat` operands.
fn to_text(reference: &str, timezone: &str) -> Value {
    json!({
        "$cond": {
            "if": { "$eq": [{ "$type": reference }, "date"] },
            "then": {
                "$dateToString": {
                    "date": reference,
                    "format": "%Y-%m-%d",
                    "timezone": timezone,
                }
            },
            "else": { "$toString": reference },
        }
    })
}

fn order_request() -> FieldRequest {
    FieldRequest::new(vec![
        CalculatedField::new("total", "{{calc.mul({{data.subtotal}};1.2)}}"),
        CalculatedField::new("subtotal", "{{calc.add({{data.price}};{{data.shipping}})}}"),
        CalculatedField::new("label", "{{calc.concat('#';{{info.incrementalId}})}}"),
    ])
}
