pub mod compile;
pub mod compile_expr;
pub mod compile_lineage;
pub mod error;
pub mod ops;
pub mod plan;
pub mod types;

pub use compile::{
    build_calculated_field_pipeline, build_calculated_field_pipeline_with_options,
    build_derived_field_pipeline, build_derived_field_pipeline_with_options, compile_operation,
    Planner, SimplePlanner,
};
pub use compile_expr::{
    parse_expression, parse_operation, resolve_operand, split_args, ConstValue, InfoKind,
    Operation, Operator,
};
pub use compile_lineage::{referenced_fields, FieldReferences};
pub use error::CompileError;
pub use plan::{CompileManifest, FieldPath, Pipeline, PipelineStage};
pub use types::{
    CalculatedField, CompileOptions, DateUnit, Dialect, DialectSyntax, FieldRequest,
};

#[cfg(test)]
mod tests;
