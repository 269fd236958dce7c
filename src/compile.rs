use crate::compile_expr::{parse_expression, Operation, Operator};
use crate::compile_lineage::{referenced_fields, FieldReferences};
use crate::error::CompileError;
use crate::ops::{codegen, OpMeta, OperatorRegistry};
use crate::plan::{CompileManifest, Dependency, FieldPath, OperandValue, Pipeline, PipelineStage};
use crate::types::{CompileOptions, Dialect, FieldRequest};
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

pub trait Planner {
    fn compile(&self, req: &FieldRequest) -> Result<(Pipeline, CompileManifest), CompileError>;
}

#[derive(Debug, Default)]
pub struct SimplePlanner;

impl Planner for SimplePlanner {
    fn compile(&self, req: &FieldRequest) -> Result<(Pipeline, CompileManifest), CompileError> {
        if req.fields.is_empty() {
            return Err(CompileError::EmptyRequest);
        }
        let started_at = Instant::now();
        let syntax = req.dialect.syntax();

        let mut parsed = Vec::with_capacity(req.fields.len());
        let mut seen_targets = HashSet::with_capacity(req.fields.len());
        for field in &req.fields {
            let target = FieldPath::target(&field.name)?;
            if !seen_targets.insert(target.clone()) {
                return Err(CompileError::DuplicateField {
                    field: field.name.clone(),
                });
            }
            let operation = parse_expression(&field.expression, syntax)?;
            let refs = referenced_fields(&operation);
            parsed.push(ParsedField {
                name: &field.name,
                target,
                operation,
                refs,
            });
        }

        let order = order_fields(&parsed)?;
        let mut stats = LowerStats::default();
        let mut ctx = LowerCtx {
            opts: &req.opts,
            reserved: &seen_targets,
            next_aux: 0,
            stats: &mut stats,
        };
        let mut pipeline = Pipeline::default();
        for idx in order {
            let field = &parsed[idx];
            pipeline.extend(ctx.lower_root(&field.operation, &field.target)?);
        }

        let manifest = CompileManifest {
            field_count: parsed.len(),
            stage_count: pipeline.len(),
            aux_field_count: stats.aux_field_count,
            lowered_op_count: stats.lowered_op_count,
            max_depth: stats.max_depth,
            compile_time_us: started_at.elapsed().as_micros() as u64,
        };
        debug!(dialect = %req.dialect, "{}", manifest.summary_line());
        Ok((pipeline, manifest))
    }
}

/// Compiles a calculated field written in the `{{calc...}}` dialect.
#[tracing::instrument(level = "debug", skip(expression))]
pub fn build_calculated_field_pipeline(
    expression: &str,
    field: &str,
    timezone: &str,
) -> Result<Pipeline, CompileError> {
    build_field_pipeline(
        Dialect::Calc,
        expression,
        field,
        &CompileOptions::with_timezone(timezone),
    )
}

pub fn build_calculated_field_pipeline_with_options(
    expression: &str,
    field: &str,
    opts: &CompileOptions,
) -> Result<Pipeline, CompileError> {
    build_field_pipeline(Dialect::Calc, expression, field, opts)
}

/// Compiles a derived field written in the `@exp...` dialect.
#[tracing::instrument(level = "debug", skip(expression))]
pub fn build_derived_field_pipeline(
    expression: &str,
    field: &str,
    timezone: &str,
) -> Result<Pipeline, CompileError> {
    build_field_pipeline(
        Dialect::Derived,
        expression,
        field,
        &CompileOptions::with_timezone(timezone),
    )
}

pub fn build_derived_field_pipeline_with_options(
    expression: &str,
    field: &str,
    opts: &CompileOptions,
) -> Result<Pipeline, CompileError> {
    build_field_pipeline(Dialect::Derived, expression, field, opts)
}

fn build_field_pipeline(
    dialect: Dialect,
    expression: &str,
    field: &str,
    opts: &CompileOptions,
) -> Result<Pipeline, CompileError> {
    let operation = parse_expression(expression, dialect.syntax())?;
    compile_operation(&operation, &FieldPath::target(field)?, opts)
}

/// Lowers an already-parsed operation so that its result lands at `target`.
pub fn compile_operation(
    operation: &Operation,
    target: &FieldPath,
    opts: &CompileOptions,
) -> Result<Pipeline, CompileError> {
    let mut stats = LowerStats::default();
    let reserved = HashSet::from([target.clone()]);
    let pipeline = LowerCtx {
        opts,
        reserved: &reserved,
        next_aux: 0,
        stats: &mut stats,
    }
    .lower_root(operation, target)?;
    debug!(
        target = %target,
        stages = pipeline.len(),
        aux = stats.aux_field_count,
        "compiled operation `{}`",
        operation.name()
    );
    Ok(pipeline)
}

struct ParsedField<'a> {
    name: &'a str,
    target: FieldPath,
    operation: Operation,
    refs: FieldReferences,
}

/// Request order, except that a field reading another requested field comes after it.
fn order_fields(fields: &[ParsedField<'_>]) -> Result<Vec<usize>, CompileError> {
    let deps: Vec<Vec<usize>> = fields
        .iter()
        .map(|field| {
            fields
                .iter()
                .enumerate()
                .filter(|(_, other)| field.refs.reads(other.target.as_str()))
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect();

    let mut order = Vec::with_capacity(fields.len());
    let mut done = vec![false; fields.len()];
    while order.len() < fields.len() {
        let next = (0..fields.len())
            .find(|&idx| !done[idx] && deps[idx].iter().all(|&dep| done[dep]));
        let Some(idx) = next else {
            let fields = (0..fields.len())
                .filter(|&idx| !done[idx] && on_cycle(&deps, idx))
                .map(|idx| fields[idx].name.to_string())
                .collect();
            return Err(CompileError::CyclicFields { fields });
        };
        done[idx] = true;
        order.push(idx);
    }
    Ok(order)
}

/// Whether `start` can reach itself through `deps`.
fn on_cycle(deps: &[Vec<usize>], start: usize) -> bool {
    let mut seen = vec![false; deps.len()];
    let mut stack = deps[start].clone();
    while let Some(idx) = stack.pop() {
        if idx == start {
            return true;
        }
        if !std::mem::replace(&mut seen[idx], true) {
            stack.extend_from_slice(&deps[idx]);
        }
    }
    false
}

#[derive(Debug, Default)]
struct LowerStats {
    lowered_op_count: usize,
    aux_field_count: usize,
    max_depth: usize,
}

/// One operation's stage plus the stages its nested operands need first.
struct Lowered {
    stage: PipelineStage,
    dependencies: Vec<PipelineStage>,
}

impl Lowered {
    fn into_stages(self) -> Vec<PipelineStage> {
        let mut stages = self.dependencies;
        stages.push(self.stage);
        stages
    }
}

struct LowerCtx<'a> {
    opts: &'a CompileOptions,
    /// Requested targets; generated aux slots never take one of these paths.
    reserved: &'a HashSet<FieldPath>,
    /// Aux slot sequence, local to one compile call.
    next_aux: usize,
    stats: &'a mut LowerStats,
}

impl LowerCtx<'_> {
    fn lower_root(
        &mut self,
        operation: &Operation,
        target: &FieldPath,
    ) -> Result<Pipeline, CompileError> {
        operation.validate()?;
        Ok(Pipeline::new(
            self.lower_operation(operation, target, 1).into_stages(),
        ))
    }

    fn lower_operation(
        &mut self,
        operation: &Operation,
        target: &FieldPath,
        depth: usize,
    ) -> Lowered {
        let meta = OperatorRegistry::meta(operation.op());
        self.stats.lowered_op_count += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let operands = operation.operands();
        let mut values = Vec::with_capacity(operands.len());
        let mut dependencies = Vec::new();
        for operand in operands {
            let (value, dependency) = self.operand_value(operand, meta, target);
            if let Some(dependency) = dependency {
                dependencies.extend(self.lower_dependency(dependency, depth + 1));
            }
            values.push(value);
        }

        let expression = codegen::emit(meta, &values, self.opts);
        Lowered {
            stage: PipelineStage::new(target.clone(), expression),
            dependencies,
        }
    }

    fn lower_dependency(&mut self, dependency: Dependency<'_>, depth: usize) -> Vec<PipelineStage> {
        self.lower_operation(dependency.operation, &dependency.path, depth)
            .into_stages()
    }

    fn next_aux_path(&mut self, target: &FieldPath, op_name: &str) -> FieldPath {
        loop {
            let path = target.aux_child(op_name, self.next_aux);
            self.next_aux += 1;
            if !self.reserved.contains(&path) {
                return path;
            }
        }
    }

    fn operand_value<'o>(
        &mut self,
        operand: &'o Operator,
        meta: &OpMeta,
        target: &FieldPath,
    ) -> (OperandValue, Option<Dependency<'o>>) {
        match operand {
            Operator::Const(value) => (OperandValue::Literal(value.clone()), None),
            Operator::Field { path } => (OperandValue::Reference(format!("${path}")), None),
            Operator::Info(kind) => (
                OperandValue::Reference(format!("${}", kind.record_path())),
                None,
            ),
            Operator::Expression(inner) => {
                let path = self.next_aux_path(target, meta.name);
                self.stats.aux_field_count += 1;
                (
                    OperandValue::Reference(path.reference()),
                    Some(Dependency {
                        operation: inner.as_ref(),
                        path,
                    }),
                )
            }
        }
    }
}
