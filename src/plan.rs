use crate::compile_expr::{ConstValue, Operation};
use crate::error::CompileError;
use crate::ops::const_json;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

pub const ADD_FIELDS: &str = "$addFields";
pub const DATA_ROOT: &str = "data.";
pub const AUX_ROOT: &str = "aux.";

/// Dotted document path: a persisted `data.*` field or a transient `aux.*` slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    /// Resolves a target field name; names not already rooted go under `data.`.
    pub fn target(name: &str) -> Result<Self, CompileError> {
        let trimmed = name.trim();
        let rooted = trimmed.starts_with(AUX_ROOT) || trimmed.starts_with(DATA_ROOT);
        let path = if rooted {
            Self(trimmed.to_string())
        } else {
            Self(format!("{DATA_ROOT}{trimmed}"))
        };
        if path.base().trim().is_empty() {
            return Err(CompileError::syntax(name, "empty target field name"));
        }
        Ok(path)
    }

    /// Auxiliary slot holding operand `seq` of `op_name` computed for `self`.
    pub fn aux_child(&self, op_name: &str, seq: usize) -> Self {
        Self(format!("{AUX_ROOT}{}-{op_name}{seq}", self.base()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_aux(&self) -> bool {
        self.0.starts_with(AUX_ROOT)
    }

    /// `$`-prefixed form used inside aggregation expressions.
    #[inline]
    pub fn reference(&self) -> String {
        format!("${}", self.0)
    }

    fn base(&self) -> &str {
        self.0
            .strip_prefix(AUX_ROOT)
            .or_else(|| self.0.strip_prefix(DATA_ROOT))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operand as seen by code generation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValue {
    Literal(ConstValue),
    /// `$`-prefixed path into the current document.
    Reference(String),
}

impl OperandValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => const_json(value),
            Self::Reference(path) => Value::String(path.clone()),
        }
    }
}

/// Nested operation that must be materialized at `path` before its consumer runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency<'a> {
    pub operation: &'a Operation,
    pub path: FieldPath,
}

/// One `$addFields` step writing `expression` to `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStage {
    path: FieldPath,
    expression: Value,
}

impl PipelineStage {
    pub fn new(path: FieldPath, expression: Value) -> Self {
        Self { path, expression }
    }

    #[inline]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    #[inline]
    pub fn expression(&self) -> &Value {
        &self.expression
    }

    pub fn to_document(&self) -> Value {
        let mut fields = Map::with_capacity(1);
        fields.insert(self.path.as_str().to_string(), self.expression.clone());
        let mut stage = Map::with_capacity(1);
        stage.insert(ADD_FIELDS.to_string(), Value::Object(fields));
        Value::Object(stage)
    }
}

impl Serialize for PipelineStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Fields<'a>(&'a PipelineStage);

        impl Serialize for Fields<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(self.0.path.as_str(), &self.0.expression)?;
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(ADD_FIELDS, &Fields(self))?;
        map.end()
    }
}

/// Ordered stage list; every `aux.*` path is written before it is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(stages: Vec<PipelineStage>) -> Self {
        Self { stages }
    }

    #[inline]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn into_stages(self) -> Vec<PipelineStage> {
        self.stages
    }

    pub fn into_documents(self) -> Vec<Value> {
        self.stages.iter().map(PipelineStage::to_document).collect()
    }

    pub fn extend(&mut self, other: Pipeline) {
        self.stages.extend(other.stages);
    }

    pub fn aux_paths(&self) -> Vec<&FieldPath> {
        self.stages
            .iter()
            .map(PipelineStage::path)
            .filter(|path| path.is_aux())
            .collect()
    }

    /// `$unset` stage dropping the auxiliary slots, if any were introduced.
    pub fn aux_cleanup_stage(&self) -> Option<Value> {
        let paths: Vec<Value> = self
            .aux_paths()
            .into_iter()
            .map(|path| Value::String(path.as_str().to_string()))
            .collect();
        if paths.is_empty() {
            return None;
        }
        let mut stage = Map::with_capacity(1);
        stage.insert("$unset".to_string(), Value::Array(paths));
        Some(Value::Object(stage))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileManifest {
    /// Number of requested calculated fields.
    pub field_count: usize,
    pub stage_count: usize,
    /// Auxiliary slots introduced for nested operations.
    pub aux_field_count: usize,
    pub lowered_op_count: usize,
    /// Deepest operation nesting seen, root is 1.
    pub max_depth: usize,
    /// End-to-end compile latency in microseconds.
    pub compile_time_us: u64,
}

impl CompileManifest {
    #[inline]
    pub fn summary_line(&self) -> String {
        format!(
            "fields={} stages={} aux={} lowered={} max_depth={} compile_us={}",
            self.field_count,
            self.stage_count,
            self.aux_field_count,
            self.lowered_op_count,
            self.max_depth,
            self.compile_time_us
        )
    }
}
