//! Workflow validation: lint rules and diagnostics.
//!
//! Advisory checks on a [`WorkflowGraph`] ahead of resolution. Structural
//! breakage (duplicate ids, dangling edges, fan-in violations) is an
//! `Error`; anything the resolver would merely skip or fail fast on at run
//! time is a `Warning`. Call [`validate`] for diagnostics or
//! [`validate_or_raise`] to fail on the first `Error`-severity issue.

use std::collections::HashSet;

use flowbench_types::{FlowError, NodeData, NodeKind};

use crate::store::WorkflowGraph;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub node_id: Option<String>,
    pub edge: Option<(String, String)>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct UniqueNodeIdRule;
impl LintRule for UniqueNodeIdRule {
    fn name(&self) -> &str { "unique_node_id" }
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic> {
        let mut seen = HashSet::new();
        graph
            .nodes()
            .iter()
            .filter(|n| !seen.insert(n.id.as_str()))
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!("Node id '{}' appears more than once", n.id),
                node_id: Some(n.id.clone()),
                edge: None,
                fix: Some("Re-create the duplicated node so it gets a fresh id".into()),
            })
            .collect()
    }
}

struct EdgeEndpointsExistRule;
impl LintRule for EdgeEndpointsExistRule {
    fn name(&self) -> &str { "edge_endpoints_exist" }
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic> {
        graph
            .edges()
            .iter()
            .filter(|e| graph.node(&e.source).is_none() || graph.node(&e.target).is_none())
            .map(|e| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!(
                    "Edge {} -> {} references a node that does not exist",
                    e.source, e.target
                ),
                node_id: None,
                edge: Some((e.source.clone(), e.target.clone())),
                fix: Some("Run the edge-sync pass or remove the edge".into()),
            })
            .collect()
    }
}

struct SingleIncomingEdgeRule;
impl LintRule for SingleIncomingEdgeRule {
    fn name(&self) -> &str { "single_incoming_edge" }
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .iter()
            .filter(|n| graph.fan_in(&n.id) > 1)
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: format!(
                    "Node '{}' has {} incoming edges; at most one is allowed",
                    n.id,
                    graph.fan_in(&n.id)
                ),
                node_id: Some(n.id.clone()),
                edge: None,
                fix: Some("Remove the extra incoming edges".into()),
            })
            .collect()
    }
}

struct ResultHasModelRule;
impl LintRule for ResultHasModelRule {
    fn name(&self) -> &str { "result_has_model" }
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic> {
        graph
            .nodes_of_kind(NodeKind::Result)
            .filter(|n| {
                !matches!(graph.parent_of(&n.id), Some(p) if p.kind() == NodeKind::Model)
            })
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!(
                    "Result node '{}' has no model parent and will be excluded from runs",
                    n.label()
                ),
                node_id: Some(n.id.clone()),
                edge: None,
                fix: Some("Connect a model node into the result node".into()),
            })
            .collect()
    }
}

struct ModelTargetColumnRule;
impl LintRule for ModelTargetColumnRule {
    fn name(&self) -> &str { "model_target_column" }
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic> {
        graph
            .nodes_of_kind(NodeKind::Model)
            .filter(|n| match &n.data {
                NodeData::Model { target_column, .. } => {
                    target_column.as_deref().map_or(true, str::is_empty)
                }
                _ => false,
            })
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!(
                    "Model node '{}' has no target column; a run through it will abort",
                    n.label()
                ),
                node_id: Some(n.id.clone()),
                edge: None,
                fix: Some("Pick a target column on the model node".into()),
            })
            .collect()
    }
}

struct DatasetUploadedRule;
impl LintRule for DatasetUploadedRule {
    fn name(&self) -> &str { "dataset_uploaded" }
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic> {
        graph
            .nodes_of_kind(NodeKind::Dataset)
            .filter(|n| match &n.data {
                NodeData::Dataset { file, file_id, .. } => {
                    file.as_deref().map_or(true, str::is_empty)
                        && file_id.as_deref().map_or(true, str::is_empty)
                }
                _ => false,
            })
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!("Dataset node '{}' has no uploaded file", n.label()),
                node_id: Some(n.id.clone()),
                edge: None,
                fix: Some("Upload a dataset file to the node".into()),
            })
            .collect()
    }
}

struct TestSizeRangeRule;
impl LintRule for TestSizeRangeRule {
    fn name(&self) -> &str { "test_size_range" }
    fn apply(&self, graph: &WorkflowGraph) -> Vec<Diagnostic> {
        graph
            .nodes_of_kind(NodeKind::Split)
            .filter_map(|n| match &n.data {
                NodeData::Split { test_size: Some(ts), .. } if !(*ts > 0.0 && *ts < 1.0) => {
                    Some((n, *ts))
                }
                _ => None,
            })
            .map(|(n, ts)| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!(
                    "Split node '{}' has test_size {ts}; expected a fraction in (0, 1)",
                    n.label()
                ),
                node_id: Some(n.id.clone()),
                edge: None,
                fix: Some("Use a test fraction such as 0.2".into()),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all built-in lint rules and return collected diagnostics.
pub fn validate(graph: &WorkflowGraph) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(UniqueNodeIdRule),
        Box::new(EdgeEndpointsExistRule),
        Box::new(SingleIncomingEdgeRule),
        Box::new(ResultHasModelRule),
        Box::new(ModelTargetColumnRule),
        Box::new(DatasetUploadedRule),
        Box::new(TestSizeRangeRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(graph));
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic found.
pub fn validate_or_raise(graph: &WorkflowGraph) -> flowbench_types::Result<Vec<Diagnostic>> {
    let diagnostics = validate(graph);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        return Err(FlowError::ValidationError(messages.join("; ")));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
