//! Pipeline resolution: from the current graph to one executable
//! configuration per result node.
//!
//! For every result node the resolver walks backward through the
//! single-parent chain, recording the first-seen ancestor of each stage
//! type and stopping at the first dataset node. Structural gaps (no model
//! parent, no dataset within the hop bound) exclude that result from the
//! batch silently; a present-but-misconfigured node fails the whole run.
//! That asymmetry is deliberate and pinned by tests.

use std::collections::BTreeMap;

use flowbench_types::{
    FlowError, Node, NodeData, NodeKind, PipelineConfig, Result, DEFAULT_ENCODER,
    DEFAULT_IMPUTER, DEFAULT_MODEL, DEFAULT_SCALER, DEFAULT_TEST_SIZE,
};

use crate::store::WorkflowGraph;

/// Defensive bound on the backward walk, not a derived value.
pub const DEFAULT_MAX_HOPS: usize = 10;

/// Why a result node produced no configuration. All three are silent at
/// batch level; the distinction is surfaced for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The result node has no parent, or its parent is not a model node.
    NoModelParent,
    /// The parent chain ended without reaching a dataset node.
    DatasetNotFound,
    /// The hop bound ran out with ancestry still unexplored.
    MaxHopsExceeded,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoModelParent => f.write_str("no model node feeds this result"),
            SkipReason::DatasetNotFound => f.write_str("no dataset node found in the parent chain"),
            SkipReason::MaxHopsExceeded => f.write_str("hop bound exceeded before a dataset node"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedResult {
    pub node_id: String,
    pub reason: SkipReason,
}

/// The outcome of resolving a graph: configurations keyed by result node
/// id, plus the result nodes that were excluded and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBatch {
    pub configs: BTreeMap<String, PipelineConfig>,
    pub skipped: Vec<SkippedResult>,
}

/// Walks result-node parent chains and assembles [`PipelineConfig`]s.
#[derive(Debug, Clone)]
pub struct Resolver {
    max_hops: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    pub fn with_max_hops(max_hops: usize) -> Self {
        Self { max_hops }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Resolve every result node in `graph`.
    ///
    /// Errors: no result nodes at all; a reachable dataset node with no
    /// file reference; a model node with no target column; or zero
    /// assembled configurations after processing all result nodes.
    pub fn resolve(&self, graph: &WorkflowGraph) -> Result<ResolvedBatch> {
        let result_nodes: Vec<&Node> = graph.nodes_of_kind(NodeKind::Result).collect();
        if result_nodes.is_empty() {
            return Err(FlowError::NoResultNodes);
        }

        let mut configs = BTreeMap::new();
        let mut skipped = Vec::new();

        for result in result_nodes {
            match self.resolve_one(graph, result)? {
                Ok(config) => {
                    configs.insert(result.id.clone(), config);
                }
                Err(reason) => {
                    tracing::debug!(result = %result.id, %reason, "result node excluded from batch");
                    skipped.push(SkippedResult {
                        node_id: result.id.clone(),
                        reason,
                    });
                }
            }
        }

        if configs.is_empty() {
            return Err(FlowError::NoPipelinePaths);
        }
        Ok(ResolvedBatch { configs, skipped })
    }

    /// Resolve a single result node. The outer `Result` is the fail-fast
    /// path (aborts the whole run); the inner one is a silent skip.
    fn resolve_one(
        &self,
        graph: &WorkflowGraph,
        result: &Node,
    ) -> Result<std::result::Result<PipelineConfig, SkipReason>> {
        let model = match graph.parent_of(&result.id) {
            Some(node) if node.kind() == NodeKind::Model => node,
            _ => return Ok(Err(SkipReason::NoModelParent)),
        };

        let mut split: Option<&Node> = None;
        let mut preprocessing: Option<&Node> = None;
        let mut imputation: Option<&Node> = None;
        let mut encoding: Option<&Node> = None;
        let mut dataset: Option<&Node> = None;

        let mut current = graph.parent_of(&model.id);
        let mut hops = 0;
        let mut exhausted = false;

        while let Some(node) = current {
            if hops == self.max_hops {
                exhausted = true;
                break;
            }
            hops += 1;
            match node.kind() {
                // First-seen wins for each slot.
                NodeKind::Split => split = split.or(Some(node)),
                NodeKind::Preprocessing => preprocessing = preprocessing.or(Some(node)),
                NodeKind::Imputation => imputation = imputation.or(Some(node)),
                NodeKind::Encoding => encoding = encoding.or(Some(node)),
                // A dataset node is the start of the pipeline; stop here.
                NodeKind::Dataset => {
                    dataset = Some(node);
                    break;
                }
                NodeKind::Model | NodeKind::Result => {}
            }
            current = graph.parent_of(&node.id);
        }

        let dataset = match dataset {
            Some(node) => node,
            None if exhausted => return Ok(Err(SkipReason::MaxHopsExceeded)),
            None => return Ok(Err(SkipReason::DatasetNotFound)),
        };

        // Present-but-misconfigured nodes are fatal to the whole batch.
        // Order matches the original canvas: dataset emptiness first.
        let file_id = match &dataset.data {
            NodeData::Dataset { file, file_id, .. } => {
                match file_id.as_deref().or(file.as_deref()) {
                    Some(id) if !id.is_empty() => id.to_string(),
                    _ => {
                        return Err(FlowError::EmptyDataset {
                            result: result.label().to_string(),
                        })
                    }
                }
            }
            _ => unreachable!("kind checked above"),
        };

        let (target_column, model_type) = match &model.data {
            NodeData::Model {
                target_column,
                model_type,
                ..
            } => {
                let target = match target_column.as_deref() {
                    Some(col) if !col.is_empty() => col.to_string(),
                    _ => {
                        return Err(FlowError::MissingTargetColumn {
                            result: result.label().to_string(),
                        })
                    }
                };
                (
                    target,
                    model_type.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                )
            }
            _ => unreachable!("kind checked above"),
        };

        Ok(Ok(PipelineConfig {
            file_id,
            target_column,
            scaler_type: slot_string(preprocessing, |d| match d {
                NodeData::Preprocessing { scaler, .. } => scaler.clone(),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_SCALER.to_string()),
            imputer_strategy: slot_string(imputation, |d| match d {
                NodeData::Imputation { strategy, .. } => strategy.clone(),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_IMPUTER.to_string()),
            encoder_strategy: slot_string(encoding, |d| match d {
                NodeData::Encoding { strategy, .. } => strategy.clone(),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_ENCODER.to_string()),
            test_size: split
                .and_then(|n| match &n.data {
                    NodeData::Split { test_size, .. } => *test_size,
                    _ => None,
                })
                .unwrap_or(DEFAULT_TEST_SIZE),
            model_type,
        }))
    }
}

fn slot_string(node: Option<&Node>, pick: impl Fn(&NodeData) -> Option<String>) -> Option<String> {
    node.and_then(|n| pick(&n.data))
}
