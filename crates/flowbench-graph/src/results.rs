//! Distributes a batch execution response back into result nodes.
//!
//! The compute backend answers a batch with a map of result-node id to
//! either a metrics object or `{"error": ...}`. Per-node errors are
//! reported without touching that node's stored data; successful entries
//! replace the previous run's metric vocabulary wholesale.

use flowbench_types::{NodeData, NodeKind, RESULT_METRIC_KEYS};

use crate::store::WorkflowGraph;

/// A server-reported failure for one result node inside an otherwise
/// successful batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeError {
    pub node_id: String,
    pub label: String,
    pub message: String,
}

/// Aggregate outcome of applying one batch response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub success_count: usize,
    pub node_errors: Vec<NodeError>,
}

/// Merge a batch response into `graph`.
///
/// For every result node present in the response: an `error` entry is
/// recorded in the report and the node keeps its prior metrics; otherwise
/// the fixed [`RESULT_METRIC_KEYS`] are stripped (so classification and
/// regression vocabularies never mix across re-runs) and the new fields
/// merged in. Result nodes absent from the response are left alone.
pub fn apply_batch_results(
    graph: &mut WorkflowGraph,
    response: &serde_json::Map<String, serde_json::Value>,
) -> BatchReport {
    let mut report = BatchReport::default();

    let result_ids: Vec<String> = graph
        .nodes_of_kind(NodeKind::Result)
        .map(|n| n.id.clone())
        .collect();

    for id in result_ids {
        let Some(entry) = response.get(&id) else {
            continue;
        };

        let label = graph.node(&id).map(|n| n.label().to_string()).unwrap_or_default();

        if let Some(message) = entry.get("error").and_then(|v| v.as_str()) {
            tracing::warn!(node = %id, %label, %message, "server reported error for result node");
            report.node_errors.push(NodeError {
                node_id: id,
                label,
                message: message.to_string(),
            });
            continue;
        }

        let Some(fields) = entry.as_object() else {
            continue;
        };

        if let Some(node) = graph.node_mut_internal(&id) {
            if let NodeData::Result { metrics, .. } = &mut node.data {
                for key in RESULT_METRIC_KEYS {
                    metrics.remove(*key);
                }
                for (key, value) in fields {
                    metrics.insert(key.clone(), value.clone());
                }
                report.success_count += 1;
            }
        }
    }

    if report.success_count > 0 {
        tracing::info!(updated = report.success_count, "pipeline executed");
    }
    report
}
