//! Autosave snapshot persistence and workflow templates.
//!
//! After every graph mutation the caller persists a [`GraphSnapshot`] to a
//! fixed slot. On session start, [`load_or_seed`] restores the last
//! snapshot or falls back to the seeded default graph. Writes are
//! unconditional overwrites of the prior snapshot; there is no versioning
//! and the last writer wins.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use flowbench_types::{Edge, EdgeStyle, Node, NodeData, NodeKind, Position, Result};

use crate::store::WorkflowGraph;
use crate::styling;

/// Fixed slot name for the most recent graph snapshot.
pub const AUTOSAVE_SLOT: &str = "workspace_autosave";

/// Wholesale serialization of a graph at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// RFC 3339 timestamp of when the snapshot was taken.
    #[serde(default)]
    pub timestamp: String,
}

impl GraphSnapshot {
    pub fn of(graph: &WorkflowGraph) -> Self {
        Self {
            nodes: graph.nodes().to_vec(),
            edges: graph.edges().to_vec(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn into_graph(self) -> WorkflowGraph {
        WorkflowGraph::from_parts(self.nodes, self.edges)
    }
}

fn slot_path(store_root: &Path) -> PathBuf {
    store_root.join(format!("{AUTOSAVE_SLOT}.json"))
}

/// Save the current graph to the autosave slot under `store_root`.
///
/// The directory is created if it does not already exist.
pub async fn save_snapshot(graph: &WorkflowGraph, store_root: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(store_root).await?;
    let path = slot_path(store_root);
    let json = serde_json::to_string_pretty(&GraphSnapshot::of(graph))?;
    tokio::fs::write(&path, json).await?;
    tracing::debug!(path = %path.display(), "graph snapshot saved");
    Ok(path)
}

/// Load the last autosaved snapshot.
///
/// Returns `Ok(None)` when no snapshot exists (first session or after
/// [`clear_snapshot`]).
pub async fn load_snapshot(store_root: &Path) -> Result<Option<GraphSnapshot>> {
    let path = slot_path(store_root);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(&path).await?;
    let snapshot: GraphSnapshot = serde_json::from_str(&json)?;
    Ok(Some(snapshot))
}

/// Delete the autosave slot, if present.
pub async fn clear_snapshot(store_root: &Path) -> Result<()> {
    let path = slot_path(store_root);
    if tokio::fs::try_exists(&path).await? {
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(path = %path.display(), "graph snapshot cleared");
    }
    Ok(())
}

/// Session-start graph: the last autosave if present, else the seeded
/// default (a single dataset node).
pub async fn load_or_seed(store_root: &Path) -> Result<WorkflowGraph> {
    match load_snapshot(store_root).await? {
        Some(snapshot) => Ok(snapshot.into_graph()),
        None => Ok(WorkflowGraph::seed()),
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A named, pre-built workflow. Loading one replaces the active graph
/// wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Template {
    pub fn into_graph(self) -> WorkflowGraph {
        WorkflowGraph::from_parts(self.nodes, self.edges)
    }
}

fn template_node(id: &str, x: f64, data: NodeData) -> Node {
    Node {
        id: id.into(),
        position: Position::new(x, 100.0),
        data,
    }
}

fn template_edge(id: &str, source: &str, target: &str, source_kind: NodeKind) -> Edge {
    Edge {
        id: id.into(),
        source: source.into(),
        target: target.into(),
        animated: true,
        style: EdgeStyle {
            stroke: styling::stroke_for(source_kind).into(),
            stroke_width: styling::STROKE_WIDTH,
        },
    }
}

fn labeled(kind: NodeKind, label: &str) -> NodeData {
    let mut data = NodeData::default_for(kind);
    match &mut data {
        NodeData::Dataset { label: l, .. }
        | NodeData::Imputation { label: l, .. }
        | NodeData::Encoding { label: l, .. }
        | NodeData::Preprocessing { label: l, .. }
        | NodeData::Split { label: l, .. }
        | NodeData::Model { label: l, .. }
        | NodeData::Result { label: l, .. } => *l = label.into(),
    }
    data
}

/// The built-in template catalog.
pub fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            id: "linear-regression".into(),
            name: "Linear Regression Pipeline".into(),
            description: "A standard pipeline for predicting continuous values. \
                          Includes data splitting and linear regression modeling."
                .into(),
            nodes: vec![
                template_node("t1-1", 0.0, labeled(NodeKind::Dataset, "Housing Data")),
                template_node("t1-2", 500.0, labeled(NodeKind::Split, "Train/Test Split")),
                template_node(
                    "t1-3",
                    1000.0,
                    NodeData::Model {
                        label: "Linear Regression".into(),
                        target_column: None,
                        model_type: Some("Linear Regression".into()),
                        columns: Vec::new(),
                    },
                ),
                template_node("t1-4", 1500.0, labeled(NodeKind::Result, "Evaluation Metrics")),
            ],
            edges: vec![
                template_edge("e1-1", "t1-1", "t1-2", NodeKind::Dataset),
                template_edge("e1-2", "t1-2", "t1-3", NodeKind::Split),
                template_edge("e1-3", "t1-3", "t1-4", NodeKind::Model),
            ],
        },
        Template {
            id: "random-forest".into(),
            name: "Random Forest Classifier".into(),
            description: "Robust classification pipeline with feature encoding and \
                          Random Forest ensemble learning."
                .into(),
            nodes: vec![
                template_node("t2-1", 0.0, labeled(NodeKind::Dataset, "Customer Churn")),
                template_node("t2-2", 500.0, labeled(NodeKind::Encoding, "One-Hot Encoding")),
                template_node("t2-3", 1000.0, labeled(NodeKind::Split, "Split Data")),
                template_node(
                    "t2-4",
                    1500.0,
                    NodeData::Model {
                        label: "Random Forest".into(),
                        target_column: None,
                        model_type: Some("Random Forest".into()),
                        columns: Vec::new(),
                    },
                ),
                template_node("t2-5", 2000.0, labeled(NodeKind::Result, "Accuracy Report")),
            ],
            edges: vec![
                template_edge("e2-1", "t2-1", "t2-2", NodeKind::Dataset),
                template_edge("e2-2", "t2-2", "t2-3", NodeKind::Encoding),
                template_edge("e2-3", "t2-3", "t2-4", NodeKind::Split),
                template_edge("e2-4", "t2-4", "t2-5", NodeKind::Model),
            ],
        },
        Template {
            id: "data-cleaning".into(),
            name: "Data Cleaning & Prep".into(),
            description: "Focus on data quality. Handles missing values and performs \
                          feature scaling before visualization."
                .into(),
            nodes: vec![
                template_node("t3-1", 0.0, labeled(NodeKind::Dataset, "Raw Survey Data")),
                template_node("t3-2", 500.0, labeled(NodeKind::Imputation, "Fill Missing Values")),
                template_node("t3-3", 1000.0, labeled(NodeKind::Preprocessing, "Scale Features")),
                template_node("t3-4", 1500.0, labeled(NodeKind::Result, "Cleaned Dataset")),
            ],
            edges: vec![
                template_edge("e3-1", "t3-1", "t3-2", NodeKind::Dataset),
                template_edge("e3-1b", "t3-2", "t3-3", NodeKind::Imputation),
                template_edge("e3-2", "t3-3", "t3-4", NodeKind::Preprocessing),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = WorkflowGraph::seed();
        let model = graph.add_node(NodeKind::Model, Position::new(300.0, 50.0));
        let ds = graph.nodes()[0].id.clone();
        graph.connect(&ds, &model).unwrap();

        let path = save_snapshot(&graph, dir.path()).await.unwrap();
        assert!(path.ends_with("workspace_autosave.json"));

        let snapshot = load_snapshot(dir.path()).await.unwrap().unwrap();
        assert!(!snapshot.timestamp.is_empty());
        let restored = snapshot.into_graph();
        assert_eq!(restored.nodes(), graph.nodes());
        assert_eq!(restored.edges(), graph.edges());
    }

    #[tokio::test]
    async fn load_snapshot_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = WorkflowGraph::seed();
        save_snapshot(&graph, dir.path()).await.unwrap();

        graph.add_node(NodeKind::Result, Position::default());
        save_snapshot(&graph, dir.path()).await.unwrap();

        let snapshot = load_snapshot(dir.path()).await.unwrap().unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
    }

    #[tokio::test]
    async fn clear_then_load_or_seed_yields_default_graph() {
        let dir = tempfile::tempdir().unwrap();
        let graph = WorkflowGraph::seed();
        save_snapshot(&graph, dir.path()).await.unwrap();
        clear_snapshot(dir.path()).await.unwrap();

        let restored = load_or_seed(dir.path()).await.unwrap();
        assert_eq!(restored.nodes().len(), 1);
        assert_eq!(restored.nodes()[0].kind(), NodeKind::Dataset);
        assert_eq!(restored.nodes()[0].label(), "Dataset Node");
    }

    #[tokio::test]
    async fn load_or_seed_prefers_the_autosave() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = WorkflowGraph::seed();
        graph.add_node(NodeKind::Model, Position::default());
        save_snapshot(&graph, dir.path()).await.unwrap();

        let restored = load_or_seed(dir.path()).await.unwrap();
        assert_eq!(restored.nodes().len(), 2);
    }

    #[test]
    fn builtin_templates_are_well_formed() {
        let templates = builtin_templates();
        assert_eq!(templates.len(), 3);
        for template in templates {
            let node_count = template.nodes.len();
            let edge_count = template.edges.len();
            let graph = template.into_graph();
            // Nothing dangling: every template edge survives the sync pass.
            assert_eq!(graph.nodes().len(), node_count);
            assert_eq!(graph.edges().len(), edge_count);
            assert!(graph.nodes().iter().any(|n| n.kind() == NodeKind::Dataset));
            assert!(graph.nodes().iter().any(|n| n.kind() == NodeKind::Result));
        }
    }

    #[test]
    fn template_load_replaces_graph_wholesale() {
        let template = builtin_templates()
            .into_iter()
            .find(|t| t.id == "random-forest")
            .unwrap();
        let graph = template.into_graph();
        assert_eq!(graph.nodes().len(), 5);
        let model = graph.nodes().iter().find(|n| n.kind() == NodeKind::Model).unwrap();
        match &model.data {
            NodeData::Model { model_type, .. } => {
                assert_eq!(model_type.as_deref(), Some("Random Forest"));
            }
            other => panic!("Expected model data, got: {other:?}"),
        }
    }
}
