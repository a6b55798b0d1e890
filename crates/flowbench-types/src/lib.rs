//! Shared types and errors for the flowbench workspace.
//!
//! This crate provides the foundational types used across all other flowbench crates:
//! - `FlowError` — unified error taxonomy
//! - `NodeKind` / `NodeData` / `Node` / `Edge` — the canvas graph data model
//! - `PipelineConfig` — the per-result execution payload assembled by the resolver

use serde::{Deserialize, Serialize};

/// Unified error type for all flowbench subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    // === Graph / resolver errors ===
    #[error("Workflow validation failed: {0}")]
    ValidationError(String),

    #[error("Dataset node connected to {result} is empty")]
    EmptyDataset { result: String },

    #[error("Model node connected to {result} has no target column")]
    MissingTargetColumn { result: String },

    #[error("Add a Result node to see output!")]
    NoResultNodes,

    #[error("No valid pipeline paths found. Connect Dataset -> Model -> Result.")]
    NoPipelinePaths,

    #[error("No node with id '{id}' in the graph")]
    UnknownNode { id: String },

    #[error("Node '{id}' is a {expected} node; its data cannot become {actual}")]
    KindMismatch {
        id: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    // === Client errors ===
    #[error("Upload is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Workflow '{id}' not found in the backend store")]
    WorkflowNotFound { id: String },

    #[error("No access token set; log in first")]
    AuthRequired,

    #[error("Server returned HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Transport error: {0}")]
    Transport(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl FlowError {
    /// Returns `true` for errors in the fail-fast validation taxonomy:
    /// a misconfigured-but-present node aborts the whole batch.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FlowError::ValidationError(_)
                | FlowError::EmptyDataset { .. }
                | FlowError::MissingTargetColumn { .. }
                | FlowError::NoResultNodes
                | FlowError::NoPipelinePaths
        )
    }

    /// Maps the error to an HTTP status code for server mode.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FlowError::Api { status, .. } => Some(*status),
            FlowError::AuthRequired => Some(401),
            FlowError::WorkflowNotFound { .. } => Some(404),
            FlowError::FileTooLarge { .. } => Some(413),
            e if e.is_validation() => Some(400),
            _ => None,
        }
    }
}

/// A convenience alias for `Result<T, FlowError>`.
pub type Result<T> = std::result::Result<T, FlowError>;

// ---------------------------------------------------------------------------
// NodeKind — the seven pipeline stage types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Dataset,
    Imputation,
    Encoding,
    Preprocessing,
    Split,
    Model,
    Result,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Dataset,
        NodeKind::Imputation,
        NodeKind::Encoding,
        NodeKind::Preprocessing,
        NodeKind::Split,
        NodeKind::Model,
        NodeKind::Result,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Dataset => "dataset",
            NodeKind::Imputation => "imputation",
            NodeKind::Encoding => "encoding",
            NodeKind::Preprocessing => "preprocessing",
            NodeKind::Split => "split",
            NodeKind::Model => "model",
            NodeKind::Result => "result",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NodeData — tagged per-kind payload
// ---------------------------------------------------------------------------

/// Per-kind node payload. Tagged with `"type"` on the wire so a serialized
/// node reads `{"id": ..., "type": "dataset", "label": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeData {
    Dataset {
        label: String,
        /// Raw filename, set when a file was chosen but not yet uploaded.
        #[serde(default)]
        file: Option<String>,
        /// Backend identifier assigned by the upload endpoint.
        #[serde(default)]
        file_id: Option<String>,
        #[serde(default)]
        columns: Vec<String>,
        #[serde(default)]
        preview: Vec<serde_json::Value>,
        /// (rows, cols)
        #[serde(default)]
        shape: Option<(u64, u64)>,
    },
    Imputation {
        label: String,
        #[serde(default)]
        strategy: Option<String>,
    },
    Encoding {
        label: String,
        #[serde(default)]
        strategy: Option<String>,
    },
    Preprocessing {
        label: String,
        #[serde(default)]
        scaler: Option<String>,
    },
    Split {
        label: String,
        #[serde(default)]
        test_size: Option<f64>,
    },
    Model {
        label: String,
        #[serde(default)]
        target_column: Option<String>,
        #[serde(default)]
        model_type: Option<String>,
        /// Mirrored from the dataset node so target-column selectors stay in sync.
        #[serde(default)]
        columns: Vec<String>,
    },
    Result {
        label: String,
        /// Last execution's metrics (or server-reported error), open-schema.
        #[serde(default)]
        metrics: serde_json::Map<String, serde_json::Value>,
    },
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Dataset { .. } => NodeKind::Dataset,
            NodeData::Imputation { .. } => NodeKind::Imputation,
            NodeData::Encoding { .. } => NodeKind::Encoding,
            NodeData::Preprocessing { .. } => NodeKind::Preprocessing,
            NodeData::Split { .. } => NodeKind::Split,
            NodeData::Model { .. } => NodeKind::Model,
            NodeData::Result { .. } => NodeKind::Result,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NodeData::Dataset { label, .. }
            | NodeData::Imputation { label, .. }
            | NodeData::Encoding { label, .. }
            | NodeData::Preprocessing { label, .. }
            | NodeData::Split { label, .. }
            | NodeData::Model { label, .. }
            | NodeData::Result { label, .. } => label,
        }
    }

    /// Kind-appropriate default payload for a freshly dropped node.
    pub fn default_for(kind: NodeKind) -> NodeData {
        let label = format!("{kind} node");
        match kind {
            NodeKind::Dataset => NodeData::Dataset {
                label,
                file: None,
                file_id: None,
                columns: Vec::new(),
                preview: Vec::new(),
                shape: None,
            },
            NodeKind::Imputation => NodeData::Imputation {
                label,
                strategy: None,
            },
            NodeKind::Encoding => NodeData::Encoding {
                label,
                strategy: None,
            },
            NodeKind::Preprocessing => NodeData::Preprocessing {
                label,
                scaler: None,
            },
            NodeKind::Split => NodeData::Split {
                label,
                test_size: None,
            },
            NodeKind::Model => NodeData::Model {
                label,
                target_column: None,
                model_type: None,
                columns: Vec::new(),
            },
            NodeKind::Result => NodeData::Result {
                label,
                metrics: serde_json::Map::new(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Node, Edge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A canvas node. The kind lives inside the flattened [`NodeData`] tag and
/// is immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub position: Position,
    #[serde(flatten)]
    pub data: NodeData,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn label(&self) -> &str {
        self.data.label()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: u32,
}

/// A directed edge between two nodes. The styling sync pass keeps `style`
/// consistent with the source node's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub animated: bool,
    pub style: EdgeStyle,
}

// ---------------------------------------------------------------------------
// PipelineConfig — the per-result execution payload
// ---------------------------------------------------------------------------

pub const DEFAULT_SCALER: &str = "None";
pub const DEFAULT_IMPUTER: &str = "mean";
pub const DEFAULT_ENCODER: &str = "onehot";
pub const DEFAULT_TEST_SIZE: f64 = 0.2;
pub const DEFAULT_MODEL: &str = "Logistic Regression";

/// Metric fields stripped from a result node before merging a new run's
/// output, so classification and regression vocabularies never mix.
pub const RESULT_METRIC_KEYS: &[&str] = &[
    "r2_score",
    "mse",
    "mae",
    "accuracy",
    "classification_report",
    "confusion_matrix",
    "is_regression",
];

/// One resolved pipeline, derived per result node; never persisted
/// independently of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub file_id: String,
    pub target_column: String,
    pub scaler_type: String,
    pub imputer_strategy: String,
    pub encoder_strategy: String,
    pub test_size: f64,
    pub model_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_empty_dataset() {
        let err = FlowError::EmptyDataset {
            result: "Evaluation Metrics".into(),
        };
        assert_eq!(
            err.to_string(),
            "Dataset node connected to Evaluation Metrics is empty"
        );
    }

    #[test]
    fn error_display_missing_target_column() {
        let err = FlowError::MissingTargetColumn {
            result: "Result".into(),
        };
        assert_eq!(
            err.to_string(),
            "Model node connected to Result has no target column"
        );
    }

    #[test]
    fn error_display_no_pipeline_paths() {
        assert_eq!(
            FlowError::NoPipelinePaths.to_string(),
            "No valid pipeline paths found. Connect Dataset -> Model -> Result."
        );
    }

    #[test]
    fn error_display_no_result_nodes() {
        assert_eq!(
            FlowError::NoResultNodes.to_string(),
            "Add a Result node to see output!"
        );
    }

    #[test]
    fn error_display_api() {
        let err = FlowError::Api {
            status: 502,
            detail: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Server returned HTTP 502: bad gateway");
    }

    #[test]
    fn error_display_kind_mismatch() {
        let err = FlowError::KindMismatch {
            id: "n1".into(),
            expected: NodeKind::Dataset,
            actual: NodeKind::Model,
        };
        assert_eq!(
            err.to_string(),
            "Node 'n1' is a dataset node; its data cannot become model"
        );
    }

    #[test]
    fn validation_taxonomy() {
        assert!(FlowError::NoPipelinePaths.is_validation());
        assert!(FlowError::EmptyDataset { result: "R".into() }.is_validation());
        assert!(FlowError::MissingTargetColumn { result: "R".into() }.is_validation());
        assert!(!FlowError::AuthRequired.is_validation());
        assert!(!FlowError::Transport("boom".into()).is_validation());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(FlowError::AuthRequired.http_status(), Some(401));
        assert_eq!(
            FlowError::WorkflowNotFound { id: "w".into() }.http_status(),
            Some(404)
        );
        assert_eq!(
            FlowError::FileTooLarge { size: 1, limit: 0 }.http_status(),
            Some(413)
        );
        assert_eq!(FlowError::NoPipelinePaths.http_status(), Some(400));
        assert_eq!(
            FlowError::Api { status: 504, detail: "t".into() }.http_status(),
            Some(504)
        );
        assert_eq!(FlowError::Other("x".into()).http_status(), None);
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FlowError = io_err.into();
        assert!(matches!(err, FlowError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn node_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&NodeKind::Dataset).unwrap(), "\"dataset\"");
        assert_eq!(
            serde_json::to_string(&NodeKind::Preprocessing).unwrap(),
            "\"preprocessing\""
        );
        let kind: NodeKind = serde_json::from_str("\"split\"").unwrap();
        assert_eq!(kind, NodeKind::Split);
    }

    #[test]
    fn node_serializes_with_flattened_type_tag() {
        let node = Node {
            id: "n1".into(),
            position: Position::new(50.0, 50.0),
            data: NodeData::Split {
                label: "Train/Test Split".into(),
                test_size: Some(0.3),
            },
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "n1");
        assert_eq!(json["type"], "split");
        assert_eq!(json["label"], "Train/Test Split");
        assert_eq!(json["test_size"], 0.3);

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn sparse_node_json_deserializes_with_defaults() {
        // Template payloads carry only a label and maybe one field.
        let node: Node = serde_json::from_str(
            r#"{"id": "t2-4", "position": {"x": 1500.0, "y": 100.0},
                "type": "model", "label": "Random Forest", "model_type": "Random Forest"}"#,
        )
        .unwrap();
        assert_eq!(node.kind(), NodeKind::Model);
        match node.data {
            NodeData::Model {
                target_column,
                model_type,
                columns,
                ..
            } => {
                assert_eq!(model_type.as_deref(), Some("Random Forest"));
                assert!(target_column.is_none());
                assert!(columns.is_empty());
            }
            other => panic!("Expected model data, got: {other:?}"),
        }
    }

    #[test]
    fn default_for_every_kind_round_trips() {
        for kind in NodeKind::ALL {
            let data = NodeData::default_for(kind);
            assert_eq!(data.kind(), kind);
            assert_eq!(data.label(), format!("{kind} node"));
            let json = serde_json::to_string(&data).unwrap();
            let back: NodeData = serde_json::from_str(&json).unwrap();
            assert_eq!(back, data);
        }
    }

    #[test]
    fn pipeline_config_serialization() {
        let config = PipelineConfig {
            file_id: "abc".into(),
            target_column: "y".into(),
            scaler_type: DEFAULT_SCALER.into(),
            imputer_strategy: DEFAULT_IMPUTER.into(),
            encoder_strategy: DEFAULT_ENCODER.into(),
            test_size: 0.3,
            model_type: "Random Forest".into(),
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["file_id"], "abc");
        assert_eq!(json["scaler_type"], "None");
        assert_eq!(json["imputer_strategy"], "mean");
        assert_eq!(json["encoder_strategy"], "onehot");
        assert_eq!(json["test_size"], 0.3);
    }

    #[test]
    fn metric_strip_set_is_fixed() {
        assert_eq!(RESULT_METRIC_KEYS.len(), 7);
        assert!(RESULT_METRIC_KEYS.contains(&"accuracy"));
        assert!(RESULT_METRIC_KEYS.contains(&"confusion_matrix"));
        // feature_importance survives re-runs; it is not in the strip set.
        assert!(!RESULT_METRIC_KEYS.contains(&"feature_importance"));
    }
}
