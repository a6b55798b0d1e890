//! Wire types for the backend API.

use serde::{Deserialize, Serialize};

use flowbench_types::{Edge, Node};

/// Bearer token issued by `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
}

/// Response to a dataset upload. The columns and preview rows feed the
/// dataset node the upload was initiated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub dataset_id: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub preview: Vec<serde_json::Value>,
    #[serde(default)]
    pub shape: Option<(u64, u64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

/// A saved workflow as the backend stores it: the node and edge lists
/// serialized verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: i64,
    pub name: String,
    pub nodes_json: Vec<Node>,
    pub edges_json: Vec<Edge>,
}

/// One entry of the execution history, including the graph snapshot the
/// run was submitted with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub created_at: String,
    #[serde(default)]
    pub workflow_id: Option<i64>,
    #[serde(default)]
    pub results_summary: Option<serde_json::Value>,
    #[serde(default)]
    pub workflow_snapshot: Option<serde_json::Value>,
}
