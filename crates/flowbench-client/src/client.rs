use serde_json::json;

use flowbench_graph::{apply_batch_results, BatchReport, Resolver, WorkflowGraph};
use flowbench_types::{FlowError, PipelineConfig, Result};

use crate::types::{
    DatasetSummary, HistoryEntry, Token, UploadResponse, UserProfile, WorkflowRecord,
};

/// Client-side cap on dataset uploads, enforced before any bytes are sent.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build a client from `FLOWBENCH_API_URL` and `FLOWBENCH_TOKEN`.
    /// Both are optional; the URL falls back to the local dev server.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("FLOWBENCH_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut client = Self::new(base_url);
        if let Ok(token) = std::env::var("FLOWBENCH_TOKEN") {
            client.token = Some(token);
        }
        client
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn bearer(&self) -> Result<&str> {
        self.token.as_deref().ok_or(FlowError::AuthRequired)
    }

    // -- auth ---------------------------------------------------------------

    /// Log in with form-encoded credentials. The returned token is
    /// retained on the client for subsequent calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Token> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        let token: Token = handle_response(resp).await?;
        self.token = Some(token.access_token.clone());
        tracing::debug!(username, "logged in");
        Ok(token)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserProfile> {
        let resp = self
            .http
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        handle_response(resp).await
    }

    pub async fn me(&self) -> Result<UserProfile> {
        self.get_json("/auth/me").await
    }

    // -- datasets -----------------------------------------------------------

    /// Upload a CSV as multipart form data. Files over [`MAX_UPLOAD_BYTES`]
    /// are rejected locally without contacting the server.
    pub async fn upload_dataset(&self, path: &std::path::Path) -> Result<UploadResponse> {
        let token = self.bearer()?;
        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(FlowError::FileTooLarge {
                size,
                limit: MAX_UPLOAD_BYTES,
            });
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset.csv".to_string());
        let bytes = tokio::fs::read(path).await?;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        handle_response(resp).await
    }

    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>> {
        self.get_json("/datasets").await
    }

    pub async fn delete_dataset(&self, id: &str) -> Result<()> {
        let token = self.bearer()?;
        let resp = self
            .http
            .delete(self.url(&format!("/datasets/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        let _: serde_json::Value = handle_response(resp).await?;
        Ok(())
    }

    /// Histogram and correlation summary for an uploaded dataset. The
    /// shape of the summary is backend-defined; it is passed through
    /// opaquely.
    pub async fn analyze_dataset(&self, dataset_id: &str) -> Result<serde_json::Value> {
        let token = self.bearer()?;
        let resp = self
            .http
            .post(self.url("/analyze"))
            .bearer_auth(token)
            .json(&json!({ "file_id": dataset_id }))
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        handle_response(resp).await
    }

    // -- pipeline execution -------------------------------------------------

    /// Submit one batch of resolved pipeline configs. Each entry carries
    /// the full graph snapshot so the server can record what was run.
    pub async fn run_batch(
        &self,
        graph: &WorkflowGraph,
        configs: &std::collections::BTreeMap<String, PipelineConfig>,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let token = self.bearer()?;
        let snapshot = json!({ "nodes": graph.nodes(), "edges": graph.edges() });
        let mut payload = serde_json::Map::new();
        for (result_id, config) in configs {
            let mut entry = serde_json::to_value(config)?;
            if let Some(obj) = entry.as_object_mut() {
                obj.insert("workflow_snapshot".into(), snapshot.clone());
            }
            payload.insert(result_id.clone(), entry);
        }

        let resp = self
            .http
            .post(self.url("/run_pipeline_batch"))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        handle_response(resp).await
    }

    /// Resolve, submit, and merge: the whole run-pipeline interaction.
    /// Resolution failures and transport failures abort before any node
    /// data is touched; per-node server errors are reported in the
    /// returned [`BatchReport`].
    pub async fn execute(&self, graph: &mut WorkflowGraph, resolver: &Resolver) -> Result<BatchReport> {
        let batch = resolver.resolve(graph)?;
        tracing::info!(
            pipelines = batch.configs.len(),
            skipped = batch.skipped.len(),
            "submitting pipeline batch"
        );
        let response = self.run_batch(graph, &batch.configs).await?;
        Ok(apply_batch_results(graph, &response))
    }

    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.get_json("/history").await
    }

    // -- workflows ----------------------------------------------------------

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>> {
        self.get_json("/workflows").await
    }

    pub async fn save_workflow(&self, name: &str, graph: &WorkflowGraph) -> Result<WorkflowRecord> {
        let token = self.bearer()?;
        let resp = self
            .http
            .post(self.url("/workflows"))
            .bearer_auth(token)
            .json(&json!({
                "name": name,
                "nodes_json": graph.nodes(),
                "edges_json": graph.edges(),
            }))
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        handle_response(resp).await
    }

    pub async fn delete_workflow(&self, id: i64) -> Result<()> {
        let token = self.bearer()?;
        let resp = self
            .http
            .delete(self.url(&format!("/workflows/{id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        let _: serde_json::Value = handle_response(resp).await?;
        Ok(())
    }

    /// Fetch a saved workflow and rebuild a graph from it. The backend
    /// only exposes a list endpoint, so this lists and filters.
    pub async fn restore_workflow(&self, id: i64) -> Result<WorkflowGraph> {
        let records = self.list_workflows().await?;
        let record = records
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| FlowError::WorkflowNotFound { id: id.to_string() })?;
        Ok(WorkflowGraph::from_parts(record.nodes_json, record.edges_json))
    }

    // -- chat ---------------------------------------------------------------

    /// Ask the assistant a question about the current workflow. The reply
    /// is opaque JSON.
    pub async fn ask(&self, graph: &WorkflowGraph, question: &str) -> Result<serde_json::Value> {
        let token = self.bearer()?;
        let resp = self
            .http
            .post(self.url("/chat"))
            .bearer_auth(token)
            .json(&json!({
                "message": question,
                "workflow": { "nodes": graph.nodes(), "edges": graph.edges() },
            }))
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        handle_response(resp).await
    }

    // -- internals ----------------------------------------------------------

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.bearer()?;
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        handle_response(resp).await
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// Map a response to `T` or to [`FlowError::Api`]. Error bodies use the
/// server's `{"detail": ...}` convention when present, raw text otherwise.
async fn handle_response<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| FlowError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(FlowError::Api {
            status: status.as_u16(),
            detail: extract_detail(&body),
        });
    }

    serde_json::from_str(&body).map_err(FlowError::from)
}

fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbench_types::NodeKind;
    use flowbench_types::Position;

    #[test]
    fn detail_extraction_prefers_the_detail_field() {
        assert_eq!(
            extract_detail(r#"{"detail": "Dataset not found"}"#),
            "Dataset not found"
        );
        assert_eq!(extract_detail("plain text error"), "plain text error");
        assert_eq!(
            extract_detail(r#"{"detail": {"loc": ["body"], "msg": "invalid"}}"#),
            r#"{"loc":["body"],"msg":"invalid"}"#
        );
    }

    #[test]
    fn url_joining_strips_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.url("/datasets"), "http://localhost:8000/datasets");
    }

    #[test]
    fn bearer_is_required_before_authed_calls() {
        let client = ApiClient::new("http://localhost:8000");
        match client.bearer() {
            Err(FlowError::AuthRequired) => {}
            other => panic!("expected AuthRequired, got: {other:?}"),
        }
    }

    #[test]
    fn with_token_satisfies_the_bearer_check() {
        let client = ApiClient::new("http://localhost:8000").with_token("tok-1");
        assert_eq!(client.bearer().unwrap(), "tok-1");
        assert_eq!(client.token(), Some("tok-1"));
    }

    #[tokio::test]
    async fn oversized_upload_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        let file = tokio::fs::File::create(&path).await.unwrap();
        file.set_len(MAX_UPLOAD_BYTES + 1).await.unwrap();

        // Unroutable base URL: reaching the network would fail differently.
        let client = ApiClient::new("http://localhost:1").with_token("tok");
        match client.upload_dataset(&path).await {
            Err(FlowError::FileTooLarge { size, limit }) => {
                assert_eq!(size, MAX_UPLOAD_BYTES + 1);
                assert_eq!(limit, MAX_UPLOAD_BYTES);
            }
            other => panic!("expected FileTooLarge, got: {other:?}"),
        }
    }

    #[test]
    fn batch_payload_carries_config_and_snapshot_per_entry() {
        let mut graph = WorkflowGraph::seed();
        let result = graph.add_node(NodeKind::Result, Position::new(400.0, 50.0));

        let config = PipelineConfig {
            file_id: "ds-1".into(),
            target_column: "y".into(),
            scaler_type: "None".into(),
            imputer_strategy: "mean".into(),
            encoder_strategy: "onehot".into(),
            test_size: 0.2,
            model_type: "Logistic Regression".into(),
        };

        // Mirror run_batch's payload assembly without a network call.
        let snapshot = json!({ "nodes": graph.nodes(), "edges": graph.edges() });
        let mut entry = serde_json::to_value(&config).unwrap();
        entry
            .as_object_mut()
            .unwrap()
            .insert("workflow_snapshot".into(), snapshot);

        assert_eq!(entry["file_id"], "ds-1");
        assert_eq!(entry["test_size"], json!(0.2));
        assert_eq!(entry["workflow_snapshot"]["nodes"].as_array().unwrap().len(), 2);
        let _ = result;
    }
}
