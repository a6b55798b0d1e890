//! HTTP client for the pipeline execution backend.
//!
//! Wraps auth, dataset upload, workflow persistence, batch pipeline
//! execution, and chat behind one [`ApiClient`]. All calls that touch
//! user data require a bearer token; [`ApiClient::login`] obtains and
//! retains one.

mod client;
mod types;

pub use client::{ApiClient, MAX_UPLOAD_BYTES};
pub use types::{DatasetSummary, HistoryEntry, Token, UploadResponse, UserProfile, WorkflowRecord};
