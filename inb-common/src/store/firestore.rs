//! Cloud Firestore document store (REST v1)
//!
//! # API Reference
//! - Document: `GET/PATCH {base}/projects/{project}/databases/(default)/documents/{path}`
//! - Listing:  `GET .../documents/{collection}?orderBy=...&pageToken=...`
//! - Merge writes send `updateMask.fieldPaths` for every leaf written
//! - Conditional writes use `currentDocument.updateTime` / `currentDocument.exists`
//!
//! A request that cannot reach the server takes the store offline; the
//! repository's reconnect-retry calls `enable_network()` before retrying.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::firestore_value::{decode_fields, encode_fields};
use super::{
    merge, split_document_path, validate_collection_path, Direction, Document, DocumentStore,
    NetworkGate, OrderBy, SetMode, StoredDocument, Version,
};
use crate::{Error, Result};

/// Public Firestore REST endpoint
pub const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";

/// Default timeout for Firestore requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Page size for collection listings
const LIST_PAGE_SIZE: u32 = 300;

/// Firestore REST client implementing [`DocumentStore`]
pub struct FirestoreStore {
    http_client: Client,
    documents_url: String,
    api_key: String,
    gate: NetworkGate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Value,
    #[serde(default)]
    update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl FirestoreStore {
    /// Create a client for `project_id`
    ///
    /// `base_url` overrides [`FIRESTORE_API_URL`] (emulator or tests).
    pub fn new(project_id: &str, api_key: &str, base_url: Option<&str>) -> Result<Self> {
        if project_id.trim().is_empty() {
            return Err(Error::Config("Firestore project id is empty".to_string()));
        }
        let base = base_url.unwrap_or(FIRESTORE_API_URL).trim_end_matches('/');
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base, project_id
            ),
            api_key: api_key.to_string(),
            gate: NetworkGate::default(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.documents_url, path)
    }

    fn key_param(&self) -> Vec<(&'static str, String)> {
        if self.api_key.is_empty() {
            Vec::new()
        } else {
            vec![("key", self.api_key.clone())]
        }
    }

    /// Map transport failures, taking the store offline on connectivity loss
    fn transport_error(&self, e: reqwest::Error) -> Error {
        let err = Error::from(e);
        if err.is_transient() {
            warn!("Firestore unreachable, going offline: {}", err);
            self.gate.disable();
        }
        err
    }

    async fn error_from_response(response: Response, path: &str) -> Error {
        let status = response.status();
        let body: ErrorEnvelope = response.json().await.unwrap_or_default();
        let message = if body.error.message.is_empty() {
            format!("HTTP {}", status)
        } else {
            body.error.message
        };

        match (status, body.error.status.as_str()) {
            (_, "FAILED_PRECONDITION") | (_, "ALREADY_EXISTS") | (StatusCode::CONFLICT, _) => {
                Error::Conflict(format!("{}: {}", path, message))
            }
            (StatusCode::FORBIDDEN, _) | (StatusCode::UNAUTHORIZED, _) | (_, "PERMISSION_DENIED") => {
                Error::PermissionDenied(message)
            }
            (StatusCode::BAD_REQUEST, _) => Error::Config(format!(
                "Firestore rejected the request (check project id and API key): {}",
                message
            )),
            (StatusCode::NOT_FOUND, _) => Error::NotFound(format!(
                "Firestore project or database not found: {}",
                message
            )),
            (StatusCode::SERVICE_UNAVAILABLE, _) | (StatusCode::GATEWAY_TIMEOUT, _) => {
                Error::Unavailable(message)
            }
            _ => Error::Internal(format!("Firestore error {}: {}", status, message)),
        }
    }

    async fn patch(
        &self,
        path: &str,
        fields: Document,
        mode: SetMode,
        precondition: Option<(&'static str, String)>,
    ) -> Result<()> {
        split_document_path(path)?;

        let mut query = self.key_param();
        if mode == SetMode::Merge {
            for field_path in merge::field_paths(&fields) {
                query.push(("updateMask.fieldPaths", field_path));
            }
        }
        if let Some(p) = precondition {
            query.push(p);
        }

        debug!(path = %path, ?mode, "Firestore PATCH");
        let response = self
            .http_client
            .patch(self.url(path))
            .query(&query)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, path).await);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn backend_name(&self) -> &'static str {
        "firestore"
    }

    async fn get_versioned(&self, path: &str) -> Result<Option<(Document, Version)>> {
        self.gate.check()?;
        split_document_path(path)?;

        let response = self
            .http_client
            .get(self.url(path))
            .query(&self.key_param())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response, path).await);
        }

        let doc: FirestoreDocument = response.json().await?;
        let fields = decode_fields(&doc.fields)?;
        Ok(Some((fields, Version(doc.update_time.unwrap_or_default()))))
    }

    async fn set(&self, path: &str, fields: Document, mode: SetMode) -> Result<()> {
        self.gate.check()?;
        self.patch(path, fields, mode, None).await
    }

    async fn set_if_version(
        &self,
        path: &str,
        fields: Document,
        mode: SetMode,
        expected: Option<&Version>,
    ) -> Result<()> {
        self.gate.check()?;
        let precondition = match expected {
            Some(version) => ("currentDocument.updateTime", version.0.clone()),
            None => ("currentDocument.exists", "false".to_string()),
        };
        self.patch(path, fields, mode, Some(precondition)).await
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<StoredDocument>> {
        self.gate.check()?;
        validate_collection_path(collection)?;

        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = self.key_param();
            query.push(("pageSize", LIST_PAGE_SIZE.to_string()));
            if let Some(order) = order {
                let dir = match order.direction {
                    Direction::Ascending => "asc",
                    Direction::Descending => "desc",
                };
                query.push(("orderBy", format!("{} {}", order.field, dir)));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .http_client
                .get(self.url(collection))
                .query(&query)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            if !response.status().is_success() {
                return Err(Self::error_from_response(response, collection).await);
            }

            let page: ListDocumentsResponse = response.json().await?;
            for doc in page.documents {
                let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
                docs.push(StoredDocument {
                    id,
                    fields: decode_fields(&doc.fields)?,
                });
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        // Server already ordered; re-apply so field-less documents are dropped consistently
        if let Some(order) = order {
            order.apply(&mut docs);
        }
        Ok(docs)
    }

    async fn enable_network(&self) -> Result<()> {
        self.gate.enable();
        Ok(())
    }

    async fn disable_network(&self) -> Result<()> {
        self.gate.disable();
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.gate.is_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_urls() {
        let store = FirestoreStore::new("demo", "k", Some("http://127.0.0.1:8080/v1/")).unwrap();
        assert_eq!(
            store.url("students/abc"),
            "http://127.0.0.1:8080/v1/projects/demo/databases/(default)/documents/students/abc"
        );
        assert_eq!(store.key_param(), vec![("key", "k".to_string())]);
    }

    #[test]
    fn test_empty_project_is_config_error() {
        assert!(matches!(
            FirestoreStore::new("  ", "k", None),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_goes_offline() {
        // Port 9 (discard) on localhost is closed in test environments
        let store = FirestoreStore::new("demo", "", Some("http://127.0.0.1:9/v1")).unwrap();
        let result = store.get("students/abc").await;
        assert!(matches!(result, Err(Error::Unavailable(_))));
        assert!(!store.is_online());

        store.enable_network().await.unwrap();
        assert!(store.is_online());
    }
}
