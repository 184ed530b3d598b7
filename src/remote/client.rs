use std::time::Duration;

use log::{debug, error};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::email::{IndexEntry, MetadataProfile};
use crate::error::IngestError;
use crate::remote::{DocumentId, IngestTransport};

/// How message bodies reach the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// `POST /v1/ingest` with `{content, metadata}` in one request.
    Json,
    /// `POST /v1/ingest/file` then `PUT /v1/ingest/{id}/metadata`.
    Multipart,
}

impl From<MetadataProfile> for UploadMode {
    fn from(profile: MetadataProfile) -> Self {
        match profile {
            MetadataProfile::Basic => UploadMode::Json,
            MetadataProfile::Enhanced => UploadMode::Multipart,
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    id: Option<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    top_k: usize,
    collection_id: Option<&'a str>,
    filter_metadata: Value,
}

/// Blocking HTTP client for the retrieval service.
pub struct RagClient {
    base_url: String,
    http: Client,
    mode: UploadMode,
}

impl RagClient {
    pub fn new(base_url: &str, timeout: Duration, mode: UploadMode) -> Result<Self, IngestError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::RemoteUnavailable(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            mode,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, IngestError> {
        let resp = req
            .send()
            .map_err(|e| IngestError::RemoteUnavailable(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(IngestError::RemoteRejected {
            status: status.as_u16(),
            body,
        })
    }

    fn send_json(&self, req: RequestBuilder) -> Result<Value, IngestError> {
        let resp = self.send(req)?;
        let status = resp.status().as_u16();
        resp.json::<Value>().map_err(|e| IngestError::RemoteRejected {
            status,
            body: format!("invalid JSON response: {e}"),
        })
    }

    /// `POST /v1/ingest`
    pub fn ingest_json(&self, content: &str, metadata: &IndexEntry) -> Result<(), IngestError> {
        let payload = json!({ "content": content, "metadata": metadata });
        self.send(self.http.post(self.url("/v1/ingest")).json(&payload))?;
        Ok(())
    }

    /// `POST /v1/ingest/file`; the body goes up as a text/plain file part.
    pub fn ingest_file(&self, file_name: &str, content: &str) -> Result<DocumentId, IngestError> {
        let part = Part::text(content.to_string())
            .file_name(file_name.to_string())
            .mime_str("text/plain")
            .map_err(|e| IngestError::RemoteUnavailable(e.to_string()))?;
        let form = Form::new().part("file", part);

        let resp = self.send(self.http.post(self.url("/v1/ingest/file")).multipart(form))?;
        let status = resp.status().as_u16();
        let parsed: UploadResponse = resp.json().map_err(|e| IngestError::RemoteRejected {
            status,
            body: format!("invalid upload response: {e}"),
        })?;
        parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| IngestError::RemoteRejected {
                status,
                body: "upload response carried no document id".to_string(),
            })
    }

    /// `DELETE /v1/ingest/{id}`
    pub fn delete(&self, id: &str) -> Result<(), IngestError> {
        self.send(self.http.delete(self.url(&format!("/v1/ingest/{id}"))))?;
        Ok(())
    }

    /// `GET /v1/ingest/list`
    pub fn list(&self) -> Result<Value, IngestError> {
        self.send_json(self.http.get(self.url("/v1/ingest/list")))
    }

    /// `GET /v1/ingest/stats`
    pub fn stats(&self) -> Result<Value, IngestError> {
        self.send_json(self.http.get(self.url("/v1/ingest/stats")))
    }

    /// `POST /v1/chat/completions`
    pub fn query(
        &self,
        question: &str,
        top_k: usize,
        collection_id: Option<&str>,
        filter_metadata: Option<Value>,
    ) -> Result<Value, IngestError> {
        let payload = QueryRequest {
            query: question,
            top_k,
            collection_id,
            filter_metadata: filter_metadata.unwrap_or_else(|| json!({})),
        };
        self.send_json(self.http.post(self.url("/v1/chat/completions")).json(&payload))
    }
}

impl IngestTransport for RagClient {
    /// `GET /health`; anything but 200 counts as down.
    fn health_check(&self) -> Result<(), IngestError> {
        let resp = self
            .http
            .get(self.url("/health"))
            .send()
            .map_err(|e| {
                error!("Health check failed: {e}");
                IngestError::RemoteUnavailable(e.to_string())
            })?;
        if resp.status() == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(IngestError::RemoteUnavailable(format!(
                "health check returned {}",
                resp.status()
            )))
        }
    }

    fn upload(&self, content: &str, metadata: &IndexEntry) -> Result<Option<DocumentId>, IngestError> {
        match self.mode {
            UploadMode::Json => {
                self.ingest_json(content, metadata)?;
                Ok(None)
            }
            UploadMode::Multipart => {
                let stem = metadata.email_id.as_deref().unwrap_or("message");
                let id = self.ingest_file(&format!("email_{stem}.txt"), content)?;
                debug!("Uploaded {} as document {id}", metadata.subject);
                Ok(Some(id))
            }
        }
    }

    /// `PUT /v1/ingest/{id}/metadata`
    fn update_metadata(&self, id: &str, metadata: &IndexEntry) -> Result<(), IngestError> {
        self.send(
            self.http
                .put(self.url(&format!("/v1/ingest/{id}/metadata")))
                .json(metadata),
        )?;
        Ok(())
    }
}
