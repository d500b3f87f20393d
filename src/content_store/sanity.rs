//! Sanity content lake backend over its HTTP API.

use super::{ContentStore, Document, DocumentType, Fields};
use crate::config::SanitySettings;
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// Content store backed by a hosted Sanity dataset.
pub struct SanityContentStore {
    client: reqwest::Client,
    base_url: String,
    dataset: String,
    api_version: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct MutateResponse {
    #[serde(default)]
    results: Vec<MutateResult>,
}

#[derive(Deserialize)]
struct MutateResult {
    document: Option<Value>,
}

#[derive(Deserialize)]
struct DocResponse {
    #[serde(default)]
    documents: Vec<Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Vec<Value>,
}

impl SanityContentStore {
    /// Create a store for `https://<project>.api.sanity.io`.
    pub fn new(settings: &SanitySettings) -> Result<Self> {
        if settings.project_id.is_empty() {
            return Err(SyllabusError::Config(
                "content_store.sanity.project_id is required for the sanity provider".to_string(),
            ));
        }
        let base_url = format!("https://{}.api.sanity.io", settings.project_id);
        Ok(Self::with_base_url(settings, &base_url))
    }

    /// Create a store against an explicit API origin.
    pub fn with_base_url(settings: &SanitySettings, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            dataset: settings.dataset.clone(),
            api_version: settings.api_version.clone(),
            token: settings.token.clone(),
        }
    }

    fn endpoint(&self, kind: &str) -> String {
        format!(
            "{}/v{}/data/{}/{}",
            self.base_url, self.api_version, kind, self.dataset
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn mutate(&self, mutation: Value) -> Result<Document> {
        let request = self
            .client
            .post(format!("{}?returnDocuments=true", self.endpoint("mutate")))
            .json(&json!({ "mutations": [mutation] }));

        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyllabusError::ContentStore(format!(
                "Sanity mutation failed ({}): {}",
                status, body
            )));
        }

        let body: MutateResponse = response.json().await?;
        let raw = body
            .results
            .into_iter()
            .find_map(|r| r.document)
            .ok_or_else(|| {
                SyllabusError::ContentStore("Sanity mutation returned no document".to_string())
            })?;

        from_sanity(raw)
    }
}

/// Convert a raw Sanity document (`_id`, `_type`, system fields) into a `Document`.
fn from_sanity(raw: Value) -> Result<Document> {
    let Value::Object(mut map) = raw else {
        return Err(SyllabusError::ContentStore(
            "Sanity document is not an object".to_string(),
        ));
    };

    let id = map
        .remove("_id")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| SyllabusError::ContentStore("Sanity document has no _id".to_string()))?;
    let doc_type: DocumentType = map
        .remove("_type")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
        .parse()?;
    let timestamp = |v: Option<Value>| {
        v.and_then(|v| v.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    };
    let created_at = timestamp(map.remove("_createdAt"));
    let updated_at = timestamp(map.remove("_updatedAt"));

    let fields: Fields = map
        .into_iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .collect();

    Ok(Document {
        id,
        doc_type,
        fields,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl ContentStore for SanityContentStore {
    #[instrument(skip(self, fields))]
    async fn create(&self, doc_type: DocumentType, fields: Fields) -> Result<Document> {
        let mut body = fields;
        body.insert("_type".to_string(), json!(doc_type.as_str()));
        let doc = self.mutate(json!({ "create": body })).await?;
        debug!("Created Sanity {} {}", doc_type, doc.id);
        Ok(doc)
    }

    #[instrument(skip(self, set))]
    async fn patch(&self, id: &str, set: Fields) -> Result<Document> {
        // A missing id is not-found; patching must never create a document.
        if self.get(id).await?.is_none() {
            return Err(SyllabusError::DocumentNotFound(id.to_string()));
        }
        self.mutate(json!({ "patch": { "id": id, "set": set } })).await
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let request = self.client.get(format!("{}/{}", self.endpoint("doc"), id));
        let response = self.authorized(request).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let body: DocResponse = response.json().await?;

        body.documents.into_iter().next().map(from_sanity).transpose()
    }

    async fn list(&self, doc_type: DocumentType) -> Result<Vec<Document>> {
        let type_param = serde_json::to_string(doc_type.as_str())?;
        let request = self.client.get(self.endpoint("query")).query(&[
            ("query", "*[_type == $type] | order(_createdAt asc)"),
            ("$type", type_param.as_str()),
        ]);
        let response = self.authorized(request).send().await?.error_for_status()?;
        let body: QueryResponse = response.json().await?;

        body.result.into_iter().map(from_sanity).collect()
    }

    async fn document_count(&self) -> Result<usize> {
        let request = self
            .client
            .get(self.endpoint("query"))
            .query(&[("query", "count(*[_type in [\"course\", \"module\", \"lesson\"]])")]);
        let response = self.authorized(request).send().await?.error_for_status()?;
        let body: Value = response.json().await?;

        Ok(body["result"].as_u64().unwrap_or(0) as usize)
    }
}
