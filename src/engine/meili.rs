//! Meilisearch REST client
//!
//! Thin async wrapper over the Meilisearch HTTP API. Every mutating call
//! returns the enqueued task summary; polling is handled by the provided
//! [`SearchEngine::wait_for_task`].

use super::{
    EngineError, EngineResult, IndexInfo, IndexPage, IndexSettings, SearchEngine, SearchHits,
    SearchQuery, Task, TaskInfo,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

/// Meilisearch error response format
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIndexRequest<'a> {
    uid: &'a str,
    primary_key: &'a str,
}

/// Meilisearch client
#[derive(Debug, Clone)]
pub struct MeiliClient {
    http: Client,
    base_url: Url,
}

impl MeiliClient {
    /// Create a client for the instance at `url`, authenticating with `api_key`
    ///
    /// An empty key sends no `Authorization` header.
    pub fn new(url: &str, api_key: &str) -> EngineResult<Self> {
        let base_url = Url::parse(url)
            .map_err(|e| EngineError::Config(format!("invalid engine URL '{}': {}", url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::Config(format!(
                "engine URL '{}' cannot be used as a base URL",
                url
            )));
        }

        let mut headers = HeaderMap::new();
        if !api_key.is_empty() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
                EngineError::Config("API key contains characters not allowed in a header".into())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("michiru/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!("Initializing Meilisearch client: url={}", base_url);

        Ok(Self { http, base_url })
    }

    /// Base URL of the instance
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> EngineResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Config(format!("invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> EngineResult<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn api_error(response: Response) -> EngineError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        decode_api_error(status.as_u16(), &body)
    }

    fn optional<T>(result: EngineResult<T>) -> EngineResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Turn a non-success response body into an [`EngineError::Api`]
fn decode_api_error(status: u16, body: &str) -> EngineError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => EngineError::Api {
            status,
            code: err.code,
            message: err.message,
        },
        Err(_) => EngineError::Api {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            },
        },
    }
}

#[async_trait]
impl SearchEngine for MeiliClient {
    async fn get_index(&self, uid: &str) -> EngineResult<Option<IndexInfo>> {
        let url = self.endpoint(&["indexes", uid])?;
        Self::optional(self.send(self.http.get(url)).await)
    }

    async fn list_indexes(&self, offset: usize, limit: usize) -> EngineResult<IndexPage> {
        let url = self.endpoint(&["indexes"])?;
        self.send(self.http.get(url).query(&[("offset", offset), ("limit", limit)]))
            .await
    }

    async fn create_index(&self, uid: &str, primary_key: &str) -> EngineResult<TaskInfo> {
        let url = self.endpoint(&["indexes"])?;
        debug!("Creating index {} (primary key {})", uid, primary_key);
        self.send(
            self.http
                .post(url)
                .json(&CreateIndexRequest { uid, primary_key }),
        )
        .await
    }

    async fn delete_index(&self, uid: &str) -> EngineResult<TaskInfo> {
        let url = self.endpoint(&["indexes", uid])?;
        self.send(self.http.delete(url)).await
    }

    async fn update_settings(
        &self,
        uid: &str,
        settings: &IndexSettings,
    ) -> EngineResult<TaskInfo> {
        let url = self.endpoint(&["indexes", uid, "settings"])?;
        self.send(self.http.patch(url).json(settings)).await
    }

    async fn add_documents(
        &self,
        uid: &str,
        documents: Vec<serde_json::Value>,
    ) -> EngineResult<TaskInfo> {
        let url = self.endpoint(&["indexes", uid, "documents"])?;
        debug!("Adding {} documents to {}", documents.len(), uid);
        self.send(self.http.post(url).json(&documents)).await
    }

    async fn delete_all_documents(&self, uid: &str) -> EngineResult<TaskInfo> {
        let url = self.endpoint(&["indexes", uid, "documents"])?;
        self.send(self.http.delete(url)).await
    }

    async fn get_document(
        &self,
        uid: &str,
        document_id: &str,
    ) -> EngineResult<Option<serde_json::Value>> {
        let url = self.endpoint(&["indexes", uid, "documents", document_id])?;
        Self::optional(self.send(self.http.get(url)).await)
    }

    async fn search(&self, uid: &str, query: &SearchQuery) -> EngineResult<SearchHits> {
        let url = self.endpoint(&["indexes", uid, "search"])?;
        self.send(self.http.post(url).json(query)).await
    }

    async fn get_task(&self, task_uid: u64) -> EngineResult<Task> {
        let url = self.endpoint(&["tasks", &task_uid.to_string()])?;
        self.send(self.http.get(url)).await
    }
}
