//! Qdrant REST client.
//!
//! Every Qdrant response wraps its payload as `{"result": ..., "status": ...}`;
//! errors carry `{"status": {"error": "..."}}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use recom_core::config::QdrantSettings;
use recom_core::types::{Point, ScoredPoint};
use recom_core::{Error, Result};

use crate::store::{CollectionInfo, VectorStore};

pub struct QdrantStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionResult {
    #[serde(default)]
    points_count: Option<u64>,
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

/// The only metric collections are created with.
const COSINE: &str = "Cosine";

#[derive(Serialize, Deserialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

#[derive(Serialize)]
struct CreateBody {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    points: &'a [Point],
}

#[derive(Serialize)]
struct CountBody {
    exact: bool,
}

#[derive(Deserialize)]
struct CountResult {
    count: u64,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    status: ErrorStatus,
}

#[derive(Deserialize)]
struct ErrorStatus {
    error: String,
}

impl QdrantStore {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidConfig("qdrant url is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client, base_url, api_key })
    }

    /// Unresolved `$VAR` api keys are treated as absent.
    pub fn from_settings(settings: &QdrantSettings) -> Result<Self> {
        let url = settings
            .url
            .as_deref()
            .ok_or_else(|| Error::InvalidConfig("qdrant.url is not set".to_string()))?;
        let api_key = settings.api_key.clone().filter(|k| !k.is_empty() && !k.starts_with('$'));
        Self::new(url, api_key, Duration::from_secs(settings.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let rb = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => rb.header("api-key", key),
            None => rb,
        }
    }

    async fn call<T: DeserializeOwned>(&self, rb: RequestBuilder, collection: &str) -> Result<T> {
        let resp = rb
            .send()
            .await
            .map_err(|e| Error::Connection(format!("{}: {e}", self.base_url)))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::IndexNotFound(collection.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Backend { status: status.as_u16(), message: error_message(&body) });
        }
        let envelope: Envelope<T> = resp.json().await.map_err(|e| Error::Backend {
            status: status.as_u16(),
            message: format!("unexpected response body: {e}"),
        })?;
        Ok(envelope.result)
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(b) => b.status.error,
        Err(_) => body.trim().to_string(),
    }
}

fn collection_path(name: &str) -> String {
    format!("/collections/{name}")
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let rb = self.request(Method::GET, &collection_path(name));
        match self.call::<CollectionResult>(rb, name).await {
            Ok(r) => {
                let vectors = r.config.params.vectors;
                if vectors.distance != COSINE {
                    warn!(collection = name, distance = %vectors.distance, "collection does not use cosine distance");
                }
                Ok(Some(CollectionInfo { dim: vectors.size, points_count: r.points_count.unwrap_or(0) }))
            }
            Err(Error::IndexNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_collection(&self, name: &str, dim: usize) -> Result<()> {
        let body = CreateBody { vectors: VectorParams { size: dim, distance: COSINE.to_string() } };
        let rb = self.request(Method::PUT, &collection_path(name)).json(&body);
        let _: serde_json::Value = self.call(rb, name).await?;
        debug!(collection = name, dim, "qdrant collection created");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        let rb = self.request(Method::DELETE, &collection_path(name));
        match self.call::<bool>(rb, name).await {
            Ok(deleted) => Ok(deleted),
            Err(Error::IndexNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn upsert(&self, name: &str, points: &[Point]) -> Result<()> {
        let path = format!("{}/points?wait=true", collection_path(name));
        let rb = self.request(Method::PUT, &path).json(&UpsertBody { points });
        let _: serde_json::Value = self.call(rb, name).await?;
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<u64> {
        let path = format!("{}/points/count", collection_path(name));
        let rb = self.request(Method::POST, &path).json(&CountBody { exact: true });
        let r: CountResult = self.call(rb, name).await?;
        Ok(r.count)
    }

    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let path = format!("{}/points/search", collection_path(name));
        let body = SearchBody { vector, limit, with_payload: true };
        let rb = self.request(Method::POST, &path).json(&body);
        self.call(rb, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_collection_info_response() {
        let body = json!({
            "result": {
                "status": "green",
                "points_count": 3,
                "config": { "params": { "vectors": { "size": 384, "distance": "Cosine" } } }
            },
            "status": "ok",
            "time": 0.001
        });
        let env: Envelope<CollectionResult> = serde_json::from_value(body).unwrap();
        assert_eq!(env.result.config.params.vectors.size, 384);
        assert_eq!(env.result.config.params.vectors.distance, COSINE);
        assert_eq!(env.result.points_count, Some(3));
    }

    #[test]
    fn create_and_search_bodies_match_rest_schema() {
        let create = CreateBody { vectors: VectorParams { size: 768, distance: COSINE.to_string() } };
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({ "vectors": { "size": 768, "distance": "Cosine" } })
        );
        let search = SearchBody { vector: &[0.5, 0.25], limit: 5, with_payload: true };
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({ "vector": [0.5, 0.25], "limit": 5, "with_payload": true })
        );
    }

    #[test]
    fn parses_scored_points() {
        let body = json!({
            "result": [
                { "id": 7, "version": 1, "score": 0.91, "payload": { "product_name": "Red Shoe" } },
                { "id": 2, "version": 1, "score": 0.5 }
            ],
            "status": "ok"
        });
        let env: Envelope<Vec<ScoredPoint>> = serde_json::from_value(body).unwrap();
        assert_eq!(env.result[0].id, 7);
        assert!(env.result[1].payload.is_none());
    }

    #[test]
    fn extracts_error_text() {
        let body = r#"{"status":{"error":"Wrong input: Vector dimension error: expected dim: 384, got 3"},"time":0.0}"#;
        assert!(error_message(body).starts_with("Wrong input"));
        assert_eq!(error_message(" bad gateway \n"), "bad gateway");
    }

    #[test]
    fn settings_without_url_are_rejected() {
        let settings = QdrantSettings { url: None, ..QdrantSettings::default() };
        assert!(matches!(QdrantStore::from_settings(&settings), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = QdrantStore::new("http://localhost:6333/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(store.base_url(), "http://localhost:6333");
    }
}
