use super::{FieldMapping, SearchBackend, SearchRequest, SearchResponse, StoreSettings};
use crate::config::BackendConfig;
use crate::error::{IndexError, Result};
use crate::types::Document;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP client for an Elasticsearch-compatible cluster.
///
/// Requests go to the first configured host; on a connection or timeout
/// failure the next host is tried.
pub struct ElasticClient {
    hosts: Vec<String>,
    credentials: Option<(String, String)>,
    http_client: reqwest::Client,
}

#[derive(Deserialize)]
struct Acknowledged {
    #[serde(default)]
    acknowledged: bool,
}

#[derive(Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
}

impl ElasticClient {
    pub fn new(config: &BackendConfig, timeout: Option<Duration>) -> Result<Self> {
        let hosts = config.host_list()?;
        if hosts.is_empty() {
            return Err(IndexError::MissingConfiguration(
                "No hosts defined for the search backend".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| IndexError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            hosts,
            credentials: config
                .credentials()
                .map(|(u, p)| (u.to_string(), p.to_string())),
            http_client,
        })
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<reqwest::Response> {
        let mut last_error = None;

        for host in &self.hosts {
            let url = format!("{}/{}", host, path.trim_start_matches('/'));
            let mut request = self.http_client.request(method.clone(), &url);
            if let Some((username, password)) = &self.credentials {
                request = request.basic_auth(username, Some(password));
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() || e.is_timeout() => {
                    tracing::warn!("Search backend host {} unreachable: {}", host, e);
                    last_error = Some(IndexError::Http(e.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_error.unwrap_or_else(|| IndexError::Http("no hosts reachable".to_string())))
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(IndexError::BackendStatus {
            status: status.as_u16(),
            message,
        })
    }

    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<reqwest::Response> {
        let response = self.send(method, path, body).await?;
        Self::expect_success(response).await
    }
}

#[async_trait]
impl SearchBackend for ElasticClient {
    async fn store_exists(&self, store: &str) -> Result<bool> {
        let response = self.send(Method::HEAD, store, None).await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(IndexError::BackendStatus {
                status: status.as_u16(),
                message: format!("unexpected status checking {}", store),
            }),
        }
    }

    async fn create_store(&self, store: &str, settings: &StoreSettings) -> Result<bool> {
        let body = json!({ "settings": settings });
        let response = self.call(Method::PUT, store, Some(&body)).await?;
        let ack: Acknowledged = response.json().await?;
        Ok(ack.acknowledged)
    }

    async fn delete_store(&self, store: &str) -> Result<()> {
        self.call(Method::DELETE, store, None).await?;
        Ok(())
    }

    async fn put_mapping(&self, store: &str, mapping: &FieldMapping) -> Result<()> {
        let body = json!({ "properties": mapping });
        self.call(Method::PUT, &format!("{}/_mapping", store), Some(&body))
            .await?;
        Ok(())
    }

    async fn index_document(&self, store: &str, id: &str, document: &Document) -> Result<()> {
        let body = Value::Object(document.clone());
        self.call(Method::PUT, &format!("{}/_doc/{}", store, id), Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_document(&self, store: &str, id: &str) -> Result<()> {
        match self
            .call(Method::DELETE, &format!("{}/_doc/{}", store, id), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn refresh_store(&self, store: &str) -> Result<()> {
        match self
            .call(Method::POST, &format!("{}/_refresh", store), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete_by_query(&self, store: &str, query: &Value) -> Result<u64> {
        let body = json!({ "query": query });
        let path = format!("{}/_delete_by_query?conflicts=proceed&refresh=true", store);
        match self.call(Method::POST, &path, Some(&body)).await {
            Ok(response) => {
                let parsed: DeleteByQueryResponse = response.json().await?;
                Ok(parsed.deleted)
            }
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn reindex(&self, source: &str, dest: &str) -> Result<()> {
        let body = json!({
            "source": { "index": source },
            "dest": { "index": dest },
        });
        self.call(
            Method::POST,
            "_reindex?wait_for_completion=true&refresh=true",
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn search(&self, store: &str, request: &SearchRequest) -> Result<SearchResponse> {
        let body = serde_json::to_value(request)?;
        let response = self
            .call(Method::POST, &format!("{}/_search", store), Some(&body))
            .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_hosts() {
        let result = ElasticClient::new(&BackendConfig::default(), None);
        assert!(matches!(result, Err(IndexError::MissingConfiguration(_))));
    }

    #[test]
    fn test_client_host_list() {
        let client = ElasticClient::new(
            &BackendConfig::new("http://es-1:9200,http://es-2:9200/"),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.hosts(), &["http://es-1:9200", "http://es-2:9200"]);
    }
}
