use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};

use super::SearchBackend;
use crate::config::EngineConfig;
use crate::error::{DashError, Result};

#[derive(Clone)]
enum Credentials {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

/// HTTP search backend speaking the `_search` / `_msearch` / `_count` endpoints.
///
/// Built once from an [`EngineConfig`] and shared by every dispatcher; the
/// underlying `reqwest::Client` pools connections internally.
pub struct HttpSearchBackend {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

/// Handle returned by [`HttpSearchBackend::acquire_connection`].
#[derive(Clone)]
pub struct BackendConnection {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl HttpSearchBackend {
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| DashError::Connection(format!("client HTTP non construit: {}", e)))?;

        let credentials = match (&config.bearer_token, &config.username) {
            (Some(token), _) => Some(Credentials::Bearer(token.clone())),
            (None, Some(username)) => Some(Credentials::Basic {
                username: username.clone(),
                password: config.password.clone(),
            }),
            (None, None) => None,
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for HttpSearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSearchBackend")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

impl BackendConnection {
    fn post(&self, path: &str, content_type: &'static str) -> RequestBuilder {
        let request = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header(CONTENT_TYPE, content_type);

        match &self.credentials {
            Some(Credentials::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            Some(Credentials::Bearer(token)) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, target: &str, body: String) -> Result<String> {
        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                DashError::Connection(format!("{}: {}", target, e))
            } else {
                DashError::Http(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(DashError::QueryExecution {
                name: target.to_string(),
                message: format!("statut {}: {}", status, text),
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    type Connection = BackendConnection;

    async fn acquire_connection(&self) -> Result<BackendConnection> {
        if self.base_url.is_empty() {
            return Err(DashError::Connection(
                "aucune URL de moteur de recherche configurée".into(),
            ));
        }

        Ok(BackendConnection {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            credentials: self.credentials.clone(),
        })
    }

    async fn execute_query(
        &self,
        body: &str,
        alias: &str,
        conn: &BackendConnection,
    ) -> Result<String> {
        debug!("POST {}/_search", alias);
        let request = conn.post(&format!("{}/_search", alias), "application/json");
        conn.send(request, alias, body.to_string()).await
    }

    async fn execute_batch(&self, conn: &BackendConnection, batch_body: &str) -> Result<String> {
        debug!("POST _msearch ({} octets)", batch_body.len());
        let request = conn.post("_msearch", "application/x-ndjson");
        conn.send(request, "_msearch", batch_body.to_string()).await
    }

    async fn execute_count(
        &self,
        body: &str,
        alias: &str,
        conn: &BackendConnection,
    ) -> Result<String> {
        debug!("POST {}/_count", alias);
        let request = conn.post(&format!("{}/_count", alias), "application/json");
        conn.send(request, alias, body.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = EngineConfig {
            base_url: "http://es:9200/".into(),
            ..EngineConfig::default()
        };
        let backend = HttpSearchBackend::from_config(&config).unwrap();
        assert_eq!(backend.base_url(), "http://es:9200");
    }

    #[test]
    fn test_bearer_token_wins_over_basic_auth() {
        let config = EngineConfig {
            username: Some("reporting".into()),
            bearer_token: Some("tok".into()),
            ..EngineConfig::default()
        };
        let backend = HttpSearchBackend::from_config(&config).unwrap();
        assert!(matches!(backend.credentials, Some(Credentials::Bearer(_))));
    }

    #[tokio::test]
    async fn test_acquire_connection_requires_base_url() {
        let config = EngineConfig {
            base_url: String::new(),
            ..EngineConfig::default()
        };
        let backend = HttpSearchBackend::from_config(&config).unwrap();
        let err = backend.acquire_connection().await.err().unwrap();
        assert!(matches!(err, DashError::Connection(_)));
    }
}
