use std::sync::Arc;

use log::{debug, error};
use serde::Deserialize;

use super::NamedQuery;
use crate::backend::SearchBackend;
use crate::error::Result;

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

/// Runs a single query against the count endpoint and unwraps the scalar.
pub struct CountQueryRunner<B> {
    backend: Arc<B>,
}

impl<B: SearchBackend> CountQueryRunner<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn run(&self, query: &NamedQuery) -> Result<u64> {
        let conn = self.backend.acquire_connection().await.map_err(|e| {
            error!("count {}: connexion impossible: {}", query.name, e);
            e
        })?;

        let raw = self
            .backend
            .execute_count(&query.query_body, &query.target_alias, &conn)
            .await
            .map_err(|e| {
                error!("count {}: échec sur {}: {}", query.name, query.target_alias, e);
                e.for_query(&query.name)
            })?;

        let count = parse_count(&raw).map_err(|e| {
            error!("count {}: réponse illisible: {}", query.name, e);
            e
        })?;
        debug!("count {} = {}", query.name, count);
        Ok(count)
    }
}

/// Extracts `count` from a `{"count": N}` response.
pub fn parse_count(raw: &str) -> Result<u64> {
    let response: CountResponse = serde_json::from_str(raw)?;
    Ok(response.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::ScriptedBackend;
    use crate::error::DashError;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(r#"{"count": 42, "_shards": {"total": 1}}"#).unwrap(), 42);
        assert!(matches!(
            parse_count(r#"{"hits": {}}"#),
            Err(DashError::Serialization(_))
        ));
        assert!(parse_count(r#"{"count": -1}"#).is_err());
    }

    #[tokio::test]
    async fn test_run_unwraps_count() {
        let backend = Arc::new(ScriptedBackend::new().count_response(r#"{"count": 17}"#));
        let query = NamedQuery::new("open_alerts", r#"{"query": {"match_all": {}}}"#, "alerts");
        let count = CountQueryRunner::new(backend).run(&query).await.unwrap();
        assert_eq!(count, 17);
    }

    #[tokio::test]
    async fn test_run_propagates_connection_error() {
        let backend = Arc::new(ScriptedBackend::new().refuse_connection());
        let query = NamedQuery::new("open_alerts", "{}", "alerts");
        let err = CountQueryRunner::new(backend).run(&query).await.unwrap_err();
        assert!(matches!(err, DashError::Connection(_)));
    }
}
