use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;

use super::{QueryMap, QueryResult, ResultBundle};
use crate::backend::SearchBackend;
use crate::error::{DashError, Result};

/// Runs every query of a [`QueryMap`] as its own task and gathers the payloads.
///
/// Each task posts exactly one tagged [`QueryResult`] on the completion channel,
/// whatever happens to its request. The orchestrator reads one message per query
/// and matches results by name, never by arrival order. The first error received
/// fails the whole call: no partial bundle is returned.
pub struct FanoutDispatcher<B> {
    backend: Arc<B>,
    abort_siblings_on_failure: bool,
}

impl<B> FanoutDispatcher<B>
where
    B: SearchBackend + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            abort_siblings_on_failure: false,
        }
    }

    /// When set, tasks still in flight are aborted as soon as one query fails.
    /// Otherwise they run to completion and their results are dropped.
    pub fn abort_siblings_on_failure(mut self, abort: bool) -> Self {
        self.abort_siblings_on_failure = abort;
        self
    }

    pub async fn dispatch(&self, queries: &QueryMap) -> Result<ResultBundle> {
        if queries.is_empty() {
            return Ok(ResultBundle::new());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<QueryResult>();
        let mut handles = Vec::with_capacity(queries.len());

        for (name, query) in queries {
            let tx = tx.clone();
            let backend = Arc::clone(&self.backend);
            let name = name.clone();
            let body = query.query_body.clone();
            let alias = query.target_alias.clone();

            debug!("fan-out: lancement de {} sur {}", name, alias);
            handles.push(tokio::spawn(async move {
                let outcome = execute_one(backend.as_ref(), &body, &alias)
                    .await
                    .map_err(|e| e.for_query(&name));
                // The receiver is gone once the orchestrator has bailed out on a sibling.
                let _ = tx.send(QueryResult::from_outcome(name, outcome));
            }));
        }
        // Only the tasks hold senders now, so a task that dies without reporting
        // closes the channel instead of hanging the loop below.
        drop(tx);

        let mut bundle = ResultBundle::new();
        for _ in 0..queries.len() {
            let Some(result) = rx.recv().await else {
                error!(
                    "fan-out: {} résultat(s) sur {} reçus, une tâche s'est arrêtée sans répondre",
                    bundle.len(),
                    queries.len()
                );
                return Err(DashError::Connection(
                    "tâche de requête interrompue sans résultat".into(),
                ));
            };

            if let Some(err) = result.error {
                error!("fan-out: échec de la requête {}: {}", result.name, err);
                if self.abort_siblings_on_failure {
                    handles.iter().for_each(|h| h.abort());
                }
                return Err(err);
            }

            debug!("fan-out: résultat reçu pour {}", result.name);
            bundle.insert(result.name, result.raw_payload);
        }

        info!("fan-out: {} requêtes terminées", bundle.len());
        Ok(bundle)
    }
}

async fn execute_one<B: SearchBackend>(backend: &B, body: &str, alias: &str) -> Result<String> {
    let conn = backend.acquire_connection().await?;
    backend.execute_query(body, alias, &conn).await
}
