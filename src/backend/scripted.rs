//! In-memory backend for dispatcher tests: canned payloads per alias, with
//! optional delays, failures and panics.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::SearchBackend;
use crate::error::{DashError, Result};

#[derive(Clone, Default)]
pub(crate) struct Scripted {
    pub payload: String,
    pub delay_ms: u64,
    pub fail: bool,
    pub panic: bool,
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    queries: HashMap<String, Scripted>,
    failing_bodies: HashSet<String>,
    batch_response: String,
    count_response: String,
    refuse_connection: bool,
    pub completed: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub last_batch: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, alias: &str, payload: &str, delay_ms: u64) -> Self {
        self.queries.insert(
            alias.to_string(),
            Scripted {
                payload: payload.to_string(),
                delay_ms,
                ..Scripted::default()
            },
        );
        self
    }

    pub fn fail(mut self, alias: &str, delay_ms: u64) -> Self {
        self.queries.insert(
            alias.to_string(),
            Scripted {
                delay_ms,
                fail: true,
                ..Scripted::default()
            },
        );
        self
    }

    /// Fails any query sent with `body`, whatever its alias.
    pub fn fail_body(mut self, body: &str) -> Self {
        self.failing_bodies.insert(body.to_string());
        self
    }

    pub fn panic_on(mut self, alias: &str) -> Self {
        self.queries.insert(
            alias.to_string(),
            Scripted {
                panic: true,
                ..Scripted::default()
            },
        );
        self
    }

    pub fn batch_response(mut self, raw: &str) -> Self {
        self.batch_response = raw.to_string();
        self
    }

    pub fn count_response(mut self, raw: &str) -> Self {
        self.count_response = raw.to_string();
        self
    }

    pub fn refuse_connection(mut self) -> Self {
        self.refuse_connection = true;
        self
    }
}

pub(crate) fn hits(total: i64) -> String {
    format!(r#"{{"hits":{{"total":{{"value":{}}}}},"aggregations":{{}}}}"#, total)
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    type Connection = ();

    async fn acquire_connection(&self) -> Result<()> {
        if self.refuse_connection {
            return Err(DashError::Connection("refused".into()));
        }
        Ok(())
    }

    async fn execute_query(&self, body: &str, alias: &str, _conn: &()) -> Result<String> {
        let scripted = self.queries.get(alias).cloned().ok_or_else(|| {
            DashError::QueryExecution {
                name: alias.to_string(),
                message: "no such index".into(),
            }
        })?;

        if scripted.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(scripted.delay_ms)).await;
        }
        if scripted.panic {
            panic!("scripted panic for {}", alias);
        }
        if scripted.fail || self.failing_bodies.contains(body) {
            return Err(DashError::QueryExecution {
                name: alias.to_string(),
                message: "scripted failure".into(),
            });
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(scripted.payload)
    }

    async fn execute_batch(&self, _conn: &(), batch_body: &str) -> Result<String> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_batch.lock().unwrap() = Some(batch_body.to_string());
        Ok(self.batch_response.clone())
    }

    async fn execute_count(&self, _body: &str, _alias: &str, _conn: &()) -> Result<String> {
        Ok(self.count_response.clone())
    }
}
