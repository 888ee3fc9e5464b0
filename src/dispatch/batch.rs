use std::sync::Arc;

use log::{debug, error, info};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::json;
use serde_json::value::RawValue;

use super::{QueryMap, ResultBundle};
use crate::backend::SearchBackend;
use crate::error::{DashError, Result};

/// Sends every query of a [`QueryMap`] in one multi-search request.
///
/// The request is a sequence of header/body line pairs in the map's key order;
/// the backend answers with one ordered array of sub-responses which is zipped
/// back onto the same key order.
pub struct BatchDispatcher<B> {
    backend: Arc<B>,
}

impl<B: SearchBackend> BatchDispatcher<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn dispatch(&self, queries: &QueryMap) -> Result<ResultBundle> {
        if queries.is_empty() {
            return Ok(ResultBundle::new());
        }

        let batch_body = build_batch_body(queries).map_err(|e| {
            error!("batch: corps de requête invalide: {}", e);
            e
        })?;
        debug!("batch: {} requêtes, {} octets", queries.len(), batch_body.len());

        let conn = self.backend.acquire_connection().await.map_err(|e| {
            error!("batch: connexion impossible: {}", e);
            e
        })?;
        let raw = self
            .backend
            .execute_batch(&conn, &batch_body)
            .await
            .map_err(|e| {
                error!("batch: échec de l'envoi: {}", e);
                e
            })?;

        let names: Vec<&str> = queries.keys().map(String::as_str).collect();
        let bundle = split_batch_response(&names, &raw).map_err(|e| {
            error!("batch: réponse inexploitable: {}", e);
            e
        })?;

        info!("batch: {} réponses démultiplexées", bundle.len());
        Ok(bundle)
    }
}

/// Frames the queries as newline-delimited `{"index": alias}` / body pairs.
///
/// Query bodies are only compacted so each one fits on a single line: key
/// order, duplicate keys and number literals reach the backend as written.
pub fn build_batch_body(queries: &QueryMap) -> Result<String> {
    let mut body = String::new();

    for query in queries.values() {
        let header = json!({ "index": query.target_alias });

        body.push_str(&serde_json::to_string(&header)?);
        body.push('\n');
        body.push_str(&compact_json(&query.query_body)?);
        body.push('\n');
    }

    Ok(body)
}

/// Drops insignificant whitespace from a JSON document without re-encoding it.
pub fn compact_json(raw: &str) -> Result<String> {
    serde_json::from_str::<IgnoredAny>(raw)?;

    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in raw.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if !matches!(c, ' ' | '\t' | '\n' | '\r') {
            out.push(c);
        }
    }

    Ok(out)
}

#[derive(Deserialize)]
struct MultiSearchEnvelope<'a> {
    #[serde(borrow)]
    responses: Option<Vec<&'a RawValue>>,
}

#[derive(Deserialize)]
struct SubResponseStatus<'a> {
    #[serde(borrow)]
    error: Option<&'a RawValue>,
}

/// Zips an ordered multi-search response onto `names`.
///
/// Accepts the `{"responses": [...]}` envelope or a bare array. A length
/// mismatch is fatal: positions cannot be trusted once counts differ. A
/// sub-response carrying an `error` object fails the whole batch. Payloads
/// are handed back as the backend wrote them, only compacted.
pub fn split_batch_response(names: &[&str], raw: &str) -> Result<ResultBundle> {
    let responses: Vec<&RawValue> = match raw.trim_start().chars().next() {
        Some('[') => serde_json::from_str(raw)?,
        Some('{') => {
            let envelope: MultiSearchEnvelope = serde_json::from_str(raw)?;
            envelope.responses.ok_or_else(|| {
                DashError::MalformedResponse("champ \"responses\" absent".into())
            })?
        }
        _ => {
            serde_json::from_str::<IgnoredAny>(raw)?;
            return Err(DashError::MalformedResponse(
                "la réponse batch n'est ni un objet ni un tableau".into(),
            ));
        }
    };

    if responses.len() != names.len() {
        return Err(DashError::ResponseCountMismatch {
            expected: names.len(),
            actual: responses.len(),
        });
    }

    let mut bundle = ResultBundle::new();
    for (name, response) in names.iter().zip(responses) {
        let status: SubResponseStatus = serde_json::from_str(response.get())
            .unwrap_or(SubResponseStatus { error: None });
        if let Some(err) = status.error {
            return Err(DashError::QueryExecution {
                name: name.to_string(),
                message: err.get().to_string(),
            });
        }
        bundle.insert(name.to_string(), compact_json(response.get())?);
    }

    Ok(bundle)
}
