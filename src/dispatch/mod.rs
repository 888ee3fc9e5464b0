pub mod batch;
pub mod count;
pub mod fanout;

pub use batch::BatchDispatcher;
pub use count::CountQueryRunner;
pub use fanout::FanoutDispatcher;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DashError;

/// A search request built by a widget: the name keys its result in the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedQuery {
    pub name: String,
    pub query_body: String,
    pub target_alias: String,
}

impl NamedQuery {
    pub fn new(
        name: impl Into<String>,
        query_body: impl Into<String>,
        target_alias: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            query_body: query_body.into(),
            target_alias: target_alias.into(),
        }
    }
}

/// Outcome of one dispatched query, tagged with its name.
#[derive(Debug)]
pub struct QueryResult {
    pub name: String,
    pub raw_payload: String,
    pub error: Option<DashError>,
}

impl QueryResult {
    pub fn from_outcome(name: String, outcome: crate::error::Result<String>) -> Self {
        match outcome {
            Ok(raw_payload) => QueryResult {
                name,
                raw_payload,
                error: None,
            },
            Err(e) => QueryResult {
                name,
                raw_payload: String::new(),
                error: Some(e),
            },
        }
    }
}

/// Queries of one dispatch call, keyed by name. Ordered so batch framing is stable.
pub type QueryMap = BTreeMap<String, NamedQuery>;

/// Raw payloads of one dispatch call, keyed by query name.
pub type ResultBundle = BTreeMap<String, String>;

/// Keys a list of queries by their name; a repeated name keeps the last query.
pub fn query_map<I>(queries: I) -> QueryMap
where
    I: IntoIterator<Item = NamedQuery>,
{
    queries
        .into_iter()
        .map(|q| (q.name.clone(), q))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_map_keys_by_name() {
        let map = query_map(vec![
            NamedQuery::new("b", "{}", "alerts"),
            NamedQuery::new("a", "{}", "events"),
            NamedQuery::new("b", r#"{"size":0}"#, "alerts"),
        ]);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map["b"].query_body, r#"{"size":0}"#);
    }

    #[test]
    fn test_query_result_from_error() {
        let result = QueryResult::from_outcome(
            "q".into(),
            Err(DashError::Connection("down".into())),
        );
        assert!(result.raw_payload.is_empty());
        assert!(matches!(result.error, Some(DashError::Connection(_))));
    }
}
