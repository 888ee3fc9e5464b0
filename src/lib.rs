pub mod analyzer;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;

pub use analyzer::{
    annotate_series, compute_date_buckets, has_no_hits, is_response_empty, DateBucket, Granularity,
};
pub use backend::{HttpSearchBackend, SearchBackend};
pub use config::{DispatchMode, EngineConfig};
pub use dispatch::{
    query_map, BatchDispatcher, CountQueryRunner, FanoutDispatcher, NamedQuery, QueryMap,
    QueryResult, ResultBundle,
};
pub use engine::ReportingEngine;
pub use error::{DashError, Result};

// ─── E2E Tests ───────────────────────────────────────────────────────────────
