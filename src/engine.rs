use std::sync::Arc;

use serde_json::Value;

use crate::analyzer::annotate::annotate_series;
use crate::analyzer::temporal::{generate_buckets, parse_range, DateBucket, Granularity};
use crate::backend::{HttpSearchBackend, SearchBackend};
use crate::config::{DispatchMode, EngineConfig};
use crate::dispatch::{
    BatchDispatcher, CountQueryRunner, FanoutDispatcher, NamedQuery, QueryMap, ResultBundle,
};
use crate::error::Result;

/// Entry point for widget code: one backend, one immutable config.
pub struct ReportingEngine<B> {
    backend: Arc<B>,
    config: EngineConfig,
}

impl ReportingEngine<HttpSearchBackend> {
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let backend = HttpSearchBackend::from_config(&config)?;
        Ok(Self::new(Arc::new(backend), config))
    }
}

impl<B> ReportingEngine<B>
where
    B: SearchBackend + 'static,
{
    pub fn new(backend: Arc<B>, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sends the queries the way `dispatch_mode` says.
    pub async fn dispatch(&self, queries: &QueryMap) -> Result<ResultBundle> {
        match self.config.dispatch_mode {
            DispatchMode::Fanout => self.fanout(queries).await,
            DispatchMode::Batch => self.batch(queries).await,
        }
    }

    pub async fn fanout(&self, queries: &QueryMap) -> Result<ResultBundle> {
        FanoutDispatcher::new(Arc::clone(&self.backend))
            .abort_siblings_on_failure(self.config.abort_siblings_on_failure)
            .dispatch(queries)
            .await
    }

    pub async fn batch(&self, queries: &QueryMap) -> Result<ResultBundle> {
        BatchDispatcher::new(Arc::clone(&self.backend))
            .dispatch(queries)
            .await
    }

    pub async fn count(&self, query: &NamedQuery) -> Result<u64> {
        CountQueryRunner::new(Arc::clone(&self.backend))
            .run(query)
            .await
    }

    /// Buckets `[date_from, date_to]` and attaches the buckets to `chart_data`.
    ///
    /// `period` is `day`, `week`, `month` or `auto`.
    pub fn annotated_series(
        &self,
        period: &str,
        date_from: &str,
        date_to: &str,
        chart_data: &Value,
    ) -> Result<(Vec<DateBucket>, Value)> {
        let (start, end) = parse_range(date_from, date_to)?;
        let granularity = Granularity::resolve(period, start, end)?;
        let buckets = generate_buckets(granularity, start, end);
        let annotated = annotate_series(chart_data, &buckets)?;
        Ok((buckets, annotated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::inspector::is_response_empty;
    use crate::backend::scripted::{hits, ScriptedBackend};
    use crate::dispatch::query_map;
    use crate::error::DashError;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn queries() -> QueryMap {
        query_map(vec![
            NamedQuery::new("a", "{}", "idx-a"),
            NamedQuery::new("b", "{}", "idx-b"),
        ])
    }

    #[tokio::test]
    async fn test_dispatch_follows_mode() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .respond("idx-a", &hits(0), 0)
                .respond("idx-b", &hits(3), 0)
                .batch_response(r#"{"responses": [{"hits": {"total": {"value": 0}}}, {"hits": {"total": {"value": 0}}}]}"#),
        );

        let fanout = ReportingEngine::new(Arc::clone(&backend), EngineConfig::default());
        let bundle = fanout.dispatch(&queries()).await.unwrap();
        assert!(!is_response_empty(&bundle));
        assert_eq!(backend.batch_calls.load(Ordering::SeqCst), 0);

        let batch = ReportingEngine::new(
            Arc::clone(&backend),
            EngineConfig {
                dispatch_mode: DispatchMode::Batch,
                ..EngineConfig::default()
            },
        );
        let bundle = batch.dispatch(&queries()).await.unwrap();
        assert!(is_response_empty(&bundle));
        assert_eq!(backend.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_annotated_series_auto_period() {
        let engine = ReportingEngine::new(Arc::new(ScriptedBackend::new()), EngineConfig::default());
        let chart = json!([{"data": [{"x": "2024-05-02", "y": 1}]}]);

        let (buckets, annotated) = engine
            .annotated_series("auto", "2024-05-01", "2024-05-03", &chart)
            .unwrap();

        assert_eq!(buckets.len(), 3);
        assert_eq!(
            annotated[0]["data"][0]["date"],
            json!({"startDate": "2024-05-02", "endDate": "2024-05-02"})
        );
    }

    #[test]
    fn test_annotated_series_rejects_bad_period() {
        let engine = ReportingEngine::new(Arc::new(ScriptedBackend::new()), EngineConfig::default());
        let chart = json!([{"data": []}]);
        assert!(matches!(
            engine.annotated_series("hour", "2024-05-01", "2024-05-03", &chart),
            Err(DashError::InvalidParameter(_))
        ));
    }
}
