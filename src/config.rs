use serde::{Deserialize, Serialize};

/// How a batch of named queries is sent to the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One concurrent request per query.
    Fanout,
    /// A single multi-search request carrying every query.
    Batch,
}

impl DispatchMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fanout" => Some(DispatchMode::Fanout),
            "batch" => Some(DispatchMode::Batch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bearer_token: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub dispatch_mode: DispatchMode,
    pub abort_siblings_on_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            base_url: "http://localhost:9200".into(),
            username: None,
            password: None,
            bearer_token: None,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            dispatch_mode: DispatchMode::Fanout,
            abort_siblings_on_failure: false,
        }
    }
}

pub const ENV_PREFIX: &str = "DASH_";

impl EngineConfig {
    /// Builds a config from `(key, value)` pairs on top of the defaults.
    ///
    /// Keys are snake_case (`base_url`, `request_timeout_ms`, ...). Unknown keys are
    /// ignored and values that fail to parse keep their default.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = EngineConfig::default();

        for (key, value) in pairs {
            let value: String = value.into();
            match key.as_ref() {
                "base_url" => config.base_url = value.trim_end_matches('/').to_string(),
                "username" => config.username = non_empty(value),
                "password" => config.password = non_empty(value),
                "bearer_token" => config.bearer_token = non_empty(value),
                "connect_timeout_ms" => {
                    config.connect_timeout_ms = value.trim().parse().unwrap_or(5_000)
                }
                "request_timeout_ms" => {
                    config.request_timeout_ms = value.trim().parse().unwrap_or(30_000)
                }
                "dispatch_mode" => {
                    if let Some(mode) = DispatchMode::parse(&value) {
                        config.dispatch_mode = mode;
                    } else {
                        log::warn!("dispatch_mode inconnu ignoré: {}", value);
                    }
                }
                "abort_siblings_on_failure" => {
                    config.abort_siblings_on_failure =
                        matches!(value.trim(), "1" | "true" | "yes" | "on")
                }
                _ => {}
            }
        }

        config
    }

    /// Reads `DASH_*` environment variables, e.g. `DASH_BASE_URL`.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars().filter_map(|(key, value)| {
            key.strip_prefix(ENV_PREFIX)
                .map(|k| (k.to_ascii_lowercase(), value))
        }))
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
