//! Typeahead configuration.
//!
//! Timing, query bounds and channel settings. Values come from `Default`,
//! builder methods, `TYPEAHEAD_*` environment variables, or a YAML file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::TypeaheadError;

/// Default suggestion service endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8080/typeahead";

/// Default debounce window (milliseconds).
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Shortest prefix worth querying.
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// Longest prefix the service indexes meaningfully.
pub const DEFAULT_MAX_QUERY_LEN: usize = 20;

/// Default number of suggestions requested per query.
pub const DEFAULT_LIMIT: u32 = 5;

/// Default handshake timeout (milliseconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default base URL of the search view.
pub const DEFAULT_SEARCH_BASE: &str = "http://localhost:5173/";

/// How inbound batches are matched to outbound queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMode {
    /// Plain wire format; the most recently received batch wins.
    #[default]
    Latest,
    /// Outbound queries carry `seq`; batches must echo the latest one.
    Sequence,
}

/// Configuration for a typeahead session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeaheadConfig {
    /// WebSocket endpoint of the suggestion service.
    pub endpoint: String,

    /// Quiet period after the last keystroke before a query is considered.
    pub debounce_ms: u64,

    /// Inclusive lower bound on query length (characters).
    pub min_query_len: usize,

    /// Inclusive upper bound on query length (characters).
    pub max_query_len: usize,

    /// Suggestions requested per query.
    pub limit: u32,

    pub correlation: CorrelationMode,

    /// Handshake timeout when opening the channel.
    pub connect_timeout_ms: u64,

    /// Give up on an unanswered query after this long. `None` waits forever.
    pub response_timeout_ms: Option<u64>,

    /// Base URL the committed query is routed under (`<base>/search?q=...`,
    /// keeping any path prefix of the base).
    pub search_base: String,
}

impl Default for TypeaheadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            max_query_len: DEFAULT_MAX_QUERY_LEN,
            limit: DEFAULT_LIMIT,
            correlation: CorrelationMode::Latest,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            response_timeout_ms: None,
            search_base: DEFAULT_SEARCH_BASE.to_string(),
        }
    }
}

impl TypeaheadConfig {
    /// Load from a YAML file. Missing keys fall back to defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        let config: TypeaheadConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Parsing {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Validating {}", path.display()))?;
        Ok(config)
    }

    /// Overlay `TYPEAHEAD_*` environment variables on the defaults.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Overlay `TYPEAHEAD_*` environment variables on this config.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(endpoint) = lookup("TYPEAHEAD_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(v) = lookup("TYPEAHEAD_DEBOUNCE_MS") {
            self.debounce_ms = v.parse().context("TYPEAHEAD_DEBOUNCE_MS")?;
        }
        if let Some(v) = lookup("TYPEAHEAD_MIN_QUERY_LEN") {
            self.min_query_len = v.parse().context("TYPEAHEAD_MIN_QUERY_LEN")?;
        }
        if let Some(v) = lookup("TYPEAHEAD_MAX_QUERY_LEN") {
            self.max_query_len = v.parse().context("TYPEAHEAD_MAX_QUERY_LEN")?;
        }
        if let Some(v) = lookup("TYPEAHEAD_LIMIT") {
            self.limit = v.parse().context("TYPEAHEAD_LIMIT")?;
        }
        if let Some(v) = lookup("TYPEAHEAD_CORRELATION") {
            self.correlation = match v.to_ascii_lowercase().as_str() {
                "latest" => CorrelationMode::Latest,
                "sequence" => CorrelationMode::Sequence,
                other => anyhow::bail!("TYPEAHEAD_CORRELATION: unknown mode '{}'", other),
            };
        }
        if let Some(v) = lookup("TYPEAHEAD_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = v.parse().context("TYPEAHEAD_CONNECT_TIMEOUT_MS")?;
        }
        if let Some(v) = lookup("TYPEAHEAD_RESPONSE_TIMEOUT_MS") {
            self.response_timeout_ms = Some(v.parse().context("TYPEAHEAD_RESPONSE_TIMEOUT_MS")?);
        }
        if let Some(base) = lookup("TYPEAHEAD_SEARCH_BASE") {
            self.search_base = base;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> std::result::Result<(), TypeaheadError> {
        if self.min_query_len == 0 {
            return Err(TypeaheadError::Config(
                "min_query_len must be at least 1".into(),
            ));
        }
        if self.min_query_len > self.max_query_len {
            return Err(TypeaheadError::Config(format!(
                "min_query_len ({}) exceeds max_query_len ({})",
                self.min_query_len, self.max_query_len
            )));
        }
        if self.limit == 0 {
            return Err(TypeaheadError::Config("limit must be positive".into()));
        }
        if self.debounce_ms == 0 {
            return Err(TypeaheadError::Config("debounce_ms must be positive".into()));
        }
        url::Url::parse(&self.endpoint)
            .map_err(|e| TypeaheadError::Config(format!("endpoint '{}': {}", self.endpoint, e)))?;
        url::Url::parse(&self.search_base).map_err(|e| {
            TypeaheadError::Config(format!("search_base '{}': {}", self.search_base, e))
        })?;
        Ok(())
    }

    /// Set the endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the debounce window.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the accepted query length range.
    pub fn query_len(mut self, min: usize, max: usize) -> Self {
        self.min_query_len = min;
        self.max_query_len = max;
        self
    }

    /// Set the number of suggestions requested.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn correlation(mut self, mode: CorrelationMode) -> Self {
        self.correlation = mode;
        self
    }

    /// Set the response timeout (milliseconds).
    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.response_timeout_ms = Some(ms);
        self
    }

    /// Debounce window as Duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Handshake timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Response timeout as Duration, if one is configured.
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TypeaheadConfig::default();
        assert_eq!(config.endpoint, "ws://localhost:8080/typeahead");
        assert_eq!(config.debounce_ms, 400);
        assert_eq!(config.min_query_len, 3);
        assert_eq!(config.max_query_len, 20);
        assert_eq!(config.limit, 5);
        assert_eq!(config.correlation, CorrelationMode::Latest);
        assert!(config.response_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TypeaheadConfig::default()
            .debounce_ms(300)
            .query_len(2, 30)
            .limit(8)
            .correlation(CorrelationMode::Sequence)
            .response_timeout_ms(1500);

        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!((config.min_query_len, config.max_query_len), (2, 30));
        assert_eq!(config.limit, 8);
        assert_eq!(config.correlation, CorrelationMode::Sequence);
        assert_eq!(config.response_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = TypeaheadConfig::default().query_len(10, 5);
        assert!(matches!(config.validate(), Err(TypeaheadError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limit_and_debounce() {
        assert!(TypeaheadConfig::default().limit(0).validate().is_err());
        assert!(TypeaheadConfig::default().debounce_ms(0).validate().is_err());
        assert!(TypeaheadConfig::default().query_len(0, 5).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let config = TypeaheadConfig::default().endpoint("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TYPEAHEAD_ENDPOINT", "ws://suggest.internal:9000/typeahead"),
            ("TYPEAHEAD_DEBOUNCE_MS", "350"),
            ("TYPEAHEAD_CORRELATION", "Sequence"),
            ("TYPEAHEAD_RESPONSE_TIMEOUT_MS", "2000"),
        ]
        .into_iter()
        .collect();

        let config = TypeaheadConfig::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.endpoint, "ws://suggest.internal:9000/typeahead");
        assert_eq!(config.debounce_ms, 350);
        assert_eq!(config.correlation, CorrelationMode::Sequence);
        assert_eq!(config.response_timeout_ms, Some(2000));
        assert_eq!(config.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_env_overrides_reject_garbage() {
        let result = TypeaheadConfig::default().with_overrides(|key| {
            (key == "TYPEAHEAD_DEBOUNCE_MS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "endpoint: ws://127.0.0.1:8080/typeahead\ndebounce_ms: 250\ncorrelation: sequence"
        )
        .unwrap();

        let config = TypeaheadConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.endpoint, "ws://127.0.0.1:8080/typeahead");
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.correlation, CorrelationMode::Sequence);
        // Unspecified keys keep their defaults
        assert_eq!(config.max_query_len, DEFAULT_MAX_QUERY_LEN);
    }

    #[test]
    fn test_load_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_query_len: 9\nmax_query_len: 4").unwrap();
        assert!(TypeaheadConfig::load_from_file(file.path()).is_err());
    }
}
