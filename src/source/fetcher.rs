// Fetchers - retrieve raw content for a data source URL
// The scheme part of the URL (file, http, https, or anything registered)
// picks which fetcher runs

use super::filetype::Filetype;
use crate::error::{QueryError, Result};
use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Raw content of a source plus the format it's believed to be in
#[derive(Debug, Clone, PartialEq)]
pub struct RawData {
    pub filetype: Filetype,
    pub content: String,
}

impl RawData {
    pub fn new(filetype: Filetype, content: impl Into<String>) -> Self {
        Self {
            filetype,
            content: content.into(),
        }
    }
}

/// A fetcher retrieves the content behind a source URL
///
/// `source` is the full URL including its scheme. Implement this to
/// plug a custom scheme into the registry with `register_fetcher`.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, source: &str) -> anyhow::Result<RawData>;
}

/// Reads `file://<path>` sources from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

#[async_trait]
impl Fetch for FileFetcher {
    async fn fetch(&self, source: &str) -> anyhow::Result<RawData> {
        let path = Path::new(source.strip_prefix("file://").unwrap_or(source));
        let filetype = Filetype::from_extension(path.extension().and_then(OsStr::to_str));

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;

        Ok(RawData::new(filetype, content))
    }
}

/// Downloads `http://` and `https://` sources
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, source: &str) -> anyhow::Result<RawData> {
        let resp = self.client.get(source).send().await?.error_for_status()?;

        // 1. try the Content-Type header
        let mut filetype = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(Filetype::from_content_type)
            .unwrap_or(Filetype::Unknown);

        // 2. fall back to the extension in the url
        if filetype == Filetype::Unknown {
            filetype = Filetype::from_location(source);
        }

        Ok(RawData::new(filetype, resp.text().await?))
    }
}

/// Maps URL schemes to fetchers
pub struct FetcherRegistry {
    fetchers: RwLock<HashMap<String, Arc<dyn Fetch>>>,
}

impl FetcherRegistry {
    /// An empty registry with no schemes
    pub fn new() -> Self {
        Self {
            fetchers: RwLock::new(HashMap::new()),
        }
    }

    /// A registry handling file, http and https
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let http = HttpFetcher::default();
        registry.register("file", FileFetcher);
        registry.register("http", http.clone());
        registry.register("https", http);
        registry
    }

    /// Register a fetcher for a scheme, replacing any existing one
    pub fn register(&self, scheme: impl Into<String>, fetcher: impl Fetch + 'static) {
        let scheme = scheme.into().to_ascii_lowercase();
        debug!("registering fetcher for scheme: {}", scheme);
        self.fetchers.write().insert(scheme, Arc::new(fetcher));
    }

    /// Whether a scheme has a fetcher
    pub fn supports(&self, scheme: &str) -> bool {
        self.fetchers
            .read()
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Fetch a source through the fetcher for its scheme
    pub async fn retrieve(&self, source: &str) -> Result<RawData> {
        let (scheme, _) = source
            .split_once("://")
            .ok_or_else(|| QueryError::fetch(source, "protocol is not specified"))?;

        // Clone the fetcher out so the lock isn't held across the await
        let fetcher = self
            .fetchers
            .read()
            .get(&scheme.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                QueryError::fetch(source, format!("unsupported protocol '{}'", scheme))
            })?;

        fetcher
            .fetch(source)
            .await
            .map_err(|e| QueryError::fetch(source, format!("{:#}", e)))
    }
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

static DEFAULT_REGISTRY: Lazy<FetcherRegistry> = Lazy::new(FetcherRegistry::with_defaults);

/// The process-wide registry used by `crate::query`
pub fn default_registry() -> &'static FetcherRegistry {
    &DEFAULT_REGISTRY
}

/// Register a fetcher for a scheme in the process-wide registry
pub fn register_fetcher(scheme: impl Into<String>, fetcher: impl Fetch + 'static) {
    DEFAULT_REGISTRY.register(scheme, fetcher);
}

/// Retrieve a source through the process-wide registry
pub async fn retrieve_data(source: impl AsRef<str>) -> Result<RawData> {
    DEFAULT_REGISTRY.retrieve(source.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct StaticFetcher(&'static str);

    #[async_trait]
    impl Fetch for StaticFetcher {
        async fn fetch(&self, _source: &str) -> anyhow::Result<RawData> {
            Ok(RawData::new(Filetype::Json, self.0))
        }
    }

    #[tokio::test]
    async fn test_file_fetcher_reads_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"a": 1}}]"#).unwrap();

        let url = format!("file://{}", file.path().display());
        let data = FetcherRegistry::with_defaults().retrieve(&url).await.unwrap();
        assert_eq!(data.filetype, Filetype::Json);
        assert_eq!(data.content, r#"[{"a": 1}]"#);
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let err = FetcherRegistry::with_defaults()
            .retrieve("file://./definitely/not/here.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Fetch { .. }));
        assert!(err.to_string().contains("not/here.csv"));
    }

    #[tokio::test]
    async fn test_protocol_is_required() {
        let err = FetcherRegistry::with_defaults()
            .retrieve("data.json")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("protocol is not specified"));
    }

    #[tokio::test]
    async fn test_unknown_protocol() {
        let err = FetcherRegistry::with_defaults()
            .retrieve("ftp://example.com/data.csv")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported protocol 'ftp'"));
    }

    #[tokio::test]
    async fn test_register_custom_fetcher() {
        let registry = FetcherRegistry::new();
        assert!(!registry.supports("custom"));

        registry.register("Custom", StaticFetcher(r#"[{"score": 60}]"#));
        assert!(registry.supports("custom"));

        let data = registry.retrieve("custom://anything").await.unwrap();
        assert_eq!(data, RawData::new(Filetype::Json, r#"[{"score": 60}]"#));
    }
}
