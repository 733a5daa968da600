//! Knowledge base sources
//!
//! A source yields one snapshot per run. Loading never fails the run: any
//! error degrades to an empty knowledge base, which classifies every public
//! package as missing eligibility data.

use super::{HttpClient, KnowledgeBase, KnowledgeBaseSnapshot};
use crate::error::{ConfigError, KnowledgeBaseError};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Where to load the knowledge base from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceSpec {
    /// A JSON snapshot on disk
    File(PathBuf),
    /// A JSON snapshot served over HTTP(S)
    Url(String),
    /// No knowledge base
    #[default]
    None,
}

impl SourceSpec {
    /// Interprets a CLI or config value as a URL or a file path
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidSource {
                value: value.to_string(),
            });
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Ok(SourceSpec::Url(trimmed.to_string()))
        } else if trimmed.contains("://") {
            Err(ConfigError::InvalidSource {
                value: value.to_string(),
            })
        } else {
            Ok(SourceSpec::File(PathBuf::from(trimmed)))
        }
    }

    /// Builds the source this value names
    pub fn into_source(
        self,
        timeout: Duration,
    ) -> Result<Box<dyn KnowledgeBaseSource>, KnowledgeBaseError> {
        Ok(match self {
            SourceSpec::File(path) => Box::new(FileSource::new(path)),
            SourceSpec::Url(url) => Box::new(UrlSource::new(url, HttpClient::with_timeout(timeout)?)),
            SourceSpec::None => Box::new(EmptySource),
        })
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::File(path) => write!(f, "{}", path.display()),
            SourceSpec::Url(url) => write!(f, "{}", url),
            SourceSpec::None => write!(f, "none"),
        }
    }
}

/// Trait for knowledge base sources
#[async_trait]
pub trait KnowledgeBaseSource: Send + Sync {
    /// Name used in logs and errors
    fn source_name(&self) -> String;

    /// Fetch the snapshot
    async fn fetch(&self) -> Result<KnowledgeBaseSnapshot, KnowledgeBaseError>;
}

/// Snapshot stored as a JSON file
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source reading `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KnowledgeBaseSource for FileSource {
    fn source_name(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<KnowledgeBaseSnapshot, KnowledgeBaseError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| KnowledgeBaseError::ReadError {
                path: self.path.clone(),
                source: e,
            })?;
        serde_json::from_str(&content).map_err(|e| KnowledgeBaseError::ParseError {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

/// Snapshot served over HTTP(S)
pub struct UrlSource {
    url: String,
    client: HttpClient,
}

impl UrlSource {
    /// Create a source fetching `url` with `client`
    pub fn new(url: impl Into<String>, client: HttpClient) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl KnowledgeBaseSource for UrlSource {
    fn source_name(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<KnowledgeBaseSnapshot, KnowledgeBaseError> {
        self.client.get_json(&self.url).await
    }
}

/// No knowledge base configured
pub struct EmptySource;

#[async_trait]
impl KnowledgeBaseSource for EmptySource {
    fn source_name(&self) -> String {
        "none".to_string()
    }

    async fn fetch(&self) -> Result<KnowledgeBaseSnapshot, KnowledgeBaseError> {
        Ok(KnowledgeBaseSnapshot::default())
    }
}

/// Loads the knowledge base, degrading to empty on any failure
pub async fn load_knowledge_base(source: &dyn KnowledgeBaseSource) -> KnowledgeBase {
    match source.fetch().await {
        Ok(snapshot) => {
            let kb = KnowledgeBase::from_snapshot(snapshot);
            info!(source = %source.source_name(), packages = kb.len(), "loaded knowledge base");
            kb
        }
        Err(e) => {
            warn!(source = %source.source_name(), error = %e, "knowledge base unavailable, continuing without it");
            KnowledgeBase::empty()
        }
    }
}
