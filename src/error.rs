//! Application error types using thiserror
//!
//! Only manifest and config errors are fatal and reach `AppError`. Version
//! errors become notes on a result and knowledge base errors degrade to an
//! empty snapshot.
//!
//! Error hierarchy:
//! - VersionError: Malformed version specifiers and empty ranges
//! - ManifestError: Issues locating, parsing or rewriting packages.yml / dependencies.yml
//! - KnowledgeBaseError: Issues loading the Fusion compatibility snapshot
//! - ConfigError: Issues with CLI options or the project config file

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to version specifiers and ranges
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Input is not a semantic version (optionally prefixed by a matcher)
    #[error("malformed version '{input}': {message}")]
    Malformed { input: String, message: String },

    /// Specifiers whose intersection accepts no version at all
    #[error("version specifiers [{specifiers}] do not overlap")]
    EmptyRange { specifiers: String },
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// No packages.yml or dependencies.yml in the project
    #[error("no packages.yml or dependencies.yml found under {root}")]
    NotFound { root: PathBuf },

    /// More than one manifest of the same kind
    #[error("found {} {file_name} files, expected at most one: {}", .paths.len(), join_paths(.paths))]
    DuplicateManifest {
        file_name: &'static str,
        paths: Vec<PathBuf>,
    },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("failed to parse YAML in {path}: {message}")]
    YamlParseError { path: PathBuf, message: String },

    /// The manifest has no top-level `packages` list
    #[error("{path} must contain a top-level 'packages' list")]
    MissingPackagesKey { path: PathBuf },

    /// A single dependency entry is not a mapping or has an unusable shape
    #[error("invalid dependency entry #{index} in {path}: {message}")]
    InvalidEntry {
        path: PathBuf,
        index: usize,
        message: String,
    },

    /// A package to rewrite has no entry in the manifest text
    #[error("no '- package: {package}' entry found in {path}")]
    EntryNotFound { path: PathBuf, package: String },
}

/// Errors related to loading the Fusion compatibility knowledge base
#[derive(Error, Debug)]
pub enum KnowledgeBaseError {
    /// Network request failed
    #[error("failed to fetch knowledge base from {source_name}: {message}")]
    NetworkError {
        source_name: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching knowledge base from {source_name}")]
    Timeout { source_name: String },

    /// Response body is not a knowledge base snapshot
    #[error("invalid knowledge base response from {source_name}: {message}")]
    InvalidResponse {
        source_name: String,
        message: String,
    },

    /// Failed to read a local snapshot
    #[error("failed to read knowledge base file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local snapshot is not valid JSON of the expected shape
    #[error("failed to parse knowledge base file {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML of the expected shape
    #[error("invalid config file {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// Invalid knowledge base source
    #[error("invalid knowledge base source '{value}': expected a file path or an http(s) URL")]
    InvalidSource { value: String },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl VersionError {
    /// Creates a new Malformed error
    pub fn malformed(input: impl Into<String>, message: impl Into<String>) -> Self {
        VersionError::Malformed {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(root: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { root: root.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new YamlParseError
    pub fn yaml_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::YamlParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new EntryNotFound error
    pub fn entry_not_found(path: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        ManifestError::EntryNotFound {
            path: path.into(),
            package: package.into(),
        }
    }

    /// Creates a new InvalidEntry error
    pub fn invalid_entry(path: impl Into<PathBuf>, index: usize, message: impl Into<String>) -> Self {
        ManifestError::InvalidEntry {
            path: path.into(),
            index,
            message: message.into(),
        }
    }
}

impl KnowledgeBaseError {
    /// Creates a new NetworkError
    pub fn network_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        KnowledgeBaseError::NetworkError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(source_name: impl Into<String>) -> Self {
        KnowledgeBaseError::Timeout {
            source_name: source_name.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        KnowledgeBaseError::InvalidResponse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_error_malformed() {
        let err = VersionError::malformed("1.x", "expected MAJOR.MINOR.PATCH");
        let msg = format!("{}", err);
        assert!(msg.contains("malformed version '1.x'"));
        assert!(msg.contains("MAJOR.MINOR.PATCH"));
    }

    #[test]
    fn test_version_error_empty_range() {
        let err = VersionError::EmptyRange {
            specifiers: ">=2.0.0, <1.0.0".to_string(),
        };
        assert!(err.to_string().contains("do not overlap"));
    }

    #[test]
    fn test_manifest_error_not_found() {
        let err = ManifestError::not_found("/path/to/project");
        let msg = format!("{}", err);
        assert!(msg.contains("no packages.yml or dependencies.yml"));
        assert!(msg.contains("/path/to/project"));
    }

    #[test]
    fn test_manifest_error_duplicate_lists_every_path() {
        let err = ManifestError::DuplicateManifest {
            file_name: "packages.yml",
            paths: vec![PathBuf::from("/a/packages.yml"), PathBuf::from("/b/packages.yml")],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("found 2 packages.yml files"));
        assert!(msg.contains("/a/packages.yml"));
        assert!(msg.contains("/b/packages.yml"));
    }

    #[test]
    fn test_manifest_error_missing_packages_key() {
        let err = ManifestError::MissingPackagesKey {
            path: PathBuf::from("packages.yml"),
        };
        assert!(err.to_string().contains("top-level 'packages' list"));
    }

    #[test]
    fn test_manifest_error_invalid_entry() {
        let err = ManifestError::invalid_entry("packages.yml", 3, "entry must be a mapping");
        let msg = format!("{}", err);
        assert!(msg.contains("#3"));
        assert!(msg.contains("entry must be a mapping"));
    }

    #[test]
    fn test_manifest_error_entry_not_found() {
        let err = ManifestError::entry_not_found("packages.yml", "org/pkg");
        assert!(err.to_string().contains("'- package: org/pkg'"));
    }

    #[test]
    fn test_knowledge_base_error_timeout() {
        let err = KnowledgeBaseError::timeout("https://example.com/kb.json");
        let msg = format!("{}", err);
        assert!(msg.contains("timeout"));
        assert!(msg.contains("example.com"));
    }

    #[test]
    fn test_knowledge_base_error_network() {
        let err = KnowledgeBaseError::network_error("hub", "connection refused");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_config_error_invalid_source() {
        let err = ConfigError::InvalidSource {
            value: "".to_string(),
        };
        assert!(err.to_string().contains("invalid knowledge base source"));
    }

    #[test]
    fn test_app_error_from_manifest_error() {
        let app_err: AppError = ManifestError::not_found("/path").into();
        assert!(app_err.to_string().contains("no packages.yml"));
    }

    #[test]
    fn test_app_error_from_config_error() {
        let app_err: AppError = ConfigError::ConflictingOptions {
            message: "--quiet and --verbose cannot be used together".to_string(),
        }
        .into();
        assert!(app_err.to_string().contains("conflicting options"));
    }
}
