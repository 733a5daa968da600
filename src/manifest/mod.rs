//! Manifest file detection, parsing and rewriting
//!
//! This module provides functionality to:
//! - Detect the project's packages.yml or dependencies.yml
//! - Parse declared dependencies from either format
//! - Merge installed package metadata into the declarations
//! - Rewrite declared versions in place

mod detector;
mod package_file;
mod parser;
mod writer;

pub use detector::{detect_manifest, find_manifest_files, select_manifest, ManifestInfo};
pub use package_file::DbtPackageFile;
pub use parser::{
    get_parser, version_strings, DependenciesYmlParser, ManifestParser, PackagesYmlParser,
    VersionEdit,
};
pub use writer::{read_manifest, write_manifest, LineChange, ManifestWriter, WriteResult};
