//! The project's dependency file, enriched with installed metadata

use super::{detect_manifest, get_parser, read_manifest};
use crate::domain::{DeclaredDependency, InstalledFact, ManifestKind, PackageId};
use crate::error::ManifestError;
use crate::knowledge_base::KnowledgeBase;
use crate::update::installed_version_state;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One manifest and its declared dependencies, in declaration order
#[derive(Debug, Clone)]
pub struct DbtPackageFile {
    path: PathBuf,
    kind: ManifestKind,
    dependencies: Vec<DeclaredDependency>,
    index: HashMap<PackageId, usize>,
    name_lookup: OnceCell<HashMap<String, PackageId>>,
}

impl DbtPackageFile {
    /// Detects, reads and parses the project's manifest
    pub fn load(root: &Path) -> Result<Self, ManifestError> {
        let info = detect_manifest(root)?;
        let content = read_manifest(&info.path)?;
        let dependencies = get_parser(info.kind).parse(&info.path, &content)?;
        debug!(path = %info.path.display(), count = dependencies.len(), "parsed manifest");
        Ok(Self::from_dependencies(info.path, info.kind, dependencies))
    }

    /// Builds a file model from already parsed dependencies
    pub fn from_dependencies(
        path: impl Into<PathBuf>,
        kind: ManifestKind,
        dependencies: impl IntoIterator<Item = DeclaredDependency>,
    ) -> Self {
        let mut file = Self {
            path: path.into(),
            kind,
            dependencies: Vec::new(),
            index: HashMap::new(),
            name_lookup: OnceCell::new(),
        };
        for dependency in dependencies {
            file.add_dependency(dependency);
        }
        file
    }

    /// Registers a dependency; a repeated identity keeps the first declaration
    pub fn add_dependency(&mut self, dependency: DeclaredDependency) -> bool {
        if self.index.contains_key(&dependency.id) {
            warn!(package = %dependency.id, path = %self.path.display(), "package declared twice, keeping the first declaration");
            return false;
        }
        self.index.insert(dependency.id.clone(), self.dependencies.len());
        self.dependencies.push(dependency);
        self.name_lookup = OnceCell::new();
        true
    }

    /// Path of the manifest
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format of the manifest
    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    /// Looks up a dependency by identity
    pub fn get(&self, id: &PackageId) -> Option<&DeclaredDependency> {
        self.index.get(id).map(|&i| &self.dependencies[i])
    }

    /// Declared dependencies, in declaration order
    pub fn dependencies(&self) -> &[DeclaredDependency] {
        &self.dependencies
    }

    /// Number of distinct declared dependencies
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns true if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Maps local package names to identities
    ///
    /// Built on first use. When two identities share a name the first
    /// registered keeps it and the collision is logged.
    pub fn get_reverse_lookup_by_package_name(&self) -> &HashMap<String, PackageId> {
        self.name_lookup.get_or_init(|| {
            let mut lookup: HashMap<String, PackageId> = HashMap::with_capacity(self.len());
            for dependency in &self.dependencies {
                match lookup.get(&dependency.name) {
                    Some(existing) => warn!(
                        name = %dependency.name,
                        kept = %existing,
                        ignored = %dependency.id,
                        "package name declared by two packages, keeping the first"
                    ),
                    None => {
                        lookup.insert(dependency.name.clone(), dependency.id.clone());
                    }
                }
            }
            lookup
        })
    }

    /// Attaches installed metadata and records each installed version's state
    ///
    /// Installed packages that match no declared name are ignored.
    pub fn merge_installed_versions(
        &mut self,
        installed: &HashMap<String, InstalledFact>,
        knowledge_base: &KnowledgeBase,
    ) {
        let matched: Vec<(usize, InstalledFact)> = {
            let lookup = self.get_reverse_lookup_by_package_name();
            let mut matched = Vec::new();
            for (name, fact) in installed {
                match lookup.get(name).and_then(|id| self.index.get(id)) {
                    Some(&i) => matched.push((i, fact.clone())),
                    None => debug!(package = %name, "installed package is not declared in the manifest"),
                }
            }
            matched
        };

        for (i, fact) in matched {
            self.dependencies[i].installed = Some(fact);
        }
        for dependency in &mut self.dependencies {
            dependency.installed_version_state = installed_version_state(dependency, knowledge_base);
        }
    }
}
