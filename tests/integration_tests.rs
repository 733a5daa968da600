//! Integration tests for fusionup
//!
//! These tests verify:
//! - Manifest detection and fatal manifest errors
//! - Upgrade decisions for realistic dbt projects
//! - Applying decisions and rewriting the manifest in place

use fusionup::config::Settings;
use fusionup::domain::{PackageId, PackageVersionUpgradeResult, PackageVersionUpgradeType};
use fusionup::error::{AppError, ManifestError};
use fusionup::installed::scan_installed_packages;
use fusionup::knowledge_base::{
    KnowledgeBase, KnowledgeBaseSnapshot, Overrides, SourceSpec, DEFAULT_TIMEOUT,
};
use fusionup::manifest::DbtPackageFile;
use fusionup::orchestrator::{Orchestrator, OrchestratorResult};
use fusionup::update::{check_for_package_upgrades, upgrade_package_versions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Test fixture directory creation helper
fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Writes an installed package's dbt_project.yml under dbt_packages/
fn install_package(root: &Path, dir: &str, name: &str, version: &str, require: &str) {
    let package_dir = root.join("dbt_packages").join(dir);
    fs::create_dir_all(&package_dir).unwrap();
    let mut content = format!("name: '{}'\nversion: '{}'\n", name, version);
    if !require.is_empty() {
        content.push_str(&format!("require-dbt-version: {}\n", require));
    }
    fs::write(package_dir.join("dbt_project.yml"), content).unwrap();
}

fn knowledge_base(json: &str) -> KnowledgeBase {
    let snapshot: KnowledgeBaseSnapshot = serde_json::from_str(json).unwrap();
    KnowledgeBase::from_snapshot(snapshot)
}

fn settings(root: &Path, dry_run: bool, force_upgrade: bool) -> Settings {
    Settings {
        root: root.to_path_buf(),
        dry_run,
        force_upgrade,
        source: SourceSpec::File(root.join("kb.json")),
        timeout: DEFAULT_TIMEOUT,
        overrides: Overrides::default(),
    }
}

async fn run(root: &Path, dry_run: bool, force_upgrade: bool) -> OrchestratorResult {
    Orchestrator::new(settings(root, dry_run, force_upgrade))
        .run()
        .await
        .unwrap()
}

fn reason_of(result: &OrchestratorResult, id: &str) -> PackageVersionUpgradeType {
    result
        .summary
        .all_results()
        .find(|r| r.id.as_str() == id)
        .map(|r| r.version_reason)
        .unwrap_or_else(|| panic!("no result for {}", id))
}

const KB: &str = r#"{
    "generated_at": "2025-06-01T12:00:00Z",
    "packages": {
        "org/installed": {"fusion_compatible_versions": ["1.0.0"]},
        "org/in_range": {
            "latest_version": "1.6.0",
            "fusion_compatible_versions": ["1.2.0", "1.6.0"],
            "fusion_incompatible_versions": ["1.0.0"]
        },
        "org/out_of_range": {"fusion_compatible_versions": ["1.6.0"]},
        "org/legacy": {"fusion_incompatible_versions": ["0.1.0", "0.2.0"]}
    }
}"#;

const PACKAGES_YML: &str = r#"packages:
  - package: org/installed
    version: [">=1.0.0", "<2.0.0"]
  - package: org/in_range
    version: [">=1.0.0", "<1.5.0"]
  - package: org/out_of_range
    version: [">=1.0.0", "<1.5.0"]
  - package: org/legacy
    version: 0.1.0
  - package: org/unknown
    version: 2.0.0
  - local: ../shared_macros
"#;

fn create_test_project() -> TempDir {
    let dir = create_test_dir();
    fs::write(dir.path().join("packages.yml"), PACKAGES_YML).unwrap();
    fs::write(dir.path().join("kb.json"), KB).unwrap();
    install_package(dir.path(), "installed", "installed", "1.0.0", "[\">=1.5.0\", \"<3.0.0\"]");
    install_package(dir.path(), "in_range", "in_range", "1.0.0", "[\">=1.3.0\", \"<2.0.0\"]");
    dir
}

mod manifest_detection {
    use super::*;

    #[test]
    fn test_load_packages_yml() {
        let dir = create_test_project();
        let file = DbtPackageFile::load(dir.path()).unwrap();
        assert_eq!(file.len(), 6);
        assert_eq!(file.path(), dir.path().join("packages.yml"));
        assert!(file.get(&PackageId::from("org/in_range")).is_some());
    }

    #[test]
    fn test_dependencies_yml_wins_over_packages_yml() {
        let dir = create_test_project();
        fs::write(
            dir.path().join("dependencies.yml"),
            "packages:\n  - package: org/in_range\n    version: 1.0.0\n",
        )
        .unwrap();

        let file = DbtPackageFile::load(dir.path()).unwrap();
        assert_eq!(file.len(), 1);
        assert_eq!(file.path(), dir.path().join("dependencies.yml"));
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let dir = create_test_dir();
        let err = DbtPackageFile::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }

    #[test]
    fn test_duplicate_manifest_is_fatal() {
        let dir = create_test_project();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/packages.yml"), PACKAGES_YML).unwrap();

        let err = DbtPackageFile::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateManifest { .. }));
    }

    #[test]
    fn test_installed_packages_are_not_manifests() {
        let dir = create_test_project();
        fs::write(
            dir.path().join("dbt_packages/in_range/packages.yml"),
            "packages: []\n",
        )
        .unwrap();
        assert!(DbtPackageFile::load(dir.path()).is_ok());
    }

    #[test]
    fn test_malformed_manifest_is_fatal() {
        let dir = create_test_dir();
        fs::write(dir.path().join("packages.yml"), "packages: [unclosed\n").unwrap();
        assert!(DbtPackageFile::load(dir.path()).is_err());
    }
}

mod upgrade_decisions {
    use super::*;

    fn load_merged(dir: &TempDir, kb: &KnowledgeBase) -> DbtPackageFile {
        let mut file = DbtPackageFile::load(dir.path()).unwrap();
        file.merge_installed_versions(&scan_installed_packages(dir.path()), kb);
        file
    }

    fn decide(dir: &TempDir) -> Vec<PackageVersionUpgradeResult> {
        let kb = knowledge_base(KB);
        check_for_package_upgrades(&load_merged(dir, &kb), &kb)
    }

    #[test]
    fn test_one_decision_per_dependency_in_order() {
        let dir = create_test_project();
        let ids: Vec<_> = decide(&dir).into_iter().map(|r| r.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "org/installed",
                "org/in_range",
                "org/out_of_range",
                "org/legacy",
                "org/unknown",
                "../shared_macros",
            ]
        );
    }

    #[test]
    fn test_decisions_per_package() {
        let dir = create_test_project();
        let results = decide(&dir);
        let reasons: Vec<_> = results.iter().map(|r| r.version_reason).collect();
        assert_eq!(
            reasons,
            vec![
                PackageVersionUpgradeType::NoUpgradeRequired,
                PackageVersionUpgradeType::UpgradeAvailable,
                PackageVersionUpgradeType::PublicPackageFusionCompatibleVersionExceedsProjectConfig,
                PackageVersionUpgradeType::PublicPackageNotCompatibleWithFusion,
                PackageVersionUpgradeType::PublicPackageMissingFusionEligibility,
                PackageVersionUpgradeType::PrivatePackageMissingRequireDbtVersion,
            ]
        );

        assert_eq!(results[0].previous_version, "1.0.0");
        assert_eq!(results[1].compatible_version.as_ref().unwrap().to_version_string(), "1.2.0");
        assert_eq!(results[1].latest_version.as_ref().unwrap().to_version_string(), "1.6.0");
        assert_eq!(results[2].compatible_version.as_ref().unwrap().to_version_string(), "1.6.0");
        assert_eq!(results[4].previous_version, "unknown");
        assert!(!results[5].public_package);
    }

    #[test]
    fn test_decisions_are_idempotent() {
        let dir = create_test_project();
        assert_eq!(decide(&dir), decide(&dir));
    }

    #[test]
    fn test_overrides_win_over_knowledge_base() {
        let dir = create_test_project();
        let kb = knowledge_base(KB).with_overrides(Overrides::new(["org/legacy"], ["org/in_range"]));
        let results = check_for_package_upgrades(&load_merged(&dir, &kb), &kb);

        assert_eq!(results[1].version_reason, PackageVersionUpgradeType::PublicPackageNotCompatibleWithFusion);
        assert_eq!(results[3].version_reason, PackageVersionUpgradeType::NoUpgradeRequired);
    }

    #[test]
    fn test_duplicate_package_names_keep_first() {
        let dir = create_test_dir();
        fs::write(
            dir.path().join("packages.yml"),
            "packages:\n  - package: first/utils\n    version: 1.0.0\n  - package: second/utils\n    version: 1.0.0\n",
        )
        .unwrap();
        install_package(dir.path(), "utils", "utils", "1.0.0", "[\">=1.0.0\", \"<3.0.0\"]");

        let kb = KnowledgeBase::empty();
        let mut file = DbtPackageFile::load(dir.path()).unwrap();
        assert_eq!(
            file.get_reverse_lookup_by_package_name().get("utils"),
            Some(&PackageId::from("first/utils"))
        );
        file.merge_installed_versions(&scan_installed_packages(dir.path()), &kb);
        let results = check_for_package_upgrades(&file, &kb);

        assert_eq!(results[0].version_reason, PackageVersionUpgradeType::NoUpgradeRequired);
        assert_eq!(
            results[1].version_reason,
            PackageVersionUpgradeType::PublicPackageMissingFusionEligibility
        );
    }

    #[test]
    fn test_force_flag_controls_out_of_range_upgrade() {
        let dir = create_test_project();
        let kb = knowledge_base(KB);
        let file = load_merged(&dir, &kb);

        let plain = upgrade_package_versions(&file, check_for_package_upgrades(&file, &kb), false, true);
        let forced = upgrade_package_versions(&file, check_for_package_upgrades(&file, &kb), true, true);

        assert_eq!(plain.upgrade_count(), 1);
        assert_eq!(plain.forced_candidates().count(), 1);
        assert_eq!(forced.upgrade_count(), 2);
        assert_eq!(forced.forced_candidates().count(), 0);
        assert_eq!(plain.total_packages(), forced.total_packages());
    }
}

mod manifest_rewrite {
    use super::*;

    #[tokio::test]
    async fn test_apply_rewrites_only_upgraded_versions() {
        let dir = create_test_project();
        let result = run(dir.path(), false, false).await;

        assert!(result.summary.upgraded);
        assert_eq!(reason_of(&result, "org/in_range"), PackageVersionUpgradeType::UpgradeAvailable);
        let content = fs::read_to_string(dir.path().join("packages.yml")).unwrap();
        assert!(content.contains("  - package: org/in_range\n    version: \"1.2.0\"\n"));
        assert!(content.contains("  - package: org/out_of_range\n    version: [\">=1.0.0\", \"<1.5.0\"]\n"));
        assert!(content.contains("  - package: org/legacy\n    version: 0.1.0\n"));
        assert!(content.contains("  - local: ../shared_macros\n"));
    }

    #[tokio::test]
    async fn test_force_upgrade_rewrites_out_of_range() {
        let dir = create_test_project();
        let result = run(dir.path(), false, true).await;

        assert_eq!(result.summary.upgrade_count(), 2);
        let content = fs::read_to_string(dir.path().join("packages.yml")).unwrap();
        assert!(content.contains("  - package: org/out_of_range\n    version: \"1.6.0\"\n"));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_manifest_unchanged() {
        let dir = create_test_project();
        let result = run(dir.path(), true, true).await;

        assert_eq!(result.summary.upgrade_count(), 2);
        assert!(!result.summary.upgraded);
        assert_eq!(result.write_result.changes.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("packages.yml")).unwrap(),
            PACKAGES_YML
        );
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let dir = create_test_project();
        run(dir.path(), false, false).await;
        let after_first = fs::read_to_string(dir.path().join("packages.yml")).unwrap();

        let second = run(dir.path(), false, false).await;
        assert_eq!(
            fs::read_to_string(dir.path().join("packages.yml")).unwrap(),
            after_first
        );
        assert!(second.write_result.changes.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_manifest_error_aborts_run() {
        let dir = create_test_dir();
        let err = Orchestrator::new(settings(dir.path(), true, false))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Manifest(ManifestError::NotFound { .. })));
    }
}
