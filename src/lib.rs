//! fusionup - Fusion compatibility and upgrade advisor for dbt packages
//!
//! This library provides the core functionality for moving a dbt project's
//! package dependencies onto versions that run on dbt Fusion:
//! - Reading `packages.yml` / `dependencies.yml` and installed packages
//! - Loading the Fusion compatibility knowledge base
//! - Judging each dependency and rewriting the manifest

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod installed;
pub mod knowledge_base;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod update;
