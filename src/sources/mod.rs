// src/sources/mod.rs

//! Source runners and their dispatcher
//!
//! A source runner is the backend that resolves and materializes packages
//! from one kind of source (normal feed, OS feature provider, external
//! vendor catalog). The set is closed at construction; the dispatcher is
//! an immutable registry consulted per configuration.
//!
//! Runners hand each materialized package back through a result sink so
//! the coordinator can run the post-materialization pipeline while the
//! runner still owns the operation.

use std::collections::BTreeMap;
use tracing::warn;

use crate::config::Configuration;
use crate::error::Result;
use crate::results::PackageResult;

/// Callback invoked per package result; the per-package configuration is
/// captured by value upstream so runners never retain shared mutable
/// state.
pub type ResultSink<'a> = &'a mut dyn FnMut(&mut PackageResult, &Configuration) -> Result<()>;

/// Backend capability interface for one source kind
pub trait SourceRunner {
    /// Declared source-kind name, matched against
    /// [`SourceType::as_str`](crate::config::SourceType::as_str)
    fn source_type(&self) -> &'static str;

    /// Install any app the source itself needs before it can operate
    fn ensure_source_app_installed(&self, config: &Configuration) -> Result<()>;

    fn count_run(&self, config: &Configuration) -> Result<usize>;

    fn list_run(&self, config: &Configuration) -> Result<Vec<PackageResult>>;
    fn list_noop(&self, config: &Configuration) -> Result<()>;

    fn install_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>>;
    fn install_noop(&self, config: &Configuration) -> Result<()>;

    fn upgrade_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
        before_modify: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>>;
    fn upgrade_noop(&self, config: &Configuration) -> Result<()>;

    fn uninstall_run(
        &self,
        config: &Configuration,
        on_result: ResultSink,
        before_modify: ResultSink,
    ) -> Result<BTreeMap<String, PackageResult>>;
    fn uninstall_noop(&self, config: &Configuration) -> Result<()>;

    fn get_outdated(&self, config: &Configuration) -> Result<BTreeMap<String, PackageResult>>;

    /// Drop any rollback snapshot the runner keeps for `name`
    fn remove_rollback_directory_if_exists(&self, name: &str);

    /// Build a package from a manifest; only feed-style sources support
    /// this.
    fn pack_run(&self, _config: &Configuration) -> Result<()> {
        warn!("This source does not support packing");
        Ok(())
    }

    /// Push a built package to the source; only feed-style sources
    /// support this.
    fn push_run(&self, _config: &Configuration) -> Result<()> {
        warn!("This source does not support pushing");
        Ok(())
    }
}

/// Immutable registry of source runners known at construction
pub struct SourceDispatcher {
    runners: Vec<Box<dyn SourceRunner>>,
}

impl SourceDispatcher {
    pub fn new(runners: Vec<Box<dyn SourceRunner>>) -> Self {
        Self { runners }
    }

    /// Find the runner whose declared type equals the wanted kind or its
    /// plural form. Unknown kinds log a warning and return `None`; the
    /// caller treats the operation as a no-op.
    pub fn resolve(&self, source_type: &str) -> Option<&dyn SourceRunner> {
        let plural = format!("{}s", source_type);
        let found = self
            .runners
            .iter()
            .find(|r| r.source_type() == source_type || r.source_type() == plural)
            .map(|r| r.as_ref());
        if found.is_none() {
            warn!("No source runner registered for '{}'; skipping", source_type);
        }
        found
    }
}
