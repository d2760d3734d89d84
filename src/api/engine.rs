//! High-level engine facade.
//!
//! [`PythiaEngine`] is the boundary the CLI and other adapters consume: it
//! owns the configured analyzer list and the optional result cache, runs the
//! analyzers over a file or directory tree, keeps the composite result, and
//! renders reports from it.

use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::analyzers::{self, build_analyzers, Analyzer};
use crate::core::config::PythiaConfig;
use crate::core::errors::{PythiaError, Result};
use crate::core::results::{AnalyzerReport, CompositeResult};
use crate::io::cache::ResultCache;
use crate::io::reports::{self, ReportFormat};

/// Runs the enabled principle analyzers and composes their results.
pub struct PythiaEngine {
    config: PythiaConfig,
    analyzers: Vec<Box<dyn Analyzer>>,
    cache: Option<ResultCache>,
    results: Option<CompositeResult>,
}

impl PythiaEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: PythiaConfig) -> Result<Self> {
        config.validate()?;
        let analyzers = build_analyzers(&config);
        let cache = config
            .use_cache
            .then(|| ResultCache::new(config.cache_dir.clone()));
        info!(
            "Engine ready with {} analyzers (cache {})",
            analyzers.len(),
            if cache.is_some() { "enabled" } else { "disabled" }
        );
        Ok(Self {
            config,
            analyzers,
            cache,
            results: None,
        })
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &PythiaConfig {
        &self.config
    }

    /// The composite result of the last analysis, if any.
    pub fn results(&self) -> Option<&CompositeResult> {
        self.results.as_ref()
    }

    /// Analyze a single file with every enabled analyzer.
    ///
    /// File-scoped failures (unreadable, undecodable, or syntactically
    /// invalid sources) are absorbed into per-analyzer error sentinels; the
    /// call itself only fails on configuration-level problems.
    pub fn analyze_file(&mut self, path: impl AsRef<Path>) -> Result<CompositeResult> {
        let path = path.as_ref();
        debug!("Analyzing file {}", path.display());

        let mut records = IndexMap::new();
        for analyzer in &self.analyzers {
            let analysis = analyzers::analyze_file(analyzer.as_ref(), self.cache.as_ref(), path);
            records.insert(
                analyzer.kind().key().to_string(),
                AnalyzerReport::File(analysis),
            );
        }

        let composite = CompositeResult::compose(path, records);
        self.results = Some(composite.clone());
        Ok(composite)
    }

    /// Analyze every Python file under a directory root.
    ///
    /// With `parallel` set, file analyses fan out to a worker pool sized to
    /// the available cores — except for corpus-dependent analyzers (DRY),
    /// which always run their files sequentially so cross-file duplicate
    /// detection sees the complete corpus. Per-file failures become error
    /// sentinels; only enumeration of the root itself can fail.
    pub fn analyze_directory(
        &mut self,
        root: impl AsRef<Path>,
        parallel: bool,
    ) -> Result<CompositeResult> {
        let root = root.as_ref();
        info!("Analyzing directory {} (parallel: {parallel})", root.display());

        let mut records = IndexMap::new();
        for analyzer in &self.analyzers {
            let analysis = analyzers::analyze_directory(
                analyzer.as_ref(),
                self.cache.as_ref(),
                root,
                parallel,
            )?;
            records.insert(
                analyzer.kind().key().to_string(),
                AnalyzerReport::Directory(analysis),
            );
        }

        let composite = CompositeResult::compose(root, records);
        self.results = Some(composite.clone());
        Ok(composite)
    }

    /// Render the last analysis in the requested format, optionally writing
    /// it to `output_path` as well.
    pub fn generate_report(
        &self,
        format: ReportFormat,
        output_path: Option<&Path>,
    ) -> Result<String> {
        let composite = self
            .results
            .as_ref()
            .ok_or_else(|| PythiaError::report("no analysis results available"))?;

        let report = reports::generate_report(composite, &self.analyzers, format)?;
        if let Some(path) = output_path {
            reports::write_report(&report, path)?;
        }
        Ok(report)
    }

    /// Clear stored results and every analyzer's run-scoped state.
    ///
    /// Reusing one engine across independent runs is defined behavior only
    /// after calling this.
    pub fn reset(&mut self) {
        for analyzer in &self.analyzers {
            analyzer.reset();
        }
        self.results = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AnalyzerKind;
    use std::fs;

    fn engine() -> PythiaEngine {
        PythiaEngine::new(PythiaConfig::default()).unwrap()
    }

    #[test]
    fn test_composite_keys_follow_configuration_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("m.py"), "x = 2\n").unwrap();

        let mut engine = engine();
        let composite = engine.analyze_directory(dir.path(), false).unwrap();
        let keys: Vec<_> = composite.analyzers.keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["srp", "ocp", "lsp", "isp", "dip", "kiss", "dry"]
        );
    }

    #[test]
    fn test_trivial_file_scores_one_across_the_board() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trivial.py");
        fs::write(&path, "def constant():\n    return None\n").unwrap();

        let mut engine = engine();
        let composite = engine.analyze_file(&path).unwrap();
        assert_eq!(composite.overall_quality_score, 1.0);
        for report in composite.analyzers.values() {
            assert_eq!(report.overall_score(), Some(1.0));
        }
    }

    #[test]
    fn test_report_requires_results() {
        let engine = engine();
        assert!(engine.generate_report(ReportFormat::Text, None).is_err());
    }

    #[test]
    fn test_subset_of_analyzers_runs_only_those() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("m.py"), "x = 2\n").unwrap();

        let mut config = PythiaConfig::default();
        config.enabled_analyzers = vec![AnalyzerKind::Kiss, AnalyzerKind::Dry];
        let mut engine = PythiaEngine::new(config).unwrap();
        let composite = engine.analyze_directory(dir.path(), false).unwrap();
        let keys: Vec<_> = composite.analyzers.keys().cloned().collect();
        assert_eq!(keys, vec!["kiss", "dry"]);
    }

    #[test]
    fn test_reset_makes_engine_reuse_defined() {
        let dir = tempfile::tempdir().unwrap();
        let shared = "\
def repeated(value):
    total = value + 10
    total = total * 2
    total = total - 3
    return total
";
        fs::write(dir.path().join("a.py"), shared).unwrap();

        let mut config = PythiaConfig::default();
        config.enabled_analyzers = vec![AnalyzerKind::Dry];
        let mut engine = PythiaEngine::new(config).unwrap();

        let first = engine.analyze_directory(dir.path(), false).unwrap();
        engine.reset();
        let second = engine.analyze_directory(dir.path(), false).unwrap();
        // Without the reset the second run would see every window twice and
        // report self-duplicates.
        assert_eq!(first, second);
    }
}
