//! The analyzer framework and the seven principle analyzers.
//!
//! Each analyzer implements one core operation over a parsed source unit plus
//! a handful of reporting hooks; the framework owns everything around it:
//! read-with-recovery, result caching, directory fan-out, and summary
//! composition. One bad file never aborts a directory run.

pub mod abstraction;
pub mod dip;
pub mod dry;
pub mod isp;
pub mod kiss;
pub mod lsp;
pub mod ocp;
pub mod srp;

use std::fmt::Write as _;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::config::{AnalyzerKind, PythiaConfig};
use crate::core::errors::{PythiaError, Result};
use crate::core::results::{base_summary, DirectoryAnalysis, FileAnalysis, Summary};
use crate::io::cache::ResultCache;
use crate::lang::python::{enumerate_python_files, SourceUnit};

/// Contract every principle analyzer implements.
///
/// `analyze_source` is the core operation; the summary and report hooks have
/// default bodies so an analyzer only overrides the sections it has something
/// to say in.
pub trait Analyzer: Send + Sync {
    /// Stable identity used in reports, configuration, and cache entries.
    fn kind(&self) -> AnalyzerKind;

    /// Human-readable analyzer name.
    fn name(&self) -> &str;

    /// One-line description of what the analyzer checks for.
    fn description(&self) -> &str;

    /// Analyze one parsed source unit.
    fn analyze_source(&self, unit: &SourceUnit) -> Result<FileAnalysis>;

    /// Whether per-file results remain valid across runs and may be cached.
    fn cacheable(&self) -> bool {
        true
    }

    /// Whether results depend on state accumulated across files in one run.
    fn corpus_dependent(&self) -> bool {
        false
    }

    /// Reset any run-scoped state accumulated across files.
    fn reset(&self) {}

    /// Inject analyzer-specific counters into a directory summary.
    fn contribute_to_summary(&self, _summary: &mut Summary, _files: &[FileAnalysis]) {}

    /// Append the analyzer's section body to the text report.
    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(report, "Files:");
        for file in &analysis.files {
            match &file.error {
                Some(error) => {
                    let _ = writeln!(report, "  {}: Error - {error}", file.file_path.display());
                }
                None => {
                    let _ = writeln!(report, "  {}", file.file_path.display());
                }
            }
        }
    }

    /// Append analyzer-specific lines to the HTML summary block.
    fn contribute_to_html_summary(&self, _html: &mut String, _summary: &Summary) {}

    /// Append the analyzer's section body to the HTML report.
    fn contribute_to_html_report(&self, html: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(html, "<h2>Files</h2>");
        for file in &analysis.files {
            let _ = writeln!(html, "<div class='file'>");
            let _ = writeln!(
                html,
                "<div class='file-path'>{}</div>",
                file.file_path.display()
            );
            if let Some(error) = &file.error {
                let _ = writeln!(html, "<p class='bad'>Error: {error}</p>");
            }
            let _ = writeln!(html, "</div>");
        }
    }
}

/// Instantiate the enabled analyzers in configured order.
pub fn build_analyzers(config: &PythiaConfig) -> Vec<Box<dyn Analyzer>> {
    config
        .enabled_analyzers
        .iter()
        .map(|kind| -> Box<dyn Analyzer> {
            match kind {
                AnalyzerKind::Srp => Box::new(srp::SrpAnalyzer::new(config.srp.clone())),
                AnalyzerKind::Ocp => Box::new(ocp::OcpAnalyzer::new()),
                AnalyzerKind::Lsp => Box::new(lsp::LspAnalyzer::new()),
                AnalyzerKind::Isp => Box::new(isp::IspAnalyzer::new(config.isp.clone())),
                AnalyzerKind::Dip => Box::new(dip::DipAnalyzer::new()),
                AnalyzerKind::Kiss => Box::new(kiss::KissAnalyzer::new(config.kiss.clone())),
                AnalyzerKind::Dry => Box::new(dry::DryAnalyzer::new(config.dry.clone())),
            }
        })
        .collect()
}

/// Analyze one file, absorbing file-scoped failures into error sentinels.
///
/// The read and parse happen here so implementations only ever see a valid
/// [`SourceUnit`]; read, parse, and analyzer failures all become sentinel
/// records instead of propagating.
pub fn analyze_file(
    analyzer: &dyn Analyzer,
    cache: Option<&ResultCache>,
    path: &Path,
) -> FileAnalysis {
    let cache = cache.filter(|_| analyzer.cacheable());

    if let Some(cache) = cache {
        if let Some(hit) = cache.get(analyzer.kind(), path) {
            debug!("Cache hit for {} on {}", analyzer.kind(), path.display());
            return hit;
        }
    }

    let unit = match SourceUnit::load(path) {
        Ok(unit) => unit,
        Err(PythiaError::Parse { message, .. }) => {
            warn!("Syntax error in {}: {message}", path.display());
            return FileAnalysis::error(path, format!("Syntax error: {message}"));
        }
        Err(err) => {
            warn!("Error reading file {}: {err}", path.display());
            return FileAnalysis::error(path, format!("File reading error: {err}"));
        }
    };

    let result = match analyzer.analyze_source(&unit) {
        Ok(result) => result,
        Err(err) => {
            warn!(
                "Error analyzing {} with {}: {err}",
                path.display(),
                analyzer.name()
            );
            return FileAnalysis::error(path, format!("Analysis error: {err}"));
        }
    };

    if let Some(cache) = cache {
        cache.put(analyzer.kind(), path, &result);
    }

    result
}

/// Analyze every Python file under a root with one analyzer.
///
/// Files are enumerated in sorted path order and each input path produces
/// exactly one result entry in that order. When `parallel` is set and the
/// analyzer is not corpus-dependent, files fan out to the rayon worker pool;
/// corpus-dependent analyzers always run sequentially so their cross-file
/// state sees every file.
pub fn analyze_directory(
    analyzer: &dyn Analyzer,
    cache: Option<&ResultCache>,
    root: &Path,
    parallel: bool,
) -> Result<DirectoryAnalysis> {
    let files = enumerate_python_files(root)?;
    if files.is_empty() {
        warn!("No Python files found in {}", root.display());
    }

    let results: Vec<FileAnalysis> = if parallel && files.len() > 1 && !analyzer.corpus_dependent()
    {
        files
            .par_iter()
            .map(|path| analyze_file(analyzer, cache, path))
            .collect()
    } else {
        files
            .iter()
            .map(|path| analyze_file(analyzer, cache, path))
            .collect()
    };

    let mut summary = base_summary(&results);
    analyzer.contribute_to_summary(&mut summary, &results);

    Ok(DirectoryAnalysis {
        files: results,
        summary,
    })
}

/// Compliance rate formatted the way report sections print it.
pub(crate) fn format_rate(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

/// `(total - violations) / total`, guarding the empty population at zero.
pub(crate) fn compliance_rate(total: usize, violations: usize) -> f64 {
    (total.saturating_sub(violations)) as f64 / total.max(1) as f64
}
