//! Report rendering.
//!
//! Three renderers over a [`CompositeResult`]: plain text, JSON (the
//! composite record serialized verbatim), and a self-contained HTML document
//! with an embedded stylesheet. Analyzer-specific sections are delegated to
//! each analyzer's report hooks; this module owns only the shell.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::analyzers::Analyzer;
use crate::core::errors::{PythiaError, Result};
use crate::core::results::{base_summary, AnalyzerReport, CompositeResult, DirectoryAnalysis};

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable plain text.
    Text,
    /// The composite record as pretty-printed JSON.
    Json,
    /// Self-contained HTML document.
    Html,
}

impl FromStr for ReportFormat {
    type Err = PythiaError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            other => Err(PythiaError::report(format!(
                "unknown report format '{other}' (expected text, json, or html)"
            ))),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Html => "html",
        })
    }
}

/// Semantic CSS class for a score: `good` ≥ 0.8, `warning` ≥ 0.6, else `bad`.
pub fn score_class(score: f64) -> &'static str {
    if score >= 0.8 {
        "good"
    } else if score >= 0.6 {
        "warning"
    } else {
        "bad"
    }
}

/// Render a composite result in the requested format.
pub fn generate_report(
    composite: &CompositeResult,
    analyzers: &[Box<dyn Analyzer>],
    format: ReportFormat,
) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(composite)?),
        ReportFormat::Text => Ok(text_report(composite, analyzers)),
        ReportFormat::Html => Ok(html_report(composite, analyzers)),
    }
}

/// Write a rendered report to a file.
pub fn write_report(report: &str, path: &Path) -> Result<()> {
    fs::write(path, report)
        .map_err(|err| PythiaError::report(format!("cannot write {}: {err}", path.display())))?;
    info!("Report written to {}", path.display());
    Ok(())
}

/// A uniform directory view over a per-analyzer report, so section hooks see
/// the same shape for single-file and directory runs.
fn directory_view(analyzer: &dyn Analyzer, report: &AnalyzerReport) -> DirectoryAnalysis {
    match report {
        AnalyzerReport::Directory(dir) => dir.clone(),
        AnalyzerReport::File(file) => {
            let files = vec![file.clone()];
            let mut summary = base_summary(&files);
            analyzer.contribute_to_summary(&mut summary, &files);
            DirectoryAnalysis { files, summary }
        }
    }
}

fn text_report(composite: &CompositeResult, analyzers: &[Box<dyn Analyzer>]) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "===== CODE QUALITY ANALYSIS REPORT =====");
    let _ = writeln!(
        report,
        "Overall Quality Score: {:.2}/1.00",
        composite.overall_quality_score
    );
    let _ = writeln!(report);

    for analyzer in analyzers {
        let Some(analyzer_report) = composite.analyzers.get(analyzer.kind().key()) else {
            continue;
        };
        let view = directory_view(analyzer.as_ref(), analyzer_report);

        let _ = writeln!(report, "===== {} =====", analyzer.name());
        let _ = writeln!(report, "Description: {}", analyzer.description());
        let _ = writeln!(report);
        let _ = writeln!(
            report,
            "Files analyzed: {}",
            view.summary.get("analyzed_count").cloned().unwrap_or_default()
        );
        let _ = writeln!(
            report,
            "Files with errors: {}",
            view.summary.get("error_count").cloned().unwrap_or_default()
        );
        let _ = writeln!(report);
        analyzer.contribute_to_text_report(&mut report, &view);
        let _ = writeln!(report);
    }

    report
}

const HTML_STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
h1 { color: #333; }
h2 { color: #666; }
.summary { background-color: #f5f5f5; padding: 10px; border-radius: 5px; margin-bottom: 20px; }
.analyzer { margin-bottom: 30px; border: 1px solid #eee; padding: 10px; border-radius: 5px; }
.file { margin-bottom: 20px; border: 1px solid #ddd; padding: 10px; border-radius: 5px; }
.file-header { display: flex; justify-content: space-between; }
.file-path { font-weight: bold; }
.file-score { font-weight: bold; }
.good { color: green; }
.warning { color: orange; }
.bad { color: red; }
.violation { margin-left: 20px; margin-bottom: 10px; }
.recommendation { font-style: italic; color: #666; margin-top: 5px; }
.metrics { margin-top: 10px; }
";

fn html_report(composite: &CompositeResult, analyzers: &[Box<dyn Analyzer>]) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "<title>Code Quality Analysis Report</title>");
    let _ = writeln!(html, "<style>");
    html.push_str(HTML_STYLE);
    let _ = writeln!(html, "</style>");
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "<h1>Code Quality Analysis Report</h1>");

    let overall = composite.overall_quality_score;
    let _ = writeln!(html, "<div class='summary'>");
    let _ = writeln!(html, "<h2>Summary</h2>");
    let _ = writeln!(
        html,
        "<p>Overall Quality Score: <span class='{}'>{overall:.2}/1.00</span></p>",
        score_class(overall)
    );
    let _ = writeln!(html, "</div>");

    for analyzer in analyzers {
        let Some(analyzer_report) = composite.analyzers.get(analyzer.kind().key()) else {
            continue;
        };
        let view = directory_view(analyzer.as_ref(), analyzer_report);

        let _ = writeln!(html, "<div class='analyzer'>");
        let _ = writeln!(html, "<h1>{}</h1>", analyzer.name());
        let _ = writeln!(html, "<p>{}</p>", analyzer.description());
        let _ = writeln!(html, "<div class='summary'>");
        let _ = writeln!(html, "<h2>Summary</h2>");
        let _ = writeln!(
            html,
            "<p>Files analyzed: {}</p>",
            view.summary.get("analyzed_count").cloned().unwrap_or_default()
        );
        let _ = writeln!(
            html,
            "<p>Files with errors: {}</p>",
            view.summary.get("error_count").cloned().unwrap_or_default()
        );
        analyzer.contribute_to_html_summary(&mut html, &view.summary);
        let _ = writeln!(html, "</div>");
        analyzer.contribute_to_html_report(&mut html, &view);
        let _ = writeln!(html, "</div>");
    }

    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");
    html
}
