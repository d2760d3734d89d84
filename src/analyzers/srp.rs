//! Single Responsibility analyzer.
//!
//! Estimates how many distinct responsibility domains a class touches by
//! matching its combined text (class name, docstrings, method sources)
//! against a fixed keyword table, and how cohesive its methods are via mean
//! pairwise token similarity.

use std::collections::HashSet;
use std::fmt::Write as _;

use once_cell::sync::Lazy;
use serde_json::json;

use crate::analyzers::{compliance_rate, format_rate, Analyzer};
use crate::core::config::{AnalyzerKind, SrpConfig};
use crate::core::errors::Result;
use crate::core::results::{
    DirectoryAnalysis, EntityAnalysis, EntityKind, FileAnalysis, Finding, FindingKind, Metrics,
    SourceSpan, Summary,
};
use crate::lang::ast_utils::{
    collect_classes, collect_functions, docstring, identifier_tokens, node_source,
};
use crate::lang::python::SourceUnit;

/// Responsibility domains and the keywords that signal them.
///
/// A domain is present in a class when any of its keywords appears as a whole
/// word anywhere in the class's combined text.
static RESPONSIBILITY_DOMAINS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "data_access",
            vec![
                "database", "query", "repository", "store", "retrieve", "save", "load",
                "persist", "fetch",
            ],
        ),
        (
            "ui",
            vec![
                "display", "show", "render", "view", "ui", "interface", "screen", "layout",
            ],
        ),
        (
            "validation",
            vec!["validate", "check", "verify", "ensure", "assert", "constraint"],
        ),
        (
            "calculation",
            vec!["calculate", "compute", "process", "algorithm", "formula"],
        ),
        (
            "io",
            vec!["file", "read", "write", "stream", "input", "output", "io", "print"],
        ),
        (
            "network",
            vec![
                "http", "request", "response", "api", "endpoint", "url", "network", "fetch",
            ],
        ),
        (
            "authentication",
            vec!["auth", "login", "permission", "role", "access", "credential"],
        ),
        (
            "error_handling",
            vec![
                "exception", "error", "handle", "try", "catch", "finally", "raise",
            ],
        ),
        (
            "configuration",
            vec!["config", "setting", "property", "environment", "parameter"],
        ),
        (
            "logging",
            vec!["log", "trace", "debug", "info", "warn", "error", "fatal"],
        ),
    ]
});

/// Detects classes with more than one responsibility or low method cohesion.
pub struct SrpAnalyzer {
    config: SrpConfig,
}

impl SrpAnalyzer {
    /// Create an analyzer with the given settings.
    pub fn new(config: SrpConfig) -> Self {
        Self { config }
    }

    fn analyze_class(
        &self,
        class: &rustpython_parser::ast::StmtClassDef,
        unit: &SourceUnit,
    ) -> EntityAnalysis {
        let methods = collect_functions(&class.body);

        // Token sets per method over name + docstring + source.
        let method_tokens: Vec<HashSet<String>> = methods
            .iter()
            .map(|method| {
                let text = format!(
                    "{} {} {}",
                    method.name,
                    docstring(method.body).unwrap_or(""),
                    node_source(method.range, &unit.content, &unit.lines),
                );
                identifier_tokens(&text)
            })
            .collect();

        let mut combined_tokens: HashSet<String> =
            identifier_tokens(&format!("{} {}", class.name, docstring(&class.body).unwrap_or("")));
        for tokens in &method_tokens {
            combined_tokens.extend(tokens.iter().cloned());
        }

        let responsibilities: Vec<&str> = RESPONSIBILITY_DOMAINS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| combined_tokens.contains(*kw)))
            .map(|(domain, _)| *domain)
            .collect();

        let cohesion = mean_pairwise_similarity(&method_tokens);

        let excess = responsibilities
            .len()
            .saturating_sub(self.config.max_responsibilities);
        let mut score = (1.0 - excess as f64 * 0.2).max(0.0);
        if cohesion < self.config.cohesion_threshold {
            score *= cohesion / self.config.cohesion_threshold;
        }

        let class_line = unit.lines.node_line(class);
        let mut findings = Vec::new();
        if excess > 0 {
            findings.push(Finding::new(
                FindingKind::MultipleResponsibilities,
                format!(
                    "Class touches {} responsibility domains ({}), exceeding the maximum of {}",
                    responsibilities.len(),
                    responsibilities.join(", "),
                    self.config.max_responsibilities
                ),
                SourceSpan::line(&unit.path, class_line),
                excess as f64 * 0.2,
            ));
        }
        if cohesion < self.config.cohesion_threshold {
            findings.push(Finding::new(
                FindingKind::LowCohesion,
                format!(
                    "Method cohesion {cohesion:.2} is below the threshold of {:.2}",
                    self.config.cohesion_threshold
                ),
                SourceSpan::line(&unit.path, class_line),
                (self.config.cohesion_threshold - cohesion) / self.config.cohesion_threshold,
            ));
        }

        let mut metrics = Metrics::new();
        metrics.insert("responsibilities".into(), json!(responsibilities));
        metrics.insert("num_methods".into(), json!(methods.len()));
        metrics.insert("cohesion_score".into(), json!(cohesion));

        let recommendation =
            self.recommendation(class.name.as_str(), &responsibilities, cohesion, excess);

        EntityAnalysis {
            name: class.name.to_string(),
            kind: EntityKind::Class,
            score,
            findings,
            recommendation,
            metrics,
        }
    }

    fn recommendation(
        &self,
        class_name: &str,
        responsibilities: &[&str],
        cohesion: f64,
        excess: usize,
    ) -> Option<String> {
        if excess == 0 && cohesion >= self.config.cohesion_threshold {
            return None;
        }

        let mut text = format!(
            "Class '{class_name}' may have too many responsibilities: {}. ",
            responsibilities.join(", ")
        );
        if excess > 0 {
            let _ = write!(
                text,
                "Consider splitting into {} classes, each with a single responsibility. ",
                responsibilities.len()
            );
        }
        if cohesion < self.config.cohesion_threshold {
            let _ = write!(
                text,
                "Low method cohesion ({cohesion:.2}) indicates methods may not be working together."
            );
        }
        Some(text.trim_end().to_string())
    }
}

/// Mean pairwise Jaccard similarity; `1.0` for fewer than two token sets.
fn mean_pairwise_similarity(token_sets: &[HashSet<String>]) -> f64 {
    if token_sets.len() <= 1 {
        return 1.0;
    }

    let mut total = 0.0;
    let mut comparisons = 0usize;
    for i in 0..token_sets.len() {
        for j in (i + 1)..token_sets.len() {
            if token_sets[i].is_empty() || token_sets[j].is_empty() {
                continue;
            }
            let intersection = token_sets[i].intersection(&token_sets[j]).count();
            let union = token_sets[i].union(&token_sets[j]).count();
            total += intersection as f64 / union as f64;
            comparisons += 1;
        }
    }
    total / comparisons.max(1) as f64
}

impl Analyzer for SrpAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Srp
    }

    fn name(&self) -> &str {
        "SRP Analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes code for violations of the Single Responsibility Principle"
    }

    fn analyze_source(&self, unit: &SourceUnit) -> Result<FileAnalysis> {
        let entities = collect_classes(&unit.suite)
            .into_iter()
            .map(|class| self.analyze_class(class, unit))
            .collect();
        Ok(FileAnalysis::analyzed(&unit.path, entities))
    }

    fn contribute_to_summary(&self, summary: &mut Summary, files: &[FileAnalysis]) {
        let mut class_count = 0usize;
        let mut violation_count = 0usize;
        for file in files.iter().filter(|f| !f.is_error()) {
            for class in &file.entities {
                class_count += 1;
                if class
                    .findings
                    .iter()
                    .any(|f| f.kind == FindingKind::MultipleResponsibilities)
                {
                    violation_count += 1;
                }
            }
        }
        summary.insert("class_count".into(), class_count.into());
        summary.insert("srp_violation_count".into(), violation_count.into());
        summary.insert(
            "srp_compliance_rate".into(),
            json!(compliance_rate(class_count, violation_count)),
        );
    }

    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let summary = &analysis.summary;
        let _ = writeln!(report, "Classes analyzed: {}", summary["class_count"]);
        let _ = writeln!(
            report,
            "Classes with SRP violations: {}",
            summary["srp_violation_count"]
        );
        let _ = writeln!(
            report,
            "SRP compliance rate: {}",
            format_rate(summary["srp_compliance_rate"].as_f64().unwrap_or(0.0))
        );
        let _ = writeln!(report);

        let _ = writeln!(report, "SRP Violations:");
        let mut violations_found = false;
        for file in analysis.analyzed_files() {
            for class in file.entities.iter().filter(|c| c.has_findings()) {
                violations_found = true;
                let _ = writeln!(
                    report,
                    "  {}: Class {}",
                    file.file_path.display(),
                    class.name
                );
                if let Some(resp) = class.metrics.get("responsibilities") {
                    let _ = writeln!(report, "    Responsibilities: {resp}");
                }
                if let Some(cohesion) = class.metrics.get("cohesion_score").and_then(|v| v.as_f64())
                {
                    let _ = writeln!(report, "    Cohesion Score: {cohesion:.2}");
                }
                if let Some(rec) = &class.recommendation {
                    let _ = writeln!(report, "    Recommendation: {rec}");
                }
                let _ = writeln!(report);
            }
        }
        if !violations_found {
            let _ = writeln!(report, "  No SRP violations detected!");
        }
    }

    fn contribute_to_html_summary(&self, html: &mut String, summary: &Summary) {
        let _ = writeln!(html, "<p>Classes analyzed: {}</p>", summary["class_count"]);
        let _ = writeln!(
            html,
            "<p>Classes with SRP violations: {}</p>",
            summary["srp_violation_count"]
        );
        let rate = summary["srp_compliance_rate"].as_f64().unwrap_or(0.0);
        let _ = writeln!(
            html,
            "<p>SRP compliance rate: <span class='{}'>{}</span></p>",
            crate::io::reports::score_class(rate),
            format_rate(rate)
        );
    }

    fn contribute_to_html_report(&self, html: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(html, "<h2>Class Analysis</h2>");
        for file in analysis.analyzed_files() {
            for class in &file.entities {
                let _ = writeln!(html, "<div class='file'>");
                let _ = writeln!(html, "<div class='file-header'>");
                let _ = writeln!(
                    html,
                    "<div class='file-path'>{}: Class {}</div>",
                    file.file_path.display(),
                    class.name
                );
                let _ = writeln!(
                    html,
                    "<div class='file-score {}'>SRP Score: {:.2}</div>",
                    crate::io::reports::score_class(class.score),
                    class.score
                );
                let _ = writeln!(html, "</div>");
                if let Some(resp) = class.metrics.get("responsibilities") {
                    let _ = writeln!(html, "<p>Responsibilities: {resp}</p>");
                }
                if let Some(rec) = &class.recommendation {
                    let _ = writeln!(html, "<p class='recommendation'>{rec}</p>");
                }
                let _ = writeln!(html, "</div>");
            }
        }
    }
}
