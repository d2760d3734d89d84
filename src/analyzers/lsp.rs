//! Liskov Substitution analyzer.
//!
//! Builds the in-file class hierarchy and a per-class method signature table,
//! then compares every override against the same-named method of its listed
//! base classes. A signature records positional parameter annotations (or
//! "unknown"), the return annotation, and the exception names raised in the
//! body. Double-underscore methods are skipped.

use std::collections::HashMap;
use std::fmt::Write as _;

use rustpython_parser::ast;
use serde_json::json;

use crate::analyzers::{compliance_rate, format_rate, Analyzer};
use crate::core::config::AnalyzerKind;
use crate::core::errors::Result;
use crate::core::results::{
    DirectoryAnalysis, EntityAnalysis, EntityKind, FileAnalysis, Finding, FindingKind, Metrics,
    SourceSpan, Summary,
};
use crate::lang::ast_utils::{
    annotation_name, class_methods, collect_classes, name_of, walk_stmts, FuncDef,
};
use crate::lang::python::SourceUnit;

/// Signature of one method, as far as source-level annotations reveal it.
#[derive(Debug, Clone)]
struct MethodSignature {
    params: Vec<String>,
    returns: String,
    raises: Vec<String>,
}

impl MethodSignature {
    fn of(method: &FuncDef<'_>) -> Self {
        Self {
            params: method.parameter_annotations(),
            returns: annotation_name(method.returns),
            raises: raised_exception_names(method.body),
        }
    }
}

/// Exception names raised by `raise` statements in a body.
///
/// Extracted from the raised expression or its callee; bare `raise` carries
/// no name and is ignored.
fn raised_exception_names(body: &[ast::Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    walk_stmts(body, &mut |stmt| {
        let ast::Stmt::Raise(raise) = stmt else { return };
        let Some(exc) = raise.exc.as_deref() else {
            return;
        };
        let name = match exc {
            ast::Expr::Call(call) => name_of(&call.func),
            other => name_of(other),
        };
        if let Some(name) = name {
            names.push(name);
        }
    });
    names
}

/// Detects overrides that break the base-class contract.
pub struct LspAnalyzer;

impl LspAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self
    }

    fn analyze_class(
        &self,
        class: &ast::StmtClassDef,
        bases: &[String],
        signatures: &HashMap<String, HashMap<String, MethodSignature>>,
        unit: &SourceUnit,
    ) -> EntityAnalysis {
        let mut findings = Vec::new();

        for method in class_methods(class) {
            if method.is_special() {
                continue;
            }
            for base in bases {
                let Some(base_signature) =
                    signatures.get(base).and_then(|methods| methods.get(method.name))
                else {
                    continue;
                };
                self.check_override(&method, base, base_signature, unit, &mut findings);
            }
        }

        let score = (1.0 - findings.len() as f64 * 0.1).max(0.0);

        let mut metrics = Metrics::new();
        metrics.insert("extends".into(), json!(bases));

        let recommendation = recommendation(class.name.as_str(), bases, &findings);

        EntityAnalysis {
            name: class.name.to_string(),
            kind: EntityKind::Class,
            score,
            findings,
            recommendation,
            metrics,
        }
    }

    fn check_override(
        &self,
        method: &FuncDef<'_>,
        base: &str,
        base_signature: &MethodSignature,
        unit: &SourceUnit,
        findings: &mut Vec<Finding>,
    ) {
        let signature = MethodSignature::of(method);
        let line = unit.lines.line_of(method.range.start().to_usize());

        if signature.params.len() != base_signature.params.len() {
            findings.push(Finding::new(
                FindingKind::OverrideChangesParameterCount,
                format!(
                    "Override of '{}' takes {} parameters, base '{base}' declares {}",
                    method.name,
                    signature.params.len(),
                    base_signature.params.len()
                ),
                SourceSpan::line(&unit.path, line),
                0.1,
            ));
        }

        if signature.returns != base_signature.returns
            && signature.returns != "unknown"
            && base_signature.returns != "unknown"
        {
            findings.push(Finding::new(
                FindingKind::OverrideChangesReturnType,
                format!(
                    "Override of '{}' returns '{}', base '{base}' returns '{}'",
                    method.name, signature.returns, base_signature.returns
                ),
                SourceSpan::line(&unit.path, line),
                0.1,
            ));
        }

        let new_exceptions: Vec<&String> = signature
            .raises
            .iter()
            .filter(|exc| !base_signature.raises.contains(exc))
            .collect();
        if !new_exceptions.is_empty() {
            findings.push(Finding::new(
                FindingKind::OverrideRaisesNewException,
                format!(
                    "Override of '{}' raises {} not raised by base '{base}'",
                    method.name,
                    new_exceptions
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                SourceSpan::line(&unit.path, line),
                0.1,
            ));
        }
    }
}

impl Default for LspAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn recommendation(class_name: &str, bases: &[String], findings: &[Finding]) -> Option<String> {
    if findings.is_empty() {
        return None;
    }

    let mut text = format!(
        "Class '{class_name}' has potential LSP violations when extending '{}'. ",
        bases.join(", ")
    );
    if findings
        .iter()
        .any(|f| f.kind == FindingKind::OverrideChangesParameterCount)
    {
        text.push_str("Keep the same method signature as the base class. ");
    }
    if findings
        .iter()
        .any(|f| f.kind == FindingKind::OverrideChangesReturnType)
    {
        text.push_str("Return types in overrides should be covariant with the base. ");
    }
    if findings
        .iter()
        .any(|f| f.kind == FindingKind::OverrideRaisesNewException)
    {
        text.push_str("Overrides should not widen the set of raised exceptions. ");
    }
    text.push_str(
        "Ensure derived instances can stand in for base instances without behavior changes.",
    );
    Some(text)
}

impl Analyzer for LspAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Lsp
    }

    fn name(&self) -> &str {
        "LSP Analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes code for violations of the Liskov Substitution Principle"
    }

    fn analyze_source(&self, unit: &SourceUnit) -> Result<FileAnalysis> {
        let classes = collect_classes(&unit.suite);

        // First pass: hierarchy and signature tables.
        let mut hierarchy: Vec<(&ast::StmtClassDef, Vec<String>)> = Vec::new();
        let mut signatures: HashMap<String, HashMap<String, MethodSignature>> = HashMap::new();
        for class in classes {
            let bases: Vec<String> = class.bases.iter().filter_map(name_of).collect();
            let methods: HashMap<String, MethodSignature> = class_methods(class)
                .iter()
                .filter(|m| !m.is_special())
                .map(|m| (m.name.to_string(), MethodSignature::of(m)))
                .collect();
            signatures.insert(class.name.to_string(), methods);
            hierarchy.push((class, bases));
        }

        // Second pass: only classes that extend something get a sub-record.
        let entities = hierarchy
            .into_iter()
            .filter(|(_, bases)| !bases.is_empty())
            .map(|(class, bases)| self.analyze_class(class, &bases, &signatures, unit))
            .collect();

        Ok(FileAnalysis::analyzed(&unit.path, entities))
    }

    fn contribute_to_summary(&self, summary: &mut Summary, files: &[FileAnalysis]) {
        let mut class_count = 0usize;
        let mut violation_count = 0usize;
        for file in files.iter().filter(|f| !f.is_error()) {
            for class in &file.entities {
                class_count += 1;
                if class.has_findings() {
                    violation_count += 1;
                }
            }
        }
        summary.insert("subclass_count".into(), class_count.into());
        summary.insert("lsp_violation_count".into(), violation_count.into());
        summary.insert(
            "lsp_compliance_rate".into(),
            json!(compliance_rate(class_count, violation_count)),
        );
    }

    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let summary = &analysis.summary;
        let _ = writeln!(report, "Subclasses analyzed: {}", summary["subclass_count"]);
        let _ = writeln!(
            report,
            "Subclasses with LSP violations: {}",
            summary["lsp_violation_count"]
        );
        let _ = writeln!(
            report,
            "LSP compliance rate: {}",
            format_rate(summary["lsp_compliance_rate"].as_f64().unwrap_or(0.0))
        );
        let _ = writeln!(report);

        let _ = writeln!(report, "LSP Violations:");
        let mut violations_found = false;
        for file in analysis.analyzed_files() {
            for class in file.entities.iter().filter(|c| c.has_findings()) {
                violations_found = true;
                let _ = writeln!(
                    report,
                    "  {}: Class {} extends {}",
                    file.file_path.display(),
                    class.name,
                    class.metrics["extends"]
                );
                for finding in &class.findings {
                    let _ = writeln!(
                        report,
                        "    {} (line {})",
                        finding.details, finding.span.start_line
                    );
                }
                if let Some(rec) = &class.recommendation {
                    let _ = writeln!(report, "    Recommendation: {rec}");
                }
                let _ = writeln!(report);
            }
        }
        if !violations_found {
            let _ = writeln!(report, "  No LSP violations detected!");
        }
    }

    fn contribute_to_html_summary(&self, html: &mut String, summary: &Summary) {
        let _ = writeln!(
            html,
            "<p>Subclasses analyzed: {}</p>",
            summary["subclass_count"]
        );
        let rate = summary["lsp_compliance_rate"].as_f64().unwrap_or(0.0);
        let _ = writeln!(
            html,
            "<p>LSP compliance rate: <span class='{}'>{}</span></p>",
            crate::io::reports::score_class(rate),
            format_rate(rate)
        );
    }

    fn contribute_to_html_report(&self, html: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(html, "<h2>Subclass Analysis</h2>");
        for file in analysis.analyzed_files() {
            for class in &file.entities {
                let _ = writeln!(html, "<div class='file'>");
                let _ = writeln!(html, "<div class='file-header'>");
                let _ = writeln!(
                    html,
                    "<div class='file-path'>{}: Class {} extends {}</div>",
                    file.file_path.display(),
                    class.name,
                    class.metrics["extends"]
                );
                let _ = writeln!(
                    html,
                    "<div class='file-score {}'>LSP Score: {:.2}</div>",
                    crate::io::reports::score_class(class.score),
                    class.score
                );
                let _ = writeln!(html, "</div>");
                for finding in &class.findings {
                    let _ = writeln!(
                        html,
                        "<div class='violation'>{} (line {})</div>",
                        finding.details, finding.span.start_line
                    );
                }
                let _ = writeln!(html, "</div>");
            }
        }
    }
}
