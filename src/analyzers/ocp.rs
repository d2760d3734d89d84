//! Open/Closed analyzer.
//!
//! Flags the patterns that force a class to be edited instead of extended:
//! runtime type introspection, long if/elif dispatch chains, and constructors
//! that build their concrete collaborators directly.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use rustpython_parser::ast;
use serde_json::json;

use crate::analyzers::abstraction::is_abstraction;
use crate::analyzers::{compliance_rate, format_rate, Analyzer};
use crate::core::config::AnalyzerKind;
use crate::core::errors::Result;
use crate::core::results::{
    DirectoryAnalysis, EntityAnalysis, EntityKind, FileAnalysis, Finding, FindingKind, Metrics,
    SourceSpan, Summary,
};
use crate::lang::ast_utils::{collect_classes, walk_exprs_in_stmts, walk_stmts, FuncDef};
use crate::lang::python::SourceUnit;

/// Builtin container and primitive constructors that never count as concrete
/// collaborators.
static BUILTIN_CALLABLES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec!["list", "dict", "set", "tuple", "int", "float", "str", "bool"]
});

/// Minimum if/elif chain length worth flagging.
const MIN_CHAIN_LENGTH: usize = 3;

/// Detects classes that are closed for extension.
pub struct OcpAnalyzer;

impl OcpAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self
    }

    fn analyze_class(
        &self,
        class: &ast::StmtClassDef,
        unit: &SourceUnit,
    ) -> EntityAnalysis {
        let mut findings = Vec::new();
        self.find_type_checking(class, unit, &mut findings);
        self.find_if_elif_chains(class, unit, &mut findings);
        self.find_concrete_instantiations(class, unit, &mut findings);

        let score = (1.0 - findings.len() as f64 * 0.1).max(0.0);

        let mut metrics = Metrics::new();
        metrics.insert("is_interface".into(), json!(is_abstraction(class)));
        metrics.insert("violation_count".into(), json!(findings.len()));

        let recommendation = recommendation(class.name.as_str(), &findings);

        EntityAnalysis {
            name: class.name.to_string(),
            kind: EntityKind::Class,
            score,
            findings,
            recommendation,
            metrics,
        }
    }

    /// isinstance()/type() calls anywhere in the class body.
    fn find_type_checking(
        &self,
        class: &ast::StmtClassDef,
        unit: &SourceUnit,
        findings: &mut Vec<Finding>,
    ) {
        walk_exprs_in_stmts(&class.body, &mut |expr| {
            let ast::Expr::Call(call) = expr else { return };
            let ast::Expr::Name(name) = call.func.as_ref() else {
                return;
            };
            let line = unit.lines.node_line(call);
            match name.id.as_str() {
                "isinstance" => findings.push(Finding::new(
                    FindingKind::TypeCheckingWithIsinstance,
                    "Type checking with isinstance()",
                    SourceSpan::line(&unit.path, line),
                    0.1,
                )),
                "type" => findings.push(Finding::new(
                    FindingKind::TypeCheckingWithType,
                    "Type checking with type()",
                    SourceSpan::line(&unit.path, line),
                    0.1,
                )),
                _ => {}
            }
        });
    }

    /// if/elif chains long enough to suggest a missing polymorphic seam.
    fn find_if_elif_chains(
        &self,
        class: &ast::StmtClassDef,
        unit: &SourceUnit,
        findings: &mut Vec<Finding>,
    ) {
        walk_stmts(&class.body, &mut |stmt| {
            let ast::Stmt::If(head) = stmt else { return };

            let mut chain_length = 1;
            let mut current = head;
            while let [ast::Stmt::If(next)] = current.orelse.as_slice() {
                chain_length += 1;
                current = next;
            }

            if chain_length >= MIN_CHAIN_LENGTH {
                findings.push(Finding::new(
                    FindingKind::IfElifChain,
                    format!("If-elif chain with {chain_length} conditions"),
                    SourceSpan::line(&unit.path, unit.lines.node_line(head)),
                    0.1,
                ));
            }
        });
    }

    /// Calls to bare non-builtin names inside the constructor.
    fn find_concrete_instantiations(
        &self,
        class: &ast::StmtClassDef,
        unit: &SourceUnit,
        findings: &mut Vec<Finding>,
    ) {
        for method in class.body.iter().filter_map(FuncDef::cast) {
            if method.name != "__init__" {
                continue;
            }
            walk_exprs_in_stmts(method.body, &mut |expr| {
                let ast::Expr::Call(call) = expr else { return };
                let ast::Expr::Name(name) = call.func.as_ref() else {
                    return;
                };
                if BUILTIN_CALLABLES.contains(&name.id.as_str()) {
                    return;
                }
                findings.push(Finding::new(
                    FindingKind::ConcreteInstantiation,
                    format!(
                        "Direct instantiation of '{}' instead of using factories or injection",
                        name.id
                    ),
                    SourceSpan::line(&unit.path, unit.lines.node_line(call)),
                    0.1,
                ));
            });
        }
    }
}

impl Default for OcpAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn recommendation(class_name: &str, findings: &[Finding]) -> Option<String> {
    if findings.is_empty() {
        return None;
    }

    let mut text = format!("Class '{class_name}' has potential OCP violations. ");
    if findings.iter().any(|f| {
        matches!(
            f.kind,
            FindingKind::TypeCheckingWithIsinstance | FindingKind::TypeCheckingWithType
        )
    }) {
        text.push_str(
            "Replace conditional type logic with polymorphic behavior through a strategy. ",
        );
    }
    if findings.iter().any(|f| f.kind == FindingKind::IfElifChain) {
        text.push_str("Consider polymorphism instead of long if-elif dispatch. ");
    }
    if findings
        .iter()
        .any(|f| f.kind == FindingKind::ConcreteInstantiation)
    {
        text.push_str("Use dependency injection or a factory instead of instantiating directly. ");
    }
    Some(text.trim_end().to_string())
}

impl Analyzer for OcpAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Ocp
    }

    fn name(&self) -> &str {
        "OCP Analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes code for violations of the Open/Closed Principle"
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
                if class.has_findings() {
                    violation_count += 1;
                }
            }
        }
        summary.insert("class_count".into(), class_count.into());
        summary.insert("ocp_violation_count".into(), violation_count.into());
        summary.insert(
            "ocp_compliance_rate".into(),
            json!(compliance_rate(class_count, violation_count)),
        );
    }

    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let summary = &analysis.summary;
        let _ = writeln!(report, "Classes analyzed: {}", summary["class_count"]);
        let _ = writeln!(
            report,
            "Classes with OCP violations: {}",
            summary["ocp_violation_count"]
        );
        let _ = writeln!(
            report,
            "OCP compliance rate: {}",
            format_rate(summary["ocp_compliance_rate"].as_f64().unwrap_or(0.0))
        );
        let _ = writeln!(report);

        let _ = writeln!(report, "OCP Violations:");
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
            let _ = writeln!(report, "  No OCP violations detected!");
        }
    }

    fn contribute_to_html_summary(&self, html: &mut String, summary: &Summary) {
        let _ = writeln!(html, "<p>Classes analyzed: {}</p>", summary["class_count"]);
        let rate = summary["ocp_compliance_rate"].as_f64().unwrap_or(0.0);
        let _ = writeln!(
            html,
            "<p>OCP compliance rate: <span class='{}'>{}</span></p>",
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
                    "<div class='file-score {}'>OCP Score: {:.2}</div>",
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn analyze(source: &str) -> FileAnalysis {
        let unit = SourceUnit::from_source(Path::new("t.py"), source).unwrap();
        OcpAnalyzer::new().analyze_source(&unit).unwrap()
    }

    #[test]
    fn test_isinstance_call_is_flagged_at_its_line() {
        let result = analyze(
            "class Shape:\n\
             \x20   def area(self, other):\n\
             \x20       if isinstance(other, Circle):\n\
             \x20           return 1\n\
             \x20       return 0\n",
        );
        let class = &result.entities[0];
        let finding = class
            .findings
            .iter()
            .find(|f| f.kind == FindingKind::TypeCheckingWithIsinstance)
            .expect("isinstance finding");
        assert_eq!(finding.span.start_line, 3);
        assert!((class.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_if_elif_chain_of_three_is_flagged() {
        let result = analyze(
            "class Dispatcher:\n\
             \x20   def handle(self, kind):\n\
             \x20       if kind == 1:\n\
             \x20           return 'a'\n\
             \x20       elif kind == 2:\n\
             \x20           return 'b'\n\
             \x20       elif kind == 3:\n\
             \x20           return 'c'\n",
        );
        let class = &result.entities[0];
        assert!(class.findings.iter().any(|f| f.kind == FindingKind::IfElifChain));
    }

    #[test]
    fn test_two_branch_if_is_not_a_chain() {
        let result = analyze(
            "class Dispatcher:\n\
             \x20   def handle(self, kind):\n\
             \x20       if kind == 1:\n\
             \x20           return 'a'\n\
             \x20       elif kind == 2:\n\
             \x20           return 'b'\n",
        );
        assert!(result.entities[0].findings.is_empty());
    }

    #[test]
    fn test_constructor_instantiation_is_flagged_but_builtins_pass() {
        let result = analyze(
            "class Service:\n\
             \x20   def __init__(self):\n\
             \x20       self.cache = dict()\n\
             \x20       self.client = HttpClient()\n",
        );
        let class = &result.entities[0];
        let concrete: Vec<_> = class
            .findings
            .iter()
            .filter(|f| f.kind == FindingKind::ConcreteInstantiation)
            .collect();
        assert_eq!(concrete.len(), 1);
        assert!(concrete[0].details.contains("HttpClient"));
        assert_eq!(concrete[0].span.start_line, 4);
    }

    #[test]
    fn test_clean_class_scores_one() {
        let result = analyze(
            "class Clean:\n\
             \x20   def __init__(self, client):\n\
             \x20       self.client = client\n",
        );
        assert_eq!(result.entities[0].score, 1.0);
        assert!(result.entities[0].findings.is_empty());
    }
}
