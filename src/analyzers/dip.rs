//! Dependency Inversion analyzer.
//!
//! Builds an intra-file dependency map (base classes, call targets, and
//! constructor-assigned collaborators), derives incoming/outgoing degrees to
//! label classes high- or low-level, and flags high-level classes that lean
//! on concrete classes, instantiate them directly, or take dependencies that
//! never pass through the constructor.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

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
use crate::lang::ast_utils::{collect_classes, name_of, walk_exprs_in_stmts, FuncDef};
use crate::lang::python::SourceUnit;

/// Everything the analyzer extracts about one class before scoring it.
struct ClassFacts {
    name: String,
    line: usize,
    bases: BTreeSet<String>,
    /// Every name the class depends on: bases, call targets, constructor
    /// assignments.
    dependencies: BTreeSet<String>,
    /// Bare names the class calls as constructors anywhere in its body.
    instantiated: BTreeSet<String>,
    /// Annotation names of constructor parameters.
    injected: BTreeSet<String>,
}

impl ClassFacts {
    fn gather(class: &ast::StmtClassDef, unit: &SourceUnit) -> Self {
        let bases: BTreeSet<String> = class.bases.iter().filter_map(name_of).collect();

        let mut dependencies = bases.clone();
        let mut instantiated = BTreeSet::new();
        walk_exprs_in_stmts(&class.body, &mut |expr| {
            let ast::Expr::Call(call) = expr else { return };
            if let Some(target) = name_of(&call.func) {
                dependencies.insert(target);
            }
            if let ast::Expr::Name(name) = call.func.as_ref() {
                instantiated.insert(name.id.to_string());
            }
        });

        let injected = class
            .body
            .iter()
            .filter_map(FuncDef::cast)
            .find(|method| method.name == "__init__")
            .map(|ctor| ctor.parameter_annotations().into_iter().collect())
            .unwrap_or_default();

        Self {
            name: class.name.to_string(),
            line: unit.lines.node_line(class),
            bases,
            dependencies,
            instantiated,
            injected,
        }
    }
}

/// Detects high-level classes wired directly to low-level details.
pub struct DipAnalyzer;

impl DipAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self
    }

    fn analyze_class(
        &self,
        facts: &ClassFacts,
        is_high_level: bool,
        concretes: &HashSet<String>,
        unit: &SourceUnit,
    ) -> EntityAnalysis {
        let mut findings = Vec::new();
        let span = || SourceSpan::line(&unit.path, facts.line);

        if is_high_level {
            let concrete_deps: Vec<&String> = facts
                .dependencies
                .iter()
                .filter(|dep| concretes.contains(*dep))
                .collect();
            if !concrete_deps.is_empty() {
                findings.push(Finding::new(
                    FindingKind::ConcreteDependency,
                    format!(
                        "High-level class depends on concrete classes: {}",
                        joined(&concrete_deps)
                    ),
                    span(),
                    0.2,
                ));
            }

            let direct: Vec<&String> = facts
                .instantiated
                .iter()
                .filter(|name| concretes.contains(*name))
                .collect();
            if !direct.is_empty() {
                findings.push(Finding::new(
                    FindingKind::DirectInstantiation,
                    format!(
                        "High-level class directly instantiates: {}",
                        joined(&direct)
                    ),
                    span(),
                    0.2,
                ));
            }

            // Base classes are not injectable collaborators.
            let not_injected: Vec<&String> = facts
                .dependencies
                .iter()
                .filter(|dep| !facts.bases.contains(*dep) && !facts.injected.contains(*dep))
                .collect();
            if !not_injected.is_empty() {
                findings.push(Finding::new(
                    FindingKind::MissingConstructorInjection,
                    format!(
                        "Dependencies not injected through the constructor: {}",
                        joined(&not_injected)
                    ),
                    span(),
                    0.2,
                ));
            }
        }

        let score = (1.0 - findings.len() as f64 * 0.2).max(0.0);

        let mut metrics = Metrics::new();
        metrics.insert("is_high_level".into(), json!(is_high_level));
        metrics.insert(
            "dependencies".into(),
            json!(facts.dependencies.iter().collect::<Vec<_>>()),
        );

        let recommendation = if findings.is_empty() {
            None
        } else {
            Some(format!(
                "Class '{}' should depend on abstractions: introduce interfaces for its \
                 collaborators and accept them through the constructor.",
                facts.name
            ))
        };

        EntityAnalysis {
            name: facts.name.clone(),
            kind: EntityKind::Class,
            score,
            findings,
            recommendation,
            metrics,
        }
    }
}

impl Default for DipAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn joined(names: &[&String]) -> String {
    names
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Analyzer for DipAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Dip
    }

    fn name(&self) -> &str {
        "DIP Analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes code for violations of the Dependency Inversion Principle"
    }

    fn analyze_source(&self, unit: &SourceUnit) -> Result<FileAnalysis> {
        let classes = collect_classes(&unit.suite);

        let mut concretes = HashSet::new();
        let mut all_facts = Vec::new();
        for class in classes {
            if !is_abstraction(class) {
                concretes.insert(class.name.to_string());
            }
            all_facts.push(ClassFacts::gather(class, unit));
        }

        // Degree counting over every name seen in the dependency map.
        let mut incoming: HashMap<&str, usize> = HashMap::new();
        let mut outgoing: HashMap<&str, usize> = HashMap::new();
        for facts in &all_facts {
            outgoing.insert(facts.name.as_str(), facts.dependencies.len());
            for dep in &facts.dependencies {
                *incoming.entry(dep.as_str()).or_default() += 1;
            }
        }

        let entities = all_facts
            .iter()
            .filter(|facts| !facts.dependencies.is_empty())
            .map(|facts| {
                let inbound = incoming.get(facts.name.as_str()).copied().unwrap_or(0);
                let outbound = outgoing.get(facts.name.as_str()).copied().unwrap_or(0);
                self.analyze_class(facts, inbound > outbound, &concretes, unit)
            })
            .collect();

        Ok(FileAnalysis::analyzed(&unit.path, entities))
    }

    fn contribute_to_summary(&self, summary: &mut Summary, files: &[FileAnalysis]) {
        let mut class_count = 0usize;
        let mut violation_count = 0usize;
        let mut high_level_count = 0usize;
        for file in files.iter().filter(|f| !f.is_error()) {
            for class in &file.entities {
                class_count += 1;
                if class.has_findings() {
                    violation_count += 1;
                }
                if class.metrics.get("is_high_level").and_then(|v| v.as_bool()) == Some(true) {
                    high_level_count += 1;
                }
            }
        }
        summary.insert("dependent_class_count".into(), class_count.into());
        summary.insert("high_level_class_count".into(), high_level_count.into());
        summary.insert("dip_violation_count".into(), violation_count.into());
        summary.insert(
            "dip_compliance_rate".into(),
            json!(compliance_rate(class_count, violation_count)),
        );
    }

    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let summary = &analysis.summary;
        let _ = writeln!(
            report,
            "Classes with dependencies: {}",
            summary["dependent_class_count"]
        );
        let _ = writeln!(
            report,
            "High-level classes: {}",
            summary["high_level_class_count"]
        );
        let _ = writeln!(
            report,
            "DIP compliance rate: {}",
            format_rate(summary["dip_compliance_rate"].as_f64().unwrap_or(0.0))
        );
        let _ = writeln!(report);

        let _ = writeln!(report, "DIP Violations:");
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
                    let _ = writeln!(report, "    {}", finding.details);
                }
                if let Some(rec) = &class.recommendation {
                    let _ = writeln!(report, "    Recommendation: {rec}");
                }
                let _ = writeln!(report);
            }
        }
        if !violations_found {
            let _ = writeln!(report, "  No DIP violations detected!");
        }
    }

    fn contribute_to_html_summary(&self, html: &mut String, summary: &Summary) {
        let _ = writeln!(
            html,
            "<p>Classes with dependencies: {}</p>",
            summary["dependent_class_count"]
        );
        let rate = summary["dip_compliance_rate"].as_f64().unwrap_or(0.0);
        let _ = writeln!(
            html,
            "<p>DIP compliance rate: <span class='{}'>{}</span></p>",
            crate::io::reports::score_class(rate),
            format_rate(rate)
        );
    }

    fn contribute_to_html_report(&self, html: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(html, "<h2>Dependency Analysis</h2>");
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
                    "<div class='file-score {}'>DIP Score: {:.2}</div>",
                    crate::io::reports::score_class(class.score),
                    class.score
                );
                let _ = writeln!(html, "</div>");
                let _ = writeln!(
                    html,
                    "<p>Dependencies: {}</p>",
                    class.metrics["dependencies"]
                );
                for finding in &class.findings {
                    let _ = writeln!(html, "<div class='violation'>{}</div>", finding.details);
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
        DipAnalyzer::new().analyze_source(&unit).unwrap()
    }

    #[test]
    fn test_high_level_class_with_concrete_dependency_is_flagged() {
        let result = analyze(
            "class Repo:\n\
             \x20   def get(self):\n\
             \x20       return 1\n\
             class UserService:\n\
             \x20   def __init__(self):\n\
             \x20       self.repo = Repo()\n\
             class AdminFlow(UserService):\n\
             \x20   def run(self):\n\
             \x20       return 1\n\
             class GuestFlow(UserService):\n\
             \x20   def run(self):\n\
             \x20       return 1\n",
        );
        let service = result
            .entities
            .iter()
            .find(|e| e.name == "UserService")
            .expect("UserService entity");
        assert_eq!(service.metrics["is_high_level"], json!(true));
        assert!(service
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::ConcreteDependency));
        assert!(service
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::DirectInstantiation));
        assert!(service.score < 1.0);
    }

    #[test]
    fn test_injected_dependency_passes_the_injection_check() {
        let result = analyze(
            "class Repo:\n\
             \x20   def get(self):\n\
             \x20       return 1\n\
             class UserService:\n\
             \x20   def __init__(self, repo: Repo):\n\
             \x20       self.repo = repo\n\
             \x20   def fresh(self):\n\
             \x20       return Repo()\n\
             class AdminFlow(UserService):\n\
             \x20   def run(self):\n\
             \x20       return 1\n\
             class GuestFlow(UserService):\n\
             \x20   def run(self):\n\
             \x20       return 1\n",
        );
        let service = result
            .entities
            .iter()
            .find(|e| e.name == "UserService")
            .expect("UserService entity");
        // Repo is named by a constructor annotation, so no injection finding;
        // the concrete dependency itself is still reported.
        assert!(!service
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::MissingConstructorInjection));
        assert!(service
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::ConcreteDependency));
    }

    #[test]
    fn test_low_level_class_is_not_flagged() {
        let result = analyze(
            "class Formatter:\n\
             \x20   def format(self, row):\n\
             \x20       return str(row)\n\
             class CsvWriter:\n\
             \x20   def __init__(self):\n\
             \x20       self.formatter = Formatter()\n",
        );
        let writer = result
            .entities
            .iter()
            .find(|e| e.name == "CsvWriter")
            .expect("CsvWriter entity");
        assert_eq!(writer.metrics["is_high_level"], json!(false));
        assert!(writer.findings.is_empty());
        assert_eq!(writer.score, 1.0);
    }

    #[test]
    fn test_class_without_dependencies_has_no_entity() {
        let result = analyze(
            "class Standalone:\n\
             \x20   def value(self):\n\
             \x20       return 1\n",
        );
        assert!(result.entities.is_empty());
        assert_eq!(result.score, 1.0);
    }
}
