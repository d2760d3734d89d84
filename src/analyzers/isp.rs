//! Interface Segregation analyzer.
//!
//! Finds interfaces that force their implementers to carry more methods than
//! any one client needs. Interfaces are recognized by the shared abstraction
//! heuristic; an oversized interface yields one finding per concrete class in
//! the file that lists it as a base.

use std::fmt::Write as _;

use rustpython_parser::ast;
use serde_json::json;

use crate::analyzers::abstraction::{interface_methods, is_abstraction};
use crate::analyzers::{compliance_rate, format_rate, Analyzer};
use crate::core::config::{AnalyzerKind, IspConfig};
use crate::core::errors::Result;
use crate::core::results::{
    DirectoryAnalysis, EntityAnalysis, EntityKind, FileAnalysis, Finding, FindingKind, Metrics,
    SourceSpan, Summary,
};
use crate::lang::ast_utils::{collect_classes, name_of};
use crate::lang::python::SourceUnit;

/// Detects implementations burdened by oversized interfaces.
pub struct IspAnalyzer {
    config: IspConfig,
}

impl IspAnalyzer {
    /// Create an analyzer with the given settings.
    pub fn new(config: IspConfig) -> Self {
        Self { config }
    }

    fn analyze_implementation(
        &self,
        implementation: &ast::StmtClassDef,
        interface: &str,
        method_count: usize,
        unit: &SourceUnit,
    ) -> EntityAnalysis {
        let line = unit.lines.node_line(implementation);
        let findings = vec![Finding::new(
            FindingKind::InterfaceTooLarge,
            format!(
                "Interface '{interface}' has {method_count} methods, exceeding the maximum of {}",
                self.config.max_interface_methods
            ),
            SourceSpan::line(&unit.path, line),
            0.1,
        )];

        let score = (1.0 - findings.len() as f64 * 0.1).max(0.0);

        let mut metrics = Metrics::new();
        metrics.insert("implements".into(), json!(interface));
        metrics.insert("interface_method_count".into(), json!(method_count));

        let recommendation = Some(format!(
            "Class '{}' implements the oversized interface '{interface}'. Consider splitting \
             '{interface}' into smaller, more focused interfaces grouped by client usage.",
            implementation.name
        ));

        EntityAnalysis {
            name: implementation.name.to_string(),
            kind: EntityKind::Class,
            score,
            findings,
            recommendation,
            metrics,
        }
    }
}

impl Analyzer for IspAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Isp
    }

    fn name(&self) -> &str {
        "ISP Analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes code for violations of the Interface Segregation Principle"
    }

    fn analyze_source(&self, unit: &SourceUnit) -> Result<FileAnalysis> {
        let classes = collect_classes(&unit.suite);

        // First pass: split the file into interfaces and concrete classes.
        let mut interfaces: Vec<(&ast::StmtClassDef, usize)> = Vec::new();
        let mut concretes: Vec<&ast::StmtClassDef> = Vec::new();
        for class in classes {
            if is_abstraction(class) {
                interfaces.push((class, interface_methods(class).len()));
            } else {
                concretes.push(class);
            }
        }

        // Second pass: oversized interfaces burden each of their implementers.
        let mut entities = Vec::new();
        for (interface, method_count) in interfaces {
            if method_count <= self.config.max_interface_methods {
                continue;
            }
            for implementation in &concretes {
                let implements = implementation
                    .bases
                    .iter()
                    .filter_map(name_of)
                    .any(|base| base == interface.name.as_str());
                if implements {
                    entities.push(self.analyze_implementation(
                        implementation,
                        interface.name.as_str(),
                        method_count,
                        unit,
                    ));
                }
            }
        }

        Ok(FileAnalysis::analyzed(&unit.path, entities))
    }

    fn contribute_to_summary(&self, summary: &mut Summary, files: &[FileAnalysis]) {
        let mut implementation_count = 0usize;
        let mut violation_count = 0usize;
        for file in files.iter().filter(|f| !f.is_error()) {
            for entity in &file.entities {
                implementation_count += 1;
                if entity.has_findings() {
                    violation_count += 1;
                }
            }
        }
        summary.insert("implementation_count".into(), implementation_count.into());
        summary.insert("isp_violation_count".into(), violation_count.into());
        summary.insert(
            "isp_compliance_rate".into(),
            json!(compliance_rate(implementation_count, violation_count)),
        );
    }

    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let summary = &analysis.summary;
        let _ = writeln!(
            report,
            "Implementations of oversized interfaces: {}",
            summary["isp_violation_count"]
        );
        let _ = writeln!(
            report,
            "ISP compliance rate: {}",
            format_rate(summary["isp_compliance_rate"].as_f64().unwrap_or(0.0))
        );
        let _ = writeln!(report);

        let _ = writeln!(report, "ISP Violations:");
        let mut violations_found = false;
        for file in analysis.analyzed_files() {
            for entity in file.entities.iter().filter(|e| e.has_findings()) {
                violations_found = true;
                let _ = writeln!(
                    report,
                    "  {}: Class {} implements {}",
                    file.file_path.display(),
                    entity.name,
                    entity.metrics["implements"]
                );
                for finding in &entity.findings {
                    let _ = writeln!(report, "    {}", finding.details);
                }
                if let Some(rec) = &entity.recommendation {
                    let _ = writeln!(report, "    Recommendation: {rec}");
                }
                let _ = writeln!(report);
            }
        }
        if !violations_found {
            let _ = writeln!(report, "  No ISP violations detected!");
        }
    }

    fn contribute_to_html_summary(&self, html: &mut String, summary: &Summary) {
        let _ = writeln!(
            html,
            "<p>Implementations of oversized interfaces: {}</p>",
            summary["isp_violation_count"]
        );
        let rate = summary["isp_compliance_rate"].as_f64().unwrap_or(0.0);
        let _ = writeln!(
            html,
            "<p>ISP compliance rate: <span class='{}'>{}</span></p>",
            crate::io::reports::score_class(rate),
            format_rate(rate)
        );
    }

    fn contribute_to_html_report(&self, html: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(html, "<h2>Implementation Analysis</h2>");
        for file in analysis.analyzed_files() {
            for entity in &file.entities {
                let _ = writeln!(html, "<div class='file'>");
                let _ = writeln!(html, "<div class='file-header'>");
                let _ = writeln!(
                    html,
                    "<div class='file-path'>{}: Class {} implements {}</div>",
                    file.file_path.display(),
                    entity.name,
                    entity.metrics["implements"]
                );
                let _ = writeln!(
                    html,
                    "<div class='file-score {}'>ISP Score: {:.2}</div>",
                    crate::io::reports::score_class(entity.score),
                    entity.score
                );
                let _ = writeln!(html, "</div>");
                for finding in &entity.findings {
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
        IspAnalyzer::new(IspConfig::default())
            .analyze_source(&unit)
            .unwrap()
    }

    const FAT_INTERFACE: &str = "class Device(ABC):\n\
        \x20   def read(self): pass\n\
        \x20   def write(self): pass\n\
        \x20   def seek(self): pass\n\
        \x20   def flush(self): pass\n\
        \x20   def lock(self): pass\n\
        \x20   def unlock(self): pass\n\
        \x20   def stat(self): pass\n";

    #[test]
    fn test_oversized_interface_flags_each_implementation() {
        let source = format!(
            "{FAT_INTERFACE}\
             class DiskDevice(Device):\n\
             \x20   def read(self): return 1\n\
             class TapeDevice(Device):\n\
             \x20   def read(self): return 2\n"
        );
        let result = analyze(&source);
        assert_eq!(result.entities.len(), 2);
        for entity in &result.entities {
            assert!((entity.score - 0.9).abs() < 1e-9);
            assert_eq!(entity.findings.len(), 1);
            assert_eq!(entity.findings[0].kind, FindingKind::InterfaceTooLarge);
            assert!(entity.findings[0].details.contains("Device"));
        }
    }

    #[test]
    fn test_small_interface_produces_no_entities() {
        let result = analyze(
            "class Port(ABC):\n\
             \x20   def send(self): pass\n\
             class TcpPort(Port):\n\
             \x20   def send(self): return 1\n",
        );
        assert!(result.entities.is_empty());
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_unimplemented_fat_interface_is_not_reported() {
        let result = analyze(FAT_INTERFACE);
        assert!(result.entities.is_empty());
        assert_eq!(result.score, 1.0);
    }
}
