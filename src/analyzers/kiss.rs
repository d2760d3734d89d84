//! Simplicity analyzer.
//!
//! Measures every function and method against size and complexity limits:
//! line count, nesting depth, cyclomatic and cognitive complexity, parameter
//! count, and conditional expressions too involved to read at a glance. Each
//! exceeded limit becomes a finding whose severity grows with the overshoot.

use std::fmt::Write as _;

use rustpython_parser::ast;
use serde_json::json;

use crate::analyzers::{compliance_rate, format_rate, Analyzer};
use crate::core::config::{AnalyzerKind, KissConfig};
use crate::core::errors::Result;
use crate::core::results::{
    DirectoryAnalysis, EntityAnalysis, EntityKind, FileAnalysis, Finding, FindingKind, Metrics,
    SourceSpan, Summary,
};
use crate::lang::ast_utils::{
    child_suites, collect_functions, node_source, own_exprs, walk_exprs, walk_exprs_in_stmts,
    FuncDef,
};
use crate::lang::python::SourceUnit;

/// Detects functions that outgrew their readers.
pub struct KissAnalyzer {
    config: KissConfig,
}

impl KissAnalyzer {
    /// Create an analyzer with the given limits.
    pub fn new(config: KissConfig) -> Self {
        Self { config }
    }

    fn analyze_function(&self, func: &FuncDef<'_>, unit: &SourceUnit) -> EntityAnalysis {
        let line = unit.lines.line_of(func.range.start().to_usize());
        let span = || SourceSpan::line(&unit.path, line);

        let source = node_source(func.range, &unit.content, &unit.lines);
        let line_count = source.lines().count();
        let nesting_depth = max_nesting_depth(func.body, 0);
        let cyclomatic = cyclomatic_complexity(func.body);
        let cognitive = cognitive_complexity(func.body, 0);
        let parameter_count = func.parameter_count();
        let complex_conditionals = find_complex_conditionals(func.body, unit);

        let mut findings = Vec::new();
        let mut check = |kind, measured: usize, limit: usize, what: &str| {
            if measured > limit {
                findings.push(Finding::new(
                    kind,
                    format!("Method has {what} of {measured}, exceeding the maximum of {limit}"),
                    span(),
                    (measured - limit) as f64 / limit as f64,
                ));
            }
        };
        check(
            FindingKind::LongMethod,
            line_count,
            self.config.max_method_lines,
            "a length in lines",
        );
        check(
            FindingKind::DeepNesting,
            nesting_depth,
            self.config.max_nesting_depth,
            "a nesting depth",
        );
        check(
            FindingKind::HighCyclomaticComplexity,
            cyclomatic,
            self.config.max_cyclomatic_complexity,
            "a cyclomatic complexity",
        );
        check(
            FindingKind::HighCognitiveComplexity,
            cognitive,
            self.config.max_cognitive_complexity,
            "a cognitive complexity",
        );
        check(
            FindingKind::TooManyParameters,
            parameter_count,
            self.config.max_parameters,
            "a parameter count",
        );

        if !complex_conditionals.is_empty() {
            findings.push(Finding::new(
                FindingKind::ComplexConditionals,
                format!(
                    "Method has {} complex conditional expressions: {}",
                    complex_conditionals.len(),
                    complex_conditionals.join("; ")
                ),
                span(),
                complex_conditionals.len() as f64 / 3.0,
            ));
        }

        let total_severity: f64 = findings.iter().map(|f| f.severity).sum();
        let score = (1.0 - total_severity * 0.2).max(0.0);

        let mut metrics = Metrics::new();
        metrics.insert("line_count".into(), json!(line_count));
        metrics.insert("nesting_depth".into(), json!(nesting_depth));
        metrics.insert("cyclomatic_complexity".into(), json!(cyclomatic));
        metrics.insert("cognitive_complexity".into(), json!(cognitive));
        metrics.insert("parameter_count".into(), json!(parameter_count));

        let recommendation = recommendation(func.name, &findings);

        EntityAnalysis {
            name: func.name.to_string(),
            kind: EntityKind::Function,
            score,
            findings,
            recommendation,
            metrics,
        }
    }
}

/// Deepest chain of if/for/while/with/try constructs in a body.
fn max_nesting_depth(body: &[ast::Stmt], current: usize) -> usize {
    let mut deepest = current;
    for stmt in body {
        let next = if is_nesting_construct(stmt) {
            current + 1
        } else {
            current
        };
        deepest = deepest.max(next);
        for suite in child_suites(stmt) {
            deepest = deepest.max(max_nesting_depth(suite, next));
        }
    }
    deepest
}

fn is_nesting_construct(stmt: &ast::Stmt) -> bool {
    matches!(
        stmt,
        ast::Stmt::If(_)
            | ast::Stmt::For(_)
            | ast::Stmt::AsyncFor(_)
            | ast::Stmt::While(_)
            | ast::Stmt::With(_)
            | ast::Stmt::AsyncWith(_)
            | ast::Stmt::Try(_)
            | ast::Stmt::TryStar(_)
    )
}

/// 1 + one per branch point + boolean operands beyond the first.
fn cyclomatic_complexity(body: &[ast::Stmt]) -> usize {
    let mut complexity = 1;
    crate::lang::ast_utils::walk_stmts(body, &mut |stmt| {
        if matches!(
            stmt,
            ast::Stmt::If(_) | ast::Stmt::While(_) | ast::Stmt::For(_) | ast::Stmt::AsyncFor(_)
        ) {
            complexity += 1;
        }
    });
    walk_exprs_in_stmts(body, &mut |expr| {
        if let ast::Expr::BoolOp(bool_op) = expr {
            complexity += bool_op.values.len() - 1;
        }
    });
    complexity
}

/// Nesting-weighted complexity: control constructs cost `level + 1`, an else
/// branch costs 1, boolean operators cost their operand count minus one.
fn cognitive_complexity(body: &[ast::Stmt], level: usize) -> usize {
    let mut total = 0;
    for stmt in body {
        let (increment, child_level) = match stmt {
            ast::Stmt::If(s) => {
                let else_cost = usize::from(!s.orelse.is_empty());
                (level + 1 + else_cost, level + 1)
            }
            ast::Stmt::For(_)
            | ast::Stmt::AsyncFor(_)
            | ast::Stmt::While(_)
            | ast::Stmt::With(_)
            | ast::Stmt::AsyncWith(_) => (level + 1, level + 1),
            _ => (0, level),
        };
        total += increment;

        for expr in own_exprs(stmt) {
            walk_exprs(expr, &mut |e| {
                if let ast::Expr::BoolOp(bool_op) = e {
                    total += bool_op.values.len() - 1;
                }
            });
        }

        for suite in child_suites(stmt) {
            total += cognitive_complexity(suite, child_level);
        }
    }
    total
}

/// Conditional expressions worth calling out, with their lines.
fn find_complex_conditionals(body: &[ast::Stmt], unit: &SourceUnit) -> Vec<String> {
    let mut found = Vec::new();
    walk_exprs_in_stmts(body, &mut |expr| {
        let line = unit.lines.node_line(expr);
        match expr {
            ast::Expr::BoolOp(bool_op) if bool_op.values.len() > 2 => {
                found.push(format!(
                    "boolean operation with {} operands at line {line}",
                    bool_op.values.len()
                ));
            }
            ast::Expr::BoolOp(bool_op) => {
                if bool_op
                    .values
                    .iter()
                    .any(|v| matches!(v, ast::Expr::BoolOp(_)))
                {
                    found.push(format!("nested boolean operation at line {line}"));
                }
            }
            ast::Expr::Compare(compare) if compare.ops.len() > 1 => {
                found.push(format!(
                    "comparison with {} operators at line {line}",
                    compare.ops.len()
                ));
            }
            _ => {}
        }
    });
    found
}

fn recommendation(name: &str, findings: &[Finding]) -> Option<String> {
    if findings.is_empty() {
        return None;
    }

    let mut text = format!("Method '{name}' could be simplified: ");
    for finding in findings {
        let hint = match finding.kind {
            FindingKind::LongMethod => "break it into smaller, focused methods",
            FindingKind::DeepNesting => "extract nested blocks or use early returns",
            FindingKind::HighCyclomaticComplexity => "simplify the branching logic",
            FindingKind::HighCognitiveComplexity => "flatten the control flow for readability",
            FindingKind::TooManyParameters => "group parameters into a parameter object",
            FindingKind::ComplexConditionals => "name the conditions as variables or methods",
            _ => continue,
        };
        let _ = write!(text, "{hint}; ");
    }
    Some(text.trim_end_matches([' ', ';']).to_string())
}

impl Analyzer for KissAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Kiss
    }

    fn name(&self) -> &str {
        "KISS Analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes code for violations of the Keep It Simple principle"
    }

    fn analyze_source(&self, unit: &SourceUnit) -> Result<FileAnalysis> {
        let entities = collect_functions(&unit.suite)
            .iter()
            .map(|func| self.analyze_function(func, unit))
            .collect();
        Ok(FileAnalysis::analyzed(&unit.path, entities))
    }

    fn contribute_to_summary(&self, summary: &mut Summary, files: &[FileAnalysis]) {
        let mut method_count = 0usize;
        let mut violation_count = 0usize;
        for file in files.iter().filter(|f| !f.is_error()) {
            for method in &file.entities {
                method_count += 1;
                if method.has_findings() {
                    violation_count += 1;
                }
            }
        }
        summary.insert("method_count".into(), method_count.into());
        summary.insert("kiss_violation_count".into(), violation_count.into());
        summary.insert(
            "kiss_compliance_rate".into(),
            json!(compliance_rate(method_count, violation_count)),
        );
    }

    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let summary = &analysis.summary;
        let _ = writeln!(report, "Methods analyzed: {}", summary["method_count"]);
        let _ = writeln!(
            report,
            "Methods with KISS violations: {}",
            summary["kiss_violation_count"]
        );
        let _ = writeln!(
            report,
            "KISS compliance rate: {}",
            format_rate(summary["kiss_compliance_rate"].as_f64().unwrap_or(0.0))
        );
        let _ = writeln!(report);

        let _ = writeln!(report, "KISS Violations:");
        let mut violations_found = false;
        for file in analysis.analyzed_files() {
            for method in file.entities.iter().filter(|m| m.has_findings()) {
                violations_found = true;
                let _ = writeln!(
                    report,
                    "  {}: Method {}",
                    file.file_path.display(),
                    method.name
                );
                let _ = writeln!(report, "    Lines: {}", method.metrics["line_count"]);
                let _ = writeln!(
                    report,
                    "    Nesting Depth: {}",
                    method.metrics["nesting_depth"]
                );
                let _ = writeln!(
                    report,
                    "    Cyclomatic Complexity: {}",
                    method.metrics["cyclomatic_complexity"]
                );
                let _ = writeln!(
                    report,
                    "    Cognitive Complexity: {}",
                    method.metrics["cognitive_complexity"]
                );
                let _ = writeln!(
                    report,
                    "    Parameters: {}",
                    method.metrics["parameter_count"]
                );
                for finding in &method.findings {
                    let _ = writeln!(report, "    Violation: {}", finding.details);
                }
                if let Some(rec) = &method.recommendation {
                    let _ = writeln!(report, "    Recommendation: {rec}");
                }
                let _ = writeln!(report);
            }
        }
        if !violations_found {
            let _ = writeln!(report, "  No KISS violations detected!");
        }
    }

    fn contribute_to_html_summary(&self, html: &mut String, summary: &Summary) {
        let _ = writeln!(html, "<p>Methods analyzed: {}</p>", summary["method_count"]);
        let _ = writeln!(
            html,
            "<p>Methods with KISS violations: {}</p>",
            summary["kiss_violation_count"]
        );
        let rate = summary["kiss_compliance_rate"].as_f64().unwrap_or(0.0);
        let _ = writeln!(
            html,
            "<p>KISS compliance rate: <span class='{}'>{}</span></p>",
            crate::io::reports::score_class(rate),
            format_rate(rate)
        );
    }

    fn contribute_to_html_report(&self, html: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(html, "<h2>Method Analysis</h2>");
        for file in analysis.analyzed_files() {
            for method in &file.entities {
                let _ = writeln!(html, "<div class='file'>");
                let _ = writeln!(html, "<div class='file-header'>");
                let _ = writeln!(
                    html,
                    "<div class='file-path'>{}: Method {}</div>",
                    file.file_path.display(),
                    method.name
                );
                let _ = writeln!(
                    html,
                    "<div class='file-score {}'>KISS Score: {:.2}</div>",
                    crate::io::reports::score_class(method.score),
                    method.score
                );
                let _ = writeln!(html, "</div>");
                let _ = writeln!(html, "<div class='metrics'>");
                let _ = writeln!(html, "<p>Lines: {}</p>", method.metrics["line_count"]);
                let _ = writeln!(
                    html,
                    "<p>Nesting Depth: {}</p>",
                    method.metrics["nesting_depth"]
                );
                let _ = writeln!(
                    html,
                    "<p>Cyclomatic Complexity: {}</p>",
                    method.metrics["cyclomatic_complexity"]
                );
                let _ = writeln!(
                    html,
                    "<p>Cognitive Complexity: {}</p>",
                    method.metrics["cognitive_complexity"]
                );
                let _ = writeln!(html, "</div>");
                for finding in &method.findings {
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
        KissAnalyzer::new(KissConfig::default())
            .analyze_source(&unit)
            .unwrap()
    }

    #[test]
    fn test_trivial_function_scores_one() {
        let result = analyze("def answer():\n    return 42\n");
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].score, 1.0);
        assert!(result.entities[0].findings.is_empty());
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn test_long_method_severity_is_overshoot_over_limit() {
        // Exactly 25 source lines: def line plus 24 statements.
        let mut source = String::from("def long_one():\n");
        for idx in 0..23 {
            source.push_str(&format!("    v{idx} = {}\n", idx + 2));
        }
        source.push_str("    return 0\n");

        let result = analyze(&source);
        let finding = result.entities[0]
            .findings
            .iter()
            .find(|f| f.kind == FindingKind::LongMethod)
            .expect("long_method finding");
        // 25 lines against a limit of 20: severity (25 - 20) / 20.
        assert!((finding.severity - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_nesting_depth_counts_control_layers() {
        let result = analyze(
            "def nested(a, b, c, d):\n\
             \x20   if a:\n\
             \x20       if b:\n\
             \x20           if c:\n\
             \x20               if d:\n\
             \x20                   return 1\n\
             \x20   return 0\n",
        );
        let entity = &result.entities[0];
        assert_eq!(entity.metrics["nesting_depth"], json!(4));
        let finding = entity
            .findings
            .iter()
            .find(|f| f.kind == FindingKind::DeepNesting)
            .expect("deep_nesting finding");
        assert!((finding.severity - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cyclomatic_counts_branches_and_bool_operands() {
        let result = analyze(
            "def branches(a, b, c):\n\
             \x20   if a and b and c:\n\
             \x20       return 1\n\
             \x20   for x in a:\n\
             \x20       while b:\n\
             \x20           b = b - 1\n\
             \x20   return 0\n",
        );
        // 1 base + if + for + while + (3 operands - 1)
        assert_eq!(result.entities[0].metrics["cyclomatic_complexity"], json!(6));
    }

    #[test]
    fn test_cognitive_weights_nesting() {
        let result = analyze(
            "def weighted(a, b):\n\
             \x20   if a:\n\
             \x20       if b:\n\
             \x20           return 1\n\
             \x20   else:\n\
             \x20       return 2\n\
             \x20   return 0\n",
        );
        // outer if: 1 + else 1; inner if: 2.
        assert_eq!(result.entities[0].metrics["cognitive_complexity"], json!(4));
    }

    #[test]
    fn test_parameter_count_finding() {
        let result = analyze(
            "def wide(a, b, c, d, e, f, g, h):\n    return a\n",
        );
        let finding = result.entities[0]
            .findings
            .iter()
            .find(|f| f.kind == FindingKind::TooManyParameters)
            .expect("too_many_parameters finding");
        assert!((finding.severity - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_complex_conditionals_are_described() {
        let result = analyze(
            "def tangled(a, b, c, d):\n\
             \x20   if a and b and c:\n\
             \x20       return 1\n\
             \x20   if a and (b or c):\n\
             \x20       return 2\n\
             \x20   if a < b < c:\n\
             \x20       return 3\n\
             \x20   return 0\n",
        );
        let finding = result.entities[0]
            .findings
            .iter()
            .find(|f| f.kind == FindingKind::ComplexConditionals)
            .expect("complex_conditionals finding");
        assert!(finding.details.contains("3 complex conditional expressions"));
        assert_eq!(finding.severity, 1.0);
    }
}
