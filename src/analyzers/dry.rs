//! Duplication analyzer.
//!
//! Fingerprints every normalized line window of a file and records the
//! occurrences in a run-scoped corpus, so duplicates are detected across all
//! files analyzed in the same run. Long string literals and non-trivial
//! numeric constants are tracked the same way. The corpus is the only state
//! shared between files; results are therefore neither cacheable nor valid
//! under parallel fan-out, and the framework runs this analyzer sequentially.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::PathBuf;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustpython_parser::ast;
use rustpython_parser::ast::Ranged;
use serde_json::json;

use crate::analyzers::{format_rate, Analyzer};
use crate::core::config::{AnalyzerKind, DryConfig};
use crate::core::errors::Result;
use crate::core::results::{
    DirectoryAnalysis, EntityAnalysis, EntityKind, FileAnalysis, Finding, FindingKind, Metrics,
    SourceSpan, Summary,
};
use crate::lang::ast_utils::walk_exprs_in_stmts;
use crate::lang::python::SourceUnit;

/// Upper bound on indexed window length, in lines.
const MAX_DUPLICATE_LINES: usize = 30;

/// One sighting of a duplicated block.
#[derive(Debug, Clone)]
struct BlockOccurrence {
    path: PathBuf,
    start_line: usize,
    end_line: usize,
    preview: String,
}

/// One sighting of a tracked literal.
#[derive(Debug, Clone)]
struct LiteralOccurrence {
    path: PathBuf,
    line: usize,
}

/// Cross-file accumulator, scoped to one analyzer instance and one run.
#[derive(Debug, Default)]
struct CorpusState {
    blocks: HashMap<String, Vec<BlockOccurrence>>,
    strings: HashMap<String, Vec<LiteralOccurrence>>,
    constants: HashMap<String, Vec<LiteralOccurrence>>,
}

/// Detects duplicated blocks and repeated literals.
pub struct DryAnalyzer {
    config: DryConfig,
    corpus: Mutex<CorpusState>,
}

impl DryAnalyzer {
    /// Create an analyzer with the given settings and an empty corpus.
    pub fn new(config: DryConfig) -> Self {
        Self {
            config,
            corpus: Mutex::new(CorpusState::default()),
        }
    }

    /// Index every normalized window of the file into the corpus.
    fn index_blocks(&self, corpus: &mut CorpusState, unit: &SourceUnit) {
        let lines: Vec<&str> = unit.content.lines().collect();
        let line_count = lines.len();
        if line_count < self.config.min_duplicate_lines {
            return;
        }

        for start in 0..=(line_count - self.config.min_duplicate_lines) {
            let max_end = (start + MAX_DUPLICATE_LINES).min(line_count);
            for end in (start + self.config.min_duplicate_lines)..=max_end {
                let window = lines[start..end].join("\n");
                let normalized = normalize_block(&window);
                if normalized.is_empty() {
                    continue;
                }
                let fingerprint = blake3::hash(normalized.as_bytes()).to_hex().to_string();
                corpus.blocks.entry(fingerprint).or_default().push(BlockOccurrence {
                    path: unit.path.clone(),
                    start_line: start + 1,
                    end_line: end,
                    preview: truncate(lines[start].trim(), 50),
                });
            }
        }
    }

    /// Duplicate-block entities for fingerprints touching the current file.
    fn duplicate_entities(&self, corpus: &CorpusState, unit: &SourceUnit) -> Vec<EntityAnalysis> {
        let mut hits: Vec<(&String, &Vec<BlockOccurrence>, &BlockOccurrence)> = Vec::new();
        for (fingerprint, occurrences) in &corpus.blocks {
            if occurrences.len() < 2 {
                continue;
            }
            let Some(local) = occurrences.iter().find(|occ| occ.path == unit.path) else {
                continue;
            };
            hits.push((fingerprint, occurrences, local));
        }

        // Corpus maps are unordered; report in source order of the local
        // sighting to keep re-analysis output stable.
        hits.sort_by(|a, b| {
            (a.2.start_line, a.2.end_line, a.0).cmp(&(b.2.start_line, b.2.end_line, b.0))
        });

        hits.into_iter()
            .map(|(_, occurrences, local)| {
                let occurrence_count = occurrences.len();
                let severity = (occurrence_count as f64 - 1.0) * 0.2;
                let finding = Finding::new(
                    FindingKind::DuplicateCodeBlock,
                    format!(
                        "Block of {} lines appears {occurrence_count} times",
                        local.end_line - local.start_line + 1
                    ),
                    SourceSpan::range(&unit.path, local.start_line, local.end_line),
                    severity,
                );

                let mut metrics = Metrics::new();
                metrics.insert("occurrences".into(), json!(occurrence_count));
                metrics.insert(
                    "locations".into(),
                    json!(occurrences
                        .iter()
                        .map(|occ| json!({
                            "file": occ.path.display().to_string(),
                            "start_line": occ.start_line,
                            "end_line": occ.end_line,
                        }))
                        .collect::<Vec<_>>()),
                );

                EntityAnalysis {
                    name: format!("lines {}-{}", local.start_line, local.end_line),
                    kind: EntityKind::DuplicateBlock,
                    score: 0.9,
                    findings: vec![finding],
                    recommendation: Some(format!(
                        "Extract the duplicated block (found in {occurrence_count} locations) \
                         into a reusable function: {}",
                        local.preview
                    )),
                    metrics,
                }
            })
            .collect()
    }

    /// Record and report repeated string literals.
    fn string_entities(&self, corpus: &mut CorpusState, unit: &SourceUnit) -> Vec<EntityAnalysis> {
        let mut local: IndexMap<String, Vec<usize>> = IndexMap::new();
        walk_exprs_in_stmts(&unit.suite, &mut |expr| {
            let ast::Expr::Constant(constant) = expr else { return };
            let ast::Constant::Str(value) = &constant.value else {
                return;
            };
            if value.chars().count() < self.config.min_string_length {
                return;
            }
            let line = unit.lines.node_line(expr);
            local.entry(value.clone()).or_default().push(line);
        });

        for (literal, lines) in &local {
            let entry = corpus.strings.entry(literal.clone()).or_default();
            for &line in lines {
                entry.push(LiteralOccurrence {
                    path: unit.path.clone(),
                    line,
                });
            }
        }

        let min = self.config.min_string_occurrences;
        local
            .iter()
            .filter_map(|(literal, lines)| {
                let global = &corpus.strings[literal];
                let (count, locations) = if lines.len() >= min {
                    let here: Vec<LiteralOccurrence> = global
                        .iter()
                        .filter(|occ| occ.path == unit.path)
                        .cloned()
                        .collect();
                    (lines.len(), here)
                } else if global.len() >= min {
                    (global.len(), global.clone())
                } else {
                    return None;
                };
                Some(self.literal_entity(
                    EntityKind::StringLiteral,
                    FindingKind::RepeatedString,
                    format!("'{}'", truncate(literal, 30)),
                    format!(
                        "String '{}' is repeated {count} times; consider defining it as a constant",
                        truncate(literal, 30)
                    ),
                    count,
                    &locations,
                    unit,
                ))
            })
            .collect()
    }

    /// Record and report repeated numeric constants.
    fn constant_entities(
        &self,
        corpus: &mut CorpusState,
        unit: &SourceUnit,
    ) -> Vec<EntityAnalysis> {
        let mut local: IndexMap<String, Vec<usize>> = IndexMap::new();
        let mut negated: HashSet<(usize, usize)> = HashSet::new();
        walk_exprs_in_stmts(&unit.suite, &mut |expr| {
            let line = unit.lines.node_line(expr);
            match expr {
                // `-n` literals arrive as a unary minus over a constant; fold
                // the sign in and skip the inner constant when it comes by.
                ast::Expr::UnaryOp(unary) if matches!(unary.op, ast::UnaryOp::USub) => {
                    if let ast::Expr::Constant(constant) = unary.operand.as_ref() {
                        if let Some(repr) = numeric_repr(&constant.value) {
                            let range = constant.range();
                            negated.insert((range.start().to_usize(), range.end().to_usize()));
                            let negative = format!("-{repr}");
                            if !is_trivial_constant(&negative) {
                                local.entry(negative).or_default().push(line);
                            }
                        }
                    }
                }
                ast::Expr::Constant(constant) => {
                    let range = constant.range();
                    if negated.contains(&(range.start().to_usize(), range.end().to_usize())) {
                        return;
                    }
                    if let Some(repr) = numeric_repr(&constant.value) {
                        if !is_trivial_constant(&repr) {
                            local.entry(repr).or_default().push(line);
                        }
                    }
                }
                _ => {}
            }
        });

        for (repr, lines) in &local {
            let entry = corpus.constants.entry(repr.clone()).or_default();
            for &line in lines {
                entry.push(LiteralOccurrence {
                    path: unit.path.clone(),
                    line,
                });
            }
        }

        let min = self.config.min_string_occurrences;
        local
            .iter()
            .filter_map(|(repr, lines)| {
                let global = &corpus.constants[repr];
                let (count, locations) = if lines.len() >= min {
                    let here: Vec<LiteralOccurrence> = global
                        .iter()
                        .filter(|occ| occ.path == unit.path)
                        .cloned()
                        .collect();
                    (lines.len(), here)
                } else if global.len() >= min {
                    (global.len(), global.clone())
                } else {
                    return None;
                };
                Some(self.literal_entity(
                    EntityKind::NumericConstant,
                    FindingKind::RepeatedConstant,
                    repr.clone(),
                    format!(
                        "Constant {repr} is repeated {count} times; consider naming it"
                    ),
                    count,
                    &locations,
                    unit,
                ))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn literal_entity(
        &self,
        kind: EntityKind,
        finding_kind: FindingKind,
        name: String,
        details: String,
        count: usize,
        locations: &[LiteralOccurrence],
        unit: &SourceUnit,
    ) -> EntityAnalysis {
        let severity =
            (count as f64 - self.config.min_string_occurrences as f64 + 1.0) * 0.1;
        let first_line = locations.first().map_or(1, |occ| occ.line);
        let finding = Finding::new(
            finding_kind,
            details,
            SourceSpan::line(&unit.path, first_line),
            severity,
        );

        let mut metrics = Metrics::new();
        metrics.insert("occurrences".into(), json!(count));
        metrics.insert(
            "locations".into(),
            json!(locations
                .iter()
                .map(|occ| json!({
                    "file": occ.path.display().to_string(),
                    "line": occ.line,
                }))
                .collect::<Vec<_>>()),
        );

        EntityAnalysis {
            name,
            kind,
            score: 0.9,
            findings: vec![finding],
            recommendation: None,
            metrics,
        }
    }
}

/// Canonical form for duplicate comparison: hash-comments stripped,
/// whitespace collapsed, string literals blanked.
fn normalize_block(block: &str) -> String {
    let without_comments: String = block
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");

    let collapsed = without_comments.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars();
    while let Some(ch) = chars.next() {
        if ch == '"' || ch == '\'' {
            for inner in chars.by_ref() {
                if inner == ch {
                    break;
                }
            }
            out.push(ch);
            out.push(ch);
        } else {
            out.push(ch);
        }
    }
    out.trim().to_string()
}

/// Display form of a numeric constant, `None` for non-numeric constants.
fn numeric_repr(constant: &ast::Constant) -> Option<String> {
    match constant {
        ast::Constant::Int(value) => Some(value.to_string()),
        ast::Constant::Float(value) => Some(value.to_string()),
        _ => None,
    }
}

fn is_trivial_constant(repr: &str) -> bool {
    matches!(repr, "0" | "1" | "-1")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{prefix}...")
    }
}

impl Analyzer for DryAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Dry
    }

    fn name(&self) -> &str {
        "DRY Analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes code for violations of the Don't Repeat Yourself principle"
    }

    fn analyze_source(&self, unit: &SourceUnit) -> Result<FileAnalysis> {
        let mut corpus = self.corpus.lock();

        self.index_blocks(&mut corpus, unit);
        let mut entities = self.duplicate_entities(&corpus, unit);
        entities.extend(self.string_entities(&mut corpus, unit));
        entities.extend(self.constant_entities(&mut corpus, unit));

        // Every entity here carries exactly one finding; the file score drops
        // a tenth per finding rather than averaging entity scores.
        let finding_count: usize = entities.iter().map(|e| e.findings.len()).sum();
        let score = (1.0 - finding_count as f64 * 0.1).max(0.0);

        Ok(FileAnalysis {
            file_path: unit.path.clone(),
            score,
            entities,
            error: None,
        })
    }

    fn cacheable(&self) -> bool {
        // A cached per-file result is only valid for the corpus it was
        // computed against.
        false
    }

    fn corpus_dependent(&self) -> bool {
        true
    }

    fn reset(&self) {
        *self.corpus.lock() = CorpusState::default();
    }

    fn contribute_to_summary(&self, summary: &mut Summary, files: &[FileAnalysis]) {
        let mut blocks = 0usize;
        let mut strings = 0usize;
        let mut constants = 0usize;
        let mut analyzed = 0usize;
        for file in files.iter().filter(|f| !f.is_error()) {
            analyzed += 1;
            for entity in &file.entities {
                match entity.kind {
                    EntityKind::DuplicateBlock => blocks += 1,
                    EntityKind::StringLiteral => strings += 1,
                    EntityKind::NumericConstant => constants += 1,
                    _ => {}
                }
            }
        }
        let total = blocks + strings + constants;
        summary.insert("duplicate_blocks_count".into(), blocks.into());
        summary.insert("repeated_strings_count".into(), strings.into());
        summary.insert("repeated_constants_count".into(), constants.into());
        summary.insert("total_dry_violations".into(), total.into());

        // Two violations per analyzed file is the "all bad" baseline.
        let rate = if analyzed > 0 {
            (1.0 - total as f64 / (analyzed * 2) as f64).max(0.0)
        } else {
            1.0
        };
        summary.insert("dry_compliance_rate".into(), json!(rate));
    }

    fn contribute_to_text_report(&self, report: &mut String, analysis: &DirectoryAnalysis) {
        let summary = &analysis.summary;
        let _ = writeln!(
            report,
            "Duplicate code blocks: {}",
            summary["duplicate_blocks_count"]
        );
        let _ = writeln!(
            report,
            "Repeated string literals: {}",
            summary["repeated_strings_count"]
        );
        let _ = writeln!(
            report,
            "Repeated numeric constants: {}",
            summary["repeated_constants_count"]
        );
        let _ = writeln!(
            report,
            "DRY compliance rate: {}",
            format_rate(summary["dry_compliance_rate"].as_f64().unwrap_or(0.0))
        );
        let _ = writeln!(report);

        let mut violations_found = false;
        for file in analysis.analyzed_files() {
            for entity in &file.entities {
                violations_found = true;
                let _ = writeln!(
                    report,
                    "  {}: {} ({} occurrences)",
                    file.file_path.display(),
                    entity.name,
                    entity.metrics["occurrences"]
                );
                for finding in &entity.findings {
                    let _ = writeln!(report, "    {}", finding.details);
                }
            }
        }
        if !violations_found {
            let _ = writeln!(report, "  No DRY violations detected!");
        }
    }

    fn contribute_to_html_summary(&self, html: &mut String, summary: &Summary) {
        let _ = writeln!(
            html,
            "<p>Duplicate code blocks: {}</p>",
            summary["duplicate_blocks_count"]
        );
        let _ = writeln!(
            html,
            "<p>Repeated string literals: {}</p>",
            summary["repeated_strings_count"]
        );
        let _ = writeln!(
            html,
            "<p>Repeated numeric constants: {}</p>",
            summary["repeated_constants_count"]
        );
        let rate = summary["dry_compliance_rate"].as_f64().unwrap_or(0.0);
        let _ = writeln!(
            html,
            "<p>DRY compliance rate: <span class='{}'>{}</span></p>",
            crate::io::reports::score_class(rate),
            format_rate(rate)
        );
    }

    fn contribute_to_html_report(&self, html: &mut String, analysis: &DirectoryAnalysis) {
        let _ = writeln!(html, "<h2>Duplication Analysis</h2>");
        for file in analysis.analyzed_files() {
            for entity in &file.entities {
                let _ = writeln!(html, "<div class='file'>");
                let _ = writeln!(html, "<div class='file-header'>");
                let _ = writeln!(
                    html,
                    "<div class='file-path'>{}: {}</div>",
                    file.file_path.display(),
                    entity.name
                );
                let _ = writeln!(
                    html,
                    "<div class='file-score warning'>Occurrences: {}</div>",
                    entity.metrics["occurrences"]
                );
                let _ = writeln!(html, "</div>");
                for finding in &entity.findings {
                    let _ = writeln!(html, "<div class='violation'>{}</div>", finding.details);
                }
                if let Some(rec) = &entity.recommendation {
                    let _ = writeln!(html, "<p class='recommendation'>{rec}</p>");
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

    fn analyze_one(analyzer: &DryAnalyzer, path: &str, source: &str) -> FileAnalysis {
        let unit = SourceUnit::from_source(Path::new(path), source).unwrap();
        analyzer.analyze_source(&unit).unwrap()
    }

    fn analyzer() -> DryAnalyzer {
        DryAnalyzer::new(DryConfig::default())
    }

    #[test]
    fn test_normalize_strips_comments_whitespace_and_strings() {
        let normalized = normalize_block("x = \"hello\"  # greet\n  y   =  'bye'\n");
        assert_eq!(normalized, "x = \"\" y = ''");
    }

    #[test]
    fn test_identical_bodies_in_one_file_are_reported() {
        let source = "\
def first(a):
    total = a + 10
    total = total * 2
    total = total - 3
    total = total // 7
    return total

def second(b):
    total = b + 10
    total = total * 2
    total = total - 3
    total = total // 7
    return total
";
        let result = analyze_one(&analyzer(), "dup.py", source);
        let duplicate = result
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::DuplicateBlock)
            .expect("duplicate block entity");
        assert!(duplicate.metrics["occurrences"].as_u64().unwrap() >= 2);
        assert!(result.score <= 0.9);
    }

    #[test]
    fn test_duplicates_across_files_surface_when_second_file_lands() {
        let shared = "    total = value + 10\n    total = total * 2\n    total = total - 3\n    total = total // 7\n    return total\n";
        let a = format!("def alpha(value):\n{shared}");
        let b = format!("def beta(value):\n{shared}");

        let dry = analyzer();
        let first = analyze_one(&dry, "a.py", &a);
        assert!(first
            .entities
            .iter()
            .all(|e| e.kind != EntityKind::DuplicateBlock));

        let second = analyze_one(&dry, "b.py", &b);
        let duplicate = second
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::DuplicateBlock)
            .expect("cross-file duplicate");
        assert_eq!(duplicate.metrics["occurrences"].as_u64(), Some(2));
        let locations = duplicate.metrics["locations"].as_array().unwrap();
        let files: HashSet<&str> = locations
            .iter()
            .map(|loc| loc["file"].as_str().unwrap())
            .collect();
        assert!(files.contains("a.py") && files.contains("b.py"));
    }

    #[test]
    fn test_repeated_long_string_is_reported_at_threshold() {
        let source = "\
a = \"configuration-key-name\"
b = \"configuration-key-name\"
c = \"configuration-key-name\"
";
        let result = analyze_one(&analyzer(), "s.py", source);
        let entity = result
            .entities
            .iter()
            .find(|e| e.kind == EntityKind::StringLiteral)
            .expect("repeated string entity");
        assert_eq!(entity.metrics["occurrences"].as_u64(), Some(3));
        assert!((entity.findings[0].severity - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_short_strings_are_ignored() {
        let result = analyze_one(&analyzer(), "s.py", "a = 'ok'\nb = 'ok'\nc = 'ok'\n");
        assert!(result
            .entities
            .iter()
            .all(|e| e.kind != EntityKind::StringLiteral));
    }

    #[test]
    fn test_repeated_constant_skips_trivial_values() {
        let source = "\
a = 86400
b = 86400
c = 86400
x = 1
y = 1
z = 1
n = -1
m = -1
o = -1
";
        let result = analyze_one(&analyzer(), "c.py", source);
        let constants: Vec<_> = result
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::NumericConstant)
            .collect();
        assert_eq!(constants.len(), 1);
        assert_eq!(constants[0].name, "86400");
    }

    #[test]
    fn test_reset_clears_the_corpus() {
        let shared = "    total = value + 10\n    total = total * 2\n    total = total - 3\n    return total\n";
        let dry = analyzer();
        analyze_one(&dry, "a.py", &format!("def alpha(value):\n{shared}"));
        dry.reset();
        let second = analyze_one(&dry, "b.py", &format!("def beta(value):\n{shared}"));
        assert!(second
            .entities
            .iter()
            .all(|e| e.kind != EntityKind::DuplicateBlock));
    }

    #[test]
    fn test_clean_file_scores_one() {
        let result = analyze_one(&analyzer(), "ok.py", "def tiny():\n    return None\n");
        assert_eq!(result.score, 1.0);
        assert!(result.entities.is_empty());
    }
}

