//! The analysis result model.
//!
//! Analyzers report through a shared shape: a [`FileAnalysis`] per source
//! file holding per-entity sub-records ([`EntityAnalysis`]) with zero or more
//! [`Finding`]s each. Directory runs wrap those into a [`DirectoryAnalysis`]
//! with a summary map, and the engine composes one [`CompositeResult`] across
//! analyzers. Scores live in `[0, 1]`; `1.0` means no issues.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered summary map attached to directory results.
pub type Summary = IndexMap<String, Value>;

/// Analyzer-specific metric map attached to entity sub-records.
pub type Metrics = serde_json::Map<String, Value>;

/// Location of a finding: a file plus a line or line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Source file the finding points into.
    pub file: PathBuf,
    /// First line of the finding (1-based).
    pub start_line: usize,
    /// Last line when the finding covers a range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

impl SourceSpan {
    /// Span covering a single line.
    pub fn line(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            start_line: line,
            end_line: None,
        }
    }

    /// Span covering an inclusive line range.
    pub fn range(file: impl Into<PathBuf>, start_line: usize, end_line: usize) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line: Some(end_line),
        }
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end_line {
            Some(end) => write!(f, "{}:{}-{}", self.file.display(), self.start_line, end),
            None => write!(f, "{}:{}", self.file.display(), self.start_line),
        }
    }
}

/// Closed set of issue tags the analyzers can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Class text touches more responsibility domains than allowed
    MultipleResponsibilities,
    /// Mean pairwise method similarity fell below the threshold
    LowCohesion,
    /// `isinstance(...)` call inside a class body
    TypeCheckingWithIsinstance,
    /// `type(...)` call inside a class body
    TypeCheckingWithType,
    /// if/elif chain long enough to suggest a missing polymorphic seam
    IfElifChain,
    /// Constructor builds a concrete collaborator directly
    ConcreteInstantiation,
    /// Override arity differs from the base method
    OverrideChangesParameterCount,
    /// Override return annotation differs from the base method
    OverrideChangesReturnType,
    /// Override raises an exception the base method never raises
    OverrideRaisesNewException,
    /// Implemented interface exposes too many methods
    InterfaceTooLarge,
    /// High-level class depends on a concrete class
    ConcreteDependency,
    /// High-level class instantiates a concrete dependency itself
    DirectInstantiation,
    /// Dependencies are not supplied through the constructor
    MissingConstructorInjection,
    /// Function body exceeds the line limit
    LongMethod,
    /// Control-flow nesting exceeds the depth limit
    DeepNesting,
    /// Cyclomatic complexity exceeds the limit
    HighCyclomaticComplexity,
    /// Cognitive complexity exceeds the limit
    HighCognitiveComplexity,
    /// Parameter count exceeds the limit
    TooManyParameters,
    /// Boolean/comparison expressions too involved to read at a glance
    ComplexConditionals,
    /// Normalized block appears at several locations
    DuplicateCodeBlock,
    /// Long string literal repeated across the code
    RepeatedString,
    /// Non-trivial numeric constant repeated across the code
    RepeatedConstant,
}

impl FindingKind {
    /// The snake_case tag used in serialized output.
    pub fn tag(self) -> &'static str {
        match self {
            FindingKind::MultipleResponsibilities => "multiple_responsibilities",
            FindingKind::LowCohesion => "low_cohesion",
            FindingKind::TypeCheckingWithIsinstance => "type_checking_with_isinstance",
            FindingKind::TypeCheckingWithType => "type_checking_with_type",
            FindingKind::IfElifChain => "if_elif_chain",
            FindingKind::ConcreteInstantiation => "concrete_instantiation",
            FindingKind::OverrideChangesParameterCount => "override_changes_parameter_count",
            FindingKind::OverrideChangesReturnType => "override_changes_return_type",
            FindingKind::OverrideRaisesNewException => "override_raises_new_exception",
            FindingKind::InterfaceTooLarge => "interface_too_large",
            FindingKind::ConcreteDependency => "concrete_dependency",
            FindingKind::DirectInstantiation => "direct_instantiation",
            FindingKind::MissingConstructorInjection => "missing_constructor_injection",
            FindingKind::LongMethod => "long_method",
            FindingKind::DeepNesting => "deep_nesting",
            FindingKind::HighCyclomaticComplexity => "high_cyclomatic_complexity",
            FindingKind::HighCognitiveComplexity => "high_cognitive_complexity",
            FindingKind::TooManyParameters => "too_many_parameters",
            FindingKind::ComplexConditionals => "complex_conditionals",
            FindingKind::DuplicateCodeBlock => "duplicate_code_block",
            FindingKind::RepeatedString => "repeated_string",
            FindingKind::RepeatedConstant => "repeated_constant",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One reported issue at one location. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Issue tag.
    pub kind: FindingKind,
    /// Human-readable specifics.
    pub details: String,
    /// Where the issue was observed.
    pub span: SourceSpan,
    /// Weight in `[0, 1]` used when converting finding counts to scores.
    pub severity: f64,
}

impl Finding {
    /// Create a finding, clamping severity into `[0, 1]`.
    pub fn new(kind: FindingKind, details: impl Into<String>, span: SourceSpan, severity: f64) -> Self {
        Self {
            kind,
            details: details.into(),
            span,
            severity: severity.clamp(0.0, 1.0),
        }
    }
}

/// What a sub-record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A class definition
    Class,
    /// A function or method definition
    Function,
    /// A duplicated normalized block
    DuplicateBlock,
    /// A repeated string literal
    StringLiteral,
    /// A repeated numeric constant
    NumericConstant,
}

/// Per-entity sub-record inside a [`FileAnalysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnalysis {
    /// Entity name (class or function name, literal preview, …).
    pub name: String,
    /// Entity category.
    pub kind: EntityKind,
    /// Entity score in `[0, 1]`; `1.0` when the findings list is empty.
    pub score: f64,
    /// Issues attached to this entity.
    pub findings: Vec<Finding>,
    /// Remediation text generated from the finding kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Analyzer-specific measurements (cohesion, complexity numbers, …).
    #[serde(default, skip_serializing_if = "Metrics::is_empty")]
    pub metrics: Metrics,
}

impl EntityAnalysis {
    /// Create a clean sub-record with score 1.0 and no findings.
    pub fn clean(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
            score: 1.0,
            findings: Vec::new(),
            recommendation: None,
            metrics: Metrics::new(),
        }
    }

    /// True when any finding is attached.
    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Result of one analyzer over one file, or an error sentinel when the file
/// could not be read, parsed, or analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    /// Source path this record describes.
    pub file_path: PathBuf,
    /// Overall score: mean of entity scores, `1.0` with no entities.
    pub score: f64,
    /// Per-entity sub-records.
    pub entities: Vec<EntityAnalysis>,
    /// Error description when this record is a sentinel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileAnalysis {
    /// Build a successful record, deriving the file score from its entities.
    pub fn analyzed(file_path: impl Into<PathBuf>, entities: Vec<EntityAnalysis>) -> Self {
        let score = mean(entities.iter().map(|e| e.score)).unwrap_or(1.0);
        Self {
            file_path: file_path.into(),
            score,
            entities,
            error: None,
        }
    }

    /// Build an error sentinel carrying only the path and a description.
    pub fn error(file_path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            score: 0.0,
            entities: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// True when this record is an error sentinel.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// All findings across this file's entities.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.entities.iter().flat_map(|e| e.findings.iter())
    }
}

/// Result of one analyzer over a directory tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryAnalysis {
    /// One record per enumerated file, in enumeration order.
    pub files: Vec<FileAnalysis>,
    /// Universal counters plus analyzer-contributed aggregates.
    pub summary: Summary,
}

impl DirectoryAnalysis {
    /// Overall score: mean over non-sentinel file scores.
    pub fn overall_score(&self) -> Option<f64> {
        mean(self.files.iter().filter(|f| !f.is_error()).map(|f| f.score))
    }

    /// Records that analyzed cleanly (not error sentinels).
    pub fn analyzed_files(&self) -> impl Iterator<Item = &FileAnalysis> {
        self.files.iter().filter(|f| !f.is_error())
    }
}

/// What one analyzer contributed to a composite record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalyzerReport {
    /// Single-file analysis.
    File(FileAnalysis),
    /// Directory analysis.
    Directory(DirectoryAnalysis),
}

impl AnalyzerReport {
    /// The analyzer's overall score, when one is present.
    pub fn overall_score(&self) -> Option<f64> {
        match self {
            AnalyzerReport::File(file) => (!file.is_error()).then_some(file.score),
            AnalyzerReport::Directory(dir) => dir.overall_score(),
        }
    }

    /// Directory view, when this report came from a directory run.
    pub fn as_directory(&self) -> Option<&DirectoryAnalysis> {
        match self {
            AnalyzerReport::Directory(dir) => Some(dir),
            AnalyzerReport::File(_) => None,
        }
    }

    /// The file records behind this report.
    pub fn files(&self) -> &[FileAnalysis] {
        match self {
            AnalyzerReport::File(file) => std::slice::from_ref(file),
            AnalyzerReport::Directory(dir) => &dir.files,
        }
    }
}

/// The engine's composed output across all enabled analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    /// File or directory that was analyzed.
    pub path: PathBuf,
    /// Per-analyzer reports, in configured analyzer order.
    pub analyzers: IndexMap<String, AnalyzerReport>,
    /// Arithmetic mean of the overall scores present; `0.0` when none are.
    pub overall_quality_score: f64,
}

impl CompositeResult {
    /// Compose analyzer reports, computing the combined quality score.
    pub fn compose(path: impl Into<PathBuf>, analyzers: IndexMap<String, AnalyzerReport>) -> Self {
        let overall_quality_score =
            mean(analyzers.values().filter_map(AnalyzerReport::overall_score)).unwrap_or(0.0);
        Self {
            path: path.into(),
            analyzers,
            overall_quality_score,
        }
    }
}

/// Arithmetic mean, `None` for an empty sequence.
pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Universal counters every directory summary starts with.
pub fn base_summary(files: &[FileAnalysis]) -> Summary {
    let error_count = files.iter().filter(|f| f.is_error()).count();
    let mut summary = Summary::new();
    summary.insert("file_count".into(), files.len().into());
    summary.insert("error_count".into(), error_count.into());
    summary.insert("analyzed_count".into(), (files.len() - error_count).into());
    summary
}
