//! Configuration types for the analysis engine.
//!
//! A [`PythiaConfig`] is accepted once at engine construction; there is no
//! runtime reconfiguration. Unknown keys in deserialized configuration are
//! ignored so callers can keep engine options inside larger settings files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::errors::{PythiaError, Result};

/// Identity of a principle analyzer, also its key in reports and cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// Single Responsibility Principle
    Srp,
    /// Open/Closed Principle
    Ocp,
    /// Liskov Substitution Principle
    Lsp,
    /// Interface Segregation Principle
    Isp,
    /// Dependency Inversion Principle
    Dip,
    /// Keep It Simple (complexity limits)
    Kiss,
    /// Don't Repeat Yourself (duplication)
    Dry,
}

impl AnalyzerKind {
    /// All analyzers in their canonical report order.
    pub const ALL: [AnalyzerKind; 7] = [
        AnalyzerKind::Srp,
        AnalyzerKind::Ocp,
        AnalyzerKind::Lsp,
        AnalyzerKind::Isp,
        AnalyzerKind::Dip,
        AnalyzerKind::Kiss,
        AnalyzerKind::Dry,
    ];

    /// Short lowercase key used in configuration, cache file names and JSON.
    pub fn key(self) -> &'static str {
        match self {
            AnalyzerKind::Srp => "srp",
            AnalyzerKind::Ocp => "ocp",
            AnalyzerKind::Lsp => "lsp",
            AnalyzerKind::Isp => "isp",
            AnalyzerKind::Dip => "dip",
            AnalyzerKind::Kiss => "kiss",
            AnalyzerKind::Dry => "dry",
        }
    }

    /// Parse a lowercase analyzer key.
    pub fn from_key(key: &str) -> Option<Self> {
        AnalyzerKind::ALL.into_iter().find(|k| k.key() == key)
    }
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythiaConfig {
    /// Analyzers to run, in report order. Defaults to all seven.
    #[serde(default = "PythiaConfig::default_enabled_analyzers")]
    pub enabled_analyzers: Vec<AnalyzerKind>,

    /// Enable the read-through / write-through result cache.
    #[serde(default)]
    pub use_cache: bool,

    /// Directory holding cache entries.
    #[serde(default = "PythiaConfig::default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Single Responsibility analyzer settings.
    #[serde(default, rename = "srp_config")]
    pub srp: SrpConfig,

    /// Interface Segregation analyzer settings.
    #[serde(default, rename = "isp_config")]
    pub isp: IspConfig,

    /// Simplicity analyzer settings.
    #[serde(default, rename = "kiss_config")]
    pub kiss: KissConfig,

    /// Duplication analyzer settings.
    #[serde(default, rename = "dry_config")]
    pub dry: DryConfig,
}

/// Default implementation for [`PythiaConfig`].
impl Default for PythiaConfig {
    fn default() -> Self {
        Self {
            enabled_analyzers: Self::default_enabled_analyzers(),
            use_cache: false,
            cache_dir: Self::default_cache_dir(),
            srp: SrpConfig::default(),
            isp: IspConfig::default(),
            kiss: KissConfig::default(),
            dry: DryConfig::default(),
        }
    }
}

impl PythiaConfig {
    fn default_enabled_analyzers() -> Vec<AnalyzerKind> {
        AnalyzerKind::ALL.to_vec()
    }

    fn default_cache_dir() -> PathBuf {
        PathBuf::from(".pythia_cache")
    }

    /// Validate option ranges before the engine is built.
    pub fn validate(&self) -> Result<()> {
        if self.enabled_analyzers.is_empty() {
            return Err(PythiaError::config_field(
                "at least one analyzer must be enabled",
                "enabled_analyzers",
            ));
        }
        if !(0.0..=1.0).contains(&self.srp.cohesion_threshold) {
            return Err(PythiaError::config_field(
                "cohesion_threshold must be in [0, 1]",
                "srp_config.cohesion_threshold",
            ));
        }
        if self.dry.min_duplicate_lines == 0 {
            return Err(PythiaError::config_field(
                "min_duplicate_lines must be positive",
                "dry_config.min_duplicate_lines",
            ));
        }
        if self.dry.min_string_occurrences == 0 {
            return Err(PythiaError::config_field(
                "min_string_occurrences must be positive",
                "dry_config.min_string_occurrences",
            ));
        }
        if self.kiss.max_method_lines == 0
            || self.kiss.max_nesting_depth == 0
            || self.kiss.max_cyclomatic_complexity == 0
            || self.kiss.max_cognitive_complexity == 0
            || self.kiss.max_parameters == 0
        {
            return Err(PythiaError::config_field(
                "complexity limits must be positive",
                "kiss_config",
            ));
        }
        Ok(())
    }
}

/// Settings for the Single Responsibility analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrpConfig {
    /// Responsibility domains a class may touch before it violates SRP.
    #[serde(default = "SrpConfig::default_max_responsibilities")]
    pub max_responsibilities: usize,

    /// Mean pairwise method similarity below which the class score is scaled down.
    #[serde(default = "SrpConfig::default_cohesion_threshold")]
    pub cohesion_threshold: f64,
}

/// Default implementation for [`SrpConfig`].
impl Default for SrpConfig {
    fn default() -> Self {
        Self {
            max_responsibilities: Self::default_max_responsibilities(),
            cohesion_threshold: Self::default_cohesion_threshold(),
        }
    }
}

/// Default value providers for [`SrpConfig`].
impl SrpConfig {
    const fn default_max_responsibilities() -> usize {
        1
    }

    const fn default_cohesion_threshold() -> f64 {
        0.5
    }
}

/// Settings for the Interface Segregation analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IspConfig {
    /// Method count above which an interface is considered too large.
    #[serde(default = "IspConfig::default_max_interface_methods")]
    pub max_interface_methods: usize,
}

/// Default implementation for [`IspConfig`].
impl Default for IspConfig {
    fn default() -> Self {
        Self {
            max_interface_methods: Self::default_max_interface_methods(),
        }
    }
}

/// Default value providers for [`IspConfig`].
impl IspConfig {
    const fn default_max_interface_methods() -> usize {
        5
    }
}

/// Settings for the simplicity (KISS) analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KissConfig {
    /// Maximum source lines per function or method.
    #[serde(default = "KissConfig::default_max_method_lines")]
    pub max_method_lines: usize,

    /// Maximum nesting depth over if/for/while/with/try.
    #[serde(default = "KissConfig::default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Maximum cyclomatic complexity.
    #[serde(default = "KissConfig::default_max_cyclomatic_complexity")]
    pub max_cyclomatic_complexity: usize,

    /// Maximum cognitive complexity.
    #[serde(default = "KissConfig::default_max_cognitive_complexity")]
    pub max_cognitive_complexity: usize,

    /// Maximum parameter count.
    #[serde(default = "KissConfig::default_max_parameters")]
    pub max_parameters: usize,
}

/// Default implementation for [`KissConfig`].
impl Default for KissConfig {
    fn default() -> Self {
        Self {
            max_method_lines: Self::default_max_method_lines(),
            max_nesting_depth: Self::default_max_nesting_depth(),
            max_cyclomatic_complexity: Self::default_max_cyclomatic_complexity(),
            max_cognitive_complexity: Self::default_max_cognitive_complexity(),
            max_parameters: Self::default_max_parameters(),
        }
    }
}

/// Default value providers for [`KissConfig`].
impl KissConfig {
    const fn default_max_method_lines() -> usize {
        20
    }

    const fn default_max_nesting_depth() -> usize {
        3
    }

    const fn default_max_cyclomatic_complexity() -> usize {
        10
    }

    const fn default_max_cognitive_complexity() -> usize {
        15
    }

    const fn default_max_parameters() -> usize {
        5
    }
}

/// Settings for the duplication (DRY) analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryConfig {
    /// Smallest window (in lines) indexed for duplicate detection.
    #[serde(default = "DryConfig::default_min_duplicate_lines")]
    pub min_duplicate_lines: usize,

    /// Reserved similarity threshold for near-duplicate matching.
    #[serde(default = "DryConfig::default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Minimum length (in characters) before a string literal is tracked.
    #[serde(default = "DryConfig::default_min_string_length")]
    pub min_string_length: usize,

    /// Occurrence count at which a tracked literal becomes a finding.
    #[serde(default = "DryConfig::default_min_string_occurrences")]
    pub min_string_occurrences: usize,
}

/// Default implementation for [`DryConfig`].
impl Default for DryConfig {
    fn default() -> Self {
        Self {
            min_duplicate_lines: Self::default_min_duplicate_lines(),
            similarity_threshold: Self::default_similarity_threshold(),
            min_string_length: Self::default_min_string_length(),
            min_string_occurrences: Self::default_min_string_occurrences(),
        }
    }
}

/// Default value providers for [`DryConfig`].
impl DryConfig {
    const fn default_min_duplicate_lines() -> usize {
        3
    }

    const fn default_similarity_threshold() -> f64 {
        0.8
    }

    const fn default_min_string_length() -> usize {
        10
    }

    const fn default_min_string_occurrences() -> usize {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_all_analyzers_in_order() {
        let config = PythiaConfig::default();
        assert_eq!(config.enabled_analyzers, AnalyzerKind::ALL.to_vec());
        assert!(!config.use_cache);
        assert_eq!(config.kiss.max_method_lines, 20);
        assert_eq!(config.dry.min_string_occurrences, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let json = r#"{
            "enabled_analyzers": ["kiss", "srp"],
            "use_cache": true,
            "totally_unknown_option": 42,
            "kiss_config": {"max_parameters": 3, "mystery": "?"}
        }"#;
        let config: PythiaConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.enabled_analyzers,
            vec![AnalyzerKind::Kiss, AnalyzerKind::Srp]
        );
        assert!(config.use_cache);
        assert_eq!(config.kiss.max_parameters, 3);
        // Unspecified fields keep their defaults.
        assert_eq!(config.kiss.max_nesting_depth, 3);
    }

    #[test]
    fn test_validation_rejects_bad_ranges() {
        let mut config = PythiaConfig::default();
        config.srp.cohesion_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = PythiaConfig::default();
        config.enabled_analyzers.clear();
        assert!(config.validate().is_err());

        let mut config = PythiaConfig::default();
        config.dry.min_duplicate_lines = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analyzer_kind_keys_round_trip() {
        for kind in AnalyzerKind::ALL {
            assert_eq!(AnalyzerKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(AnalyzerKind::from_key("srpp"), None);
    }
}
