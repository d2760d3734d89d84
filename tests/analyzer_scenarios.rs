//! End-to-end scenarios over real temporary directories.
//!
//! Each scenario drives the engine the way the CLI does: write Python
//! sources to disk, analyze, and assert on the composite record.

use std::fs;
use std::path::Path;

use pythia_rs::core::config::{AnalyzerKind, PythiaConfig};
use pythia_rs::core::results::{AnalyzerReport, EntityKind, FindingKind};
use pythia_rs::io::reports::ReportFormat;
use pythia_rs::PythiaEngine;

fn engine() -> PythiaEngine {
    PythiaEngine::new(PythiaConfig::default()).unwrap()
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn file_report<'a>(
    composite: &'a pythia_rs::CompositeResult,
    analyzer: &str,
) -> &'a pythia_rs::FileAnalysis {
    match &composite.analyzers[analyzer] {
        AnalyzerReport::File(file) => file,
        AnalyzerReport::Directory(dir) => &dir.files[0],
    }
}

#[test]
fn scenario_multi_responsibility_class() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manager.py");
    fs::write(
        &path,
        "\
class ReportManager:
    def load_data(self):
        return self.database.query()

    def process_data(self):
        return calculate(self.rows)

    def display_data(self):
        render(self.rows)
",
    )
    .unwrap();

    let mut engine = engine();
    let composite = engine.analyze_file(&path).unwrap();

    let srp = file_report(&composite, "srp");
    assert_eq!(srp.entities.len(), 1);
    let class = &srp.entities[0];
    assert_eq!(
        class.metrics["responsibilities"],
        serde_json::json!(["data_access", "ui", "calculation"])
    );
    assert!(class.score < 1.0);
    assert!(composite.overall_quality_score < 1.0);
}

#[test]
fn scenario_heavy_function_fails_kiss() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("heavy.py");

    let mut source = String::from("def heavy(a, b, c, d, e, f, g, h):\n");
    source.push_str("    if a and b and c:\n");
    source.push_str("        if b and c and d:\n");
    source.push_str("            if c and d and e:\n");
    source.push_str("                if d and e and f:\n");
    source.push_str("                    if e and f and g:\n");
    source.push_str("                        total = a + b\n");
    for idx in 0..52 {
        source.push_str(&format!("    pad_{idx} = {}\n", idx + 2));
    }
    source.push_str("    return 0\n");
    fs::write(&path, source).unwrap();

    let mut engine = engine();
    let composite = engine.analyze_file(&path).unwrap();

    let kiss = file_report(&composite, "kiss");
    let heavy = &kiss.entities[0];
    for kind in [
        FindingKind::LongMethod,
        FindingKind::DeepNesting,
        FindingKind::TooManyParameters,
    ] {
        assert!(
            heavy.findings.iter().any(|f| f.kind == kind),
            "missing {kind} finding"
        );
    }
    assert!(heavy.score < 0.4, "score {} should be < 0.4", heavy.score);
}

#[test]
fn scenario_duplicate_bodies_in_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dup.py");
    fs::write(
        &path,
        "\
def alpha(value):
    total = value + 10
    total = total * 2
    total = total - 3
    total = total // 7
    return total

def beta(value):
    total = value + 10
    total = total * 2
    total = total - 3
    total = total // 7
    return total
",
    )
    .unwrap();

    let mut engine = engine();
    let composite = engine.analyze_file(&path).unwrap();

    let dry = file_report(&composite, "dry");
    let duplicate = dry
        .entities
        .iter()
        .find(|e| {
            e.kind == EntityKind::DuplicateBlock
                && e.metrics["occurrences"].as_u64() == Some(2)
        })
        .expect("duplicate block with two occurrences");
    let locations = duplicate.metrics["locations"].as_array().unwrap();
    assert_eq!(locations.len(), 2);
    assert_ne!(locations[0]["start_line"], locations[1]["start_line"]);
    assert!(dry.score <= 0.9);
}

#[test]
fn scenario_trivial_file_is_clean_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trivial.py");
    fs::write(&path, "def constant():\n    return 42\n").unwrap();

    let mut engine = engine();
    let composite = engine.analyze_file(&path).unwrap();

    assert_eq!(composite.analyzers.len(), 7);
    for (name, report) in &composite.analyzers {
        assert_eq!(report.overall_score(), Some(1.0), "analyzer {name}");
        for file in report.files() {
            assert_eq!(file.findings().count(), 0, "analyzer {name}");
        }
    }
    assert_eq!(composite.overall_quality_score, 1.0);
}

#[test]
fn scenario_unparsable_file_becomes_error_sentinels() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.py", "def broken(:\n    pass\n");

    let mut engine = engine();
    let composite = engine.analyze_directory(dir.path(), false).unwrap();

    for (name, report) in &composite.analyzers {
        let directory = report.as_directory().expect("directory report");
        assert_eq!(directory.files.len(), 1, "analyzer {name}");
        assert!(directory.files[0].is_error(), "analyzer {name}");
        assert_eq!(
            directory.summary["error_count"],
            serde_json::json!(1),
            "analyzer {name}"
        );
    }
}

#[test]
fn scenario_fat_interface_burdens_both_implementations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.py");
    fs::write(
        &path,
        "\
class Device(ABC):
    def read(self): pass
    def write(self): pass
    def seek(self): pass
    def flush(self): pass
    def lock(self): pass
    def unlock(self): pass
    def stat(self): pass

class DiskDevice(Device):
    def read(self):
        return 1

class TapeDevice(Device):
    def read(self):
        return 2
",
    )
    .unwrap();

    let mut engine = engine();
    let composite = engine.analyze_file(&path).unwrap();

    let isp = file_report(&composite, "isp");
    assert_eq!(isp.entities.len(), 2);
    for implementation in &isp.entities {
        assert!((implementation.score - 0.9).abs() < 1e-9);
        assert_eq!(implementation.findings.len(), 1);
        assert_eq!(implementation.findings[0].kind, FindingKind::InterfaceTooLarge);
        assert!(implementation.findings[0].details.contains("Device"));
    }
}

#[test]
fn scenario_override_raising_new_exception() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("override.py");
    fs::write(
        &path,
        "\
class Storage:
    def save(self, item):
        return item

class StrictStorage(Storage):
    def save(self, item):
        if item is None:
            raise ValueError('item required')
        return item
",
    )
    .unwrap();

    let mut engine = engine();
    let composite = engine.analyze_file(&path).unwrap();

    let lsp = file_report(&composite, "lsp");
    let strict = lsp
        .entities
        .iter()
        .find(|e| e.name == "StrictStorage")
        .expect("StrictStorage entity");
    let raises: Vec<_> = strict
        .findings
        .iter()
        .filter(|f| f.kind == FindingKind::OverrideRaisesNewException)
        .collect();
    assert_eq!(raises.len(), 1);
}

#[test]
fn invariant_scores_stay_in_unit_interval() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mixed.py",
        "\
class Everything:
    def __init__(self):
        self.helper = Helper()

    def decide(self, value):
        if isinstance(value, int):
            return 1
        elif value == 'a':
            return 2
        elif value == 'b':
            return 3
        return 0

class Helper:
    def assist(self):
        return 1
",
    );
    write(dir.path(), "broken.py", "class Broken(:\n");

    let mut engine = engine();
    let composite = engine.analyze_directory(dir.path(), false).unwrap();

    assert!((0.0..=1.0).contains(&composite.overall_quality_score));
    for report in composite.analyzers.values() {
        for file in report.files() {
            assert!((0.0..=1.0).contains(&file.score));
            for entity in &file.entities {
                assert!((0.0..=1.0).contains(&entity.score));
                if entity.findings.is_empty() {
                    assert_eq!(entity.score, 1.0);
                }
                for finding in &entity.findings {
                    assert!((0.0..=1.0).contains(&finding.severity));
                }
            }
        }
    }
}

#[test]
fn invariant_directory_order_matches_sorted_enumeration() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["zeta.py", "alpha.py", "mid.py"] {
        write(dir.path(), name, "x = 2\n");
    }
    fs::create_dir(dir.path().join("pkg")).unwrap();
    write(&dir.path().join("pkg"), "inner.py", "y = 3\n");

    let mut engine = engine();
    let composite = engine.analyze_directory(dir.path(), false).unwrap();

    for report in composite.analyzers.values() {
        let directory = report.as_directory().unwrap();
        assert_eq!(directory.files.len(), 4);
        let names: Vec<_> = directory
            .files
            .iter()
            .map(|f| {
                f.file_path
                    .strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, vec!["alpha.py", "mid.py", "pkg/inner.py", "zeta.py"]);
    }
}

#[test]
fn invariant_reanalysis_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.py",
        "\
def alpha(value):
    total = value + 10
    total = total * 2
    total = total - 3
    return total
",
    );
    write(
        dir.path(),
        "b.py",
        "\
def beta(value):
    total = value + 10
    total = total * 2
    total = total - 3
    return total
",
    );

    let mut first_engine = engine();
    let first = first_engine.analyze_directory(dir.path(), false).unwrap();
    let mut second_engine = engine();
    let second = second_engine.analyze_directory(dir.path(), false).unwrap();
    assert_eq!(first, second);
}

#[test]
fn invariant_parallel_matches_sequential_for_stateless_analyzers() {
    let dir = tempfile::tempdir().unwrap();
    for idx in 0..6 {
        write(
            dir.path(),
            &format!("mod_{idx}.py"),
            &format!("def f{idx}(a, b):\n    if a and b:\n        return {idx}\n    return 0\n"),
        );
    }

    let mut config = PythiaConfig::default();
    config.enabled_analyzers = vec![
        AnalyzerKind::Srp,
        AnalyzerKind::Ocp,
        AnalyzerKind::Lsp,
        AnalyzerKind::Isp,
        AnalyzerKind::Dip,
        AnalyzerKind::Kiss,
    ];
    let mut sequential_engine = PythiaEngine::new(config.clone()).unwrap();
    let sequential = sequential_engine.analyze_directory(dir.path(), false).unwrap();
    let mut parallel_engine = PythiaEngine::new(config).unwrap();
    let parallel = parallel_engine.analyze_directory(dir.path(), true).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn invariant_composite_is_mean_of_present_scores() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = String::from("def long_one():\n");
    for idx in 0..23 {
        source.push_str(&format!("    v{idx} = {}\n", idx + 100));
    }
    source.push_str("    return 0\n");
    write(dir.path(), "long.py", &source);

    let mut engine = engine();
    let composite = engine.analyze_directory(dir.path(), false).unwrap();

    let scores: Vec<f64> = composite
        .analyzers
        .values()
        .filter_map(|report| report.overall_score())
        .collect();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    assert!((composite.overall_quality_score - mean).abs() < 1e-9);
    // The oversized function must actually drag the mean below 1.
    assert!(composite.overall_quality_score < 1.0);
}

#[test]
fn cache_round_trip_and_invalidation() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("src");
    fs::create_dir(&sources).unwrap();
    let path = sources.join("cached.py");
    fs::write(&path, "def v():\n    return 2\n").unwrap();

    let mut config = PythiaConfig::default();
    config.enabled_analyzers = vec![AnalyzerKind::Kiss];
    config.use_cache = true;
    config.cache_dir = dir.path().join("cache");

    let mut engine = PythiaEngine::new(config.clone()).unwrap();
    let first = engine.analyze_directory(&sources, false).unwrap();

    // A second engine must serve the identical record from the cache.
    let mut cached_engine = PythiaEngine::new(config.clone()).unwrap();
    let second = cached_engine.analyze_directory(&sources, false).unwrap();
    assert_eq!(first, second);

    // Touching the source afterwards invalidates the entry.
    std::thread::sleep(std::time::Duration::from_millis(50));
    let mut grown = String::from("def v(a, b, c, d, e, f, g):\n");
    for idx in 0..25 {
        grown.push_str(&format!("    w{idx} = {}\n", idx + 50));
    }
    grown.push_str("    return 0\n");
    fs::write(&path, grown).unwrap();

    let mut fresh_engine = PythiaEngine::new(config).unwrap();
    let third = fresh_engine.analyze_directory(&sources, false).unwrap();
    assert_ne!(first, third);
    let kiss = match &third.analyzers["kiss"] {
        AnalyzerReport::Directory(d) => d,
        AnalyzerReport::File(_) => unreachable!(),
    };
    assert!(kiss.files[0]
        .findings()
        .any(|f| f.kind == FindingKind::TooManyParameters));
}

#[test]
fn reports_render_in_all_three_formats() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "m.py", "def tiny():\n    return 2\n");

    let mut engine = engine();
    engine.analyze_directory(dir.path(), false).unwrap();

    let text = engine.generate_report(ReportFormat::Text, None).unwrap();
    assert!(text.starts_with("===== CODE QUALITY ANALYSIS REPORT ====="));
    assert!(text.contains("Overall Quality Score: 1.00/1.00"));

    let json = engine.generate_report(ReportFormat::Json, None).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["overall_quality_score"], serde_json::json!(1.0));

    let output = dir.path().join("report.html");
    let html = engine
        .generate_report(ReportFormat::Html, Some(&output))
        .unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
    assert_eq!(fs::read_to_string(&output).unwrap(), html);
}
