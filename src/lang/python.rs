//! Python source loading.
//!
//! Centralizes file reading (tolerant of UTF-8 and Latin-1), parsing into the
//! typed Python AST, and deterministic enumeration of source files under a
//! directory root.

use std::fs;
use std::path::{Path, PathBuf};

use rustpython_parser::ast;
use rustpython_parser::{parse, Mode};
use tracing::warn;
use walkdir::WalkDir;

use crate::core::errors::{PythiaError, Result};
use crate::lang::ast_utils::LineIndex;

/// File suffix recognized as Python source.
pub const PYTHON_SUFFIX: &str = "py";

/// A loaded source file: raw content plus its parsed module body.
///
/// Both representations are kept because the detectors need raw-line access
/// (slicing bodies, normalizing windows) as well as structural traversal.
#[derive(Debug)]
pub struct SourceUnit {
    /// Path the unit was loaded from.
    pub path: PathBuf,
    /// Raw decoded file content.
    pub content: String,
    /// Top-level statements of the parsed module.
    pub suite: Vec<ast::Stmt>,
    /// Byte-offset to line-number index over `content`.
    pub lines: LineIndex,
}

impl SourceUnit {
    /// Read and parse a Python file into a source unit.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_source(path)?;
        let suite = parse_source(&content, path)?;
        let lines = LineIndex::new(&content);
        Ok(Self {
            path: path.to_path_buf(),
            content,
            suite,
            lines,
        })
    }

    /// Build a unit from in-memory source, parsing it under the given path.
    pub fn from_source(path: &Path, content: &str) -> Result<Self> {
        let suite = parse_source(content, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            content: content.to_string(),
            suite,
            lines: LineIndex::new(content),
        })
    }
}

/// Read a source file, attempting UTF-8 first and Latin-1 on decode failure.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .map_err(|err| PythiaError::file(path.display().to_string(), err.to_string()))?;

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(err) => {
            warn!(
                "File {} is not valid UTF-8, falling back to Latin-1",
                path.display()
            );
            // Latin-1 maps every byte to the code point of the same value.
            Ok(err.into_bytes().iter().map(|&b| b as char).collect())
        }
    }
}

/// Parse decoded source into the module's statement list.
pub fn parse_source(content: &str, path: &Path) -> Result<Vec<ast::Stmt>> {
    let source_path = path.display().to_string();
    match parse(content, Mode::Module, &source_path) {
        Ok(ast::Mod::Module(module)) => Ok(module.body),
        Ok(_) => Err(PythiaError::parse(
            source_path,
            "source did not parse as a module",
            None,
        )),
        Err(err) => {
            let line = LineIndex::new(content).line_of(err.offset.to_usize());
            Err(PythiaError::parse(source_path, err.to_string(), Some(line)))
        }
    }
}

/// Enumerate every Python file under `root`, in sorted path order.
///
/// Sorting makes directory analysis deterministic: results are produced and
/// reported in exactly this order. Unreadable subtrees are skipped with a
/// warning rather than aborting the walk.
pub fn enumerate_python_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(PythiaError::file(
            root.display().to_string(),
            "path does not exist",
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().is_some_and(|ext| ext == PYTHON_SUFFIX)
                {
                    files.push(path.to_path_buf());
                }
            }
            Err(err) => warn!("Skipping unreadable entry under {}: {err}", root.display()),
        }
    }

    files.sort();
    Ok(files)
}
