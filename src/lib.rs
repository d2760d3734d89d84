//! # Pythia-RS: Multi-Principle Code Quality Engine
//!
//! A static analysis engine for Python source that scores code against seven
//! design principles:
//!
//! - **SOLID**: Single Responsibility, Open/Closed, Liskov Substitution,
//!   Interface Segregation, Dependency Inversion
//! - **Simplicity**: cyclomatic/cognitive complexity, nesting and size limits
//! - **Duplication**: cross-file duplicate blocks, repeated literals
//!
//! Every analyzer produces per-entity findings and a score in `[0, 1]`; the
//! engine composes them into a single quality record rendered as text, JSON,
//! or a self-contained HTML report.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       API Layer                            │
//! ├────────────────────────────────────────────────────────────┤
//! │  Core          │  Analyzers   │  Language   │  I/O         │
//! │                │              │             │              │
//! │ • Errors       │ • SRP/OCP    │ • Loader    │ • Cache      │
//! │ • Config       │ • LSP/ISP    │ • AST       │ • Reports    │
//! │ • Results      │ • DIP        │   services  │              │
//! │                │ • KISS/DRY   │             │              │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pythia_rs::{PythiaConfig, PythiaEngine};
//! use pythia_rs::io::reports::ReportFormat;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = PythiaEngine::new(PythiaConfig::default())?;
//!     engine.analyze_directory("./src", false)?;
//!     println!("{}", engine.generate_report(ReportFormat::Text, None)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// Core data structures and configuration
pub mod core {
    //! Errors, configuration, and the analysis result model.

    pub mod config;
    pub mod errors;
    pub mod results;
}

// Python source loading and AST services
pub mod lang {
    //! Python source loading and shared AST helpers.

    pub mod ast_utils;
    pub mod python;
}

// The analyzer framework and the seven principle analyzers
pub mod analyzers;

// Caching and report generation
pub mod io {
    //! Result caching and report rendering.

    pub mod cache;
    pub mod reports;
}

// Public engine interface
pub mod api {
    //! High-level engine facade consumed by the CLI and other adapters.

    pub mod engine;
}

// Re-export primary types for convenience
pub use api::engine::PythiaEngine;
pub use core::config::PythiaConfig;
pub use core::errors::{PythiaError, Result};
pub use core::results::{CompositeResult, DirectoryAnalysis, FileAnalysis, Finding};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
