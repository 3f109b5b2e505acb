//! Core library for inspecting shipped Android builds of a Unity game:
//! bundle/asset parsing, script-name resolution, and evidence fusion over
//! the recovered structural, textual, and manifest signals.

pub mod asset;
pub mod bundle;
pub mod compression;
pub mod config;
pub mod container;
pub mod driver;
pub mod error;
pub mod evidence;
pub mod reader;
pub mod report;
pub mod scan;
pub mod script_resolver;
pub mod transport;

pub use config::AnalyzerConfig;
pub use driver::Analyzer;
pub use error::{AnalyzerError, Result};
pub use report::AnalysisResult;

#[cfg(feature = "async")]
pub use driver::analyze_blocking;
