//! assetrun - a declarative build and deploy orchestrator for front-end asset libraries
//!
//! A project file (`assetrun.yml`) declares settings, leaf actions bound to external
//! tools, and named operations that group them. assetrun expands an operation into an
//! ordered plan, skips actions whose outputs are current, and can keep rebuilding on
//! file changes.

// Public modules
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod pipeline;
pub mod release;
pub mod runner;
pub mod tools;
pub mod watch;

// Re-export commonly used types
pub use error::{AssetRunError, ErrorKind, Result};

/// Current version of assetrun
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
