//! Configuration parsing, resolution and validation
//!
//! This module handles discovery and parsing of assetrun.yml project files, template
//! resolution, and the immutable `Project` value built from them.

pub mod parse;
pub mod project;
pub mod resolve;
pub mod schema;
pub mod types;
pub mod version;

// Re-export main types
pub use parse::*;
pub use project::{Project, WatchRuleSpec};
pub use resolve::{placeholders, resolve, resolve_all, resolve_list, resolve_map};
pub use schema::*;
pub use types::*;
pub use version::VersionRecord;
