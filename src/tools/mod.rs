//! External tool capabilities
//!
//! The orchestrator never compiles, lints or minifies anything itself. Each external
//! collaborator is reached through one of the traits below, gathered in a `Toolbox`.
//! `ShellTools` backs every trait with the command templates from the project file;
//! tests swap in their own implementations.

pub mod shell;

use crate::config::{Project, ServeConfig};
use crate::error::ToolResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use shell::{ShellLinter, ShellTools};

/// Options passed through from a leaf action
pub type ToolOptions = BTreeMap<String, String>;

/// Which kind of asset a text belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Style,
    Script,
}

/// A single linter finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub message: String,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Violation {
            message: message.into(),
        }
    }
}

/// Output of a bundler: the same sources, readable and minified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundled {
    pub plain: String,
    pub minified: String,
}

/// Style compiler: entry file of a source tree to stylesheet text
pub trait Compile: Send + Sync {
    fn compile(&self, entry: &Path, options: &ToolOptions) -> ToolResult<String>;
}

/// Linter: files to a list of violations
pub trait Lint: Send + Sync {
    fn lint(&self, files: &[PathBuf], options: &ToolOptions) -> ToolResult<Vec<Violation>>;
}

/// Minifier: text to minified text
pub trait Minify: Send + Sync {
    fn minify(&self, text: &str, kind: AssetKind, options: &ToolOptions) -> ToolResult<String>;
}

/// Script bundler: ordered sources to a readable and a minified concatenation
pub trait Bundle: Send + Sync {
    fn bundle(&self, sources: &[PathBuf], options: &ToolOptions) -> ToolResult<Bundled>;
}

/// Documentation generator: source tree to a static site tree
pub trait GenerateDocs: Send + Sync {
    fn generate_docs(&self, src: &Path, dest: &Path, options: &ToolOptions) -> ToolResult<()>;
}

/// Static file server
pub trait Serve: Send + Sync {
    fn serve(&self, root: &Path, options: &ServeConfig) -> ToolResult<Box<dyn ServerHandle>>;
}

/// A running server; stopping it is the only way it ends
pub trait ServerHandle: Send {
    fn address(&self) -> String;
    fn stop(self: Box<Self>) -> ToolResult<()>;
}

/// Version control and publishing steps that follow a version bump
pub trait VersionControl: Send + Sync {
    fn commit(&self, message: &str) -> ToolResult<()>;
    fn tag(&self, name: &str, message: &str) -> ToolResult<()>;
    fn push(&self) -> ToolResult<()>;
    fn push_tags(&self) -> ToolResult<()>;
    fn publish(&self) -> ToolResult<()>;
}

/// Arbitrary command execution
pub trait Exec: Send + Sync {
    fn exec(&self, command: &str, cwd: &Path) -> ToolResult<()>;
}

/// Every capability the pipeline consumes
#[derive(Clone)]
pub struct Toolbox {
    pub compiler: Arc<dyn Compile>,
    pub style_linter: Arc<dyn Lint>,
    pub minifier: Arc<dyn Minify>,
    pub bundler: Arc<dyn Bundle>,
    pub script_linter: Arc<dyn Lint>,
    pub docs: Arc<dyn GenerateDocs>,
    pub server: Arc<dyn Serve>,
    pub vcs: Arc<dyn VersionControl>,
    pub exec: Arc<dyn Exec>,
}

impl Toolbox {
    /// Back every capability with the project's shell commands
    pub fn shell(project: &Project) -> Self {
        let shell = Arc::new(ShellTools::new(project));
        Toolbox {
            compiler: shell.clone(),
            style_linter: Arc::new(ShellLinter::style(shell.clone())),
            minifier: shell.clone(),
            bundler: shell.clone(),
            script_linter: Arc::new(ShellLinter::script(shell.clone())),
            docs: shell.clone(),
            server: shell.clone(),
            vcs: shell.clone(),
            exec: shell,
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn Compile>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_style_linter(mut self, linter: Arc<dyn Lint>) -> Self {
        self.style_linter = linter;
        self
    }

    pub fn with_minifier(mut self, minifier: Arc<dyn Minify>) -> Self {
        self.minifier = minifier;
        self
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn Bundle>) -> Self {
        self.bundler = bundler;
        self
    }

    pub fn with_script_linter(mut self, linter: Arc<dyn Lint>) -> Self {
        self.script_linter = linter;
        self
    }

    pub fn with_docs(mut self, docs: Arc<dyn GenerateDocs>) -> Self {
        self.docs = docs;
        self
    }

    pub fn with_server(mut self, server: Arc<dyn Serve>) -> Self {
        self.server = server;
        self
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_exec(mut self, exec: Arc<dyn Exec>) -> Self {
        self.exec = exec;
        self
    }
}
