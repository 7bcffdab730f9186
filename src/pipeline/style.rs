//! Style stage: compile → lint → minify

use crate::config::Project;
use crate::error::{FsError, Result};
use crate::pipeline::{
    banner_for, destination, lint as run_lint, read_text, require_sources, with_banner,
    write_text,
};
use crate::runner::LeafAction;
use crate::tools::{AssetKind, Toolbox, Violation};

/// Compile the entry file (first source) into the first destination
///
/// Remaining sources only take part in the incremental check (partials, includes).
pub fn compile(project: &Project, action: &LeafAction, tools: &Toolbox) -> Result<()> {
    let entry_pattern = action
        .src
        .first()
        .ok_or_else(|| FsError::MissingSource(format!("task '{}' has no source", action.name)))?;
    let entry = project.path(entry_pattern);
    if !entry.is_file() {
        return Err(FsError::MissingSource(entry.display().to_string()).into());
    }
    let dest = destination(project, action, 0)?;

    let stylesheet = tools.compiler.compile(&entry, &action.options)?;
    write_text(&dest, &stylesheet)?;
    tracing::debug!("Compiled {} -> {}", entry.display(), dest.display());
    Ok(())
}

/// Lint compiled stylesheets
pub fn lint(project: &Project, action: &LeafAction, tools: &Toolbox) -> Result<Vec<Violation>> {
    run_lint(project, action, tools.style_linter.as_ref(), "style_lint")
}

/// Minify stylesheets into the first destination, prefixed with the banner
pub fn minify(project: &Project, action: &LeafAction, tools: &Toolbox) -> Result<()> {
    let sources = require_sources(project, action)?;
    let dest = destination(project, action, 0)?;

    let text = sources
        .iter()
        .map(|path| read_text(path))
        .collect::<Result<Vec<_>>>()?
        .join("\n");

    let minified = tools.minifier.minify(&text, AssetKind::Style, &action.options)?;
    write_text(&dest, &with_banner(banner_for(project, action), &minified))?;
    tracing::debug!("Minified {} file(s) -> {}", sources.len(), dest.display());
    Ok(())
}
