//! Script stage: bundle → lint

use crate::config::Project;
use crate::error::Result;
use crate::pipeline::{banner_for, destination, lint as run_lint, require_sources, with_banner, write_text};
use crate::runner::LeafAction;
use crate::tools::{Toolbox, Violation};

/// Bundle ordered sources into a readable (first dest) and a minified (second dest) file
pub fn bundle(project: &Project, action: &LeafAction, tools: &Toolbox) -> Result<()> {
    let sources = require_sources(project, action)?;
    let plain_dest = destination(project, action, 0)?;
    let min_dest = destination(project, action, 1)?;

    let bundled = tools.bundler.bundle(&sources, &action.options)?;
    let banner = banner_for(project, action);
    write_text(&plain_dest, &with_banner(banner, &bundled.plain))?;
    write_text(&min_dest, &with_banner(banner, &bundled.minified))?;
    tracing::debug!(
        "Bundled {} file(s) -> {}, {}",
        sources.len(),
        plain_dest.display(),
        min_dest.display()
    );
    Ok(())
}

/// Lint script sources
pub fn lint(project: &Project, action: &LeafAction, tools: &Toolbox) -> Result<Vec<Violation>> {
    run_lint(project, action, tools.script_linter.as_ref(), "script_lint")
}
