//! Plan execution
//!
//! The executor walks a plan strictly in order on the calling thread. Each action is
//! checked against the incremental filter, dispatched to its pipeline, packaging or
//! release step, and recorded in the run report. Under fail-fast the first failure
//! ends the plan; otherwise the remaining actions still run and the report carries
//! every failure.

use crate::config::{ActionKind, Project};
use crate::deploy;
use crate::error::{AssetRunError, ConfigError, FsError, Result};
use crate::pipeline::{self, script, style};
use crate::release::{self, BumpStrategy};
use crate::runner::incremental::IncrementalFilter;
use crate::runner::registry::{LeafAction, Plan, TaskRegistry};
use crate::runner::report::{ActionResult, Outcome, RunReport};
use crate::runner::shutdown::Shutdown;
use crate::tools::{ServerHandle, Toolbox};
use crate::watch::{RuleRunner, WatchRule, WatchSession};
use std::fs;
use std::sync::Arc;
use std::time::Instant;

/// Execution switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop at the first failing action
    pub fail_fast: bool,
    /// Report what would run without running anything
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            fail_fast: true,
            dry_run: false,
        }
    }
}

/// Runs plans against a project
#[derive(Clone)]
pub struct Executor {
    project: Arc<Project>,
    registry: Arc<TaskRegistry>,
    tools: Toolbox,
    filter: IncrementalFilter,
    shutdown: Shutdown,
    options: RunOptions,
}

impl Executor {
    pub fn new(project: Arc<Project>, registry: Arc<TaskRegistry>, tools: Toolbox) -> Self {
        let filter = IncrementalFilter::new(&project);
        Executor {
            project,
            registry,
            tools,
            filter,
            shutdown: Shutdown::new(),
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Ignore the incremental filter and run every action
    pub fn with_force(mut self, force: bool) -> Self {
        self.filter = self.filter.with_enabled(!force);
        self
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Expand a named operation and run it
    pub fn run_operation(&self, name: &str) -> Result<RunReport> {
        let plan = self.registry.expand(name)?;
        Ok(self.run(&plan))
    }

    /// Run a plan; failures are recorded in the report, never raised
    pub fn run(&self, plan: &Plan) -> RunReport {
        let mut report = RunReport::new(&plan.operation);
        let mut servers: Vec<Box<dyn ServerHandle>> = Vec::new();

        tracing::debug!("Plan for {}: {}", plan.operation, plan.names().join(", "));

        for (index, action) in plan.actions.iter().enumerate() {
            if self.shutdown.is_triggered() {
                report.abort(remaining(plan, index));
                break;
            }

            let decision = self.filter.decide(action);
            if !decision.should_run() {
                tracing::debug!("Skipping {}: {}", action.name, decision.reason());
                report.push(
                    ActionResult::new(&action.name, action.kind, Outcome::UpToDate)
                        .with_reason(decision.reason()),
                );
                continue;
            }

            if self.options.dry_run {
                tracing::info!("[DRY RUN] would run {} ({})", action.name, decision.reason());
                report.push(
                    ActionResult::new(&action.name, action.kind, Outcome::WouldRun)
                        .with_reason(decision.reason()),
                );
                continue;
            }

            tracing::info!("Running {} ({})", action.name, action.kind);
            let started = Instant::now();
            match self.dispatch(action, &mut servers) {
                Ok(()) => {
                    self.write_stamp(action);
                    report.push(
                        ActionResult::new(&action.name, action.kind, Outcome::Ran)
                            .with_duration(started.elapsed()),
                    );
                }
                Err(e) => {
                    tracing::error!("{} failed: {}", action.name, e);
                    report.push(
                        ActionResult::new(&action.name, action.kind, Outcome::Failed)
                            .with_duration(started.elapsed())
                            .with_error(&e),
                    );
                    if self.options.fail_fast {
                        report.abort(remaining(plan, index + 1));
                        break;
                    }
                }
            }
        }

        for server in servers {
            let address = server.address();
            if let Err(e) = server.stop() {
                tracing::warn!("Failed to stop server at {}: {}", address, e);
            }
        }

        report
    }

    fn dispatch(&self, action: &LeafAction, servers: &mut Vec<Box<dyn ServerHandle>>) -> Result<()> {
        let project = self.project.as_ref();
        let tools = &self.tools;

        match action.kind {
            ActionKind::Clean => {
                let removed = deploy::clean(project, &action.src)?;
                tracing::debug!("Removed {} path(s)", removed);
            }
            ActionKind::Compile => style::compile(project, action, tools)?,
            ActionKind::StyleLint => {
                style::lint(project, action, tools)?;
            }
            ActionKind::Minify => style::minify(project, action, tools)?,
            ActionKind::Bundle => script::bundle(project, action, tools)?,
            ActionKind::ScriptLint => {
                script::lint(project, action, tools)?;
            }
            ActionKind::Docs => {
                let src = action
                    .src
                    .first()
                    .map(|s| project.path(s))
                    .filter(|p| p.exists())
                    .ok_or_else(|| FsError::MissingSource(action.src.join(", ")))?;
                let dest = pipeline::destination(project, action, 0)?;
                tools.docs.generate_docs(&src, &dest, &action.options)?;
            }
            ActionKind::Exec => {
                let command = required_option(action, "command")?;
                let cwd = action
                    .option("cwd")
                    .map(|dir| project.path(dir))
                    .unwrap_or_else(|| project.root.clone());
                tools.exec.exec(command, &cwd)?;
            }
            ActionKind::PackageDist => {
                let dist = project.path(action.src.first().map(String::as_str).unwrap_or("dist"));
                deploy::package_dist(&dist, &project.package)?;
            }
            ActionKind::ArchiveDocs => {
                deploy::archive_docs(project)?;
            }
            ActionKind::Rewrite => {
                let set = required_option(action, "rules")?;
                deploy::rewrite_set(project, set)?;
            }
            ActionKind::Release => {
                let strategy = action
                    .option("strategy")
                    .map(str::parse::<BumpStrategy>)
                    .transpose()?
                    .unwrap_or_default();
                let version = release::run_release(project, strategy, tools.vcs.as_ref())?;
                tracing::info!("Released version {}", version);
            }
            ActionKind::Serve => self.serve(action, servers)?,
            ActionKind::Watch => self.watch()?,
        }
        Ok(())
    }

    /// Start the static server; with keep-alive it blocks until shutdown, otherwise
    /// it runs until the plan ends
    fn serve(&self, action: &LeafAction, servers: &mut Vec<Box<dyn ServerHandle>>) -> Result<()> {
        let project = self.project.as_ref();
        let mut options = project.serve.clone();
        if let Some(keep_alive) = action.flag("keep_alive") {
            options.keep_alive = keep_alive;
        }
        if let Some(port) = action.option("port") {
            options.port = port.parse().map_err(|_| {
                ConfigError::Invalid(format!("Task '{}': invalid port '{}'", action.name, port))
            })?;
        }
        let root = project.path(action.src.first().unwrap_or(&options.root));

        let server = self.tools.server.serve(&root, &options)?;
        tracing::info!("Serving {} at {}", root.display(), server.address());

        if options.keep_alive {
            self.shutdown.wait();
            server.stop()?;
        } else {
            servers.push(server);
        }
        Ok(())
    }

    /// Watch the project's rules until shutdown
    fn watch(&self) -> Result<()> {
        let rules = WatchRule::from_project(&self.project)?;
        if rules.is_empty() {
            return Err(ConfigError::Invalid("No watch rules configured".to_string()).into());
        }

        let runner: Arc<dyn RuleRunner> = Arc::new(self.clone());
        let mut session = WatchSession::spawn(rules, runner);
        if let Err(e) = session.watch_fs() {
            session.stop();
            return Err(e.into());
        }
        tracing::info!("Watching for changes. Press Ctrl-C to stop.");
        session.wait(&self.shutdown);
        Ok(())
    }

    fn write_stamp(&self, action: &LeafAction) {
        if !action.incremental || !action.dest.is_empty() {
            return;
        }
        let stamp = self.filter.stamp_path(action);
        let write = || -> std::io::Result<()> {
            if let Some(parent) = stamp.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&stamp, b"")
        };
        if let Err(e) = write() {
            tracing::warn!("Failed to write stamp {}: {}", stamp.display(), e);
        }
    }
}

impl RuleRunner for Executor {
    fn run_rule(&self, _rule: &str, tasks: &[String]) -> Result<()> {
        for task in tasks {
            let report = self.run_operation(task)?;
            report.into_result()?;
        }
        Ok(())
    }
}

fn remaining(plan: &Plan, from: usize) -> impl Iterator<Item = (&str, ActionKind)> {
    plan.actions[from..]
        .iter()
        .map(|action| (action.name.as_str(), action.kind))
}

fn required_option<'a>(action: &'a LeafAction, key: &str) -> Result<&'a str> {
    action.option(key).ok_or_else(|| {
        AssetRunError::from(ConfigError::Invalid(format!(
            "Task '{}' needs options.{}",
            action.name, key
        )))
    })
}
