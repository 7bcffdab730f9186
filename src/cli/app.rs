//! Main CLI application

use crate::config::{load_dotenv, find_config_file, parse_config_file, validate_config, Project};
use crate::error::AssetRunError;
use crate::runner::{Executor, RunOptions, Shutdown, TaskRegistry};
use crate::tools::Toolbox;
use anyhow::Context as _;
use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    fn level(self) -> &'static str {
        match self {
            Verbosity::Silent => "error",
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Resolved project
    project: Arc<Project>,
    /// Tasks of the project
    registry: Arc<TaskRegistry>,
    /// Config file path
    config_path: PathBuf,
}

impl App {
    /// Create a new app, searching for the project file from the working directory
    pub fn new() -> Result<Self, AssetRunError> {
        Self::with_config_file(find_config_file()?)
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self, AssetRunError> {
        load_dotenv(&path);
        let config = parse_config_file(&path)?;
        let project = Project::load(config, &path)?;
        let registry = TaskRegistry::from_project(&project);
        validate_config(&project, &registry)?;

        let command = build_command(&project, &registry);

        Ok(App {
            command,
            project: Arc::new(project),
            registry: Arc::new(registry),
            config_path: path,
        })
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Run the application with the process arguments
    pub fn run(self) -> anyhow::Result<()> {
        self.run_from(std::env::args())
    }

    /// Run the application with explicit arguments
    pub fn run_from<I, T>(mut self, args: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = self.command.clone().get_matches_from(args);
        let verbosity = get_verbosity(&matches);

        if let Some(shell) = matches.get_one::<Shell>("completions") {
            let name = self.command.get_name().to_string();
            generate(*shell, &mut self.command, name, &mut io::stdout());
            return Ok(());
        }

        if matches.get_flag("list") {
            self.print_operations();
            return Ok(());
        }

        // Check if an operation was specified
        let operation = match matches.subcommand_name() {
            Some(name) => name.to_string(),
            None => {
                // No operation specified, show help
                self.command.print_help()?;
                println!();
                return Ok(());
            }
        };

        let shutdown = Shutdown::new();
        {
            let shutdown = shutdown.clone();
            ctrlc::set_handler(move || shutdown.trigger())
                .context("Failed to install Ctrl-C handler")?;
        }

        let options = RunOptions {
            fail_fast: !matches.get_flag("keep-going"),
            dry_run: matches.get_flag("dry-run"),
        };
        let executor = Executor::new(
            Arc::clone(&self.project),
            Arc::clone(&self.registry),
            Toolbox::shell(&self.project),
        )
        .with_options(options)
        .with_force(matches.get_flag("force"))
        .with_shutdown(shutdown);

        tracing::debug!(
            "Running '{}' from {}",
            operation,
            self.config_path.display()
        );
        let report = executor.run_operation(&operation)?;

        if matches.get_flag("json") {
            println!("{}", report.to_json()?);
        } else if verbosity > Verbosity::Silent {
            report.print_summary();
        }

        report.into_result()?;
        Ok(())
    }

    /// Print the named operations with their usage
    fn print_operations(&self) {
        println!("{}", self.project.display_name().bold());
        let width = self
            .registry
            .operations()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);
        for (name, node) in self.registry.operations() {
            let padded = format!("{:<width$}", name, width = width);
            println!("  {}  {}", padded.cyan(), node.usage().unwrap_or_default());
        }
    }
}

/// Build the clap command from the project's operations
fn build_command(project: &Project, registry: &TaskRegistry) -> Command {
    let mut cmd = Command::new("assetrun")
        .version(env!("CARGO_PKG_VERSION"))
        .about(project.usage.clone().unwrap_or_else(|| {
            format!("Build and deploy tasks for {}", project.display_name())
        }))
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to assetrun.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print warnings and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print errors only")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Show which actions would run without running them")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .help("Run every action even if its outputs are up to date")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("keep-going")
                .long("keep-going")
                .help("Keep running after an action fails")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the run report as JSON")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List operations")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Generate shell completions")
                .value_parser(clap::value_parser!(Shell)),
        );

    // One subcommand per public task
    for (name, node) in registry.operations() {
        let about = node.usage().map(str::to_string).unwrap_or_default();
        cmd = cmd.subcommand(Command::new(name.to_string()).about(about));
    }

    cmd
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Verbosity from raw arguments; logging starts before the project is loaded
fn extract_verbosity(args: &[String]) -> Verbosity {
    let has = |short: &str, long: &str| args.iter().any(|a| a == short || a == long);
    if has("-s", "--silent") {
        Verbosity::Silent
    } else if has("-q", "--quiet") {
        Verbosity::Quiet
    } else if has("-v", "--verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the verbosity flags
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("assetrun={}", verbosity.level())));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .try_init();
}

/// Run the CLI application with the process arguments
pub fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    init_tracing(extract_verbosity(&args));

    // The file flag has to be known before clap parsing
    let file_path = extract_file_arg(&args);

    let app = if let Some(path) = file_path {
        App::with_config_file(path.clone())
            .with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        App::new()?
    };

    app.run_from(args)
}

/// Extract --file argument before clap parsing
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if (args[i] == "--file" || args[i] == "-f") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
        if let Some(path) = args[i].strip_prefix("--file=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
