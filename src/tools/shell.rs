//! Shell-backed tools
//!
//! Every capability runs a command template from the `tools` section through the
//! project interpreter (`sh -c` by default). Templates see the project settings, the
//! action options and per-call variables such as `${src}`, `${dest}` and `${files}`.

use crate::config::{resolve, Project, ServeConfig, ToolsConfig};
use crate::error::{ToolError, ToolResult};
use crate::tools::{
    AssetKind, Bundle, Bundled, Compile, Exec, GenerateDocs, Lint, Minify, Serve,
    ServerHandle, ToolOptions, VersionControl, Violation,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, Stdio};
use std::sync::Arc;
use std::thread;

/// Quote a value for a POSIX shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn quote_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| shell_quote(&p.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs tool commands through the project interpreter
#[derive(Debug, Clone)]
pub struct ShellTools {
    root: PathBuf,
    interpreter: Vec<String>,
    settings: BTreeMap<String, String>,
    tools: ToolsConfig,
}

impl ShellTools {
    pub fn new(project: &Project) -> Self {
        ShellTools {
            root: project.root.clone(),
            interpreter: project.interpreter.clone(),
            settings: project.settings.clone(),
            tools: project.tools.clone(),
        }
    }

    /// Expand a command template with settings, options and call variables
    fn render(
        &self,
        tool: &str,
        template: &str,
        options: &ToolOptions,
        vars: &[(&str, String)],
    ) -> ToolResult<String> {
        let mut all = self.settings.clone();
        all.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        all.extend(vars.iter().map(|(k, v)| (k.to_string(), v.clone())));
        resolve(template, &all).map_err(|e| ToolError::Failed {
            tool: tool.to_string(),
            message: e.to_string(),
        })
    }

    fn command_for<'a>(&self, tool: &str, template: Option<&'a String>) -> ToolResult<&'a str> {
        template
            .map(String::as_str)
            .ok_or_else(|| ToolError::NotConfigured(tool.to_string()))
    }

    fn build(&self, command_line: &str, cwd: &Path) -> StdCommand {
        // Project::new rejects an empty interpreter; fall back to sh -c regardless
        let (program, args) = match self.interpreter.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => ("sh".to_string(), vec!["-c".to_string()]),
        };
        let mut command = StdCommand::new(program);
        command.args(args);
        command.arg(command_line);
        command.current_dir(cwd);
        command
    }

    /// Run a command and capture stdout; non-zero exit is a tool failure
    fn capture(&self, tool: &str, command_line: &str, stdin: Option<&str>) -> ToolResult<String> {
        let (code, stdout, stderr) = self.capture_raw(tool, command_line, stdin)?;
        if code != Some(0) {
            return Err(failure(tool, code, &stderr, &stdout));
        }
        Ok(stdout)
    }

    fn capture_raw(
        &self,
        tool: &str,
        command_line: &str,
        stdin: Option<&str>,
    ) -> ToolResult<(Option<i32>, String, String)> {
        tracing::debug!("[{}] {}", tool, command_line);

        let mut command = self.build(command_line, &self.root);
        command
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| ToolError::Spawn {
            tool: tool.to_string(),
            error: e.to_string(),
        })?;

        // Feed stdin from a separate thread so a chatty tool cannot deadlock on a full pipe
        let writer = match (stdin, child.stdin.take()) {
            (Some(text), Some(mut pipe)) => {
                let text = text.to_string();
                Some(thread::spawn(move || pipe.write_all(text.as_bytes())))
            }
            _ => None,
        };

        let output = child.wait_with_output().map_err(|e| ToolError::Spawn {
            tool: tool.to_string(),
            error: e.to_string(),
        })?;
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        Ok((
            output.status.code(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }

    /// Run a command with inherited stdio
    fn run(&self, tool: &str, command_line: &str, cwd: &Path) -> ToolResult<()> {
        tracing::info!("[RUN] {}", command_line);

        let status = self
            .build(command_line, cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| ToolError::Spawn {
                tool: tool.to_string(),
                error: e.to_string(),
            })?;

        if !status.success() {
            return Err(ToolError::Failed {
                tool: tool.to_string(),
                message: format!("exited with code {:?}", status.code()),
            });
        }
        Ok(())
    }

    fn lint_with(
        &self,
        tool: &str,
        template: Option<&String>,
        files: &[PathBuf],
        options: &ToolOptions,
    ) -> ToolResult<Vec<Violation>> {
        let template = self.command_for(tool, template)?;
        let command_line = self.render(tool, template, options, &[("files", quote_paths(files))])?;
        let (code, stdout, stderr) = self.capture_raw(tool, &command_line, None)?;

        let violations: Vec<Violation> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Violation::new)
            .collect();

        // Linters commonly exit non-zero when they report findings; only a silent failure
        // means the linter itself broke
        if code != Some(0) && violations.is_empty() {
            return Err(failure(tool, code, &stderr, &stdout));
        }
        Ok(violations)
    }
}

fn failure(tool: &str, code: Option<i32>, stderr: &str, stdout: &str) -> ToolError {
    let detail = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    ToolError::Failed {
        tool: tool.to_string(),
        message: if detail.is_empty() {
            format!("exited with code {:?}", code)
        } else {
            format!("exited with code {:?}: {}", code, detail)
        },
    }
}

impl Compile for ShellTools {
    fn compile(&self, entry: &Path, options: &ToolOptions) -> ToolResult<String> {
        let template = self.command_for("compile", self.tools.compile.as_ref())?;
        let command_line = self.render(
            "compile",
            template,
            options,
            &[("entry", shell_quote(&entry.to_string_lossy()))],
        )?;
        self.capture("compile", &command_line, None)
    }
}

impl Minify for ShellTools {
    fn minify(&self, text: &str, kind: AssetKind, options: &ToolOptions) -> ToolResult<String> {
        let template = self.command_for("minify", self.tools.minify.as_ref())?;
        let kind = match kind {
            AssetKind::Style => "style",
            AssetKind::Script => "script",
        };
        let command_line =
            self.render("minify", template, options, &[("kind", kind.to_string())])?;
        self.capture("minify", &command_line, Some(text))
    }
}

impl Bundle for ShellTools {
    fn bundle(&self, sources: &[PathBuf], options: &ToolOptions) -> ToolResult<Bundled> {
        let files = [("files", quote_paths(sources))];

        let plain_template = self.command_for("bundle", self.tools.bundle.as_ref())?;
        let plain_command = self.render("bundle", plain_template, options, &files)?;
        let plain = self.capture("bundle", &plain_command, None)?;

        let min_template = self.command_for("bundle_min", self.tools.bundle_min.as_ref())?;
        let min_command = self.render("bundle_min", min_template, options, &files)?;
        let minified = self.capture("bundle_min", &min_command, None)?;

        Ok(Bundled { plain, minified })
    }
}

impl GenerateDocs for ShellTools {
    fn generate_docs(&self, src: &Path, dest: &Path, options: &ToolOptions) -> ToolResult<()> {
        let template = self.command_for("docs", self.tools.docs.as_ref())?;
        let command_line = self.render(
            "docs",
            template,
            options,
            &[
                ("src", shell_quote(&src.to_string_lossy())),
                ("dest", shell_quote(&dest.to_string_lossy())),
            ],
        )?;
        self.capture("docs", &command_line, None).map(|_| ())
    }
}

impl Exec for ShellTools {
    fn exec(&self, command: &str, cwd: &Path) -> ToolResult<()> {
        self.run("exec", command, cwd)
    }
}

impl VersionControl for ShellTools {
    fn commit(&self, message: &str) -> ToolResult<()> {
        let command_line = self.render(
            "commit",
            &self.tools.vcs.commit,
            &ToolOptions::new(),
            &[("message", message.to_string())],
        )?;
        self.run("commit", &command_line, &self.root)
    }

    fn tag(&self, name: &str, message: &str) -> ToolResult<()> {
        let command_line = self.render(
            "tag",
            &self.tools.vcs.tag,
            &ToolOptions::new(),
            &[("tag", name.to_string()), ("message", message.to_string())],
        )?;
        self.run("tag", &command_line, &self.root)
    }

    fn push(&self) -> ToolResult<()> {
        self.run("push", &self.tools.vcs.push, &self.root)
    }

    fn push_tags(&self) -> ToolResult<()> {
        self.run("push_tags", &self.tools.vcs.push_tags, &self.root)
    }

    fn publish(&self) -> ToolResult<()> {
        self.run("publish", &self.tools.vcs.publish, &self.root)
    }
}

impl Serve for ShellTools {
    fn serve(&self, root: &Path, options: &ServeConfig) -> ToolResult<Box<dyn ServerHandle>> {
        let template = self.command_for("serve", self.tools.serve.as_ref())?;
        let command_line = self.render(
            "serve",
            template,
            &ToolOptions::new(),
            &[
                ("root", shell_quote(&root.to_string_lossy())),
                ("port", options.port.to_string()),
                ("host", options.host.clone()),
            ],
        )?;
        tracing::debug!("[serve] {}", command_line);

        let child = self
            .build(&command_line, root)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| ToolError::Spawn {
                tool: "serve".to_string(),
                error: e.to_string(),
            })?;

        Ok(Box::new(ShellServer {
            child: Some(child),
            address: format!("http://{}:{}/", options.host, options.port),
        }))
    }
}

/// A server process started by `ShellTools`
struct ShellServer {
    child: Option<Child>,
    address: String,
}

impl ServerHandle for ShellServer {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn stop(mut self: Box<Self>) -> ToolResult<()> {
        if let Some(mut child) = self.child.take() {
            // The server may already have exited on its own
            let _ = child.kill();
            child.wait().map_err(|e| ToolError::Failed {
                tool: "serve".to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl Drop for ShellServer {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Linter bound to the style or script lint command
pub struct ShellLinter {
    shell: Arc<ShellTools>,
    tool: &'static str,
}

impl ShellLinter {
    pub fn style(shell: Arc<ShellTools>) -> Self {
        ShellLinter {
            shell,
            tool: "style_lint",
        }
    }

    pub fn script(shell: Arc<ShellTools>) -> Self {
        ShellLinter {
            shell,
            tool: "script_lint",
        }
    }
}

impl Lint for ShellLinter {
    fn lint(&self, files: &[PathBuf], options: &ToolOptions) -> ToolResult<Vec<Violation>> {
        let template = match self.tool {
            "style_lint" => self.shell.tools.style_lint.as_ref(),
            _ => self.shell.tools.script_lint.as_ref(),
        };
        self.shell.lint_with(self.tool, template, files, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, VersionRecord};
    use std::fs;
    use tempfile::TempDir;

    fn shell(dir: &TempDir, tools: &str) -> ShellTools {
        let config = parse_config(&format!("tools:\n{}", tools)).unwrap();
        let project = Project::new(
            config,
            dir.path().to_path_buf(),
            VersionRecord::new("widget", "2.1.0"),
        )
        .unwrap();
        ShellTools::new(&project)
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_compile_captures_stdout() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.scss"), "a { color: red; }").unwrap();
        let tools = shell(&dir, "  compile: cat ${entry}\n");

        let css = tools
            .compile(&dir.path().join("main.scss"), &ToolOptions::new())
            .unwrap();
        assert_eq!(css, "a { color: red; }");
    }

    #[test]
    fn test_compile_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let tools = shell(&dir, "  compile: \"echo 'syntax error on line 3' >&2; exit 1\"\n");

        let result = tools.compile(&dir.path().join("main.scss"), &ToolOptions::new());
        match result {
            Err(ToolError::Failed { tool, message }) => {
                assert_eq!(tool, "compile");
                assert!(message.contains("syntax error on line 3"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_minify_reads_stdin() {
        let dir = TempDir::new().unwrap();
        let tools = shell(&dir, "  minify: tr -d ' '\n");
        let out = tools
            .minify("a { color : red ; }", AssetKind::Style, &ToolOptions::new())
            .unwrap();
        assert_eq!(out, "a{color:red;}");
    }

    #[test]
    fn test_unconfigured_tool() {
        let dir = TempDir::new().unwrap();
        let tools = shell(&dir, "  banner: x\n");
        let result = tools.minify("", AssetKind::Script, &ToolOptions::new());
        assert!(matches!(result, Err(ToolError::NotConfigured(ref t)) if t == "minify"));
    }

    #[test]
    fn test_lint_lines_are_violations() {
        let dir = TempDir::new().unwrap();
        let tools = Arc::new(shell(
            &dir,
            "  script_lint: \"printf 'a.js: missing semicolon\\n\\nb.js: unused var\\n'; exit 2\"\n",
        ));
        let linter = ShellLinter::script(tools);
        let violations = linter.lint(&[], &ToolOptions::new()).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].message, "a.js: missing semicolon");
    }

    #[test]
    fn test_silent_lint_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let tools = Arc::new(shell(&dir, "  style_lint: \"exit 3\"\n"));
        let linter = ShellLinter::style(tools);
        assert!(linter.lint(&[], &ToolOptions::new()).is_err());
    }

    #[test]
    fn test_bundle_runs_both_variants() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "var a = 1;\n").unwrap();
        fs::write(dir.path().join("b.js"), "var b = 2;\n").unwrap();
        let tools = shell(&dir, "  bundle: cat ${files}\n  bundle_min: cat ${files} | tr -d ' \\n'\n");

        let bundled = tools
            .bundle(
                &[dir.path().join("a.js"), dir.path().join("b.js")],
                &ToolOptions::new(),
            )
            .unwrap();
        assert_eq!(bundled.plain, "var a = 1;\nvar b = 2;\n");
        assert_eq!(bundled.minified, "vara=1;varb=2;");
    }

    #[test]
    fn test_template_sees_settings_and_options() {
        let dir = TempDir::new().unwrap();
        let tools = shell(&dir, "  compile: echo ${pkg.name}-${style}\n");
        let mut options = ToolOptions::new();
        options.insert("style".to_string(), "expanded".to_string());
        let out = tools.compile(Path::new("x"), &options).unwrap();
        assert_eq!(out.trim(), "widget-expanded");
    }

    #[test]
    fn test_server_stops() {
        let dir = TempDir::new().unwrap();
        let tools = shell(&dir, "  serve: sleep 30\n");
        let handle = tools.serve(dir.path(), &ServeConfig::default()).unwrap();
        assert_eq!(handle.address(), "http://127.0.0.1:9000/");
        handle.stop().unwrap();
    }
}
