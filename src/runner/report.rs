//! Per-action results of one plan execution

use crate::config::ActionKind;
use crate::error::{AssetRunError, ErrorKind, ExecutionError, Result};
use colored::Colorize;
use serde::Serialize;
use std::time::Duration;

/// What happened to one action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ran,
    UpToDate,
    WouldRun,
    Failed,
    /// Never reached: an earlier action failed or the run was interrupted
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub task: String,
    pub action: ActionKind,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ActionResult {
    pub fn new(task: impl Into<String>, action: ActionKind, outcome: Outcome) -> Self {
        ActionResult {
            task: task.into(),
            action,
            outcome,
            reason: None,
            error_kind: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_error(mut self, error: &AssetRunError) -> Self {
        self.error_kind = Some(error.kind());
        self.error = Some(error.to_string());
        self
    }
}

/// Results of one operation, in plan order
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub operation: String,
    pub success: bool,
    pub aborted: bool,
    pub results: Vec<ActionResult>,
}

impl RunReport {
    pub fn new(operation: impl Into<String>) -> Self {
        RunReport {
            operation: operation.into(),
            success: true,
            aborted: false,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: ActionResult) {
        if result.outcome == Outcome::Failed {
            self.success = false;
        }
        self.results.push(result);
    }

    /// Stop early; remaining actions are recorded as not run
    pub fn abort<'a, I>(&mut self, remaining: I)
    where
        I: IntoIterator<Item = (&'a str, ActionKind)>,
    {
        self.aborted = true;
        self.success = false;
        for (task, action) in remaining {
            self.results
                .push(ActionResult::new(task, action, Outcome::NotRun));
        }
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionResult> {
        self.results.iter().filter(|r| r.outcome == Outcome::Failed)
    }

    /// Tasks with the given outcome, in plan order
    pub fn tasks_with(&self, outcome: Outcome) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.outcome == outcome)
            .map(|r| r.task.as_str())
            .collect()
    }

    /// Convert to an error naming the first failed action
    pub fn into_result(self) -> Result<RunReport> {
        if self.success {
            return Ok(self);
        }
        let failures: Vec<&ActionResult> = self.failures().collect();
        let error = match failures.as_slice() {
            [] => ExecutionError::Interrupted(self.operation.clone()),
            [only] => ExecutionError::PlanFailed {
                action: only.task.clone(),
                kind: only.error_kind.unwrap_or(ErrorKind::FileSystem),
                cause: only.error.clone().unwrap_or_default(),
            },
            [first, ..] if self.aborted => ExecutionError::PlanFailed {
                action: first.task.clone(),
                kind: first.error_kind.unwrap_or(ErrorKind::FileSystem),
                cause: first.error.clone().unwrap_or_default(),
            },
            many => ExecutionError::Failures(many.len()),
        };
        Err(error.into())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Print one line per action to stderr
    pub fn print_summary(&self) {
        for result in &self.results {
            let status = match result.outcome {
                Outcome::Ran => "ran".green(),
                Outcome::UpToDate => "up to date".dimmed(),
                Outcome::WouldRun => "would run".yellow(),
                Outcome::Failed => "failed".red().bold(),
                Outcome::NotRun => "not run".dimmed(),
            };
            let mut line = format!("  {:<20} {:<12} {}", result.task, result.action, status);
            if result.outcome == Outcome::Ran {
                line.push_str(&format!(" ({} ms)", result.duration_ms));
            }
            if let Some(error) = &result.error {
                line.push_str(&format!(": {}", error));
            }
            eprintln!("{}", line);
        }

        let verdict = if self.success {
            format!("{} finished", self.operation).green().bold()
        } else if self.aborted && self.failures().next().is_none() {
            format!("{} interrupted", self.operation).yellow().bold()
        } else {
            format!("{} failed", self.operation).red().bold()
        };
        eprintln!("{}", verdict);
    }
}
