//! File watcher
//!
//! Change notifications are matched against watch rules. Each rule has its own
//! trailing-edge debounce and its own worker thread: a rule's task subset never runs
//! concurrently with itself, and triggers that arrive while a run is already queued
//! collapse into that queued run.

use crate::config::{Project, WatchRuleSpec};
use crate::error::{Result, WatchError};
use crate::runner::Shutdown;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Runs the task subset of a rule; implemented by the executor
pub trait RuleRunner: Send + Sync + 'static {
    fn run_rule(&self, rule: &str, tasks: &[String]) -> Result<()>;
}

/// A compiled watch rule
#[derive(Debug, Clone)]
pub struct WatchRule {
    pub name: String,
    pub patterns: Vec<String>,
    pub tasks: Vec<String>,
    pub debounce: Duration,
    matcher: GlobSet,
}

fn has_glob_chars(text: &str) -> bool {
    text.contains(['*', '?', '[', '{'])
}

impl WatchRule {
    /// Compile a rule; relative patterns are anchored at `root`
    ///
    /// A pattern ending in `/` (or naming an existing directory) covers everything below it.
    pub fn new(spec: &WatchRuleSpec, root: &Path) -> std::result::Result<Self, WatchError> {
        let mut builder = GlobSetBuilder::new();
        let mut patterns = Vec::new();

        for file in &spec.files {
            let mut pattern = root.join(file).to_string_lossy().into_owned();
            let names_dir = !has_glob_chars(&pattern) && Path::new(&pattern).is_dir();
            if pattern.ends_with('/') {
                pattern.push_str("**");
            } else if names_dir {
                pattern.push_str("/**");
            }

            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| WatchError::Pattern {
                    pattern: file.clone(),
                    error: e.to_string(),
                })?;
            builder.add(glob);
            patterns.push(pattern);
        }

        let matcher = builder.build().map_err(|e| WatchError::Pattern {
            pattern: spec.files.join(", "),
            error: e.to_string(),
        })?;

        Ok(WatchRule {
            name: spec.name.clone(),
            patterns,
            tasks: spec.tasks.clone(),
            debounce: spec.debounce,
            matcher,
        })
    }

    /// Compile every watch rule of a project
    pub fn from_project(project: &Project) -> std::result::Result<Vec<Self>, WatchError> {
        project
            .watch
            .iter()
            .map(|spec| WatchRule::new(spec, &project.root))
            .collect()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.matcher.is_match(path)
    }

    /// Directories to hand to the OS watcher: the literal prefix of each pattern,
    /// walked up to the nearest existing directory
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        self.patterns.iter().map(|p| literal_base(p)).collect()
    }
}

fn literal_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        if has_glob_chars(&component.as_os_str().to_string_lossy()) {
            break;
        }
        base.push(component);
    }
    while !base.is_dir() {
        match base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => base = parent.to_path_buf(),
            _ => return PathBuf::from("."),
        }
    }
    base
}

enum Message {
    Changed(PathBuf),
    Stop,
}

/// A running watch session
pub struct WatchSession {
    sender: Sender<Message>,
    rules: Arc<Vec<WatchRule>>,
    thread: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
}

impl WatchSession {
    /// Start the session thread and one worker per rule
    pub fn spawn(rules: Vec<WatchRule>, runner: Arc<dyn RuleRunner>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let rules = Arc::new(rules);
        let thread = {
            let rules = Arc::clone(&rules);
            thread::spawn(move || session_loop(rules, runner, receiver))
        };
        WatchSession {
            sender,
            rules,
            thread: Some(thread),
            watcher: None,
        }
    }

    /// Feed file system notifications for every rule's base directories into the session
    pub fn watch_fs(&mut self) -> std::result::Result<(), WatchError> {
        let sender = self.sender.clone();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            match event {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    for path in event.paths {
                        let _ = sender.send(Message::Changed(path));
                    }
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })
        .map_err(WatchError::WatcherInit)?;

        let roots: BTreeSet<PathBuf> = self.rules.iter().flat_map(|r| r.watch_roots()).collect();
        for root in roots {
            watcher
                .watch(&root, RecursiveMode::Recursive)
                .map_err(|error| WatchError::WatchPath {
                    path: root.clone(),
                    error,
                })?;
            tracing::debug!("Watching {}", root.display());
        }

        self.watcher = Some(watcher);
        Ok(())
    }

    /// Report a changed path
    pub fn notify(&self, path: impl Into<PathBuf>) {
        let _ = self.sender.send(Message::Changed(path.into()));
    }

    /// Block until `shutdown` is triggered, then stop
    pub fn wait(self, shutdown: &Shutdown) {
        shutdown.wait();
        self.stop();
    }

    /// Stop watching; a run in progress finishes, queued and pending runs are dropped
    pub fn stop(mut self) {
        self.watcher = None;
        let _ = self.sender.send(Message::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct Worker {
    trigger: SyncSender<()>,
    handle: JoinHandle<()>,
}

fn spawn_worker(rule: &WatchRule, runner: Arc<dyn RuleRunner>, stopping: Arc<AtomicBool>) -> Worker {
    let (trigger, queue) = mpsc::sync_channel::<()>(1);
    let name = rule.name.clone();
    let tasks = rule.tasks.clone();
    let handle = thread::spawn(move || {
        for () in queue {
            if stopping.load(Ordering::SeqCst) {
                break;
            }
            tracing::info!("[WATCH] {} changed, running {}", name, tasks.join(", "));
            if let Err(e) = runner.run_rule(&name, &tasks) {
                tracing::warn!("[WATCH] {} failed: {}", name, e);
            }
        }
    });
    Worker { trigger, handle }
}

fn session_loop(rules: Arc<Vec<WatchRule>>, runner: Arc<dyn RuleRunner>, receiver: Receiver<Message>) {
    let stopping = Arc::new(AtomicBool::new(false));
    let workers: Vec<Worker> = rules
        .iter()
        .map(|rule| spawn_worker(rule, Arc::clone(&runner), Arc::clone(&stopping)))
        .collect();
    let mut deadlines: HashMap<usize, Instant> = HashMap::new();

    loop {
        let message = match deadlines.values().min() {
            Some(&next) => {
                let timeout = next.saturating_duration_since(Instant::now());
                match receiver.recv_timeout(timeout) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => Some(Message::Stop),
                }
            }
            None => Some(receiver.recv().unwrap_or(Message::Stop)),
        };

        match message {
            Some(Message::Changed(path)) => {
                for (index, rule) in rules.iter().enumerate() {
                    if rule.matches(&path) {
                        tracing::debug!("{} matches rule {}", path.display(), rule.name);
                        deadlines.insert(index, Instant::now() + rule.debounce);
                    }
                }
            }
            Some(Message::Stop) => break,
            None => {}
        }

        let now = Instant::now();
        let due: Vec<usize> = deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(index, _)| *index)
            .collect();
        for index in due {
            deadlines.remove(&index);
            match workers[index].trigger.try_send(()) {
                Ok(()) => {}
                Err(TrySendError::Full(())) => {
                    tracing::debug!("{} already queued", rules[index].name);
                }
                Err(TrySendError::Disconnected(())) => {}
            }
        }
    }

    stopping.store(true, Ordering::SeqCst);
    for worker in workers {
        drop(worker.trigger);
        let _ = worker.handle.join();
    }
}
