//! Task registry and execution plans
//!
//! Tasks are either leaf actions bound to one capability or aliases that name other
//! tasks. `expand` flattens a task depth-first in declaration order into the plan the
//! executor walks. Declared order is write-before-read order: a later action may read
//! whatever an earlier one produced.

use crate::config::{ActionDef, ActionKind, Project, TaskDef};
use crate::error::{ConfigError, ConfigResult};
use std::collections::BTreeMap;

/// Reference prefix that forces incremental filtering on the referenced task
pub const NEWER_PREFIX: &str = "newer:";

/// Runtime representation of a leaf action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafAction {
    /// Name of the task that declared this action
    pub name: String,

    /// Capability this action invokes
    pub kind: ActionKind,

    /// Resolved source patterns
    pub src: Vec<String>,

    /// Resolved destination patterns
    pub dest: Vec<String>,

    /// Resolved tool options
    pub options: BTreeMap<String, String>,

    /// Whether the incremental filter is consulted
    pub incremental: bool,

    pub usage: Option<String>,
    pub private: bool,
}

impl LeafAction {
    /// Create from config
    pub fn from_config(name: String, config: ActionDef) -> Self {
        LeafAction {
            name,
            kind: config.action,
            incremental: config
                .incremental
                .unwrap_or_else(|| config.action.incremental_by_default()),
            src: config.src,
            dest: config.dest,
            options: config.options,
            usage: config.usage,
            private: config.private,
        }
    }

    /// Create a bare action; mostly useful for tests and programmatic registries
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        LeafAction {
            name: name.into(),
            kind,
            src: Vec::new(),
            dest: Vec::new(),
            options: BTreeMap::new(),
            incremental: kind.incremental_by_default(),
            usage: None,
            private: false,
        }
    }

    pub fn with_src<I, S>(mut self, src: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.src = src.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dest<I, S>(mut self, dest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dest = dest.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Get an option value
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Parse a boolean option, accepting the usual spellings
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.option(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1" | "on"))
    }
}

/// A named ordered grouping of other tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTask {
    pub subtasks: Vec<String>,
    pub usage: Option<String>,
    pub private: bool,
}

/// A node of the task graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskNode {
    Leaf(LeafAction),
    Alias(AliasTask),
}

impl TaskNode {
    pub fn usage(&self) -> Option<&str> {
        match self {
            TaskNode::Leaf(action) => action.usage.as_deref(),
            TaskNode::Alias(alias) => alias.usage.as_deref(),
        }
    }

    pub fn is_private(&self) -> bool {
        match self {
            TaskNode::Leaf(action) => action.private,
            TaskNode::Alias(alias) => alias.private,
        }
    }
}

/// The flattened, ordered list of leaf actions for one named task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub operation: String,
    pub actions: Vec<LeafAction>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Task names of the actions, in order
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }
}

/// Registry of named tasks
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskNode>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the resolved project tasks
    pub fn from_project(project: &Project) -> Self {
        let mut registry = TaskRegistry::new();
        for (name, def) in &project.tasks {
            let node = match def.clone() {
                TaskDef::Alias(subtasks) => TaskNode::Alias(AliasTask {
                    subtasks,
                    usage: None,
                    private: false,
                }),
                TaskDef::Group(group) => TaskNode::Alias(AliasTask {
                    subtasks: group.run,
                    usage: group.usage,
                    private: group.private,
                }),
                TaskDef::Action(action) => {
                    TaskNode::Leaf(LeafAction::from_config(name.clone(), action))
                }
            };
            registry.register(name.clone(), node);
        }
        registry
    }

    /// Register a task, replacing any previous definition
    pub fn register(&mut self, name: impl Into<String>, node: TaskNode) {
        self.tasks.insert(name.into(), node);
    }

    /// Register an alias made of other task names
    pub fn register_alias<I, S>(&mut self, name: impl Into<String>, subtasks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(
            name,
            TaskNode::Alias(AliasTask {
                subtasks: subtasks.into_iter().map(Into::into).collect(),
                usage: None,
                private: false,
            }),
        );
    }

    /// Register a leaf action under its own name
    pub fn register_action(&mut self, action: LeafAction) {
        self.register(action.name.clone(), TaskNode::Leaf(action));
    }

    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name) || self.strip_newer(name).is_some()
    }

    /// All registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Tasks exposed as operations (not private)
    pub fn operations(&self) -> impl Iterator<Item = (&str, &TaskNode)> {
        self.tasks
            .iter()
            .filter(|(_, node)| !node.is_private())
            .map(|(name, node)| (name.as_str(), node))
    }

    /// Flatten a task into its execution plan
    pub fn expand(&self, name: &str) -> ConfigResult<Plan> {
        let mut actions = Vec::new();
        let mut stack = Vec::new();
        self.expand_into(name, false, &mut stack, &mut actions)?;
        Ok(Plan {
            operation: name.to_string(),
            actions,
        })
    }

    /// Expand every registered task so reference errors surface before anything runs
    pub fn validate(&self) -> ConfigResult<()> {
        for name in self.tasks.keys() {
            self.expand(name)?;
        }
        Ok(())
    }

    fn strip_newer<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(NEWER_PREFIX)
            .filter(|rest| !self.tasks.contains_key(name) && self.tasks.contains_key(*rest))
    }

    fn expand_into(
        &self,
        name: &str,
        force_incremental: bool,
        stack: &mut Vec<String>,
        out: &mut Vec<LeafAction>,
    ) -> ConfigResult<()> {
        if let Some(rest) = self.strip_newer(name) {
            return self.expand_into(rest, true, stack, out);
        }

        if stack.iter().any(|t| t == name) {
            stack.push(name.to_string());
            return Err(ConfigError::CyclicTask(stack.join(" -> ")));
        }

        let node = self
            .tasks
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTask(name.to_string()))?;

        match node {
            TaskNode::Leaf(action) => {
                let mut action = action.clone();
                if force_incremental {
                    action.incremental = true;
                }
                out.push(action);
            }
            TaskNode::Alias(alias) => {
                stack.push(name.to_string());
                for subtask in &alias.subtasks {
                    self.expand_into(subtask, force_incremental, stack, out)?;
                }
                stack.pop();
            }
        }

        Ok(())
    }
}
