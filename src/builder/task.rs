//! Task contract and the typed set of task slots.
//!
//! Every collaborator (template, style, script, ...) is a [`Task`]: an async
//! function of the build context and [`TaskOptions`]. Which tasks exist is
//! fixed by [`TaskSlots`]; an empty slot is a visible `None`, never a
//! runtime lookup miss.

use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::BuildContext;

/// Boxed future returned by a task invocation.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

type TaskFn = dyn Fn(Arc<BuildContext>, TaskOptions) -> TaskFuture + Send + Sync;

/// Per-invocation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Scope the task to exactly these sources; `None` processes the full
    /// matching set under the source root.
    pub files: Option<Vec<PathBuf>>,
}

impl TaskOptions {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn files(files: Vec<PathBuf>) -> Self {
        Self { files: Some(files) }
    }
}

/// A registered task function.
#[derive(Clone)]
pub struct Task(Arc<TaskFn>);

impl Task {
    /// Wrap an async function as a task.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<BuildContext>, TaskOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self(Arc::new(
            move |ctx: Arc<BuildContext>, options: TaskOptions| -> TaskFuture {
                Box::pin(f(ctx, options))
            },
        ))
    }

    pub fn run(&self, ctx: Arc<BuildContext>, options: TaskOptions) -> TaskFuture {
        (self.0)(ctx, options)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task(..)")
    }
}

/// Names of every task slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Template,
    Style,
    Script,
    Sprite,
    Image,
    Vector,
    Copy,
    Watch,
    Server,
}

impl TaskKind {
    pub const ALL: [Self; 9] = [
        Self::Template,
        Self::Style,
        Self::Script,
        Self::Sprite,
        Self::Image,
        Self::Vector,
        Self::Copy,
        Self::Watch,
        Self::Server,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Style => "style",
            Self::Script => "script",
            Self::Sprite => "sprite",
            Self::Image => "image",
            Self::Vector => "vector",
            Self::Copy => "copy",
            Self::Watch => "watch",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BuildError::TaskNotFound(s.to_string()))
    }
}

/// Scheduler-level failures.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("task not found: `{0}`")]
    TaskNotFound(String),
}

/// One optional task per kind.
#[derive(Debug, Clone, Default)]
pub struct TaskSlots {
    pub template: Option<Task>,
    pub style: Option<Task>,
    pub script: Option<Task>,
    pub sprite: Option<Task>,
    pub image: Option<Task>,
    pub vector: Option<Task>,
    pub copy: Option<Task>,
    pub watch: Option<Task>,
    pub server: Option<Task>,
}

impl TaskSlots {
    pub fn get(&self, kind: TaskKind) -> Option<&Task> {
        self.slot(kind).as_ref()
    }

    /// Builder-style registration.
    pub fn with(mut self, kind: TaskKind, task: Task) -> Self {
        self.set(kind, Some(task));
        self
    }

    pub fn set(&mut self, kind: TaskKind, task: Option<Task>) {
        *self.slot_mut(kind) = task;
    }

    fn slot(&self, kind: TaskKind) -> &Option<Task> {
        match kind {
            TaskKind::Template => &self.template,
            TaskKind::Style => &self.style,
            TaskKind::Script => &self.script,
            TaskKind::Sprite => &self.sprite,
            TaskKind::Image => &self.image,
            TaskKind::Vector => &self.vector,
            TaskKind::Copy => &self.copy,
            TaskKind::Watch => &self.watch,
            TaskKind::Server => &self.server,
        }
    }

    fn slot_mut(&mut self, kind: TaskKind) -> &mut Option<Task> {
        match kind {
            TaskKind::Template => &mut self.template,
            TaskKind::Style => &mut self.style,
            TaskKind::Script => &mut self.script,
            TaskKind::Sprite => &mut self.sprite,
            TaskKind::Image => &mut self.image,
            TaskKind::Vector => &mut self.vector,
            TaskKind::Copy => &mut self.copy,
            TaskKind::Watch => &mut self.watch,
            TaskKind::Server => &mut self.server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Task {
        Task::new(|_, _| async { anyhow::Ok(()) })
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.name().parse::<TaskKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = "pug".parse::<TaskKind>().unwrap_err();
        assert!(matches!(err, BuildError::TaskNotFound(ref name) if name == "pug"));
        assert_eq!(err.to_string(), "task not found: `pug`");
    }

    #[test]
    fn test_slots() {
        let slots = TaskSlots::default().with(TaskKind::Style, noop());
        assert!(slots.get(TaskKind::Style).is_some());
        assert!(slots.get(TaskKind::Script).is_none());

        let mut slots = slots;
        slots.set(TaskKind::Style, None);
        assert!(slots.get(TaskKind::Style).is_none());
    }
}
