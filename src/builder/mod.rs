//! Task scheduler.
//!
//! # Stages
//!
//! ```text
//! clean → {style, script, sprite} → template → {image, vector, copy}
//! ```
//!
//! Tasks within a stage run concurrently; stages run in sequence, because
//! templates may reference the final URLs of styles and scripts. A stage
//! whose slots are all empty is skipped. The first task failure aborts the
//! build.

mod task;


pub use task::{BuildError, Task, TaskFuture, TaskKind, TaskOptions, TaskSlots};

use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

use crate::core::BuildContext;
use crate::utils::fs::reset_dir;
use crate::{debug, log};

/// Stages of a full build, after cleaning.
const STAGES: [&[TaskKind]; 3] = [
    &[TaskKind::Style, TaskKind::Script, TaskKind::Sprite],
    &[TaskKind::Template],
    &[TaskKind::Image, TaskKind::Vector, TaskKind::Copy],
];

/// Drives tasks registered in a build context.
#[derive(Debug, Clone)]
pub struct Builder {
    ctx: Arc<BuildContext>,
}

impl Builder {
    pub fn new(ctx: Arc<BuildContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.ctx
    }

    /// Full production build: clean, then every stage.
    pub async fn build(&self) -> Result<()> {
        let started = Instant::now();
        self.clean().await?;
        self.run_stages().await?;
        log!("build"; "done in {}ms", started.elapsed().as_millis());
        Ok(())
    }

    /// Every stage, without cleaning first.
    pub async fn run_stages(&self) -> Result<()> {
        for kinds in STAGES {
            run_stage(&self.ctx, kinds).await?;
        }
        Ok(())
    }

    /// Development session: the watch task, then the dev server.
    ///
    /// The watch task subscribes, performs the initial build and returns;
    /// the server task runs until shutdown. An empty slot is skipped, the
    /// same way an empty stage is.
    pub async fn watch(&self) -> Result<()> {
        for kind in [TaskKind::Watch, TaskKind::Server] {
            let Some(task) = self.ctx.tasks.get(kind).cloned() else {
                debug!("build"; "skipping empty {} slot", kind);
                continue;
            };
            task.run(Arc::clone(&self.ctx), TaskOptions::all())
                .await
                .with_context(|| format!("{kind} task failed"))?;
        }
        Ok(())
    }

    /// Run a single task by name.
    pub async fn run_task(&self, name: &str, options: TaskOptions) -> Result<()> {
        let kind: TaskKind = name.parse()?;
        let task = self.require(kind)?;
        task.run(Arc::clone(&self.ctx), options)
            .await
            .with_context(|| format!("{kind} task failed"))
    }

    /// Remove and recreate the output root, then forget all cached state.
    pub async fn clean(&self) -> Result<()> {
        let dist = &self.ctx.paths.dist;
        reset_dir(dist).await?;
        self.ctx.reset_state();
        debug!("build"; "cleaned {}", self.ctx.paths.display(dist));
        Ok(())
    }

    fn require(&self, kind: TaskKind) -> Result<Task> {
        self.ctx
            .tasks
            .get(kind)
            .cloned()
            .ok_or_else(|| BuildError::TaskNotFound(kind.name().to_string()).into())
    }
}

/// Run the registered tasks of one stage concurrently.
async fn run_stage(ctx: &Arc<BuildContext>, kinds: &[TaskKind]) -> Result<()> {
    let tasks: Vec<(TaskKind, Task)> = kinds
        .iter()
        .filter_map(|&kind| ctx.tasks.get(kind).map(|task| (kind, task.clone())))
        .collect();

    if tasks.is_empty() {
        debug!("build"; "skipping empty stage {:?}", kinds);
        return Ok(());
    }

    let mut set = JoinSet::new();
    for (kind, task) in tasks {
        let future = task.run(Arc::clone(ctx), TaskOptions::all());
        set.spawn(async move { future.await.with_context(|| format!("{kind} task failed")) });
    }

    while let Some(joined) = set.join_next().await {
        let outcome = joined.map_err(|e| anyhow!("task panicked: {e}")).and_then(|r| r);
        if let Err(e) = outcome {
            // Siblings keep running to completion; only the error surfaces
            set.detach_all();
            return Err(e);
        }
    }
    Ok(())
}
