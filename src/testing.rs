//! Shared fixtures for scheduler and watcher tests.

use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::builder::{Task, TaskKind, TaskOptions, TaskSlots};
use crate::config::SiteConfig;
use crate::core::{BuildContext, BuildMode, Paths};

/// Scratch project with `src/` and `public/`.
pub struct TestSite {
    _dir: TempDir,
    pub config: SiteConfig,
    pub paths: Paths,
}

impl TestSite {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig {
            root: dir.path().to_path_buf(),
            ..SiteConfig::default()
        };
        let paths = Paths::from_config(&config);
        fs::create_dir_all(&paths.src).unwrap();
        fs::create_dir_all(&paths.public).unwrap();
        Self {
            _dir: dir,
            config,
            paths,
        }
    }

    /// Write a file under `src/`.
    pub fn src(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.paths.src.join(rel), content)
    }

    /// Write a file under `public/`.
    pub fn public(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.paths.public.join(rel), content)
    }

    pub fn dist(&self, rel: &str) -> PathBuf {
        self.paths.dist.join(rel)
    }

    pub fn read_dist(&self, rel: &str) -> String {
        fs::read_to_string(self.dist(rel)).unwrap()
    }

    pub fn context(&self, mode: BuildMode, tasks: TaskSlots) -> Arc<BuildContext> {
        Arc::new(BuildContext::new(self.config.clone(), mode, tasks))
    }
}

fn write(path: &Path, content: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

/// Records task invocations in order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(TaskKind, TaskOptions)>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn calls(&self) -> Vec<(TaskKind, TaskOptions)> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, kind: TaskKind) -> Vec<TaskOptions> {
        self.calls()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, o)| o)
            .collect()
    }

    /// Task that logs `start:<kind>`, sleeps, then logs `end:<kind>`.
    pub fn task(&self, kind: TaskKind, delay: Duration) -> Task {
        let recorder = self.clone();
        Task::new(move |_ctx, options| {
            let recorder = recorder.clone();
            async move {
                recorder.calls.lock().push((kind, options));
                recorder.events.lock().push(format!("start:{kind}"));
                tokio::time::sleep(delay).await;
                recorder.events.lock().push(format!("end:{kind}"));
                anyhow::Ok(())
            }
        })
    }

    /// Record the call, then delegate to `inner`.
    pub fn wrap(&self, kind: TaskKind, inner: Task) -> Task {
        let recorder = self.clone();
        Task::new(move |ctx, options: TaskOptions| {
            recorder.calls.lock().push((kind, options.clone()));
            inner.run(ctx, options)
        })
    }
}

/// Task that always fails.
pub fn failing_task(message: &'static str) -> Task {
    Task::new(move |_, _| async move { Err::<(), _>(anyhow::anyhow!(message)) })
}
