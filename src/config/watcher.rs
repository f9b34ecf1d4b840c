//! Hot reload of the executor configuration file.
//!
//! # Data Flow
//! ```text
//! notify event (modify / create)
//!     → reload task, woken through an unbounded channel
//!     → wait out the burst, drop events queued meanwhile
//!     → load_config (parse + validate); invalid files are logged and skipped
//!     → skip if equal to the last delivered config
//!     → send on the update channel; a closed channel ends the task
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ExecutorConfig;

/// Quiet period after a change before the file is read.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches one configuration file and emits validated, changed configs.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    current: Option<ExecutorConfig>,
    update_tx: mpsc::UnboundedSender<ExecutorConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver its updates are sent on.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ExecutorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                debounce: DEFAULT_DEBOUNCE,
                current: None,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Config already in use; reloads equal to it are not sent.
    ///
    /// Defaults to whatever the file holds when [`Self::run`] is called.
    pub fn with_current(mut self, config: ExecutorConfig) -> Self {
        self.current = Some(config);
        self
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// Dropping the returned watcher stops the reload task.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    if event_tx.send(()).is_err() {
                        tracing::debug!("Config reload task stopped, ignoring change");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        let current = self.current.or_else(|| load_config(&self.path).ok());
        tokio::spawn(reload_loop(
            self.path.clone(),
            self.debounce,
            current,
            event_rx,
            self.update_tx,
        ));

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    mut current: Option<ExecutorConfig>,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<ExecutorConfig>,
) {
    while events.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        while events.try_recv().is_ok() {}

        let config = match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = ?path,
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
                continue;
            }
        };

        if current.as_ref() == Some(&config) {
            tracing::debug!(path = ?path, "Config file unchanged");
            continue;
        }

        if updates.send(config.clone()).is_err() {
            tracing::warn!(path = ?path, "Config update receiver dropped, stopping reload");
            break;
        }
        tracing::info!(path = ?path, "Config reloaded");
        current = Some(config);
    }
}
