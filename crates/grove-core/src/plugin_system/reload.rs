//! Serialized delivery of hot-reload notifications.
//!
//! File watchers and other producers submit [`ChangeNotice`]s through a
//! [`ReloadQueue`]. A single worker task applies them to the shared
//! [`PluginManager`] in arrival order, one at a time, so notifications never
//! overlap each other or a shutdown holding the same lock.
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manager::PluginManager;

/// Manager shared between the application and the reload worker
pub type SharedPluginManager = Arc<Mutex<PluginManager>>;

/// A change to apply to the plugin manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeNotice {
    ClassChanged(String),
    FileChanged(PathBuf),
    ConfigChanged,
    Refresh(String),
}

/// Counters returned by the worker when the queue closes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReloadStats {
    pub applied: usize,
    pub ignored: usize,
}

/// Sending side of the reload queue
#[derive(Debug, Clone)]
pub struct ReloadQueue {
    tx: mpsc::UnboundedSender<ChangeNotice>,
}

impl ReloadQueue {
    pub fn submit(&self, notice: ChangeNotice) -> Result<(), PluginSystemError> {
        self.tx
            .send(notice)
            .map_err(|e| PluginSystemError::Internal(format!("reload worker has stopped; dropped {:?}", e.0)))
    }
}

/// Spawn the worker. It runs until every [`ReloadQueue`] clone is dropped.
pub fn spawn_reload_worker(manager: SharedPluginManager) -> (ReloadQueue, JoinHandle<ReloadStats>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ChangeNotice>();

    let handle = tokio::spawn(async move {
        let mut stats = ReloadStats::default();
        while let Some(notice) = rx.recv().await {
            let mut manager = manager.lock().await;
            if manager.apply_change(&notice) {
                stats.applied += 1;
            } else {
                stats.ignored += 1;
            }
        }
        log::debug!(
            "Reload worker stopped after {} applied and {} ignored notice(s)",
            stats.applied,
            stats.ignored
        );
        stats
    });

    (ReloadQueue { tx }, handle)
}

impl PluginManager {
    /// Apply one change notice. Notices arriving before initialisation or
    /// after shutdown are ignored and return `false`.
    pub fn apply_change(&mut self, notice: &ChangeNotice) -> bool {
        if !self.is_initialised() || self.is_shutdown() {
            log::debug!("Ignoring {:?}; plugin manager is not running", notice);
            return false;
        }
        match notice {
            ChangeNotice::ClassChanged(class_id) => {
                self.inform_of_class_change(class_id);
            }
            ChangeNotice::FileChanged(path) => {
                self.inform_of_file_change(path);
            }
            ChangeNotice::ConfigChanged => {
                self.inform_plugins_of_config_change();
            }
            ChangeNotice::Refresh(name) => {
                self.refresh_plugin(name);
            }
        }
        true
    }
}
