use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

pub const SOURCE_EXTENSION: &str = "flow";

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),
}

pub type WatcherResult<T> = Result<T, WatcherError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Recursive watch over a directory, reporting changes to `.flow` files.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: UnboundedReceiver<notify::Result<Event>>,
}

impl FileWatcher {
    pub fn new(path: &Path) -> WatcherResult<Self> {
        let (tx, rx) = unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Next batch of source file changes; `None` once the watcher is gone.
    pub async fn next_changes(&mut self) -> Option<Vec<FileChange>> {
        loop {
            match self.receiver.recv().await? {
                Ok(event) => {
                    let changes = source_changes(&event);
                    if !changes.is_empty() {
                        return Some(changes);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "watch error"),
            }
        }
    }
}

pub fn is_source_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION)
}

fn source_changes(event: &Event) -> Vec<FileChange> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .filter(|path| is_source_file(path))
        .map(|path| FileChange {
            kind,
            path: path.clone(),
        })
        .collect()
}
