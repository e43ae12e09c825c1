pub mod config;
pub mod document;
pub mod protocol;
pub mod server;
pub mod store;
pub mod watcher;
pub mod workspace;

pub use config::{ConfigError, WorkspaceConfig, CONFIG_FILE_NAME, DEFAULT_PORT};
pub use document::{DocumentState, Pipeline, Preview, SyncOutcome};
pub use server::{router, SharedWorkspace};
pub use store::{JsonFileLayoutStore, LayoutStore, MemoryLayoutStore, StoreError, StoreResult};
pub use watcher::{ChangeKind, FileChange, FileWatcher, WatcherError, WatcherResult};
pub use workspace::{
    path_to_uri, uri_to_path, DocumentHandle, ModelUpdate, Workspace, WorkspaceError,
    WorkspaceResult,
};
