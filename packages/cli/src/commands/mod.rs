pub mod convert;
pub mod init;
pub mod layout;
pub mod validate;

pub use convert::{convert, ConvertArgs};
pub use init::{init, InitArgs};
pub use layout::{layout, LayoutArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tandem_editor::Providers;
use tandem_workspace::{
    path_to_uri, DocumentState, JsonFileLayoutStore, LayoutStore, Pipeline, SyncOutcome,
    WorkspaceConfig,
};
use walkdir::WalkDir;

/// Effective configuration shared by every command
pub struct Session {
    pub config: WorkspaceConfig,
    pub providers: Providers,
}

impl Session {
    /// `explicit` config file, or `tandem.config.json` discovered in `cwd`.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let config = match explicit {
            Some(path) => WorkspaceConfig::load(path)?,
            None => WorkspaceConfig::discover(cwd)?,
        };
        let providers = config.providers(None)?.providers;
        Ok(Self { config, providers })
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.config.diagram_type, &self.providers)
    }

    pub fn store(&self) -> Option<JsonFileLayoutStore> {
        self.config.layout_dir.as_ref().map(JsonFileLayoutStore::new)
    }

    /// Parse and convert `path`, restoring saved ids and layout when a
    /// layout directory is configured.
    pub fn open(&self, path: &Path) -> Result<DocumentState> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let uri = document_uri(path);
        let mut doc = DocumentState::new(&uri, &source, 1, &self.config.diagram_type.root_type);

        if let Some(store) = self.store() {
            if let Some(record) = store.load(&uri)? {
                doc.restore(&record);
            }
        }
        if doc.refresh(&self.pipeline()) != SyncOutcome::Converted {
            anyhow::bail!("Conversion of {} did not complete", path.display());
        }
        tracing::debug!(uri = %uri, elements = doc.index.len(), "converted");
        Ok(doc)
    }
}

/// Same URI the server uses for the file, so saved layouts are shared.
pub fn document_uri(path: &Path) -> String {
    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    path_to_uri(&absolute)
}

/// `input` itself when it is a file, otherwise every `.flow` file below it.
pub fn find_flow_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && tandem_workspace::watcher::is_source_file(path))
        .collect();
    files.sort();
    Ok(files)
}
