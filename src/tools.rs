//! Discovery of the external executables and files a job depends on.

use crate::config::AppConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where to look for an external executable, in priority order:
/// the system search path first, then a fixed file name in the working directory.
#[derive(Debug, Clone)]
pub struct ToolLookup {
    name: String,
    local_fallback: PathBuf,
    working_dir: PathBuf,
    search_path: Option<OsString>,
}

impl ToolLookup {
    /// Look up `name` on PATH, falling back to `local_fallback` in the current directory
    pub fn new(name: impl Into<String>, local_fallback: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            local_fallback: local_fallback.into(),
            working_dir: PathBuf::from("."),
            search_path: None,
        }
    }

    /// Resolve the local fallback against `dir` instead of the current directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Search these directories instead of the process PATH
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Name searched for on PATH
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first match, or `None` when neither location has the tool.
    pub fn locate(&self) -> Option<PathBuf> {
        let on_path = match &self.search_path {
            Some(paths) => which::which_in(&self.name, Some(paths), &self.working_dir).ok(),
            None => which::which(&self.name).ok(),
        };
        if let Some(found) = on_path {
            debug!(tool = %self.name, path = %found.display(), "found on search path");
            return Some(found);
        }

        let local = self.working_dir.join(&self.local_fallback);
        if local.is_file() {
            debug!(tool = %self.name, path = %local.display(), "found local fallback");
            return Some(local);
        }

        debug!(tool = %self.name, "not found");
        None
    }
}

/// Returns `path` only if it currently exists as a regular file.
pub fn existing_file(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

/// Lookups the job builder performs before a job may start
#[derive(Debug, Clone)]
pub struct Toolbox {
    /// Transcoder used for audio extraction and stream merging
    pub transcoder: ToolLookup,
    /// Cookie file handed to the extractor when it exists
    pub credential_file: PathBuf,
}

impl Toolbox {
    /// Build lookups from the configured names
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            transcoder: ToolLookup::new(
                &config.transcoder_binary,
                &config.transcoder_local_fallback,
            ),
            credential_file: config.credential_file.clone(),
        }
    }

    /// Transcoder location, if any
    pub fn locate_transcoder(&self) -> Option<PathBuf> {
        self.transcoder.locate()
    }

    /// Credential file, if present on disk right now
    pub fn credential_file(&self) -> Option<PathBuf> {
        existing_file(&self.credential_file)
    }
}
