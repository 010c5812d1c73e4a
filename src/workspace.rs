//! Workspace directory layout
//!
//! The service owns a workspace tree with fixed subdirectories for memory,
//! cache, artifacts, and logs. The tree is scaffolded once at startup.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AgentError, Result};

/// Subdirectories created under the workspace root
const SUBDIRS: [&str; 4] = ["memory", "cache", "artifacts", "logs"];

/// Handle to the workspace directory tree
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root`, scaffolding all subdirectories.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for sub in SUBDIRS {
            fs::create_dir_all(root.join(sub))?;
        }
        Ok(Self { root })
    }

    /// Get the workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for persisted memory entries
    pub fn memory_dir(&self) -> PathBuf {
        self.root.join("memory")
    }

    /// Directory for cached intermediate data
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Directory for files produced by agent tools
    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    /// Directory for log files
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Resolve a user-supplied relative path against the workspace root.
    ///
    /// Rejects absolute paths and any path that escapes the root via `..`.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return Err(AgentError::Config(format!(
                "path must be relative to the workspace: {}",
                relative
            )));
        }
        for component in candidate.components() {
            if matches!(component, std::path::Component::ParentDir) {
                return Err(AgentError::Config(format!(
                    "path escapes the workspace: {}",
                    relative
                )));
            }
        }
        Ok(self.root.join(candidate))
    }
}
