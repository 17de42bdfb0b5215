use std::path::Path;

use walkdir::WalkDir;

use crate::error::SyncError;

/// Local filesystem primitives used by the walker.
pub trait LocalFs {
    fn is_dir(&self, path: &Path) -> bool;
    /// Names directly under `path`, sorted; `.`/`..` never appear.
    fn list_entries(&self, path: &Path) -> Result<Vec<String>, SyncError>;
    /// Create one directory level; false if it could not be created.
    fn create_dir(&self, path: &Path) -> bool;
}

/// [`LocalFs`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdLocalFs;

impl LocalFs for StdLocalFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_entries(&self, path: &Path) -> Result<Vec<String>, SyncError> {
        let mut names = Vec::new();
        let walker = WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| SyncError::LocalIo {
                path: path.to_string_lossy().to_string(),
                message: e.to_string(),
            })?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    fn create_dir(&self, path: &Path) -> bool {
        match std::fs::create_dir(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("create_dir failed: {}: {}", path.display(), e);
                false
            }
        }
    }
}
