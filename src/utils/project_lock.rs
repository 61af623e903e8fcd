use crate::error::{RelocateError, Result};
use jiff::Timestamp;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LOCK_DIR: &str = "Temp";
pub const LOCK_NAME: &str = "pkg2asset.lock";

/// Exclusive per-project lock held while a batch runs. Removed on drop.
#[derive(Debug)]
pub struct ProjectLock {
    path: PathBuf,
}

impl ProjectLock {
    pub fn acquire(project_root: &Path) -> Result<Self> {
        let dir = project_root.join(LOCK_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(LOCK_NAME);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RelocateError::Busy(format!(
                    "lock file '{}' exists; remove it if no other relocation is running",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        writeln!(file, "pid={}", std::process::id())?;
        writeln!(file, "started={}", Timestamp::now())?;
        debug!("Acquired project lock {}", path.display());

        Ok(Self { path })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_is_busy_until_release() {
        let dir = tempdir().unwrap();

        let lock = ProjectLock::acquire(dir.path()).unwrap();
        let content = fs::read_to_string(lock.path()).unwrap();
        assert!(content.starts_with("pid="));
        assert!(content.contains("started="));

        let err = ProjectLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, RelocateError::Busy(_)));

        let path = lock.path().to_path_buf();
        drop(lock);
        assert!(!path.exists());
        assert!(ProjectLock::acquire(dir.path()).is_ok());
    }
}
