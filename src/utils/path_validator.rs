use crate::error::{RelocateError, Result};
use std::path::{Path, PathBuf};

const SYSTEM_DIRS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

/// Path checks that keep relocations inside the project being edited.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises an incoming project path.
    pub fn validate_project_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            RelocateError::ProjectValidation(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(RelocateError::ProjectValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        let system_dirs = SYSTEM_DIRS.iter().map(|dir| Path::new(*dir));
        if let Some(denied) = Self::denied_root(path, &canonical, system_dirs) {
            return Err(RelocateError::ProjectValidation(format!(
                "A project cannot live under system directory '{}'",
                denied.display()
            )));
        }

        Ok(canonical)
    }

    /// First root that contains `path`, compared as given and with symlinks resolved
    /// on both sides (`/etc` is `/private/etc` on macOS).
    fn denied_root<'r>(
        path: &Path,
        canonical: &Path,
        roots: impl IntoIterator<Item = &'r Path>,
    ) -> Option<&'r Path> {
        roots.into_iter().find(|root| {
            path.starts_with(root)
                || canonical.starts_with(root)
                || root
                    .canonicalize()
                    .is_ok_and(|resolved| canonical.starts_with(resolved))
        })
    }

    /// Ensures a directory resides inside the provided base directory.
    pub fn validate_inside(path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let base_dir = base_dir.as_ref();

        let canonical_path = path.canonicalize().map_err(|e| {
            RelocateError::ProjectValidation(format!("Invalid path '{}': {e}", path.display()))
        })?;

        let canonical_base = base_dir.canonicalize().map_err(|e| {
            RelocateError::ProjectValidation(format!(
                "Invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_path.starts_with(&canonical_base) {
            return Err(RelocateError::ProjectValidation(format!(
                "'{}' is outside the project directory",
                path.display()
            )));
        }

        Ok(canonical_path)
    }

    /// Final path component, used as the directory name inside the asset tree.
    pub fn base_name(path: &Path) -> Option<&std::ffi::OsStr> {
        path.file_name()
    }
}
