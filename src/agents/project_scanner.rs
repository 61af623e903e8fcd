use crate::error::{RelocateError, Result};
use crate::host::manifest::{LOCK_FILE, MANIFEST_FILE};
use crate::utils::path_validator::PathValidator;
use std::path::{Path, PathBuf};

pub const PACKAGES_DIR: &str = "Packages";
pub const PACKAGE_CACHE_DIR: &str = "Library/PackageCache";
pub const DEFAULT_ASSET_ROOT: &str = "Assets";

/// ProjectScannerAgent validates the project structure
pub struct ProjectScannerAgent {
    project_path: PathBuf,
    asset_root: PathBuf,
}

impl ProjectScannerAgent {
    pub fn new<P: AsRef<Path>, A: AsRef<Path>>(project_path: P, asset_root: A) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            asset_root: asset_root.as_ref().to_path_buf(),
        }
    }

    /// Validates the project structure
    pub fn validate(&self) -> Result<ProjectInfo> {
        let project_root = PathValidator::validate_project_path(&self.project_path)?;

        let packages_dir = project_root.join(PACKAGES_DIR);
        let manifest_path = packages_dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(RelocateError::ProjectValidation(format!(
                "{}/{} not found",
                PACKAGES_DIR, MANIFEST_FILE
            )));
        }

        let asset_root = project_root.join(&self.asset_root);
        if !asset_root.is_dir() {
            return Err(RelocateError::ProjectValidation(format!(
                "Asset root '{}' not found",
                self.asset_root.display()
            )));
        }
        let asset_root = PathValidator::validate_inside(&asset_root, &project_root)?;

        Ok(ProjectInfo {
            lock_path: packages_dir.join(LOCK_FILE),
            package_cache_dir: project_root.join(PACKAGE_CACHE_DIR),
            project_root,
            manifest_path,
            packages_dir,
            asset_root,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub project_root: PathBuf,
    pub manifest_path: PathBuf,
    pub lock_path: PathBuf,
    pub packages_dir: PathBuf,
    pub package_cache_dir: PathBuf,
    pub asset_root: PathBuf,
}
