use crate::error::{RelocateError, Result};
use crate::host::{PendingRemoval, RegistryClient};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const LOCK_FILE: &str = "packages-lock.json";

/// Prefix of manifest values that point at a package directory on disk.
pub const FILE_REFERENCE_PREFIX: &str = "file:";

/// Registry backed by `Packages/manifest.json` (and `packages-lock.json` when present).
///
/// Removals run on a worker thread and are observed through a [`PendingRemoval`].
pub struct ManifestRegistry {
    manifest_path: PathBuf,
    lock_path: PathBuf,
}

impl ManifestRegistry {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(manifest_path: P, lock_path: Q) -> Self {
        Self {
            manifest_path: manifest_path.as_ref().to_path_buf(),
            lock_path: lock_path.as_ref().to_path_buf(),
        }
    }

    #[cfg(test)]
    fn remove_now(&self, package: &str) -> Result<bool> {
        remove_dependency(&self.manifest_path, &self.lock_path, package)
    }
}

impl RegistryClient for ManifestRegistry {
    fn remove(&self, package_name: &str) -> Result<PendingRemoval> {
        let (pending, completer) = PendingRemoval::channel(package_name);
        let manifest_path = self.manifest_path.clone();
        let lock_path = self.lock_path.clone();
        let package = package_name.to_string();

        thread::Builder::new()
            .name(format!("remove-{}", package_name))
            .spawn(move || {
                let outcome = remove_dependency(&manifest_path, &lock_path, &package).map(|_| ());
                completer.complete(outcome);
            })?;

        Ok(pending)
    }
}

/// Drops `package` from the manifest and the lock file as one unit.
///
/// Both documents are parsed and edited in memory before either is written. If
/// the lock file cannot be written, the manifest goes back to its original text.
fn remove_dependency(manifest_path: &Path, lock_path: &Path, package: &str) -> Result<bool> {
    let original = read_text(manifest_path)?;
    let mut manifest = parse_json(&original, manifest_path)?;
    let mut lock = if lock_path.exists() {
        Some(load_json(lock_path)?)
    } else {
        None
    };

    let listed = dependencies_mut(&mut manifest, manifest_path)?
        .shift_remove(package)
        .is_some();
    let locked = match lock.as_mut() {
        Some(document) => dependencies_mut(document, lock_path)?
            .shift_remove(package)
            .is_some(),
        None => false,
    };

    if listed {
        write_json(manifest_path, &manifest)?;
        info!("Removed {} from {}", package, manifest_path.display());
    } else {
        debug!(
            "{} is not listed in {}, nothing to remove",
            package,
            manifest_path.display()
        );
    }

    if let (true, Some(document)) = (locked, lock.as_ref()) {
        if let Err(e) = write_json(lock_path, document) {
            if listed {
                restore_text(manifest_path, &original);
            }
            return Err(e);
        }
        debug!("Removed {} from {}", package, lock_path.display());
    }

    Ok(listed)
}

fn restore_text(path: &Path, original: &str) {
    match fs::write(path, original) {
        Ok(()) => warn!("Restored {} after a failed lock update", path.display()),
        Err(e) => warn!("Could not restore {}: {}", path.display(), e),
    }
}

/// Reads the `dependencies` object of a manifest, in file order.
pub fn read_dependencies(manifest_path: &Path) -> Result<Map<String, Value>> {
    let manifest = load_json(manifest_path)?;
    match manifest.get("dependencies") {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(RelocateError::Manifest(format!(
            "'dependencies' in {} is not an object",
            manifest_path.display()
        ))),
        None => Ok(Map::new()),
    }
}

fn dependencies_mut<'a>(document: &'a mut Value, path: &Path) -> Result<&'a mut Map<String, Value>> {
    let root = document.as_object_mut().ok_or_else(|| {
        RelocateError::Manifest(format!("{} is not a JSON object", path.display()))
    })?;

    root.entry("dependencies")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| {
            RelocateError::Manifest(format!(
                "'dependencies' in {} is not an object",
                path.display()
            ))
        })
}

fn load_json(path: &Path) -> Result<Value> {
    let content = read_text(path)?;
    parse_json(&content, path)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        RelocateError::Manifest(format!("Failed to read '{}': {}", path.display(), e))
    })
}

fn parse_json(content: &str, path: &Path) -> Result<Value> {
    serde_json::from_str(content).map_err(|e| {
        RelocateError::Manifest(format!("Failed to parse '{}': {}", path.display(), e))
    })
}

fn write_json(path: &Path, document: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(document)?;
    content.push('\n');
    fs::write(path, content).map_err(|e| {
        RelocateError::Manifest(format!("Failed to write '{}': {}", path.display(), e))
    })
}
