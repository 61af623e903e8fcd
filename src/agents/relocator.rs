use crate::error::{MoveFailureReason, RelocateError, Result};
use crate::host::{EditSession, PackageDescriptor, ProgressReporter, RegistryClient};
use crate::utils::path_validator::PathValidator;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub const PROGRESS_TITLE: &str = "Package to Asset";

/// Packages to relocate in one session, in processing order.
#[derive(Debug, Clone, Default)]
pub struct RelocationBatch {
    items: Vec<PackageDescriptor>,
}

impl RelocationBatch {
    /// Builds a batch, keeping the first occurrence of each package name.
    pub fn new(descriptors: impl IntoIterator<Item = PackageDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let items = descriptors
            .into_iter()
            .filter(|descriptor| seen.insert(descriptor.name.clone()))
            .collect();
        Self { items }
    }

    pub fn single(descriptor: PackageDescriptor) -> Self {
        Self {
            items: vec![descriptor],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageDescriptor> {
        self.items.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocatedPackage {
    pub name: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct RelocationReport {
    pub relocated: Vec<RelocatedPackage>,
}

impl RelocationReport {
    pub fn is_empty(&self) -> bool {
        self.relocated.is_empty()
    }
}

/// Fraction shown while item `index` (0-based) of `total` is being processed.
///
/// The first item reports 0.0 and the last `(total - 1) / total`.
pub fn progress_fraction(index: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    index as f32 / total as f32
}

/// Destination of a package inside the asset tree: `<asset-root>/<base-name-of-source>`.
pub fn destination_for(asset_root: &Path, package: &PackageDescriptor) -> Result<PathBuf> {
    let base_name =
        PathValidator::base_name(&package.source_path).ok_or_else(|| RelocateError::MoveFailure {
            package: package.name.clone(),
            source_path: package.source_path.clone(),
            destination: asset_root.to_path_buf(),
            reason: MoveFailureReason::Filesystem(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source path has no directory name",
            )),
        })?;
    Ok(asset_root.join(base_name))
}

/// Moves package directories into the asset tree and drops them from the registry.
pub struct PackageRelocator {
    asset_root: PathBuf,
    registry: Arc<dyn RegistryClient>,
    session: Arc<dyn EditSession>,
    progress: Arc<dyn ProgressReporter>,
    busy: AtomicBool,
}

impl PackageRelocator {
    pub fn new<P: AsRef<Path>>(
        asset_root: P,
        registry: Arc<dyn RegistryClient>,
        session: Arc<dyn EditSession>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            asset_root: asset_root.as_ref().to_path_buf(),
            registry,
            session,
            progress,
            busy: AtomicBool::new(false),
        }
    }

    /// Relocates every package of the batch in order, stopping at the first failure.
    ///
    /// Packages relocated before a failure stay relocated.
    pub fn relocate(&self, batch: &RelocationBatch) -> Result<RelocationReport> {
        if batch.is_empty() {
            return Err(RelocateError::EmptyBatch);
        }

        let _busy = BusyGuard::acquire(&self.busy)?;
        // Declared before the session so the session closes first on drop.
        let _overlay = OverlayGuard {
            progress: self.progress.as_ref(),
        };
        let _session = SessionGuard::begin(self.session.as_ref());

        let total = batch.len();
        let mut report = RelocationReport::default();

        for (index, package) in batch.iter().enumerate() {
            let destination = destination_for(&self.asset_root, package)?;

            self.progress.report(
                PROGRESS_TITLE,
                &format!("{}/{} {}", index + 1, total, package.name),
                progress_fraction(index, total),
            );

            move_directory(package, &package.source_path, &destination)?;
            info!(
                "Moved {} -> {}",
                package.source_path.display(),
                destination.display()
            );

            if let Err(err) = self.remove_from_registry(&package.name) {
                return Err(self.compensate(package, &destination, err));
            }

            report.relocated.push(RelocatedPackage {
                name: package.name.clone(),
                source: package.source_path.clone(),
                destination,
            });
        }

        Ok(report)
    }

    fn remove_from_registry(&self, name: &str) -> Result<()> {
        let mut pending = self.registry.remove(name)?;
        if !pending.is_complete() {
            debug!("Waiting for registry removal of {}", pending.package());
        }
        pending.wait()
    }

    /// Moves the directory back after a failed removal and reports whether that worked.
    fn compensate(
        &self,
        package: &PackageDescriptor,
        destination: &Path,
        err: RelocateError,
    ) -> RelocateError {
        let reason = match err {
            RelocateError::RegistryRemovalFailure { reason, .. } => reason,
            other => other.to_string(),
        };

        let restored = match fs::rename(destination, &package.source_path) {
            Ok(()) => {
                warn!(
                    "Removal of {} failed, moved it back to {}",
                    package.name,
                    package.source_path.display()
                );
                true
            }
            Err(e) => {
                warn!(
                    "Removal of {} failed and it could not be moved back: {}",
                    package.name, e
                );
                false
            }
        };

        RelocateError::RegistryRemovalFailure {
            package: package.name.clone(),
            reason,
            restored,
        }
    }
}

fn move_directory(package: &PackageDescriptor, source: &Path, destination: &Path) -> Result<()> {
    let failure = |reason| RelocateError::MoveFailure {
        package: package.name.clone(),
        source_path: source.to_path_buf(),
        destination: destination.to_path_buf(),
        reason,
    };

    // symlink_metadata also catches dangling links at the destination.
    if destination.symlink_metadata().is_ok() {
        return Err(failure(MoveFailureReason::DestinationExists));
    }
    if !source.exists() {
        return Err(failure(MoveFailureReason::SourceMissing));
    }

    fs::rename(source, destination).map_err(|e| failure(MoveFailureReason::Filesystem(e)))
}

struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                RelocateError::Busy("another batch is running on this relocator".to_string())
            })?;
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

struct SessionGuard<'a> {
    session: &'a dyn EditSession,
}

impl<'a> SessionGuard<'a> {
    fn begin(session: &'a dyn EditSession) -> Self {
        session.begin_batch_edit();
        Self { session }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.session.end_batch_edit();
    }
}

struct OverlayGuard<'a> {
    progress: &'a dyn ProgressReporter,
}

impl Drop for OverlayGuard<'_> {
    fn drop(&mut self) {
        self.progress.clear();
    }
}
