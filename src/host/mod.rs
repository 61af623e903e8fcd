use crate::error::{RelocateError, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

pub mod factory;
pub mod manifest;
pub mod progress;
pub mod session;

pub use factory::{HostFactory, HostServices};
pub use manifest::ManifestRegistry;
pub use progress::TerminalProgress;
pub use session::AssetEditSession;

/// Where a package was found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSource {
    /// Directory directly under `Packages/`
    Embedded,
    /// `file:` reference in the manifest
    Local,
    /// `Library/PackageCache/<name>@<version>`
    Cached,
}

impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PackageSource::Embedded => "embedded",
            PackageSource::Local => "local",
            PackageSource::Cached => "cached",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: Option<String>,
    /// Absolute path of the package directory
    pub source_path: PathBuf,
    /// Dependency names in declaration order
    pub dependencies: Vec<String>,
    pub source: PackageSource,
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: None,
            source_path: source_path.into(),
            dependencies: Vec::new(),
            source: PackageSource::Embedded,
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// Resolves a package identifier (name or path) to its descriptor.
pub trait PackageLookup: Send + Sync {
    fn find_package(&self, query: &str) -> Option<PackageDescriptor>;
}

/// The system of record for which packages the project depends on.
pub trait RegistryClient: Send + Sync {
    fn remove(&self, package_name: &str) -> Result<PendingRemoval>;
}

/// Defers expensive re-indexing until a batch of edits is finished.
pub trait EditSession: Send + Sync {
    fn begin_batch_edit(&self);
    fn end_batch_edit(&self);
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, title: &str, message: &str, fraction: f32);
    fn clear(&self);
}

/// Handle to a removal request that completes on another thread.
pub struct PendingRemoval {
    package: String,
    receiver: Receiver<Result<()>>,
    outcome: Option<Result<()>>,
}

/// Sending half of a [`PendingRemoval`], held by whoever performs the removal.
pub struct RemovalCompleter {
    sender: Sender<Result<()>>,
}

impl RemovalCompleter {
    pub fn complete(self, outcome: Result<()>) {
        // The relocator may have given up on the handle already; nothing to report to.
        let _ = self.sender.send(outcome);
    }
}

impl PendingRemoval {
    pub fn channel(package: impl Into<String>) -> (Self, RemovalCompleter) {
        let (sender, receiver) = mpsc::channel();
        let pending = Self {
            package: package.into(),
            receiver,
            outcome: None,
        };
        (pending, RemovalCompleter { sender })
    }

    /// A handle that is already resolved.
    #[cfg(test)]
    pub fn resolved(package: impl Into<String>, outcome: Result<()>) -> Self {
        let (pending, completer) = Self::channel(package);
        completer.complete(outcome);
        pending
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Non-blocking poll.
    pub fn is_complete(&mut self) -> bool {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.outcome = Some(Err(RelocateError::Manifest(
                        "removal worker exited without reporting a result".to_string(),
                    )))
                }
            }
        }
        self.outcome.is_some()
    }

    /// Blocks until the removal has completed. There is no timeout.
    pub fn wait(mut self) -> Result<()> {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => self.receiver.recv().unwrap_or_else(|_| {
                Err(RelocateError::Manifest(
                    "removal worker exited without reporting a result".to_string(),
                ))
            }),
        };

        outcome.map_err(|err| match err {
            RelocateError::RegistryRemovalFailure { .. } => err,
            other => RelocateError::RegistryRemovalFailure {
                package: self.package.clone(),
                reason: other.to_string(),
                restored: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn pending_removal_reports_completion_from_worker() {
        let (mut pending, completer) = PendingRemoval::channel("pkgA");
        assert!(!pending.is_complete());

        let worker = thread::spawn(move || completer.complete(Ok(())));
        worker.join().unwrap();

        assert!(pending.is_complete());
        assert!(pending.wait().is_ok());
    }

    #[test]
    fn pending_removal_maps_failures_to_registry_error() {
        let pending = PendingRemoval::resolved(
            "pkgA",
            Err(RelocateError::Manifest("manifest is locked".to_string())),
        );
        match pending.wait() {
            Err(RelocateError::RegistryRemovalFailure {
                package, reason, ..
            }) => {
                assert_eq!(package, "pkgA");
                assert!(reason.contains("manifest is locked"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn dropped_completer_is_a_failure() {
        let (mut pending, completer) = PendingRemoval::channel("pkgA");
        drop(completer);
        assert!(pending.is_complete());
        assert!(pending.wait().is_err());
    }

    #[test]
    fn descriptor_builder_keeps_dependency_order() {
        let descriptor = PackageDescriptor::new("pkgA", "/project/Packages/pkgA")
            .with_dependencies(["pkgC", "pkgB"]);
        assert_eq!(descriptor.dependencies, vec!["pkgC", "pkgB"]);
        assert_eq!(descriptor.source, PackageSource::Embedded);
    }
}
