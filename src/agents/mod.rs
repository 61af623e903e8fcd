pub mod dependency_expander;
pub mod package_locator;
pub mod project_scanner;
pub mod relocator;

pub use dependency_expander::{BUILTIN_MODULE_PREFIX, DependencyExpander};
pub use package_locator::PackageLocator;
pub use project_scanner::{ProjectInfo, ProjectScannerAgent};
pub use relocator::{PackageRelocator, RelocationBatch, RelocationReport};
