use crate::error::RelocateError;
use crate::host::{PackageDescriptor, PackageLookup};
use std::collections::HashSet;
use tracing::debug;

/// Built-in modules ship with the editor and have no directory to move.
pub const BUILTIN_MODULE_PREFIX: &str = "com.unity.modules.";

/// Expands a package into itself plus the packages it depends on.
pub struct DependencyExpander<'a> {
    lookup: &'a dyn PackageLookup,
    builtin_prefix: &'a str,
}

impl<'a> DependencyExpander<'a> {
    pub fn new(lookup: &'a dyn PackageLookup, builtin_prefix: &'a str) -> Self {
        Self {
            lookup,
            builtin_prefix,
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        !self.builtin_prefix.is_empty() && name.starts_with(self.builtin_prefix)
    }

    /// Dependencies first (depth-first, post-order), root last. Each package appears once.
    pub fn expand(&self, root: PackageDescriptor) -> Vec<PackageDescriptor> {
        let mut visited = HashSet::new();
        visited.insert(root.name.clone());

        let mut ordered = Vec::new();
        for name in &root.dependencies {
            self.visit(name, &mut visited, &mut ordered);
        }
        ordered.push(root);
        ordered
    }

    fn visit(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        ordered: &mut Vec<PackageDescriptor>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }

        if self.is_builtin(name) {
            debug!("Skipping built-in module {}", name);
            return;
        }

        let descriptor = match self.resolve(name) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                debug!("{}, skipping", e);
                return;
            }
        };

        for dependency in &descriptor.dependencies {
            self.visit(dependency, visited, ordered);
        }
        ordered.push(descriptor);
    }

    fn resolve(&self, name: &str) -> Result<PackageDescriptor, RelocateError> {
        self.lookup
            .find_package(name)
            .ok_or_else(|| RelocateError::DependencyUnresolved(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeLookup {
        packages: HashMap<String, PackageDescriptor>,
    }

    impl FakeLookup {
        fn new(packages: Vec<PackageDescriptor>) -> Self {
            Self {
                packages: packages
                    .into_iter()
                    .map(|p| (p.name.clone(), p))
                    .collect(),
            }
        }
    }

    impl PackageLookup for FakeLookup {
        fn find_package(&self, query: &str) -> Option<PackageDescriptor> {
            self.packages.get(query).cloned()
        }
    }

    fn package(name: &str, deps: &[&str]) -> PackageDescriptor {
        PackageDescriptor::new(name, format!("/project/Packages/{}", name))
            .with_dependencies(deps.iter().copied())
    }

    fn names(batch: &[PackageDescriptor]) -> Vec<&str> {
        batch.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn excludes_builtin_modules_and_puts_root_last() {
        let lookup = FakeLookup::new(vec![package("pkgB", &[])]);
        let expander = DependencyExpander::new(&lookup, BUILTIN_MODULE_PREFIX);

        let batch = expander.expand(package("pkgA", &["com.unity.modules.ui", "pkgB"]));
        assert_eq!(names(&batch), vec!["pkgB", "pkgA"]);
    }

    #[test]
    fn builtin_modules_are_excluded_even_when_resolvable() {
        let lookup = FakeLookup::new(vec![package("com.unity.modules.physics", &[])]);
        let expander = DependencyExpander::new(&lookup, BUILTIN_MODULE_PREFIX);

        let batch = expander.expand(package("pkgA", &["com.unity.modules.physics"]));
        assert!(batch.iter().all(|p| !p.name.starts_with(BUILTIN_MODULE_PREFIX)));
        assert_eq!(names(&batch), vec!["pkgA"]);
    }

    #[test]
    fn unresolvable_dependencies_are_dropped() {
        let lookup = FakeLookup::new(vec![package("pkgC", &[])]);
        let expander = DependencyExpander::new(&lookup, BUILTIN_MODULE_PREFIX);

        let batch = expander.expand(package("pkgA", &["ghost", "pkgC", "phantom"]));
        assert_eq!(names(&batch), vec!["pkgC", "pkgA"]);
    }

    #[test]
    fn transitive_dependencies_land_before_their_dependents() {
        let lookup = FakeLookup::new(vec![
            package("pkgB", &["pkgC"]),
            package("pkgC", &[]),
            package("pkgD", &["pkgC"]),
        ]);
        let expander = DependencyExpander::new(&lookup, BUILTIN_MODULE_PREFIX);

        let batch = expander.expand(package("pkgA", &["pkgB", "pkgD"]));
        assert_eq!(names(&batch), vec!["pkgC", "pkgB", "pkgD", "pkgA"]);
    }

    #[test]
    fn cycles_back_to_root_do_not_duplicate_it() {
        let lookup = FakeLookup::new(vec![package("pkgB", &["pkgA"])]);
        let expander = DependencyExpander::new(&lookup, BUILTIN_MODULE_PREFIX);

        let batch = expander.expand(package("pkgA", &["pkgB", "pkgB"]));
        assert_eq!(names(&batch), vec!["pkgB", "pkgA"]);
    }

    #[test]
    fn shared_dependency_is_emitted_once_at_first_visit() {
        let lookup = FakeLookup::new(vec![
            package("pkgB", &["pkgD"]),
            package("pkgC", &["pkgD"]),
            package("pkgD", &[]),
        ]);
        let expander = DependencyExpander::new(&lookup, BUILTIN_MODULE_PREFIX);

        let batch = expander.expand(package("pkgA", &["pkgB", "pkgC", "pkgD"]));
        assert_eq!(names(&batch), vec!["pkgD", "pkgB", "pkgC", "pkgA"]);
    }

    #[test]
    fn empty_prefix_disables_builtin_filter() {
        let lookup = FakeLookup::new(vec![package("com.unity.modules.ui", &[])]);
        let expander = DependencyExpander::new(&lookup, "");

        let batch = expander.expand(package("pkgA", &["com.unity.modules.ui"]));
        assert_eq!(names(&batch), vec!["com.unity.modules.ui", "pkgA"]);
    }
}
