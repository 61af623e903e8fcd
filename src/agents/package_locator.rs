use crate::agents::ProjectInfo;
use crate::host::manifest::{FILE_REFERENCE_PREFIX, read_dependencies};
use crate::host::{PackageDescriptor, PackageLookup, PackageSource};
use regex::Regex;
use semver::Version;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

pub const PACKAGE_FILE: &str = "package.json";

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9@][A-Za-z0-9._-]*$").expect("package name pattern is valid")
});

#[derive(Debug, Deserialize)]
struct PackageFile {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: Map<String, Value>,
}

pub fn is_valid_package_name(name: &str) -> bool {
    PACKAGE_NAME.is_match(name)
}

/// Finds packages of a project by name or by a path inside them.
pub struct PackageLocator {
    project: ProjectInfo,
}

impl PackageLocator {
    pub fn new(project: ProjectInfo) -> Self {
        Self { project }
    }

    /// Resolves a package name: embedded first, then `file:` references, then the package cache.
    pub fn find_by_name(&self, name: &str) -> Option<PackageDescriptor> {
        if !is_valid_package_name(name) {
            debug!("'{}' is not a valid package name", name);
            return None;
        }

        self.find_embedded(name)
            .or_else(|| self.find_local(name))
            .or_else(|| self.find_cached(name))
    }

    /// Resolves the package containing `query`, a path relative to the project root or absolute.
    pub fn find_for_path(&self, query: &str) -> Option<PackageDescriptor> {
        let path = Path::new(query);
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project.project_root.join(path)
        };

        if let Ok(canonical) = candidate.canonicalize() {
            for dir in canonical.ancestors() {
                if dir == self.project.project_root {
                    break;
                }
                // Nested package files (samples, tests) sit below the package root; keep climbing.
                if dir.join(PACKAGE_FILE).is_file() {
                    if let Some(descriptor) = self.classify(dir) {
                        return Some(descriptor);
                    }
                }
            }
        }

        // `Packages/<name>/...` also addresses a package by name, wherever it lives.
        virtual_package_name(path).and_then(|name| self.find_by_name(&name))
    }

    /// Every package that can be relocated, sorted by name.
    pub fn list_packages(&self) -> Vec<PackageDescriptor> {
        let mut seen = HashSet::new();
        let mut packages = Vec::new();

        let embedded = package_dirs(&self.project.packages_dir)
            .into_iter()
            .filter_map(|dir| read_descriptor(&dir, PackageSource::Embedded));
        let local = self
            .local_references()
            .into_iter()
            .filter_map(|(name, dir)| {
                read_descriptor(&dir, PackageSource::Local).filter(|d| d.name == name)
            });
        let cached = self
            .cached_names()
            .into_iter()
            .filter_map(|name| self.find_cached(&name));

        for descriptor in embedded.chain(local).chain(cached) {
            if seen.insert(descriptor.name.clone()) {
                packages.push(descriptor);
            }
        }

        packages.sort_by(|a, b| a.name.cmp(&b.name));
        packages
    }

    fn find_embedded(&self, name: &str) -> Option<PackageDescriptor> {
        let direct = self.project.packages_dir.join(name);
        if let Some(descriptor) = read_descriptor(&direct, PackageSource::Embedded) {
            if descriptor.name == name {
                return Some(descriptor);
            }
        }

        // Embedded folders do not have to be named after the package.
        package_dirs(&self.project.packages_dir)
            .into_iter()
            .filter(|dir| dir != &direct)
            .filter_map(|dir| read_descriptor(&dir, PackageSource::Embedded))
            .find(|descriptor| descriptor.name == name)
    }

    fn find_local(&self, name: &str) -> Option<PackageDescriptor> {
        self.local_references()
            .into_iter()
            .find(|(reference, _)| reference == name)
            .and_then(|(_, dir)| read_descriptor(&dir, PackageSource::Local))
            .filter(|descriptor| descriptor.name == name)
    }

    fn find_cached(&self, name: &str) -> Option<PackageDescriptor> {
        let prefix = format!("{}@", name);
        let entries = fs::read_dir(&self.project.package_cache_dir).ok()?;

        let best = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_str()?.to_string();
                let suffix = file_name.strip_prefix(&prefix)?.to_string();
                Some((Version::parse(&suffix).ok(), suffix, entry.path()))
            })
            .max_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)))?;

        read_descriptor(&best.2, PackageSource::Cached).filter(|descriptor| descriptor.name == name)
    }

    fn cached_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.project.package_cache_dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_str()?.to_string();
                file_name.split_once('@').map(|(name, _)| name.to_string())
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// `file:` entries of the manifest, resolved against `Packages/`.
    fn local_references(&self) -> Vec<(String, PathBuf)> {
        let dependencies = match read_dependencies(&self.project.manifest_path) {
            Ok(dependencies) => dependencies,
            Err(e) => {
                debug!("Ignoring file references: {}", e);
                return Vec::new();
            }
        };

        dependencies
            .iter()
            .filter_map(|(name, value)| {
                let reference = value.as_str()?.strip_prefix(FILE_REFERENCE_PREFIX)?;
                Some((name.clone(), self.project.packages_dir.join(reference)))
            })
            .collect()
    }

    fn classify(&self, dir: &Path) -> Option<PackageDescriptor> {
        let parent = dir.parent()?;
        if parent == self.project.packages_dir {
            return read_descriptor(dir, PackageSource::Embedded);
        }
        if parent == self.project.package_cache_dir {
            return read_descriptor(dir, PackageSource::Cached);
        }

        let is_local = self
            .local_references()
            .iter()
            .filter_map(|(_, reference)| reference.canonicalize().ok())
            .any(|reference| reference == dir);
        if is_local {
            return read_descriptor(dir, PackageSource::Local);
        }

        debug!("{} is not inside a package area", dir.display());
        None
    }
}

impl PackageLookup for PackageLocator {
    fn find_package(&self, query: &str) -> Option<PackageDescriptor> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        if query.contains(['/', '\\']) {
            self.find_for_path(query)
        } else {
            self.find_by_name(query)
        }
    }
}

fn virtual_package_name(path: &Path) -> Option<String> {
    let mut components = path.components();
    match components.next()? {
        Component::Normal(first) if first == "Packages" => {}
        _ => return None,
    }
    match components.next()? {
        Component::Normal(name) => name.to_str().map(str::to_string),
        _ => None,
    }
}

fn package_dirs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.join(PACKAGE_FILE).is_file())
        .collect();
    dirs.sort();
    dirs
}

fn read_descriptor(dir: &Path, source: PackageSource) -> Option<PackageDescriptor> {
    let package_file = dir.join(PACKAGE_FILE);
    let content = fs::read_to_string(&package_file).ok()?;
    let parsed: PackageFile = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Skipping {}: {}", package_file.display(), e);
            return None;
        }
    };
    let source_path = dir.canonicalize().ok()?;

    let mut descriptor = PackageDescriptor::new(parsed.name, source_path)
        .with_dependencies(parsed.dependencies.keys().cloned());
    descriptor.version = parsed.version;
    descriptor.source = source;
    Some(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::project_scanner::{DEFAULT_ASSET_ROOT, ProjectScannerAgent};
    use tempfile::{TempDir, tempdir};

    fn write_package(dir: &Path, name: &str, version: &str, deps: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        let deps: Map<String, Value> = deps
            .iter()
            .map(|d| (d.to_string(), Value::from("1.0.0")))
            .collect();
        let body = serde_json::json!({ "name": name, "version": version, "dependencies": deps });
        fs::write(dir.join(PACKAGE_FILE), body.to_string()).unwrap();
    }

    fn project(manifest: &str) -> (TempDir, PackageLocator) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Assets")).unwrap();
        fs::create_dir_all(dir.path().join("Packages")).unwrap();
        fs::write(dir.path().join("Packages/manifest.json"), manifest).unwrap();
        let info = ProjectScannerAgent::new(dir.path(), DEFAULT_ASSET_ROOT)
            .validate()
            .unwrap();
        (dir, PackageLocator::new(info))
    }

    #[test]
    fn finds_embedded_package_by_name() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        write_package(
            &dir.path().join("Packages/pkgA"),
            "pkgA",
            "1.0.0",
            &["com.unity.modules.ui", "pkgB"],
        );

        let descriptor = locator.find_package("pkgA").unwrap();
        assert_eq!(descriptor.name, "pkgA");
        assert_eq!(descriptor.source, PackageSource::Embedded);
        assert_eq!(descriptor.dependencies, vec!["com.unity.modules.ui", "pkgB"]);
        assert!(descriptor.source_path.is_absolute());
    }

    #[test]
    fn finds_embedded_package_in_differently_named_folder() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        write_package(
            &dir.path().join("Packages/Core"),
            "com.example.core",
            "1.0.0",
            &[],
        );

        let descriptor = locator.find_by_name("com.example.core").unwrap();
        assert!(descriptor.source_path.ends_with("Core"));
    }

    #[test]
    fn prefers_highest_cached_version() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        let cache = dir.path().join("Library/PackageCache");
        write_package(&cache.join("com.example.core@1.2.0"), "com.example.core", "1.2.0", &[]);
        write_package(&cache.join("com.example.core@1.10.0"), "com.example.core", "1.10.0", &[]);
        write_package(&cache.join("com.example.core@abcdef"), "com.example.core", "0.0.1", &[]);

        let descriptor = locator.find_by_name("com.example.core").unwrap();
        assert_eq!(descriptor.source, PackageSource::Cached);
        assert!(descriptor.source_path.ends_with("com.example.core@1.10.0"));
    }

    #[test]
    fn resolves_file_reference_from_manifest() {
        let (dir, locator) =
            project(r#"{"dependencies":{"com.example.local":"file:../Local/local-pkg"}}"#);
        write_package(
            &dir.path().join("Local/local-pkg"),
            "com.example.local",
            "0.3.0",
            &[],
        );

        let descriptor = locator.find_by_name("com.example.local").unwrap();
        assert_eq!(descriptor.source, PackageSource::Local);
        assert_eq!(descriptor.version.as_deref(), Some("0.3.0"));
    }

    #[test]
    fn resolves_path_inside_package() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        let package_dir = dir.path().join("Packages/pkgA");
        write_package(&package_dir, "pkgA", "1.0.0", &[]);
        fs::create_dir_all(package_dir.join("Runtime")).unwrap();
        fs::write(package_dir.join("Runtime/Thing.cs"), "class Thing {}").unwrap();

        let descriptor = locator.find_package("Packages/pkgA/Runtime/Thing.cs").unwrap();
        assert_eq!(descriptor.name, "pkgA");
    }

    #[test]
    fn path_below_nested_package_file_resolves_enclosing_package() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        let package_dir = dir.path().join("Library/PackageCache/pkgB@2.0.0");
        write_package(&package_dir, "pkgB", "2.0.0", &[]);
        write_package(&package_dir.join("Samples~/Demo"), "pkgB.demo", "2.0.0", &[]);
        fs::write(package_dir.join("Samples~/Demo/Scene.unity"), "scene").unwrap();

        let descriptor = locator
            .find_package("Library/PackageCache/pkgB@2.0.0/Samples~/Demo/Scene.unity")
            .unwrap();
        assert_eq!(descriptor.name, "pkgB");
        assert_eq!(descriptor.source, PackageSource::Cached);
        assert!(descriptor.source_path.ends_with("pkgB@2.0.0"));
    }

    #[test]
    fn virtual_packages_path_resolves_cached_package() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        write_package(
            &dir.path().join("Library/PackageCache/pkgB@2.0.0"),
            "pkgB",
            "2.0.0",
            &[],
        );

        let descriptor = locator.find_package("Packages/pkgB").unwrap();
        assert_eq!(descriptor.source, PackageSource::Cached);
    }

    #[test]
    fn unresolved_selection_is_none() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        fs::write(dir.path().join("Assets/readme.txt"), "hi").unwrap();

        assert!(locator.find_package("missing.package").is_none());
        assert!(locator.find_package("Assets/readme.txt").is_none());
        assert!(locator.find_package("../../etc").is_none());
        assert!(locator.find_package("").is_none());
    }

    #[test]
    fn malformed_package_file_is_unresolved() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        let package_dir = dir.path().join("Packages/broken");
        fs::create_dir_all(&package_dir).unwrap();
        fs::write(package_dir.join(PACKAGE_FILE), "{ nope").unwrap();

        assert!(locator.find_package("broken").is_none());
    }

    #[test]
    fn package_name_grammar() {
        assert!(is_valid_package_name("com.example.core"));
        assert!(is_valid_package_name("pkga"));
        assert!(!is_valid_package_name("../secret"));
        assert!(!is_valid_package_name("Has Space"));
    }

    #[test]
    fn lists_each_package_once_sorted() {
        let (dir, locator) = project(r#"{"dependencies":{}}"#);
        write_package(&dir.path().join("Packages/zeta"), "zeta", "1.0.0", &[]);
        write_package(&dir.path().join("Packages/alpha"), "alpha", "1.0.0", &[]);
        write_package(
            &dir.path().join("Library/PackageCache/alpha@0.9.0"),
            "alpha",
            "0.9.0",
            &[],
        );
        write_package(
            &dir.path().join("Library/PackageCache/beta@1.0.0"),
            "beta",
            "1.0.0",
            &[],
        );

        let names: Vec<_> = locator
            .list_packages()
            .into_iter()
            .map(|descriptor| (descriptor.name, descriptor.source))
            .collect();
        assert_eq!(
            names,
            vec![
                ("alpha".to_string(), PackageSource::Embedded),
                ("beta".to_string(), PackageSource::Cached),
                ("zeta".to_string(), PackageSource::Embedded),
            ]
        );
    }
}
