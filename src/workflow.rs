use crate::agents::relocator::destination_for;
use crate::agents::{
    DependencyExpander, PackageLocator, PackageRelocator, ProjectInfo, ProjectScannerAgent,
    RelocationBatch, RelocationReport,
};
use crate::error::{RelocateError, Result};
use crate::host::manifest::read_dependencies;
use crate::host::{HostFactory, PackageDescriptor, PackageLookup};
use crate::utils::project_lock::ProjectLock;
use colored::Colorize;
use std::path::Path;

/// Settings shared by the move commands.
#[derive(Debug, Clone)]
pub struct MoveOptions<'a> {
    pub package: &'a str,
    pub include_dependencies: bool,
    pub dry_run: bool,
    pub asset_root: &'a str,
    pub builtin_prefix: &'a str,
    pub show_progress: bool,
}

/// Execute the move workflow
pub fn execute_move<P: AsRef<Path>>(project_path: P, options: &MoveOptions<'_>) -> Result<()> {
    let project_path = project_path.as_ref();
    let mode = if options.include_dependencies {
        "including dependencies"
    } else {
        "excluding dependencies"
    };
    println!(
        "{}",
        format!("Moving package to {} ({})...", options.asset_root, mode)
            .cyan()
            .bold()
    );

    // Step 1: Validate project structure
    println!("\n{}", "1. Validating project structure...".yellow());
    let scanner = ProjectScannerAgent::new(project_path, options.asset_root);
    let project_info = scanner.validate()?;
    println!("{}", "✓ Project structure is valid".green());

    // Step 2: Resolve the selected package
    println!("\n{}", "2. Resolving package...".yellow());
    let locator = PackageLocator::new(project_info.clone());
    let Some(selected) = locator.find_package(options.package) else {
        let outcome = RelocateError::SelectionNotFound(options.package.to_string());
        println!("{}", format!("⚠ Nothing to move: {}", outcome).yellow());
        return Ok(());
    };
    println!(
        "{}",
        format!(
            "✓ Found {} ({})",
            selected.name,
            selected.source_path.display()
        )
        .green()
    );

    // Step 3: Build the batch
    println!("\n{}", "3. Building relocation batch...".yellow());
    let batch = if options.include_dependencies {
        let expander = DependencyExpander::new(&locator, options.builtin_prefix);
        RelocationBatch::new(expander.expand(selected))
    } else {
        RelocationBatch::single(selected)
    };
    print_batch(&project_info, &batch)?;

    if options.dry_run {
        println!(
            "\n{}",
            "Dry run: no directories were moved and the manifest was not changed.".dimmed()
        );
        return Ok(());
    }

    // Step 4: Relocate
    println!(
        "\n{}",
        format!("4. Relocating {} package(s)...", batch.len()).yellow()
    );
    let _lock = ProjectLock::acquire(&project_info.project_root)?;
    let host = HostFactory::create_cli(&project_info, options.show_progress);
    let relocator = PackageRelocator::new(
        &project_info.asset_root,
        host.registry,
        host.session,
        host.progress,
    );
    let report = relocator.relocate(&batch)?;
    println!("{}", "✓ Relocation completed".green());

    print_relocation_report(&project_info, &report);

    println!(
        "\n{}",
        "✨ Packages moved to the asset tree successfully!"
            .green()
            .bold()
    );
    Ok(())
}

fn print_batch(project: &ProjectInfo, batch: &RelocationBatch) -> Result<()> {
    let total = batch.len();
    for (index, package) in batch.iter().enumerate() {
        let destination = destination_for(&project.asset_root, package)?;
        println!(
            "   {} {} {} → {}",
            format!("{}/{}", index + 1, total).dimmed(),
            package.name.bright_cyan(),
            display_relative(project, &package.source_path).dimmed(),
            display_relative(project, &destination)
        );
    }
    Ok(())
}

fn print_relocation_report(project: &ProjectInfo, report: &RelocationReport) {
    if report.is_empty() {
        println!("\n{}", "No packages were moved".yellow());
        return;
    }

    println!("\n{}", "Relocation Summary:".cyan().bold());
    for package in &report.relocated {
        println!(
            "  • {} {} {} {}",
            package.name.white().bold(),
            display_relative(project, &package.source).dimmed(),
            "→".dimmed(),
            display_relative(project, &package.destination).green()
        );
    }
}

/// Execute the list workflow - display all relocatable packages
pub fn execute_list<P: AsRef<Path>>(
    project_path: P,
    asset_root: &str,
    builtin_prefix: &str,
) -> Result<()> {
    let project_path = project_path.as_ref();
    println!("{}", "Listing packages that can be moved...".cyan().bold());

    // Step 1: Validate project structure
    println!("\n{}", "1. Validating project structure...".yellow());
    let scanner = ProjectScannerAgent::new(project_path, asset_root);
    let project_info = scanner.validate()?;
    println!("{}", "✓ Project structure is valid".green());

    // Step 2: Scan package areas
    println!("\n{}", "2. Scanning packages...".yellow());
    let manifest = read_dependencies(&project_info.manifest_path)?;
    let locator = PackageLocator::new(project_info.clone());
    let packages: Vec<PackageDescriptor> = locator
        .list_packages()
        .into_iter()
        .filter(|package| builtin_prefix.is_empty() || !package.name.starts_with(builtin_prefix))
        .collect();
    println!("{}", "✓ Scan completed".green());

    if packages.is_empty() {
        println!("\n{}", "No movable packages were found".yellow());
        return Ok(());
    }

    println!("\n{}", "📦 Packages:".cyan().bold());
    for package in &packages {
        let version = package.version.as_deref().unwrap_or("?");
        let listed = if manifest.contains_key(&package.name) {
            "in manifest".green()
        } else {
            "not in manifest".dimmed()
        };
        println!(
            "  {} {} [{}] ({})",
            package.name.cyan(),
            version.white(),
            package.source.to_string().magenta(),
            listed
        );
    }

    println!("\n{}", "Summary:".cyan().bold());
    println!("  {} packages", packages.len().to_string().yellow());

    Ok(())
}

fn display_relative(project: &ProjectInfo, path: &Path) -> String {
    path.strip_prefix(&project.project_root)
        .unwrap_or(path)
        .display()
        .to_string()
}
