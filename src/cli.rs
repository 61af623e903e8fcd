use crate::agents::BUILTIN_MODULE_PREFIX;
use crate::agents::project_scanner::DEFAULT_ASSET_ROOT;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pkg2asset",
    about = "Package to Asset - move packages into the Assets folder and out of the package manifest",
    version
)]
pub struct Cli {
    /// Path to the project directory (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    pub path: String,

    /// Directory, relative to the project, that receives relocated packages
    #[arg(long, default_value = DEFAULT_ASSET_ROOT, global = true)]
    pub asset_root: String,

    /// Packages whose name starts with this prefix are built-in and never moved
    #[arg(long, default_value = BUILTIN_MODULE_PREFIX, global = true)]
    pub builtin_prefix: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move a package into the asset tree, excluding its dependencies
    Move {
        /// Package name, or a path to the package (or any file inside it)
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Show what would be moved without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Move a package and the packages it depends on into the asset tree
    MoveWithDeps {
        /// Package name, or a path to the package (or any file inside it)
        #[arg(value_name = "PACKAGE")]
        package: String,

        /// Show what would be moved without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List packages that can be moved
    List,
}
