/// CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "docker-backup")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.config/docker-backup/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Back up Docker volumes to tar archives
    #[command(name = "backup:volumes")]
    BackupVolumes(BackupArgs),

    /// Restore Docker volumes from tar archives
    #[command(name = "restore:volumes")]
    RestoreVolumes(RestoreVolumesArgs),

    /// Back up Docker images with `docker save`
    #[command(name = "backup:images")]
    BackupImages(BackupArgs),

    /// Restore Docker images with `docker load`
    #[command(name = "restore:images")]
    RestoreImages(RestoreImagesArgs),
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Volume names or image references
    pub names: Vec<String>,

    /// Directory to write archives to
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Write plain .tar instead of .tar.gz
    #[arg(long)]
    pub no_compression: bool,

    /// List what is available instead of backing up
    #[arg(short, long)]
    pub list: bool,
}

#[derive(Args, Debug)]
pub struct RestoreVolumesArgs {
    /// Archive paths, or file names inside --backup-dir
    pub archives: Vec<String>,

    /// Directory holding the archives
    #[arg(short = 'b', long)]
    pub backup_dir: Option<PathBuf>,

    /// Replace the contents of volumes that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Fail instead of creating missing volumes
    #[arg(long)]
    pub no_create_volume: bool,

    /// List the archives in --backup-dir
    #[arg(short, long)]
    pub list: bool,
}

#[derive(Args, Debug)]
pub struct RestoreImagesArgs {
    /// Archive paths, or file names inside --backup-dir
    pub archives: Vec<String>,

    /// Directory holding the archives
    #[arg(short = 'b', long)]
    pub backup_dir: Option<PathBuf>,

    /// Load images even if one with the same name is already present
    #[arg(long)]
    pub overwrite: bool,

    /// List the archives in --backup-dir
    #[arg(short, long)]
    pub list: bool,
}
