mod cli;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use cli::{BackupArgs, Cli, Commands, RestoreImagesArgs, RestoreVolumesArgs};
use docker_backup::core::archive::resolve_archive_argument;
use docker_backup::core::path_mapping::PathMapper;
use docker_backup::core::{BackupService, BatchSummary, DockerCli, DockerGateway, OperationOutcome, RestoreService};
use docker_backup::utils::{display, logger, AppConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Everything a subcommand handler needs
struct Context {
    config: AppConfig,
    docker: DockerCli,
    path_mapper: Arc<dyn PathMapper>,
}

impl Context {
    fn backup_service(&self) -> BackupService<DockerCli> {
        BackupService::new(self.docker.clone(), self.path_mapper.clone(), self.config.helper_image.clone())
    }

    fn restore_service(&self) -> RestoreService<DockerCli> {
        RestoreService::new(self.docker.clone(), self.path_mapper.clone(), self.config.helper_image.clone())
    }

    async fn require_docker(&self) -> Result<()> {
        if !self.docker.ping().await? {
            bail!(
                "Cannot reach the Docker daemon via '{}'. Is Docker running?",
                self.config.docker_binary
            );
        }
        Ok(())
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // A missing .env is fine
    dotenv::dotenv().ok();

    let config = AppConfig::load(cli.config.as_deref())?;
    let level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    logger::init(level)?;

    let ctx = Context {
        docker: DockerCli::new(config.docker_binary.clone(), config.timeout()?),
        path_mapper: config.path_mapper()?,
        config,
    };
    tracing::debug!(config = ?ctx.config, "Loaded configuration");

    match cli.command {
        Commands::BackupVolumes(args) => handle_backup_volumes(&ctx, args).await,
        Commands::RestoreVolumes(args) => handle_restore_volumes(&ctx, args).await,
        Commands::BackupImages(args) => handle_backup_images(&ctx, args).await,
        Commands::RestoreImages(args) => handle_restore_images(&ctx, args).await,
    }
}

async fn handle_backup_volumes(ctx: &Context, args: BackupArgs) -> Result<ExitCode> {
    let service = ctx.backup_service();
    let directory = args.output_dir.unwrap_or_else(|| ctx.config.backup_dir.clone());

    if args.list {
        ctx.require_docker().await?;
        let volumes = service.list_available_volumes().await?;
        display::print_volume_table(&volumes);
        return Ok(ExitCode::SUCCESS);
    }

    if args.names.is_empty() {
        return Ok(usage_error("No volumes specified. Use --list to see available volumes."));
    }

    ctx.require_docker().await?;
    println!(
        "Backing up {} volume(s) to {}\n",
        args.names.len(),
        directory.display()
    );
    let outcomes = service
        .backup_volumes(&args.names, &directory, !args.no_compression)
        .await?;
    Ok(report(&outcomes))
}

async fn handle_backup_images(ctx: &Context, args: BackupArgs) -> Result<ExitCode> {
    let service = ctx.backup_service();
    let directory = args.output_dir.unwrap_or_else(|| ctx.config.backup_dir.clone());

    if args.list {
        ctx.require_docker().await?;
        let images = service.list_available_images().await?;
        display::print_image_table(&images);
        return Ok(ExitCode::SUCCESS);
    }

    if args.names.is_empty() {
        return Ok(usage_error("No images specified. Use --list to see available images."));
    }

    ctx.require_docker().await?;
    println!(
        "Backing up {} image(s) to {}\n",
        args.names.len(),
        directory.display()
    );
    let outcomes = service
        .backup_images(&args.names, &directory, !args.no_compression)
        .await?;
    Ok(report(&outcomes))
}

async fn handle_restore_volumes(ctx: &Context, args: RestoreVolumesArgs) -> Result<ExitCode> {
    let service = ctx.restore_service();
    let directory = args.backup_dir.unwrap_or_else(|| ctx.config.backup_dir.clone());

    if args.list {
        list_backups(&service, &directory)?;
        return Ok(ExitCode::SUCCESS);
    }

    if args.archives.is_empty() {
        return Ok(usage_error("No archives specified. Use --list to see available backups."));
    }

    ctx.require_docker().await?;
    let archives = resolve_archives(&args.archives, &directory);
    println!("Restoring {} volume archive(s)\n", archives.len());
    let outcomes = service
        .restore_volumes(&archives, args.overwrite, !args.no_create_volume)
        .await;
    Ok(report(&outcomes))
}

async fn handle_restore_images(ctx: &Context, args: RestoreImagesArgs) -> Result<ExitCode> {
    let service = ctx.restore_service();
    let directory = args.backup_dir.unwrap_or_else(|| ctx.config.backup_dir.clone());

    if args.list {
        list_backups(&service, &directory)?;
        return Ok(ExitCode::SUCCESS);
    }

    if args.archives.is_empty() {
        return Ok(usage_error("No archives specified. Use --list to see available backups."));
    }

    ctx.require_docker().await?;
    let archives = resolve_archives(&args.archives, &directory);
    println!("Restoring {} image archive(s)\n", archives.len());
    let outcomes = service.restore_images(&archives, args.overwrite).await;
    Ok(report(&outcomes))
}

fn list_backups<G: DockerGateway>(service: &RestoreService<G>, directory: &Path) -> Result<()> {
    println!("Backups in {}\n", directory.display());
    let backups = service.list_available_backups(directory)?;
    display::print_backup_table(&backups);
    Ok(())
}

fn resolve_archives(args: &[String], directory: &Path) -> Vec<PathBuf> {
    args.iter()
        .map(|arg| resolve_archive_argument(arg, directory))
        .collect()
}

fn report(outcomes: &[OperationOutcome]) -> ExitCode {
    display::print_outcomes(outcomes);
    ExitCode::from(BatchSummary::from_outcomes(outcomes).exit_code() as u8)
}

fn usage_error(message: &str) -> ExitCode {
    eprintln!("{}", message.yellow());
    ExitCode::FAILURE
}
