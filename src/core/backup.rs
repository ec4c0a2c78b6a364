/// Backup orchestration for volumes and images
///
/// Volume archives are produced by `tar` inside a disposable helper
/// container; image archives come from `docker save`, gzipped locally.
/// Per-resource methods never return errors: every failure becomes a
/// `Failed` outcome so batches keep going.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::core::archive::{ensure_directory, ArchiveDescriptor};
use crate::core::compression::gzip_file;
use crate::core::docker::{mount_spec, DockerGateway, DockerImageInfo, DockerVolumeInfo};
use crate::core::error::{BackupToolError, Result};
use crate::core::identifier::{validate_image_id, validate_volume_name};
use crate::core::outcome::{OperationKind, OperationOutcome};
use crate::core::path_mapping::PathMapper;
use crate::utils::{BACKUP_MOUNT, STAGING_PREFIX, VOLUME_MOUNT};

pub struct BackupService<G: DockerGateway> {
    docker: G,
    path_mapper: Arc<dyn PathMapper>,
    helper_image: String,
}

impl<G: DockerGateway> BackupService<G> {
    pub fn new(docker: G, path_mapper: Arc<dyn PathMapper>, helper_image: impl Into<String>) -> Self {
        Self {
            docker,
            path_mapper,
            helper_image: helper_image.into(),
        }
    }

    pub async fn list_available_volumes(&self) -> Result<Vec<DockerVolumeInfo>> {
        self.docker.list_volumes().await
    }

    pub async fn list_available_images(&self) -> Result<Vec<DockerImageInfo>> {
        self.docker.list_images().await
    }

    /// Back up each volume in order. Only directory preparation can fail the
    /// whole batch; each name yields exactly one outcome.
    pub async fn backup_volumes(
        &self,
        names: &[String],
        directory: &Path,
        compress: bool,
    ) -> Result<Vec<OperationOutcome>> {
        ensure_directory(directory)?;

        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            outcomes.push(self.backup_single_volume(name, directory, compress).await);
        }
        Ok(outcomes)
    }

    pub async fn backup_single_volume(
        &self,
        name: &str,
        directory: &Path,
        compress: bool,
    ) -> OperationOutcome {
        let started = Instant::now();
        tracing::info!(volume = name, directory = %directory.display(), compress, "Backing up volume");

        let outcome = match self.run_volume_backup(name, directory, compress, started).await {
            Ok(outcome) => outcome,
            Err(e) => OperationOutcome::failed(name, OperationKind::BackupVolume, started, e.to_string()),
        };
        log_outcome(&outcome);
        outcome
    }

    async fn run_volume_backup(
        &self,
        name: &str,
        directory: &Path,
        compress: bool,
        started: Instant,
    ) -> Result<OperationOutcome> {
        let volume = validate_volume_name(name)?;
        ensure_directory(directory)?;

        if !self.docker.volume_exists(volume.as_str()).await? {
            return Err(BackupToolError::Backup(format!("Volume '{}' not found", volume)));
        }

        let descriptor = ArchiveDescriptor::volume(volume.as_str(), directory, compress);
        let archive_path = descriptor.path();
        if archive_path.exists() {
            return Ok(OperationOutcome::skipped(
                name,
                OperationKind::BackupVolume,
                started,
                format!("File already exists: {}", archive_path.display()),
                Some(&archive_path),
            ));
        }

        let host_dir = self.path_mapper.to_host(directory);
        let tar_flags = if compress { "czf" } else { "cf" };
        let args = vec![
            "-v".to_string(),
            mount_spec(volume.as_str(), VOLUME_MOUNT, true),
            "-v".to_string(),
            mount_spec(&host_dir.to_string_lossy(), BACKUP_MOUNT, false),
            self.helper_image.clone(),
            "tar".to_string(),
            tar_flags.to_string(),
            format!("{}/{}", BACKUP_MOUNT, descriptor.file_name()),
            "-C".to_string(),
            VOLUME_MOUNT.to_string(),
            ".".to_string(),
        ];

        match self.docker.run_container(&args).await {
            Ok(result) if result.succeeded() => {}
            Ok(result) => {
                remove_partial(&archive_path);
                return Err(BackupToolError::Backup(result.error_text()));
            }
            Err(e) => {
                remove_partial(&archive_path);
                return Err(e);
            }
        }

        // The container can exit 0 while writing somewhere we don't see
        let size = archive_size(&archive_path)?;
        Ok(OperationOutcome::success(
            name,
            OperationKind::BackupVolume,
            started,
            &archive_path,
            Some(size),
        ))
    }

    pub async fn backup_images(
        &self,
        references: &[String],
        directory: &Path,
        compress: bool,
    ) -> Result<Vec<OperationOutcome>> {
        ensure_directory(directory)?;

        let mut outcomes = Vec::with_capacity(references.len());
        for reference in references {
            outcomes.push(self.backup_single_image(reference, directory, compress).await);
        }
        Ok(outcomes)
    }

    pub async fn backup_single_image(
        &self,
        reference: &str,
        directory: &Path,
        compress: bool,
    ) -> OperationOutcome {
        let started = Instant::now();
        tracing::info!(image = reference, directory = %directory.display(), compress, "Backing up image");

        let outcome = match self.run_image_backup(reference, directory, compress, started).await {
            Ok(outcome) => outcome,
            Err(e) => OperationOutcome::failed(reference, OperationKind::BackupImage, started, e.to_string()),
        };
        log_outcome(&outcome);
        outcome
    }

    async fn run_image_backup(
        &self,
        reference: &str,
        directory: &Path,
        compress: bool,
        started: Instant,
    ) -> Result<OperationOutcome> {
        let image = validate_image_id(reference)?;
        ensure_directory(directory)?;

        if !self.docker.image_exists(image.as_str()).await? {
            return Err(BackupToolError::Backup(format!("Image '{}' not found", image)));
        }

        let archive_path = ArchiveDescriptor::image(image.as_str(), directory, compress).path();
        if archive_path.exists() {
            return Ok(OperationOutcome::skipped(
                reference,
                OperationKind::BackupImage,
                started,
                format!("File already exists: {}", archive_path.display()),
                Some(&archive_path),
            ));
        }

        if compress {
            // Cleaned up on drop, whichever way this block exits
            let staged = tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .suffix(".tar")
                .tempfile_in(directory)?;

            let result = self.docker.save_image(image.as_str(), staged.path()).await?;
            if !result.succeeded() {
                return Err(BackupToolError::Backup(result.error_text()));
            }

            let source = staged.path().to_path_buf();
            let destination = archive_path.clone();
            tokio::task::spawn_blocking(move || gzip_file(&source, &destination))
                .await
                .map_err(|e| BackupToolError::Compression(e.to_string()))??;
        } else {
            match self.docker.save_image(image.as_str(), &archive_path).await {
                Ok(result) if result.succeeded() => {}
                Ok(result) => {
                    remove_partial(&archive_path);
                    return Err(BackupToolError::Backup(result.error_text()));
                }
                Err(e) => {
                    remove_partial(&archive_path);
                    return Err(e);
                }
            }
        }

        let size = archive_size(&archive_path)?;
        Ok(OperationOutcome::success(
            reference,
            OperationKind::BackupImage,
            started,
            &archive_path,
            Some(size),
        ))
    }
}

fn archive_size(archive_path: &Path) -> Result<u64> {
    match std::fs::metadata(archive_path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        _ => Err(BackupToolError::Backup(format!(
            "archive was not created at {}",
            archive_path.display()
        ))),
    }
}

/// A failed run may leave a truncated archive that would make the next run
/// skip; the path did not exist before this run started
fn remove_partial(archive_path: &Path) {
    if archive_path.exists() {
        if let Err(e) = std::fs::remove_file(archive_path) {
            tracing::warn!("Failed to remove partial archive {}: {}", archive_path.display(), e);
        }
    }
}

pub(crate) fn log_outcome(outcome: &OperationOutcome) {
    match outcome.message() {
        Some(message) if outcome.is_failed() => tracing::warn!(
            resource = %outcome.resource_name(),
            operation = %outcome.kind(),
            status = %outcome.status(),
            "{}",
            message
        ),
        _ => tracing::info!(
            resource = %outcome.resource_name(),
            operation = %outcome.kind(),
            status = %outcome.status(),
            elapsed_ms = outcome.duration().as_millis() as u64,
            "Operation finished"
        ),
    }
}
