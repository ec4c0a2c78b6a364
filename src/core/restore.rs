/// Restore orchestration for volumes and images
///
/// Volume archives are verified (`tar t`) and extracted by disposable helper
/// containers; image archives are handed to `docker load`, gunzipped to a
/// temporary file first when compressed.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::core::archive::{infer_image_name, is_compressed_archive, resolve_restore_resource_name};
use crate::core::backup::log_outcome;
use crate::core::compression::gunzip_to_temp;
use crate::core::docker::{mount_spec, DockerGateway, ProcessResult};
use crate::core::error::{BackupToolError, Result};
use crate::core::identifier::{validate_image_id, validate_volume_name, VolumeName};
use crate::core::outcome::{OperationKind, OperationOutcome};
use crate::core::path_mapping::PathMapper;
use crate::utils::{
    is_file_readable, BACKUP_MOUNT, COMPRESSED_EXTENSION, STAGING_PREFIX, UNCOMPRESSED_EXTENSION, VOLUME_MOUNT,
};

/// An archive found in a backup directory
#[derive(Debug, Clone)]
pub struct BackupFileInfo {
    pub path: PathBuf,
    pub file_name: String,
    /// File name without the archive extension
    pub resource_name: String,
    pub compressed: bool,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Glob `directory` (non-recursively) for `*.tar` and `*.tar.gz` archives
pub fn list_available_backups(directory: &Path) -> Result<Vec<BackupFileInfo>> {
    if !directory.is_dir() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();

        if file_name.starts_with(STAGING_PREFIX) || !path.is_file() {
            continue;
        }
        if !(file_name.ends_with(COMPRESSED_EXTENSION) || file_name.ends_with(UNCOMPRESSED_EXTENSION)) {
            continue;
        }
        let Ok(resource_name) = resolve_restore_resource_name(&path) else {
            continue;
        };

        let metadata = entry.metadata()?;
        backups.push(BackupFileInfo {
            compressed: is_compressed_archive(&path),
            path,
            file_name,
            resource_name,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
        });
    }

    backups.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(backups)
}

pub struct RestoreService<G: DockerGateway> {
    docker: G,
    path_mapper: Arc<dyn PathMapper>,
    helper_image: String,
}

impl<G: DockerGateway> RestoreService<G> {
    pub fn new(docker: G, path_mapper: Arc<dyn PathMapper>, helper_image: impl Into<String>) -> Self {
        Self {
            docker,
            path_mapper,
            helper_image: helper_image.into(),
        }
    }

    pub fn list_available_backups(&self, directory: &Path) -> Result<Vec<BackupFileInfo>> {
        list_available_backups(directory)
    }

    pub async fn restore_volumes(
        &self,
        archives: &[PathBuf],
        overwrite: bool,
        create_volumes: bool,
    ) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::with_capacity(archives.len());
        for archive in archives {
            outcomes.push(self.restore_single_volume(archive, overwrite, create_volumes).await);
        }
        outcomes
    }

    pub async fn restore_single_volume(
        &self,
        archive: &Path,
        overwrite: bool,
        create_volume: bool,
    ) -> OperationOutcome {
        let started = Instant::now();
        tracing::info!(archive = %archive.display(), overwrite, create_volume, "Restoring volume");

        let label = resolve_restore_resource_name(archive).unwrap_or_else(|_| display_name(archive));
        let outcome = match self
            .run_volume_restore(archive, overwrite, create_volume, started)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => OperationOutcome::failed(&label, OperationKind::RestoreVolume, started, e.to_string()),
        };
        log_outcome(&outcome);
        outcome
    }

    async fn run_volume_restore(
        &self,
        archive: &Path,
        overwrite: bool,
        create_volume: bool,
        started: Instant,
    ) -> Result<OperationOutcome> {
        let name = resolve_restore_resource_name(archive)?;
        let volume = validate_volume_name(&name)?;
        check_archive_readable(archive)?;

        let compressed = is_compressed_archive(archive);
        let archive_dir = archive
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let host_dir = self.path_mapper.to_host(archive_dir);
        let backup_mount = mount_spec(&host_dir.to_string_lossy(), BACKUP_MOUNT, true);
        let archive_in_container = format!("{}/{}", BACKUP_MOUNT, display_name(archive));

        self.verify_archive(&backup_mount, &archive_in_container, compressed)
            .await?;

        let exists = self.docker.volume_exists(volume.as_str()).await?;
        match (exists, overwrite, create_volume) {
            (true, false, _) => {
                return Ok(OperationOutcome::skipped(
                    volume.as_str(),
                    OperationKind::RestoreVolume,
                    started,
                    format!(
                        "Volume '{}' already exists. Use --overwrite to replace its contents",
                        volume
                    ),
                    Some(archive),
                ));
            }
            (false, _, false) => {
                return Err(BackupToolError::Restore(format!(
                    "Volume '{}' does not exist and creation disabled",
                    volume
                )));
            }
            (false, _, true) => {
                tracing::info!(volume = volume.as_str(), "Creating volume");
                self.run_helper(&volume, false, &["true"])
                    .await
                    .map_err(|e| BackupToolError::Restore(format!("cannot create volume '{}': {}", volume, e)))?;
            }
            (true, true, _) => {
                tracing::info!(volume = volume.as_str(), "Clearing existing volume contents");
                // Globs cover dotfiles; unmatched patterns are harmless under -f
                let clear = format!(
                    "rm -rf {m}/..?* {m}/.[!.]* {m}/*",
                    m = VOLUME_MOUNT
                );
                self.run_helper(&volume, false, &["sh", "-c", clear.as_str()])
                    .await
                    .map_err(|e| BackupToolError::Restore(format!("cannot clear volume '{}': {}", volume, e)))?;
            }
        }

        let tar_flags = if compressed { "xzf" } else { "xf" };
        let args = vec![
            "-v".to_string(),
            mount_spec(volume.as_str(), VOLUME_MOUNT, false),
            "-v".to_string(),
            backup_mount,
            self.helper_image.clone(),
            "tar".to_string(),
            tar_flags.to_string(),
            archive_in_container,
            "-C".to_string(),
            VOLUME_MOUNT.to_string(),
        ];
        let result = self.docker.run_container(&args).await?;
        if !result.succeeded() {
            return Err(BackupToolError::Restore(result.error_text()));
        }

        let size = self.measure_volume(&volume).await;
        Ok(OperationOutcome::success(
            volume.as_str(),
            OperationKind::RestoreVolume,
            started,
            archive,
            size,
        ))
    }

    /// List the archive's contents in a read-only container
    async fn verify_archive(&self, backup_mount: &str, archive_in_container: &str, compressed: bool) -> Result<()> {
        let list_flags = if compressed { "tzf" } else { "tf" };
        let args = vec![
            "-v".to_string(),
            backup_mount.to_string(),
            self.helper_image.clone(),
            "tar".to_string(),
            list_flags.to_string(),
            archive_in_container.to_string(),
        ];
        let result = self.docker.run_container(&args).await?;
        if !result.succeeded() {
            return Err(BackupToolError::Restore(format!(
                "integrity check failed: {}",
                result.error_text()
            )));
        }
        if result.stdout.trim().is_empty() {
            return Err(BackupToolError::Restore("archive appears empty".to_string()));
        }
        Ok(())
    }

    /// Run a command in a helper container with `volume` mounted
    async fn run_helper(&self, volume: &VolumeName, read_only: bool, command: &[&str]) -> Result<ProcessResult> {
        let mut args = vec![
            "-v".to_string(),
            mount_spec(volume.as_str(), VOLUME_MOUNT, read_only),
            self.helper_image.clone(),
        ];
        args.extend(command.iter().map(|c| c.to_string()));

        let result = self.docker.run_container(&args).await?;
        if !result.succeeded() {
            return Err(BackupToolError::DockerCommand {
                command: command.join(" "),
                message: result.error_text(),
            });
        }
        Ok(result)
    }

    /// Extracted size via `du -sb`; failures only cost the size column
    async fn measure_volume(&self, volume: &VolumeName) -> Option<u64> {
        match self.run_helper(volume, true, &["du", "-sb", VOLUME_MOUNT]).await {
            Ok(result) => {
                let size = parse_du_output(&result.stdout);
                if size.is_none() {
                    tracing::warn!(volume = volume.as_str(), "Unexpected du output: {}", result.stdout.trim());
                }
                size
            }
            Err(e) => {
                tracing::warn!(volume = volume.as_str(), "Could not measure restored size: {}", e);
                None
            }
        }
    }

    pub async fn restore_images(&self, archives: &[PathBuf], overwrite: bool) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::with_capacity(archives.len());
        for archive in archives {
            outcomes.push(self.restore_single_image(archive, overwrite).await);
        }
        outcomes
    }

    pub async fn restore_single_image(&self, archive: &Path, overwrite: bool) -> OperationOutcome {
        let started = Instant::now();
        tracing::info!(archive = %archive.display(), overwrite, "Restoring image");

        let label = infer_image_name(archive)
            .map(|n| n.reference)
            .unwrap_or_else(|_| display_name(archive));
        let outcome = match self.run_image_restore(archive, overwrite, started).await {
            Ok(outcome) => outcome,
            Err(e) => OperationOutcome::failed(&label, OperationKind::RestoreImage, started, e.to_string()),
        };
        log_outcome(&outcome);
        outcome
    }

    async fn run_image_restore(&self, archive: &Path, overwrite: bool, started: Instant) -> Result<OperationOutcome> {
        let inferred = infer_image_name(archive)?;
        let image = validate_image_id(&inferred.reference)?;
        check_archive_readable(archive)?;

        if fs::metadata(archive)?.len() == 0 {
            return Err(BackupToolError::Restore("archive appears empty".to_string()));
        }

        if inferred.ambiguous {
            tracing::warn!(
                archive = %archive.display(),
                "Image name '{}' was inferred from the file name and may not match the archived tags",
                image
            );
        }

        if self.docker.image_exists(image.as_str()).await? && !overwrite {
            return Ok(OperationOutcome::skipped(
                image.as_str(),
                OperationKind::RestoreImage,
                started,
                format!("Image '{}' already present. Use --overwrite to load it again", image),
                Some(archive),
            ));
        }

        let (result, loaded_size) = if is_compressed_archive(archive) {
            let source = archive.to_path_buf();
            // Deleted when `staged` drops, on every path out of this block
            let staged = tokio::task::spawn_blocking(move || gunzip_to_temp(&source))
                .await
                .map_err(|e| BackupToolError::Compression(e.to_string()))??;
            let size = fs::metadata(staged.path()).map(|m| m.len()).ok();
            (self.docker.load_image(staged.path()).await?, size)
        } else {
            let size = fs::metadata(archive).map(|m| m.len()).ok();
            (self.docker.load_image(archive).await?, size)
        };

        if !result.succeeded() {
            return Err(BackupToolError::Restore(result.error_text()));
        }

        let loaded = parse_loaded_images(&result.stdout);
        let mut note = if loaded.is_empty() {
            String::new()
        } else {
            format!("Loaded {}", loaded.join(", "))
        };
        if inferred.ambiguous {
            if !note.is_empty() {
                note.push_str("; ");
            }
            note.push_str(&format!("name '{}' inferred from file name", image));
        }

        Ok(if note.is_empty() {
            OperationOutcome::success(image.as_str(), OperationKind::RestoreImage, started, archive, loaded_size)
        } else {
            OperationOutcome::success_with_note(
                image.as_str(),
                OperationKind::RestoreImage,
                started,
                archive,
                loaded_size,
                note,
            )
        })
    }
}

fn check_archive_readable(archive: &Path) -> Result<()> {
    if !archive.exists() {
        return Err(BackupToolError::Restore(format!(
            "Archive not found: {}",
            archive.display()
        )));
    }
    if !is_file_readable(archive) {
        return Err(BackupToolError::Restore(format!(
            "Archive is not a readable file: {}",
            archive.display()
        )));
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// First field of `du -sb` output, e.g. `4096\t/volume`
fn parse_du_output(stdout: &str) -> Option<u64> {
    stdout.split_whitespace().next()?.parse().ok()
}

/// Names from `docker load` output lines like `Loaded image: nginx:latest`
/// or `Loaded image ID: sha256:...`
fn parse_loaded_images(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("Loaded image ID:")
                .or_else(|| line.strip_prefix("Loaded image:"))
                .map(|rest| rest.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::docker::MockDockerGateway;
    use crate::core::outcome::OperationStatus;
    use crate::core::path_mapping::IdentityPathMapper;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn ok(stdout: &str) -> ProcessResult {
        ProcessResult {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn service(mock: MockDockerGateway) -> RestoreService<MockDockerGateway> {
        RestoreService::new(mock, Arc::new(IdentityPathMapper), "alpine:latest")
    }

    fn write_archive(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"archive-bytes").unwrap();
        path
    }

    /// Which helper command a `docker run` argument vector carries
    fn command_of(args: &[String]) -> String {
        let image_idx = args.iter().position(|a| a == "alpine:latest").unwrap();
        args[image_idx + 1..].join(" ")
    }

    #[tokio::test]
    async fn test_restore_missing_archive() {
        let mut mock = MockDockerGateway::new();
        mock.expect_run_container().never();
        mock.expect_volume_exists().never();

        let outcome = service(mock)
            .restore_single_volume(Path::new("/tmp/b/missing.tar.gz"), false, true)
            .await;
        assert_eq!(outcome.status(), OperationStatus::Failed);
        assert_eq!(outcome.resource_name(), "missing");
        assert!(outcome.message().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_restore_rejects_unknown_extension() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "data.zip");

        let mock = MockDockerGateway::new();
        let outcome = service(mock).restore_single_volume(&archive, false, true).await;
        assert!(outcome.is_failed());
        assert!(outcome.message().unwrap().contains("Invalid archive format"));
    }

    #[tokio::test]
    async fn test_restore_into_new_volume() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "app-data.tar.gz");

        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().returning(|_| Ok(false));
        mock.expect_run_container().returning(move |args: &[String]| {
            let command = command_of(args);
            recorded.lock().unwrap().push(command.clone());
            if command.starts_with("tar tzf") {
                Ok(ok("./\n./db.sqlite\n"))
            } else if command.starts_with("du") {
                Ok(ok("1500\t/volume\n"))
            } else {
                Ok(ok(""))
            }
        });

        let outcome = service(mock).restore_single_volume(&archive, false, true).await;
        assert!(outcome.is_success(), "{:?}", outcome.message());
        assert_eq!(outcome.resource_name(), "app-data");
        assert_eq!(outcome.size_bytes(), Some(1500));

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "tar tzf /backup/app-data.tar.gz".to_string(),
                "true".to_string(),
                "tar xzf /backup/app-data.tar.gz -C /volume".to_string(),
                "du -sb /volume".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_restore_existing_without_overwrite_skips() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "app-data.tar");

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().returning(|_| Ok(true));
        mock.expect_run_container()
            .times(1)
            .withf(|args: &[String]| command_of(args).starts_with("tar tf"))
            .returning(|_| Ok(ok("./file\n")));

        let outcome = service(mock).restore_single_volume(&archive, false, true).await;
        assert!(outcome.is_skipped());
        assert!(outcome.message().unwrap().contains("--overwrite"));
    }

    #[tokio::test]
    async fn test_restore_overwrite_clears_before_extract() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "app-data.tar.gz");

        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().returning(|_| Ok(true));
        mock.expect_run_container().returning(move |args: &[String]| {
            let command = command_of(args);
            recorded.lock().unwrap().push(command.clone());
            if command.starts_with("tar tzf") {
                Ok(ok("./a\n"))
            } else {
                Ok(ok(""))
            }
        });

        let outcome = service(mock).restore_single_volume(&archive, true, true).await;
        assert!(outcome.is_success());
        // du printed nothing parseable
        assert_eq!(outcome.size_bytes(), None);

        let calls = calls.lock().unwrap();
        let clear = calls.iter().position(|c| c.starts_with("sh -c rm -rf")).unwrap();
        let extract = calls.iter().position(|c| c.starts_with("tar xzf")).unwrap();
        assert!(clear < extract);
        assert!(calls[clear].contains("/volume/.[!.]*"));
    }

    #[tokio::test]
    async fn test_restore_daemon_error_never_treats_volume_as_new() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "web.tar.gz");

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().returning(|_| {
            Err(BackupToolError::DockerCommand {
                command: "docker volume inspect -- web".to_string(),
                message: "permission denied while trying to connect to the Docker daemon socket".to_string(),
            })
        });
        // Only the integrity listing runs; no create, clear or extract
        mock.expect_run_container()
            .times(1)
            .withf(|args: &[String]| command_of(args).starts_with("tar tzf"))
            .returning(|_| Ok(ok("./index.html\n")));

        let outcome = service(mock).restore_single_volume(&archive, true, true).await;
        assert!(outcome.is_failed());
        assert!(outcome.message().unwrap().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_restore_missing_volume_with_creation_disabled() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "app-data.tar.gz");

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().returning(|_| Ok(false));
        mock.expect_run_container()
            .times(1)
            .returning(|_| Ok(ok("./a\n")));

        let outcome = service(mock).restore_single_volume(&archive, false, false).await;
        assert!(outcome.is_failed());
        assert!(outcome.message().unwrap().contains("creation disabled"));
    }

    #[tokio::test]
    async fn test_restore_integrity_failures() {
        let tmp = TempDir::new().unwrap();
        let corrupt = write_archive(tmp.path(), "corrupt.tar.gz");
        let empty = write_archive(tmp.path(), "empty.tar.gz");

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().never();
        mock.expect_run_container().returning(|args: &[String]| {
            if command_of(args).contains("corrupt") {
                Ok(ProcessResult {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "gzip: invalid magic".to_string(),
                })
            } else {
                Ok(ok("\n"))
            }
        });

        let svc = service(mock);
        let outcome = svc.restore_single_volume(&corrupt, false, true).await;
        assert!(outcome.message().unwrap().contains("integrity check failed"));

        let outcome = svc.restore_single_volume(&empty, false, true).await;
        assert!(outcome.message().unwrap().contains("archive appears empty"));
    }

    #[tokio::test]
    async fn test_restore_extract_failure_reports_stderr() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "app-data.tar");

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().returning(|_| Ok(false));
        mock.expect_run_container().returning(|args: &[String]| {
            let command = command_of(args);
            if command.starts_with("tar tf") {
                Ok(ok("./a\n"))
            } else if command.starts_with("tar xf") {
                Ok(ProcessResult {
                    exit_code: 2,
                    stdout: String::new(),
                    stderr: "tar: unexpected end of file".to_string(),
                })
            } else {
                Ok(ok(""))
            }
        });

        let outcome = service(mock).restore_single_volume(&archive, false, true).await;
        assert!(outcome.is_failed());
        assert!(outcome.message().unwrap().contains("unexpected end of file"));
    }

    #[tokio::test]
    async fn test_restore_volume_batch_keeps_order() {
        let tmp = TempDir::new().unwrap();
        let a = write_archive(tmp.path(), "a.tar");
        let missing = tmp.path().join("b.tar");
        let c = write_archive(tmp.path(), "c.tar");

        let mut mock = MockDockerGateway::new();
        mock.expect_volume_exists().returning(|_| Ok(true));
        mock.expect_run_container().returning(|_| Ok(ok("./x\n")));

        let outcomes = service(mock).restore_volumes(&[a, missing, c], false, true).await;
        let statuses: Vec<_> = outcomes.iter().map(|o| o.status()).collect();
        assert_eq!(
            statuses,
            vec![OperationStatus::Skipped, OperationStatus::Failed, OperationStatus::Skipped]
        );
    }

    #[tokio::test]
    async fn test_restore_image_uncompressed() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "redis_7.tar");

        let mut mock = MockDockerGateway::new();
        mock.expect_image_exists()
            .withf(|reference: &str| reference == "redis:7")
            .returning(|_| Ok(false));
        mock.expect_load_image()
            .times(1)
            .returning(|_| Ok(ok("Loaded image: redis:7\n")));

        let outcome = service(mock).restore_single_image(&archive, false).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.resource_name(), "redis:7");
        let message = outcome.message().unwrap();
        assert!(message.contains("Loaded redis:7"));
        assert!(message.contains("inferred"));
    }

    #[tokio::test]
    async fn test_restore_image_present_skips() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "busybox.tar");

        let mut mock = MockDockerGateway::new();
        mock.expect_image_exists().returning(|_| Ok(true));
        mock.expect_load_image().never();

        let outcome = service(mock).restore_single_image(&archive, false).await;
        assert!(outcome.is_skipped());
        assert!(outcome.message().unwrap().contains("already present"));
    }

    #[tokio::test]
    async fn test_restore_image_compressed_uses_temp_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("busybox.tar.gz");
        let mut encoder = GzEncoder::new(fs::File::create(&archive).unwrap(), Compression::fast());
        encoder.write_all(b"fake image tar").unwrap();
        encoder.finish().unwrap();

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        let mut mock = MockDockerGateway::new();
        mock.expect_image_exists().returning(|_| Ok(true));
        mock.expect_load_image().times(1).returning(move |path: &Path| {
            assert_eq!(fs::read(path).unwrap(), b"fake image tar");
            *seen_clone.lock().unwrap() = Some(path.to_path_buf());
            Ok(ok("Loaded image: busybox:latest\n"))
        });

        let outcome = service(mock).restore_single_image(&archive, true).await;
        assert!(outcome.is_success(), "{:?}", outcome.message());
        assert_eq!(outcome.size_bytes(), Some(14));

        let temp_path = seen.lock().unwrap().clone().unwrap();
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_restore_image_load_failure() {
        let tmp = TempDir::new().unwrap();
        let archive = write_archive(tmp.path(), "busybox.tar");

        let mut mock = MockDockerGateway::new();
        mock.expect_image_exists().returning(|_| Ok(false));
        mock.expect_load_image().returning(|_| {
            Ok(ProcessResult {
                exit_code: 1,
                stdout: String::new(),
                stderr: "open /var/lib/docker/tmp: no such file".to_string(),
            })
        });

        let outcome = service(mock).restore_single_image(&archive, false).await;
        assert!(outcome.is_failed());
        assert!(outcome.message().unwrap().contains("no such file"));
    }

    #[test]
    fn test_list_available_backups() {
        let tmp = TempDir::new().unwrap();
        write_archive(tmp.path(), "b.tar");
        write_archive(tmp.path(), "a.tar.gz");
        write_archive(tmp.path(), "notes.txt");
        write_archive(tmp.path(), ".docker-backup-x.tar");
        // Valid volume names may start with a dot
        write_archive(tmp.path(), ".cache.tar.gz");
        fs::create_dir(tmp.path().join("dir.tar")).unwrap();

        let backups = list_available_backups(tmp.path()).unwrap();
        let names: Vec<_> = backups.iter().map(|b| b.file_name.as_str()).collect();
        assert_eq!(names, vec![".cache.tar.gz", "a.tar.gz", "b.tar"]);
        assert_eq!(backups[0].resource_name, ".cache");
        assert!(backups[1].compressed);
        assert_eq!(backups[1].resource_name, "a");
        assert_eq!(backups[2].size_bytes, 13);

        assert!(list_available_backups(&tmp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_du_output("4096\t/volume\n"), Some(4096));
        assert_eq!(parse_du_output("du: unrecognized option"), None);
        assert_eq!(
            parse_loaded_images("Loaded image: nginx:latest\nLoaded image ID: sha256:abc\n"),
            vec!["nginx:latest", "sha256:abc"]
        );
    }
}
