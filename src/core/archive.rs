/// Archive naming and backup directory preparation
///
/// Maps resource names to on-disk archive paths and back. Path derivation is
/// pure apart from the existence probes in `resolve_archive_argument`;
/// only `ensure_directory` writes to the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{BackupToolError, Result};
use crate::utils::{is_dir_writable, COMPRESSED_EXTENSION, UNCOMPRESSED_EXTENSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Volume,
    Image,
}

/// Everything needed to name one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    pub resource_name: String,
    pub directory: PathBuf,
    pub compressed: bool,
    pub kind: ResourceKind,
}

impl ArchiveDescriptor {
    pub fn volume(name: impl Into<String>, directory: impl Into<PathBuf>, compressed: bool) -> Self {
        Self {
            resource_name: name.into(),
            directory: directory.into(),
            compressed,
            kind: ResourceKind::Volume,
        }
    }

    pub fn image(reference: impl Into<String>, directory: impl Into<PathBuf>, compressed: bool) -> Self {
        Self {
            resource_name: reference.into(),
            directory: directory.into(),
            compressed,
            kind: ResourceKind::Image,
        }
    }

    /// Archive file name without directory
    pub fn file_name(&self) -> String {
        let stem = match self.kind {
            ResourceKind::Volume => self.resource_name.clone(),
            ResourceKind::Image => sanitize_image_name(&self.resource_name),
        };
        format!("{}{}", stem, archive_extension(self.compressed))
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(self.file_name())
    }
}

pub fn archive_extension(compressed: bool) -> &'static str {
    if compressed {
        COMPRESSED_EXTENSION
    } else {
        UNCOMPRESSED_EXTENSION
    }
}

/// Compute the canonical archive path for a resource
pub fn resolve_backup_path(
    kind: ResourceKind,
    resource_name: &str,
    directory: &Path,
    compressed: bool,
) -> PathBuf {
    ArchiveDescriptor {
        resource_name: resource_name.to_string(),
        directory: directory.to_path_buf(),
        compressed,
        kind,
    }
    .path()
}

/// Make an image reference filesystem-safe: `/` and `:` become `_`, runs of
/// `_` collapse to one, leading/trailing `_` are trimmed
pub fn sanitize_image_name(reference: &str) -> String {
    let mut out = String::with_capacity(reference.len());
    for ch in reference.chars() {
        let ch = if ch == '/' || ch == ':' { '_' } else { ch };
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('_').to_string()
}

/// Whether a path names a gzip-compressed archive
pub fn is_compressed_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(COMPRESSED_EXTENSION))
        .unwrap_or(false)
}

/// Strip directory and `.tar.gz` / `.tar` suffix from an archive path
pub fn resolve_restore_resource_name(archive_path: &Path) -> Result<String> {
    let file_name = archive_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BackupToolError::InvalidArchiveFormat(archive_path.to_path_buf()))?;

    let stem = file_name
        .strip_suffix(COMPRESSED_EXTENSION)
        .or_else(|| file_name.strip_suffix(UNCOMPRESSED_EXTENSION))
        .ok_or_else(|| BackupToolError::InvalidArchiveFormat(archive_path.to_path_buf()))?;

    if stem.is_empty() {
        return Err(BackupToolError::InvalidArchiveFormat(archive_path.to_path_buf()));
    }

    Ok(stem.to_string())
}

/// Best-effort image reference recovered from an archive file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredImageName {
    pub reference: String,
    /// The file name contained separators that could map to more than one
    /// reference (`nginx_latest` vs `nginx:latest`)
    pub ambiguous: bool,
}

/// Reverse of `sanitize_image_name`, lossy: `___` becomes `/` and the last
/// remaining `_` becomes the tag separator `:`
pub fn infer_image_name(archive_path: &Path) -> Result<InferredImageName> {
    let stem = resolve_restore_resource_name(archive_path)?;
    let ambiguous = stem.contains('_');

    let mut reference = stem.replace("___", "/");
    if let Some(idx) = reference.rfind('_') {
        reference.replace_range(idx..idx + 1, ":");
    }

    Ok(InferredImageName {
        reference,
        ambiguous,
    })
}

/// Map a restore argument to an archive path. Paths that exist or are
/// absolute are taken as given; anything else is looked up in `backup_dir`,
/// trying the archive extensions when the argument has none.
pub fn resolve_archive_argument(arg: &str, backup_dir: &Path) -> PathBuf {
    let given = PathBuf::from(arg);
    if given.is_absolute() || given.exists() {
        return given;
    }

    let joined = backup_dir.join(&given);
    if joined.exists() || arg.ends_with(UNCOMPRESSED_EXTENSION) || arg.ends_with(COMPRESSED_EXTENSION) {
        return joined;
    }

    [COMPRESSED_EXTENSION, UNCOMPRESSED_EXTENSION]
        .iter()
        .map(|ext| backup_dir.join(format!("{}{}", arg, ext)))
        .find(|candidate| candidate.exists())
        .unwrap_or(joined)
}

/// Ensure `dir` exists and is writable, creating it recursively if needed
pub fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.is_dir() && is_dir_writable(dir) {
        return Ok(());
    }

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| BackupToolError::Directory {
            path: dir.to_path_buf(),
            message: format!("cannot create directory: {}", e),
        })?;
        tracing::info!("Created backup directory {}", dir.display());
    } else if !dir.is_dir() {
        return Err(BackupToolError::Directory {
            path: dir.to_path_buf(),
            message: "path exists but is not a directory".to_string(),
        });
    }

    // Re-check: creation can succeed under a parent that rejects writes
    if !is_dir_writable(dir) {
        return Err(BackupToolError::Directory {
            path: dir.to_path_buf(),
            message: "directory is not writable".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_volume_paths() {
        let dir = Path::new("/tmp/b");
        assert_eq!(
            resolve_backup_path(ResourceKind::Volume, "app-data", dir, true),
            PathBuf::from("/tmp/b/app-data.tar.gz")
        );
        assert_eq!(
            resolve_backup_path(ResourceKind::Volume, "app-data", dir, false),
            PathBuf::from("/tmp/b/app-data.tar")
        );
    }

    #[test]
    fn test_resolve_archive_argument() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app-data.tar.gz"), b"x").unwrap();
        fs::write(dir.path().join("db.tar"), b"x").unwrap();

        assert_eq!(
            resolve_archive_argument("/abs/x.tar", dir.path()),
            PathBuf::from("/abs/x.tar")
        );
        assert_eq!(
            resolve_archive_argument("app-data.tar.gz", dir.path()),
            dir.path().join("app-data.tar.gz")
        );
        assert_eq!(resolve_archive_argument("app-data", dir.path()), dir.path().join("app-data.tar.gz"));
        assert_eq!(resolve_archive_argument("db", dir.path()), dir.path().join("db.tar"));
        // Unknown names still resolve under the backup dir so the restore reports them
        assert_eq!(resolve_archive_argument("gone.tar", dir.path()), dir.path().join("gone.tar"));
    }

    #[test]
    fn test_sanitize_image_name() {
        assert_eq!(sanitize_image_name("nginx:latest"), "nginx_latest");
        assert_eq!(sanitize_image_name("ghcr.io/owner/app:v1"), "ghcr.io_owner_app_v1");
        assert_eq!(sanitize_image_name("localhost:5000//app::dev"), "localhost_5000_app_dev");
        assert_eq!(sanitize_image_name("/leading:"), "leading");
        assert_eq!(sanitize_image_name("sha256:abcdef012345"), "sha256_abcdef012345");
    }

    #[test]
    fn test_image_path_is_deterministic() {
        let a = ArchiveDescriptor::image("redis:7", "/b", true);
        let b = ArchiveDescriptor::image("redis:7", "/b", true);
        assert_eq!(a.path(), b.path());
        assert_eq!(a.path(), PathBuf::from("/b/redis_7.tar.gz"));
    }

    #[test]
    fn test_resolve_restore_resource_name() {
        assert_eq!(
            resolve_restore_resource_name(Path::new("/b/app-data.tar.gz")).unwrap(),
            "app-data"
        );
        assert_eq!(
            resolve_restore_resource_name(Path::new("db.v2.tar")).unwrap(),
            "db.v2"
        );
        assert!(matches!(
            resolve_restore_resource_name(Path::new("/b/app-data.zip")),
            Err(BackupToolError::InvalidArchiveFormat(_))
        ));
        assert!(resolve_restore_resource_name(Path::new("/b/.tar.gz")).is_err());
    }

    #[test]
    fn test_volume_name_round_trip() {
        let dir = Path::new("/srv/backups");
        for name in ["app-data", "a.b.c", "x_y-z", "tar", "data.tar"] {
            for compressed in [true, false] {
                let path = resolve_backup_path(ResourceKind::Volume, name, dir, compressed);
                assert_eq!(resolve_restore_resource_name(&path).unwrap(), name);
            }
        }
    }

    #[test]
    fn test_infer_image_name() {
        let inferred = infer_image_name(Path::new("/b/nginx_latest.tar.gz")).unwrap();
        assert_eq!(inferred.reference, "nginx:latest");
        assert!(inferred.ambiguous);

        let inferred = infer_image_name(Path::new("/b/busybox.tar")).unwrap();
        assert_eq!(inferred.reference, "busybox");
        assert!(!inferred.ambiguous);

        let inferred = infer_image_name(Path::new("/b/owner___app_v2.tar")).unwrap();
        assert_eq!(inferred.reference, "owner/app:v2");
    }

    #[test]
    fn test_ensure_directory_creates_nested() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_directory(&nested).unwrap();
    }

    // procfs refuses new files even for root, unlike permission bits
    #[cfg(target_os = "linux")]
    #[test]
    fn test_ensure_directory_rechecks_writability() {
        match ensure_directory(Path::new("/proc")) {
            Err(BackupToolError::Directory { message, .. }) => {
                assert_eq!(message, "directory is not writable")
            }
            other => panic!("expected Directory error, got {:?}", other),
        }

        match ensure_directory(Path::new("/proc/docker-backup-test/nested")) {
            Err(BackupToolError::Directory { message, .. }) => {
                assert!(message.starts_with("cannot create directory"))
            }
            other => panic!("expected Directory error, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_directory_rejects_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ensure_directory(&file),
            Err(BackupToolError::Directory { .. })
        ));
    }
}
