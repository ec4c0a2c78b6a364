/// Translation between this process's view of a path and the Docker host's
///
/// Bind-mount sources handed to `docker run -v` are resolved by the daemon on
/// the host. When this tool itself runs inside a container, a backup directory
/// like `/app/backups` must be rewritten to its host location first.

use std::path::{Path, PathBuf};

pub trait PathMapper: Send + Sync {
    /// Host-side path for a path as seen by this process
    fn to_host(&self, path: &Path) -> PathBuf;
}

/// Running directly on the Docker host
#[derive(Debug, Clone, Default)]
pub struct IdentityPathMapper;

impl PathMapper for IdentityPathMapper {
    fn to_host(&self, path: &Path) -> PathBuf {
        absolutize(path)
    }
}

/// Running inside a container whose `container_root` is bind-mounted from
/// `host_root`
#[derive(Debug, Clone)]
pub struct PrefixPathMapper {
    container_root: PathBuf,
    host_root: PathBuf,
}

impl PrefixPathMapper {
    pub fn new(container_root: impl Into<PathBuf>, host_root: impl Into<PathBuf>) -> Self {
        Self {
            container_root: container_root.into(),
            host_root: host_root.into(),
        }
    }
}

impl PathMapper for PrefixPathMapper {
    fn to_host(&self, path: &Path) -> PathBuf {
        let path = absolutize(path);
        match path.strip_prefix(&self.container_root) {
            Ok(rest) if rest.as_os_str().is_empty() => self.host_root.clone(),
            Ok(rest) => self.host_root.join(rest),
            Err(_) => path,
        }
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
