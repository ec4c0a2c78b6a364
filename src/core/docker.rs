/// Docker CLI integration
///
/// Every interaction with the Docker runtime goes through the `DockerGateway`
/// trait. `DockerCli` implements it by shelling out to the `docker` binary
/// with a hard timeout on each invocation.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::{BackupToolError, Result};
use crate::utils::APP_NAME;

/// Captured result of one external process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Best description of a failure: stderr, else stdout, else the exit code
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("process exited with code {}", self.exit_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerVolumeInfo {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImageInfo {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub size_bytes: u64,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub labels: BTreeMap<String, String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DockerGateway: Send + Sync {
    /// Whether the daemon answers at all
    async fn ping(&self) -> Result<bool>;

    async fn list_volumes(&self) -> Result<Vec<DockerVolumeInfo>>;

    async fn list_images(&self) -> Result<Vec<DockerImageInfo>>;

    async fn volume_exists(&self, name: &str) -> Result<bool>;

    async fn image_exists(&self, reference: &str) -> Result<bool>;

    /// `docker run --rm <args...>`
    async fn run_container(&self, args: &[String]) -> Result<ProcessResult>;

    /// `docker save -o <out_path> <reference>`
    async fn save_image(&self, reference: &str, out_path: &Path) -> Result<ProcessResult>;

    /// `docker load -i <in_path>`
    async fn load_image(&self, in_path: &Path) -> Result<ProcessResult>;
}

#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
    timeout: Duration,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Run one docker command, capturing output, bounded by the timeout
    async fn exec(&self, args: &[&str]) -> Result<ProcessResult> {
        let shown = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!(command = %shown, "Executing docker command");

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackupToolError::DockerCommand {
                command: shown.clone(),
                message: format!("failed to spawn: {}", e),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| BackupToolError::DockerCommand {
                command: shown.clone(),
                message: e.to_string(),
            })?,
            Err(_) => {
                // Dropping the future kills the child
                return Err(BackupToolError::Timeout {
                    command: shown,
                    timeout: self.timeout,
                });
            }
        };

        let result = ProcessResult {
            // Killed by a signal: no exit code
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.succeeded() {
            tracing::debug!(command = %shown, exit_code = result.exit_code, "Docker command exited non-zero");
        }

        Ok(result)
    }

    /// Absent only when docker answers "no such ..."; any other non-zero
    /// exit is an error
    fn inspect_outcome(&self, args: &[&str], result: ProcessResult, missing_marker: &str) -> Result<bool> {
        if result.succeeded() {
            return Ok(true);
        }
        if result.stderr.to_lowercase().contains(missing_marker) {
            return Ok(false);
        }
        Err(BackupToolError::DockerCommand {
            command: format!("{} {}", self.binary, args.join(" ")),
            message: result.error_text(),
        })
    }

    /// Like `exec`, but a non-zero exit is an error
    async fn exec_checked(&self, args: &[&str]) -> Result<String> {
        let result = self.exec(args).await?;
        if !result.succeeded() {
            return Err(BackupToolError::DockerCommand {
                command: format!("{} {}", self.binary, args.join(" ")),
                message: result.error_text(),
            });
        }
        Ok(result.stdout)
    }
}

#[async_trait]
impl DockerGateway for DockerCli {
    async fn ping(&self) -> Result<bool> {
        match self.exec(&["info", "--format", "{{.ServerVersion}}"]).await {
            Ok(result) => Ok(result.succeeded()),
            Err(BackupToolError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_volumes(&self) -> Result<Vec<DockerVolumeInfo>> {
        let stdout = self
            .exec_checked(&["volume", "ls", "--format", "{{json .}}"])
            .await?;
        parse_volume_list(&stdout)
    }

    async fn list_images(&self) -> Result<Vec<DockerImageInfo>> {
        let stdout = self
            .exec_checked(&["image", "ls", "--format", "{{json .}}"])
            .await?;
        parse_image_list(&stdout)
    }

    async fn volume_exists(&self, name: &str) -> Result<bool> {
        let args = ["volume", "inspect", "--", name];
        let result = self.exec(&args).await?;
        self.inspect_outcome(&args, result, "no such volume")
    }

    async fn image_exists(&self, reference: &str) -> Result<bool> {
        let args = ["image", "inspect", "--", reference];
        let result = self.exec(&args).await?;
        self.inspect_outcome(&args, result, "no such image")
    }

    async fn run_container(&self, args: &[String]) -> Result<ProcessResult> {
        let name = helper_container_name();
        let mut full: Vec<&str> = vec!["run", "--rm", "--name", name.as_str()];
        full.extend(args.iter().map(String::as_str));

        match self.exec(&full).await {
            Err(e @ BackupToolError::Timeout { .. }) => {
                // Killing the client leaves the container running
                tracing::warn!(container = %name, "Removing timed-out helper container");
                match self.exec(&["rm", "-f", name.as_str()]).await {
                    Ok(result) if !result.succeeded() => {
                        tracing::warn!(container = %name, "docker rm failed: {}", result.error_text())
                    }
                    Err(rm_err) => tracing::warn!(container = %name, "docker rm failed: {}", rm_err),
                    Ok(_) => {}
                }
                Err(e)
            }
            other => other,
        }
    }

    async fn save_image(&self, reference: &str, out_path: &Path) -> Result<ProcessResult> {
        let out = out_path.to_string_lossy();
        self.exec(&["save", "-o", &out, "--", reference]).await
    }

    async fn load_image(&self, in_path: &Path) -> Result<ProcessResult> {
        let input = in_path.to_string_lossy();
        self.exec(&["load", "-i", &input]).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeLsRow {
    name: String,
    #[serde(default)]
    driver: String,
    #[serde(default)]
    mountpoint: String,
    #[serde(default)]
    labels: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageLsRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    repository: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    labels: String,
}

static HELPER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique per process and call, so a hung helper can be removed by name
fn helper_container_name() -> String {
    format!(
        "{}-{}-{}",
        APP_NAME,
        std::process::id(),
        HELPER_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// `-v` argument value for a disposable container mount
pub fn mount_spec(source: &str, target: &str, read_only: bool) -> String {
    if read_only {
        format!("{}:{}:ro", source, target)
    } else {
        format!("{}:{}", source, target)
    }
}

/// Parse `docker volume ls --format '{{json .}}'` output, one object per line
pub fn parse_volume_list(output: &str) -> Result<Vec<DockerVolumeInfo>> {
    let mut volumes = Vec::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let row: VolumeLsRow = serde_json::from_str(line).map_err(|e| {
            BackupToolError::DockerCommand {
                command: "docker volume ls".to_string(),
                message: format!("unexpected output '{}': {}", line, e),
            }
        })?;
        volumes.push(DockerVolumeInfo {
            name: row.name,
            driver: row.driver,
            mountpoint: row.mountpoint,
            labels: parse_labels(&row.labels),
        });
    }
    volumes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(volumes)
}

/// Parse `docker image ls --format '{{json .}}'` output. One image with
/// several tags appears on several lines; rows are merged by ID.
pub fn parse_image_list(output: &str) -> Result<Vec<DockerImageInfo>> {
    let mut images: Vec<DockerImageInfo> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let row: ImageLsRow = serde_json::from_str(line).map_err(|e| {
            BackupToolError::DockerCommand {
                command: "docker image ls".to_string(),
                message: format!("unexpected output '{}': {}", line, e),
            }
        })?;

        let tag = if row.repository.is_empty() || row.repository == "<none>" || row.tag == "<none>" {
            None
        } else {
            Some(format!("{}:{}", row.repository, row.tag))
        };

        if let Some(&i) = index.get(&row.id) {
            if let Some(tag) = tag {
                images[i].repo_tags.push(tag);
            }
            continue;
        }

        index.insert(row.id.clone(), images.len());
        images.push(DockerImageInfo {
            id: row.id,
            repo_tags: tag.into_iter().collect(),
            size_bytes: parse_size_string(&row.size),
            created_at: parse_created_at(&row.created_at),
            labels: parse_labels(&row.labels),
        });
    }

    Ok(images)
}

/// `k=v,k2=v2` as printed by the docker CLI
fn parse_labels(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Docker prints e.g. `2024-03-01 12:30:00 +0100 CET`; the zone name is dropped
fn parse_created_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    let mut parts = raw.split_whitespace();
    let date = parts.next()?;
    let time = parts.next()?;
    let offset = parts.next()?;
    DateTime::parse_from_str(&format!("{} {} {}", date, time, offset), "%Y-%m-%d %H:%M:%S %z").ok()
}

/// Parse Docker size string to bytes (e.g. "408MB", "6.15kB", "1.5GB").
/// The docker CLI uses decimal units.
pub fn parse_size_string(size_str: &str) -> u64 {
    let size_str = size_str.trim();

    let mut num_str = String::new();
    let mut unit_str = String::new();

    for ch in size_str.chars() {
        if ch.is_numeric() || ch == '.' {
            num_str.push(ch);
        } else if ch.is_alphabetic() {
            unit_str.push(ch);
        }
    }

    let num: f64 = num_str.parse().unwrap_or(0.0);
    let unit = unit_str.to_uppercase();

    let multiplier: u64 = match unit.as_str() {
        "B" => 1,
        "KB" => 1000,
        "MB" => 1000 * 1000,
        "GB" => 1000 * 1000 * 1000,
        "TB" => 1000 * 1000 * 1000 * 1000,
        _ => 1,
    };

    (num * multiplier as f64) as u64
}
