/// Per-resource operation results
///
/// Every backup or restore attempt yields exactly one `OperationOutcome`.
/// Outcomes are built once through the constructors below and never mutated.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    BackupVolume,
    RestoreVolume,
    BackupImage,
    RestoreImage,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::BackupVolume => "backup volume",
            OperationKind::RestoreVolume => "restore volume",
            OperationKind::BackupImage => "backup image",
            OperationKind::RestoreImage => "restore image",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationStatus::Success => "Success",
            OperationStatus::Failed => "Failed",
            OperationStatus::Skipped => "Skipped",
        })
    }
}

/// Status-specific payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        archive_path: PathBuf,
        /// Archive size for backups, extracted size for restores (if measured)
        size_bytes: Option<u64>,
        note: Option<String>,
    },
    Failed {
        message: String,
    },
    Skipped {
        message: String,
        archive_path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct OperationOutcome {
    resource_name: String,
    kind: OperationKind,
    outcome: Outcome,
    duration: Duration,
    completed_at: DateTime<Local>,
}

impl OperationOutcome {
    fn finish(resource_name: &str, kind: OperationKind, started: Instant, outcome: Outcome) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            kind,
            outcome,
            duration: started.elapsed(),
            completed_at: Local::now(),
        }
    }

    pub fn success(
        resource_name: &str,
        kind: OperationKind,
        started: Instant,
        archive_path: &Path,
        size_bytes: Option<u64>,
    ) -> Self {
        Self::finish(
            resource_name,
            kind,
            started,
            Outcome::Success {
                archive_path: archive_path.to_path_buf(),
                size_bytes,
                note: None,
            },
        )
    }

    /// Success with an operator-facing remark (e.g. an inferred image name)
    pub fn success_with_note(
        resource_name: &str,
        kind: OperationKind,
        started: Instant,
        archive_path: &Path,
        size_bytes: Option<u64>,
        note: impl Into<String>,
    ) -> Self {
        Self::finish(
            resource_name,
            kind,
            started,
            Outcome::Success {
                archive_path: archive_path.to_path_buf(),
                size_bytes,
                note: Some(note.into()),
            },
        )
    }

    pub fn failed(
        resource_name: &str,
        kind: OperationKind,
        started: Instant,
        message: impl Into<String>,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "unknown error".to_string();
        }
        Self::finish(resource_name, kind, started, Outcome::Failed { message })
    }

    pub fn skipped(
        resource_name: &str,
        kind: OperationKind,
        started: Instant,
        message: impl Into<String>,
        archive_path: Option<&Path>,
    ) -> Self {
        Self::finish(
            resource_name,
            kind,
            started,
            Outcome::Skipped {
                message: message.into(),
                archive_path: archive_path.map(Path::to_path_buf),
            },
        )
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Wall-clock time from start of the attempt to this outcome
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn completed_at(&self) -> DateTime<Local> {
        self.completed_at
    }

    pub fn status(&self) -> OperationStatus {
        match self.outcome {
            Outcome::Success { .. } => OperationStatus::Success,
            Outcome::Failed { .. } => OperationStatus::Failed,
            Outcome::Skipped { .. } => OperationStatus::Skipped,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == OperationStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status() == OperationStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status() == OperationStatus::Skipped
    }

    pub fn archive_path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Success { archive_path, .. } => Some(archive_path),
            Outcome::Skipped { archive_path, .. } => archive_path.as_deref(),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { note, .. } => note.as_deref(),
            Outcome::Failed { message } | Outcome::Skipped { message, .. } => Some(message),
        }
    }

    pub fn size_bytes(&self) -> Option<u64> {
        match self.outcome {
            Outcome::Success { size_bytes, .. } => size_bytes,
            _ => None,
        }
    }
}

/// Counts over a batch of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[OperationOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o.status() {
                OperationStatus::Success => acc.succeeded += 1,
                OperationStatus::Skipped => acc.skipped += 1,
                OperationStatus::Failed => acc.failed += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit code: 1 if anything failed, skips do not count
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}
