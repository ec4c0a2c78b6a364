pub mod archive;
pub mod backup;
pub mod compression;
pub mod docker;
pub mod error;
pub mod identifier;
pub mod outcome;
pub mod path_mapping;
pub mod restore;

pub use backup::BackupService;
pub use docker::{DockerCli, DockerGateway};
pub use error::{BackupToolError, Result, ValidationError};
pub use outcome::{BatchSummary, OperationOutcome, OperationStatus};
pub use restore::RestoreService;
