/// Archive and helper-container constants

/// Image used for disposable tar/du containers
pub const DEFAULT_HELPER_IMAGE: &str = "alpine:latest";

/// Where the volume is mounted inside helper containers
pub const VOLUME_MOUNT: &str = "/volume";

/// Where the backup directory is mounted inside helper containers
pub const BACKUP_MOUNT: &str = "/backup";

pub const COMPRESSED_EXTENSION: &str = ".tar.gz";
pub const UNCOMPRESSED_EXTENSION: &str = ".tar";

/// Prefix of in-flight files written next to archives; never listed as backups
pub const STAGING_PREFIX: &str = ".docker-backup-";

pub const DEFAULT_BACKUP_DIR: &str = "./backups";

pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Upper bound for any single docker invocation
pub const DEFAULT_COMMAND_TIMEOUT: &str = "1h";

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Buffer size for streaming gzip
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Config directory name under the platform config dir
pub const APP_NAME: &str = "docker-backup";
