/// Validated Docker resource identifiers
///
/// Construction is the only validation point: a `VolumeName` or `ImageId`
/// that exists is always well-formed.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::core::error::ValidationError;

fn volume_re() -> &'static Regex {
    static VOLUME_RE: OnceLock<Regex> = OnceLock::new();
    VOLUME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap())
}

fn digest_re() -> &'static Regex {
    static DIGEST_RE: OnceLock<Regex> = OnceLock::new();
    DIGEST_RE.get_or_init(|| Regex::new(r"^(?i)(sha256:)?[a-f0-9]{12,64}$").unwrap())
}

fn reference_re() -> &'static Regex {
    static REFERENCE_RE: OnceLock<Regex> = OnceLock::new();
    REFERENCE_RE.get_or_init(|| {
        // [registry[:port]/]path[/path...][:tag]
        Regex::new(
            r"^(?:[A-Za-z0-9][A-Za-z0-9.-]*(?::[0-9]+)?/)?[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*(?:/[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*)*(?::[A-Za-z0-9_][A-Za-z0-9_.-]{0,127})?$",
        )
        .unwrap()
    })
}

/// A Docker volume name matching `^[A-Za-z0-9._-]+$`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeName(String);

impl VolumeName {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::EmptyName { kind: "volume name" });
        }
        if !volume_re().is_match(value) {
            return Err(ValidationError::InvalidFormat {
                kind: "volume name",
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageIdKind {
    /// `repository[:tag]`, optionally prefixed with a registry host
    Reference,
    /// Content hash, 12-64 hex characters with optional `sha256:` prefix
    Digest,
}

/// A Docker image reference or content-address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId {
    value: String,
    kind: ImageIdKind,
}

impl ImageId {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::EmptyName { kind: "image identifier" });
        }

        // Bare hex strings are ambiguous with repository names; treat as digests
        let kind = if digest_re().is_match(value) {
            ImageIdKind::Digest
        } else if reference_re().is_match(value) {
            ImageIdKind::Reference
        } else {
            return Err(ValidationError::InvalidFormat {
                kind: "image identifier",
                value: value.to_string(),
            });
        };

        Ok(Self {
            value: value.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> ImageIdKind {
        self.kind
    }

    pub fn is_digest(&self) -> bool {
        self.kind == ImageIdKind::Digest
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Validate a volume name
pub fn validate_volume_name(value: &str) -> Result<VolumeName, ValidationError> {
    VolumeName::parse(value)
}

/// Validate an image reference or ID
pub fn validate_image_id(value: &str) -> Result<ImageId, ValidationError> {
    ImageId::parse(value)
}
