//! Domain layer for release-watch.
//!
//! Tracked items, fetched release snapshots and the release events handed to
//! notification channels.

pub mod release;

pub use release::{ReleaseEvent, ReleaseSnapshot, UNKNOWN_PUBLISHED_AT};

use serde::{Deserialize, Serialize};

/// Kind of registry a tracked item lives in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum SourceKind {
    /// A source-hosting repository; versions are release tag names.
    #[strum(serialize = "github")]
    #[serde(rename = "github")]
    SourceRepository,
    /// A container image; versions are content digests.
    #[strum(serialize = "docker")]
    #[serde(rename = "docker")]
    ContainerImage,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [Self::SourceRepository, Self::ContainerImage];

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Identity of a monitored repository or image.
///
/// `(source_kind, identifier)` is the sole key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackedItem {
    pub source_kind: SourceKind,
    pub identifier: String,
}

impl TrackedItem {
    pub fn new(source_kind: SourceKind, identifier: impl Into<String>) -> Self {
        Self {
            source_kind,
            identifier: identifier.into(),
        }
    }

    pub fn github(identifier: impl Into<String>) -> Self {
        Self::new(SourceKind::SourceRepository, identifier)
    }

    pub fn docker(identifier: impl Into<String>) -> Self {
        Self::new(SourceKind::ContainerImage, identifier)
    }

    /// Last path segment of the identifier, used as a short app name.
    pub fn short_name(&self) -> &str {
        self.identifier
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.identifier)
    }

    /// Check that the identifier looks like `name` or `owner/name`.
    pub fn validate(&self) -> crate::Result<()> {
        let id = self.identifier.trim();
        if id.is_empty() {
            return Err(crate::Error::validation("identifier must not be empty"));
        }
        if id != self.identifier {
            return Err(crate::Error::validation(
                "identifier must not have surrounding whitespace",
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(crate::Error::validation(
                "identifier must not contain whitespace",
            ));
        }
        let segments: Vec<&str> = id.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(crate::Error::validation(format!(
                "identifier '{}' has an empty path segment",
                id
            )));
        }
        match self.source_kind {
            SourceKind::SourceRepository if segments.len() != 2 => Err(crate::Error::validation(
                format!("repository '{}' must be in the form owner/name", id),
            )),
            SourceKind::ContainerImage if segments.len() > 2 => Err(crate::Error::validation(
                format!("image '{}' must be in the form name or namespace/name", id),
            )),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for TrackedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source_kind, self.identifier)
    }
}
