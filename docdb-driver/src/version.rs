//! Server version numbers.

use docdb_bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a [`ServerVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    #[error("version string must have at least major and minor components: {0:?}")]
    TooFewComponents(String),

    #[error("invalid version component {component:?} in {input:?}")]
    InvalidComponent { input: String, component: String },

    #[error("build info has no version string")]
    MissingVersion,
}

/// A `major.minor.patch` server version.
///
/// Ordering compares major, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_at_least(&self, other: &ServerVersion) -> bool {
        self >= other
    }

    /// Reads the `version` field of a `buildInfo` reply.
    pub fn from_build_info(info: &Document) -> Result<Self, ParseVersionError> {
        match info.get("version") {
            Some(Bson::String(s)) => s.parse(),
            _ => Err(ParseVersionError::MissingVersion),
        }
    }
}

impl FromStr for ServerVersion {
    type Err = ParseVersionError;

    /// Accepts `major.minor[.patch[.more]][-suffix]`. Anything after a `-`
    /// and any component past the patch are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s.split('-').next().unwrap_or_default();
        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() < 2 {
            return Err(ParseVersionError::TooFewComponents(s.to_string()));
        }

        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| ParseVersionError::InvalidComponent {
                    input: s.to_string(),
                    component: part.to_string(),
                })?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
