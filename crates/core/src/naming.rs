// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version display names (`major.minor.patch`)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Patch increment between consecutive versions of a project
const PATCH_STEP: u32 = 5;
/// A patch or minor component reaching this value carries into the next one
const ROLLOVER: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("invalid version name '{0}': expected major.minor.patch")]
    Malformed(String),
    #[error("no version name follows {0}")]
    Overflow(VersionName),
}

/// A semantic-version-like display name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionName {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionName {
    /// Name assumed as the predecessor of a project's first version
    pub const BASELINE: VersionName = VersionName::new(1, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The name following this one
    pub fn next(self) -> Result<Self, NamingError> {
        let overflow = || NamingError::Overflow(self);
        let patch = self.patch.checked_add(PATCH_STEP).ok_or_else(overflow)?;
        if patch < ROLLOVER {
            return Ok(Self { patch, ..self });
        }
        let minor = self.minor.checked_add(1).ok_or_else(overflow)?;
        if minor < ROLLOVER {
            return Ok(Self::new(self.major, minor, 0));
        }
        let major = self.major.checked_add(1).ok_or_else(overflow)?;
        Ok(Self::new(major, 0, 0))
    }

    /// The name for a project's next version given its latest one
    pub fn after(latest: Option<VersionName>) -> Result<Self, NamingError> {
        latest.unwrap_or(Self::BASELINE).next()
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionName {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || NamingError::Malformed(s.to_string());
        let mut parts = s.split('.');
        let mut component = || -> Result<u32, NamingError> {
            parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(malformed)
        };
        let name = Self::new(component()?, component()?, component()?);
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(name)
    }
}

impl Serialize for VersionName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
