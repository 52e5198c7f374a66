// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helm value snapshots attached to versions
//!
//! Each version owns one write-once snapshot of its deployment sizing. Fields
//! resolve as explicit override, then project default, then a fixed fallback;
//! resource limits are derived from the resolved requests.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Limits are this multiple of the resolved requests
const LIMIT_MULTIPLIER: u64 = 2;

/// Fraction digits beyond this cannot be represented in fixed point
const MAX_SCALE: u32 = 18;

const FALLBACK_REPLICAS: u32 = 1;
const FALLBACK_CPU: &str = "100m";
const FALLBACK_MEMORY: &str = "128Mi";

crate::string_id! {
    /// Identifier of a Helm value snapshot
    HelmValuesId
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("resource quantity is empty")]
    Empty,
    #[error("invalid resource quantity '{0}'")]
    Malformed(String),
}

/// A Kubernetes-style resource quantity such as `100m`, `0.5` or `128Mi`.
///
/// The numeric part is kept as a fixed-point integer so scaling never picks
/// up floating point noise; the unit suffix is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quantity {
    units: u64,
    scale: u32,
    suffix: String,
}

impl Quantity {
    /// This quantity multiplied by `factor`, in the same unit
    pub fn scaled(&self, factor: u64) -> Quantity {
        Quantity {
            units: self.units.saturating_mul(factor),
            scale: self.scale,
            suffix: self.suffix.clone(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }
        let malformed = || QuantityError::Malformed(s.to_string());

        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, suffix) = s.split_at(split);
        if number.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(malformed());
        }

        let (whole, fraction) = match number.split_once('.') {
            Some((w, f)) if !f.is_empty() && !f.contains('.') => (w, f),
            Some(_) => return Err(malformed()),
            None => (number, ""),
        };
        let scale = u32::try_from(fraction.len())
            .ok()
            .filter(|scale| *scale <= MAX_SCALE)
            .ok_or_else(malformed)?;
        let digits = format!("{}{}", whole, fraction);
        let units = digits.parse::<u64>().map_err(|_| malformed())?;

        Ok(Quantity {
            units,
            scale,
            suffix: suffix.to_string(),
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divisor = 10u64.pow(self.scale);
        let whole = self.units / divisor;
        let fraction = self.units % divisor;
        if fraction == 0 {
            return write!(f, "{}{}", whole, self.suffix);
        }
        let padded = format!("{:0width$}", fraction, width = self.scale as usize);
        write!(f, "{}.{}{}", whole, padded.trim_end_matches('0'), self.suffix)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-project sizing defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelmDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<Quantity>,
}

/// Sizing requested for one version at initiation time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<Quantity>,
}

/// Immutable sizing snapshot owned by a single version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmValues {
    pub id: HelmValuesId,
    pub replica_count: u32,
    pub cpu_request: Quantity,
    pub memory_request: Quantity,
    pub cpu_limit: Quantity,
    pub memory_limit: Quantity,
}

impl HelmValues {
    /// Resolve a snapshot: override > project default > fallback
    pub fn resolve(
        id: HelmValuesId,
        overrides: &HelmOverrides,
        defaults: &HelmDefaults,
    ) -> Result<HelmValues, QuantityError> {
        let replica_count = overrides
            .replica_count
            .or(defaults.replica_count)
            .unwrap_or(FALLBACK_REPLICAS);
        let cpu_request = match overrides.cpu_request.as_ref().or(defaults.cpu_request.as_ref()) {
            Some(q) => q.clone(),
            None => FALLBACK_CPU.parse()?,
        };
        let memory_request = match overrides
            .memory_request
            .as_ref()
            .or(defaults.memory_request.as_ref())
        {
            Some(q) => q.clone(),
            None => FALLBACK_MEMORY.parse()?,
        };

        Ok(HelmValues {
            id,
            replica_count,
            cpu_limit: cpu_request.scaled(LIMIT_MULTIPLIER),
            memory_limit: memory_request.scaled(LIMIT_MULTIPLIER),
            cpu_request,
            memory_request,
        })
    }
}

#[cfg(test)]
#[path = "helm_tests.rs"]
mod tests;
