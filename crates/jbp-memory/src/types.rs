use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseByteSizeError;
use crate::size::parse_byte_size;

/// Independently sizable memory regions of a JVM process.
///
/// Declaration order is the order flags are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryRegion {
    Heap,
    Metaspace,
    Stack,
    DirectMemory,
    CodeCache,
}

impl MemoryRegion {
    pub fn all() -> [MemoryRegion; 5] {
        [
            MemoryRegion::Heap,
            MemoryRegion::Metaspace,
            MemoryRegion::Stack,
            MemoryRegion::DirectMemory,
            MemoryRegion::CodeCache,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemoryRegion::Heap => "heap",
            MemoryRegion::Metaspace => "metaspace",
            MemoryRegion::Stack => "stack",
            MemoryRegion::DirectMemory => "direct_memory",
            MemoryRegion::CodeCache => "code_cache",
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total memory available to the process, in bytes. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemoryBudget(NonZeroU64);

impl MemoryBudget {
    /// Returns `None` for a zero budget.
    pub fn new(bytes: u64) -> Option<Self> {
        NonZeroU64::new(bytes).map(Self)
    }

    pub fn bytes(self) -> u64 {
        self.0.get()
    }
}

/// Caller-specified size for a region, bypassing the weighted split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionOverride {
    /// Absolute size in bytes.
    Bytes(u64),
    /// Percentage (`0.0..=100.0`) of the total budget.
    Percent(f64),
}

impl RegionOverride {
    /// Size of this override against `budget` bytes.
    ///
    /// Out-of-range percentages saturate (negative and NaN become zero).
    pub fn bytes_for(self, budget: u64) -> u64 {
        match self {
            RegionOverride::Bytes(bytes) => bytes,
            RegionOverride::Percent(percent) => (budget as f64 * percent / 100.0).floor() as u64,
        }
    }
}

impl FromStr for RegionOverride {
    type Err = ParseByteSizeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let Some(percent) = trimmed.strip_suffix('%') else {
            return parse_byte_size(trimmed).map(RegionOverride::Bytes);
        };

        let value: f64 = percent
            .trim()
            .parse()
            .map_err(|_| ParseByteSizeError::InvalidPercentage(trimmed.to_string()))?;
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ParseByteSizeError::InvalidPercentage(trimmed.to_string()));
        }
        Ok(RegionOverride::Percent(value))
    }
}

impl Serialize for RegionOverride {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            RegionOverride::Bytes(bytes) => serializer.serialize_u64(*bytes),
            RegionOverride::Percent(percent) => serializer.collect_str(&format_args!("{percent}%")),
        }
    }
}

impl<'de> Deserialize<'de> for RegionOverride {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bytes(u64),
            Human(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bytes(value) => Ok(RegionOverride::Bytes(value)),
            Repr::Human(value) => value.parse().map_err(serde::de::Error::custom),
        }
    }
}
