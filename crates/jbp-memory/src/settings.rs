use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::flags::FlagTemplates;
use crate::resolver::MemoryResolver;
use crate::size::MB;
use crate::types::{MemoryRegion, RegionOverride};

/// Everything needed to turn a memory limit into JVM flags.
///
/// Staging persists this as JSON next to the JRE so the launch-time
/// calculation sees exactly what was validated at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub weights: BTreeMap<MemoryRegion, f64>,
    /// Explicit sizes; these take precedence over weights.
    pub sizes: BTreeMap<MemoryRegion, RegionOverride>,
    pub minimums: BTreeMap<MemoryRegion, u64>,
    pub granularity: u64,
    pub flags: FlagTemplates,
    /// Budget used when no limit can be detected.
    pub default_limit: Option<u64>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            weights: Self::default_weights(),
            sizes: BTreeMap::new(),
            minimums: BTreeMap::new(),
            granularity: MB,
            flags: FlagTemplates::defaults(),
            default_limit: None,
        }
    }
}

impl MemorySettings {
    pub fn default_weights() -> BTreeMap<MemoryRegion, f64> {
        BTreeMap::from([
            (MemoryRegion::Heap, 75.0),
            (MemoryRegion::Metaspace, 10.0),
            (MemoryRegion::Stack, 5.0),
            (MemoryRegion::DirectMemory, 5.0),
            (MemoryRegion::CodeCache, 5.0),
        ])
    }

    pub fn resolver(&self) -> MemoryResolver {
        let resolver = self
            .weights
            .iter()
            .fold(MemoryResolver::new(), |resolver, (region, weight)| {
                resolver.weight(*region, *weight)
            });
        let resolver = self
            .sizes
            .iter()
            .fold(resolver, |resolver, (region, value)| {
                resolver.override_size(*region, *value)
            });
        self.minimums
            .iter()
            .fold(resolver, |resolver, (region, bytes)| {
                resolver.minimum(*region, *bytes)
            })
            .granularity(self.granularity)
    }
}
