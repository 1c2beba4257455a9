use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::size::format_jvm_size;
use crate::types::MemoryRegion;

/// Placeholder replaced by the resolved size in a flag template.
pub const SIZE_PLACEHOLDER: &str = "{size}";

/// Per-region command-line flag templates, e.g. `-Xmx{size}`.
///
/// Regions without a template still take part in the split but emit no flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagTemplates(BTreeMap<MemoryRegion, String>);

impl FlagTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// HotSpot flags for every region.
    pub fn openjdk() -> Self {
        Self::new()
            .with(MemoryRegion::Heap, "-Xmx{size}")
            .with(MemoryRegion::Metaspace, "-XX:MaxMetaspaceSize={size}")
            .with(MemoryRegion::Stack, "-Xss{size}")
            .with(MemoryRegion::DirectMemory, "-XX:MaxDirectMemorySize={size}")
            .with(MemoryRegion::CodeCache, "-XX:ReservedCodeCacheSize={size}")
    }

    /// The templates used when none are configured: [`Self::openjdk`] without
    /// `-Xss`. `-Xss` sizes every thread's stack, so the stack share only
    /// reserves room for thread stacks unless a template is set explicitly.
    pub fn defaults() -> Self {
        Self::openjdk().without(MemoryRegion::Stack)
    }

    #[must_use]
    pub fn with(mut self, region: MemoryRegion, template: impl Into<String>) -> Self {
        self.0.insert(region, template.into());
        self
    }

    #[must_use]
    pub fn without(mut self, region: MemoryRegion) -> Self {
        self.0.remove(&region);
        self
    }

    pub fn get(&self, region: MemoryRegion) -> Option<&str> {
        self.0.get(&region).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MemoryRegion, &str)> {
        self.0.iter().map(|(region, template)| (*region, template.as_str()))
    }

    /// Render the flag for `region` at `bytes`, if the region has a template.
    pub fn render(&self, region: MemoryRegion, bytes: u64) -> Option<String> {
        self.get(region)
            .map(|template| template.replace(SIZE_PLACEHOLDER, &format_jvm_size(bytes)))
    }
}
