use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ResolveError;
use crate::flags::FlagTemplates;
use crate::size::MB;
use crate::types::{MemoryBudget, MemoryRegion, RegionOverride};

/// Final byte size per participating region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedSizing {
    sizes: BTreeMap<MemoryRegion, u64>,
}

impl ResolvedSizing {
    pub fn get(&self, region: MemoryRegion) -> Option<u64> {
        self.sizes.get(&region).copied()
    }

    pub fn total(&self) -> u64 {
        self.sizes.values().sum()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MemoryRegion, u64)> + '_ {
        self.sizes.iter().map(|(region, bytes)| (*region, *bytes))
    }

    /// One flag per region that has a template, in region order.
    pub fn flags(&self, templates: &FlagTemplates) -> Vec<String> {
        self.iter()
            .filter_map(|(region, bytes)| templates.render(region, bytes))
            .collect()
    }
}

/// Weight-balancing memory calculator.
///
/// Regions take part in a resolution when they have a weight or an override.
/// Minimums only apply to weighted regions without an override.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryResolver {
    weights: BTreeMap<MemoryRegion, f64>,
    overrides: BTreeMap<MemoryRegion, RegionOverride>,
    minimums: BTreeMap<MemoryRegion, u64>,
    granularity: u64,
}

impl Default for MemoryResolver {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            overrides: BTreeMap::new(),
            minimums: BTreeMap::new(),
            granularity: MB,
        }
    }
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn weight(mut self, region: MemoryRegion, weight: f64) -> Self {
        self.weights.insert(region, weight);
        self
    }

    #[must_use]
    pub fn override_size(mut self, region: MemoryRegion, value: RegionOverride) -> Self {
        self.overrides.insert(region, value);
        self
    }

    #[must_use]
    pub fn minimum(mut self, region: MemoryRegion, bytes: u64) -> Self {
        self.minimums.insert(region, bytes);
        self
    }

    /// Allocation granularity in bytes (default 1 MiB). Zero is treated as one.
    #[must_use]
    pub fn granularity(mut self, bytes: u64) -> Self {
        self.granularity = bytes.max(1);
        self
    }

    /// Split `budget` across the configured regions.
    pub fn resolve_sizing(&self, budget: MemoryBudget) -> Result<ResolvedSizing, ResolveError> {
        let total = budget.bytes();
        let granularity = self.granularity;

        let mut sizes = BTreeMap::new();
        let mut required: u128 = 0;
        for (&region, &value) in &self.overrides {
            let bytes = value.bytes_for(total);
            required += u128::from(bytes);
            sizes.insert(region, round_down(bytes, granularity));
        }
        if required > u128::from(total) {
            return Err(ResolveError::InsufficientMemory {
                required: u64::try_from(required).unwrap_or(u64::MAX),
                budget: total,
            });
        }

        let reserved: u64 = sizes.values().sum();
        let remaining = total - reserved;

        let flexible: Vec<(MemoryRegion, f64)> = self
            .weights
            .iter()
            .filter(|(region, _)| !self.overrides.contains_key(region))
            .map(|(region, weight)| (*region, *weight))
            .collect();
        validate_weights(&flexible, remaining)?;

        let filled = WaterFill {
            minimums: &self.minimums,
            granularity,
            budget: total,
        }
        .run(flexible, remaining)?;
        sizes.extend(filled);

        let sizing = ResolvedSizing { sizes };
        debug_assert!(sizing.total() <= total);
        tracing::debug!(
            target: "jbp.memory",
            budget = total,
            allocated = sizing.total(),
            sizes = ?sizing.sizes,
            "resolved memory sizing"
        );
        Ok(sizing)
    }

    /// Split `budget` and render the result through `templates`.
    pub fn resolve(
        &self,
        budget: MemoryBudget,
        templates: &FlagTemplates,
    ) -> Result<Vec<String>, ResolveError> {
        Ok(self.resolve_sizing(budget)?.flags(templates))
    }
}

/// Resolve memory flags for `budget` without minimums, at 1 MiB granularity.
pub fn resolve(
    budget: MemoryBudget,
    weights: &BTreeMap<MemoryRegion, f64>,
    overrides: &BTreeMap<MemoryRegion, RegionOverride>,
    templates: &FlagTemplates,
) -> Result<Vec<String>, ResolveError> {
    let resolver = MemoryResolver {
        weights: weights.clone(),
        overrides: overrides.clone(),
        ..MemoryResolver::default()
    };
    resolver.resolve(budget, templates)
}

fn validate_weights(flexible: &[(MemoryRegion, f64)], remaining: u64) -> Result<(), ResolveError> {
    for (region, weight) in flexible {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(ResolveError::InvalidWeight {
                message: format!("{region} weight must be a non-negative number, got {weight}"),
            });
        }
    }

    if remaining > 0 && !flexible.is_empty() && flexible.iter().all(|(_, weight)| *weight == 0.0) {
        return Err(ResolveError::InvalidWeight {
            message: format!(
                "all weights of regions without an explicit size are zero, leaving {remaining} bytes unallocated"
            ),
        });
    }

    Ok(())
}

struct WaterFill<'a> {
    minimums: &'a BTreeMap<MemoryRegion, u64>,
    granularity: u64,
    budget: u64,
}

impl WaterFill<'_> {
    /// Minimums are rounded up so clamping never lands below them.
    fn minimum(&self, region: MemoryRegion) -> u64 {
        self.minimums
            .get(&region)
            .map_or(0, |bytes| round_up(*bytes, self.granularity))
    }

    fn run(
        &self,
        mut open: Vec<(MemoryRegion, f64)>,
        mut remaining: u64,
    ) -> Result<Vec<(MemoryRegion, u64)>, ResolveError> {
        let mut settled = Vec::with_capacity(open.len());
        let committed_before = self.budget - remaining;

        // Every pass that does not settle clamps at least one region, so
        // `open.len() + 1` passes always suffice.
        for _ in 0..=open.len() {
            let shares = proportional_shares(&open, remaining);
            let below: Vec<usize> = open
                .iter()
                .zip(&shares)
                .enumerate()
                .filter(|(_, ((region, _), share))| self.minimum(*region) > **share)
                .map(|(idx, _)| idx)
                .collect();

            if below.is_empty() {
                settled.extend(
                    open.iter()
                        .zip(shares)
                        .map(|((region, _), share)| (*region, round_down(share, self.granularity))),
                );
                return Ok(settled);
            }

            let mut clamped_total: u64 = 0;
            for idx in below.into_iter().rev() {
                let (region, _) = open.remove(idx);
                let minimum = self.minimum(region);
                tracing::trace!(
                    target: "jbp.memory",
                    region = %region,
                    minimum,
                    "clamping region to its minimum"
                );
                clamped_total = clamped_total.saturating_add(minimum);
                settled.push((region, minimum));
            }

            if clamped_total > remaining {
                let clamped_so_far: u64 = settled.iter().map(|(_, bytes)| *bytes).sum();
                return Err(ResolveError::InsufficientMemory {
                    required: committed_before.saturating_add(clamped_so_far),
                    budget: self.budget,
                });
            }
            remaining -= clamped_total;
        }

        settled.extend(open.into_iter().map(|(region, _)| (region, 0)));
        Ok(settled)
    }
}

/// Floor of `remaining * weight / total_weight` per region; never sums above `remaining`.
fn proportional_shares(open: &[(MemoryRegion, f64)], remaining: u64) -> Vec<u64> {
    let total_weight: f64 = open.iter().map(|(_, weight)| weight).sum();
    if total_weight <= 0.0 {
        return vec![0; open.len()];
    }

    let mut shares: Vec<u64> = open
        .iter()
        .map(|(_, weight)| {
            let share = (remaining as f64 * (weight / total_weight)).floor();
            (share as u64).min(remaining)
        })
        .collect();

    // Float rounding can overshoot by a few bytes; take it back from the largest share.
    let sum: u128 = shares.iter().map(|share| u128::from(*share)).sum();
    if sum > u128::from(remaining) {
        let excess = (sum - u128::from(remaining)) as u64;
        if let Some(largest) = shares.iter_mut().max() {
            *largest = largest.saturating_sub(excess);
        }
    }

    shares
}

fn round_down(bytes: u64, granularity: u64) -> u64 {
    bytes - bytes % granularity
}

fn round_up(bytes: u64, granularity: u64) -> u64 {
    match bytes % granularity {
        0 => bytes,
        rem => bytes.saturating_add(granularity - rem),
    }
}
