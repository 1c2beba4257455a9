use std::collections::BTreeMap;

use jbp_memory::{MemoryBudget, MemoryRegion, MemoryResolver, RegionOverride, ResolveError, MB};
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 256;

fn arb_region() -> impl Strategy<Value = MemoryRegion> {
    prop::sample::select(MemoryRegion::all().to_vec())
}

fn arb_budget() -> impl Strategy<Value = u64> {
    // 1 byte .. 64 GiB, biased towards realistic container sizes.
    prop_oneof![
        1u64..=(64 * 1024 * MB),
        (1u64..=8192).prop_map(|mib| mib * MB),
    ]
}

fn arb_weights() -> impl Strategy<Value = BTreeMap<MemoryRegion, f64>> {
    prop::collection::btree_map(arb_region(), 0u32..100, 1..=5).prop_map(|weights| {
        let mut weights: BTreeMap<MemoryRegion, f64> = weights
            .into_iter()
            .map(|(region, weight)| (region, f64::from(weight)))
            .collect();
        // At least one positive weight so remaining budget can always be placed.
        if let Some(first) = weights.values_mut().next() {
            *first += 1.0;
        }
        weights
    })
}

fn arb_overrides() -> impl Strategy<Value = BTreeMap<MemoryRegion, RegionOverride>> {
    let value = prop_oneof![
        (0u64..=2048).prop_map(|mib| RegionOverride::Bytes(mib * MB)),
        (0u32..=60).prop_map(|percent| RegionOverride::Percent(f64::from(percent))),
    ];
    prop::collection::btree_map(arb_region(), value, 0..=2)
}

fn arb_minimums() -> impl Strategy<Value = BTreeMap<MemoryRegion, u64>> {
    prop::collection::btree_map(arb_region(), (0u64..=512).prop_map(|mib| mib * MB), 0..=3)
}

fn build(
    weights: &BTreeMap<MemoryRegion, f64>,
    overrides: &BTreeMap<MemoryRegion, RegionOverride>,
    minimums: &BTreeMap<MemoryRegion, u64>,
) -> MemoryResolver {
    let mut resolver = MemoryResolver::new();
    for (region, weight) in weights {
        resolver = resolver.weight(*region, *weight);
    }
    for (region, value) in overrides {
        resolver = resolver.override_size(*region, *value);
    }
    for (region, bytes) in minimums {
        resolver = resolver.minimum(*region, *bytes);
    }
    resolver
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        max_global_rejects: 4096,
        .. ProptestConfig::default()
    })]

    #[test]
    fn resolved_total_never_exceeds_budget(
        budget in arb_budget(),
        weights in arb_weights(),
        overrides in arb_overrides(),
        minimums in arb_minimums(),
    ) {
        let resolver = build(&weights, &overrides, &minimums);
        match resolver.resolve_sizing(MemoryBudget::new(budget).unwrap()) {
            Ok(sizing) => {
                prop_assert!(sizing.total() <= budget, "{} > {}", sizing.total(), budget);
                for region in weights.keys().chain(overrides.keys()) {
                    prop_assert!(sizing.get(*region).is_some(), "{region} missing");
                }
            }
            Err(ResolveError::InsufficientMemory { budget: reported, .. }) => {
                prop_assert_eq!(reported, budget);
            }
            Err(ResolveError::InvalidWeight { .. }) => {
                // Only possible when every positive weight belongs to an overridden region.
                prop_assert!(weights
                    .iter()
                    .filter(|(region, _)| !overrides.contains_key(*region))
                    .all(|(_, weight)| *weight == 0.0));
            }
        }
    }

    #[test]
    fn clamped_regions_respect_their_minimums(
        budget in (1024u64..=16384).prop_map(|mib| mib * MB),
        weights in arb_weights(),
        minimums in arb_minimums(),
    ) {
        let resolver = build(&weights, &BTreeMap::new(), &minimums);
        if let Ok(sizing) = resolver.resolve_sizing(MemoryBudget::new(budget).unwrap()) {
            for (region, minimum) in &minimums {
                if let Some(bytes) = sizing.get(*region) {
                    prop_assert!(bytes >= *minimum, "{region}: {bytes} < {minimum}");
                }
            }
        }
    }

    #[test]
    fn full_overrides_resolve_to_themselves(
        sizes in prop::collection::vec(0u64..=256, 5),
    ) {
        let regions = MemoryRegion::all();
        let mut resolver = MemoryResolver::new();
        for (region, mib) in regions.iter().zip(&sizes) {
            resolver = resolver
                .override_size(*region, RegionOverride::Bytes(mib * MB))
                .weight(*region, 1.0);
        }

        let sizing = resolver
            .resolve_sizing(MemoryBudget::new(2048 * MB).unwrap())
            .unwrap();
        for (region, mib) in regions.iter().zip(&sizes) {
            prop_assert_eq!(sizing.get(*region), Some(mib * MB));
        }
    }

    #[test]
    fn raising_a_weight_never_shrinks_its_region(
        budget in arb_budget(),
        weights in arb_weights(),
        overrides in arb_overrides(),
        minimums in arb_minimums(),
        region in arb_region(),
        extra in 0u32..100,
    ) {
        prop_assume!(weights.contains_key(&region) && !overrides.contains_key(&region));
        let budget = MemoryBudget::new(budget).unwrap();

        let before = build(&weights, &overrides, &minimums).resolve_sizing(budget);
        let mut raised = weights.clone();
        *raised.get_mut(&region).unwrap() += f64::from(extra);
        let after = build(&raised, &overrides, &minimums).resolve_sizing(budget);

        if let (Ok(before), Ok(after)) = (before, after) {
            prop_assert!(after.get(region) >= before.get(region));
        }
    }

    #[test]
    fn resolution_is_deterministic(
        budget in arb_budget(),
        weights in arb_weights(),
        overrides in arb_overrides(),
        minimums in arb_minimums(),
    ) {
        let resolver = build(&weights, &overrides, &minimums);
        let budget = MemoryBudget::new(budget).unwrap();
        prop_assert_eq!(resolver.resolve_sizing(budget), resolver.resolve_sizing(budget));
    }
}
