use jbp_memory::{
    HeuristicError, MemoryHeuristic, MemoryLimitSource, MemoryRegion, MemorySettings,
    RegionOverride, WeightBalancingMemoryHeuristic, MB,
};

#[test]
fn heuristic_is_usable_as_a_trait_object() {
    let heuristic: Box<dyn MemoryHeuristic> =
        Box::new(WeightBalancingMemoryHeuristic::with_limit_source(
            MemorySettings::default(),
            MemoryLimitSource::Fixed(2000 * MB),
        ));

    let flags = heuristic.resolve().unwrap();
    assert_eq!(
        flags,
        vec![
            "-Xmx1500M",
            "-XX:MaxMetaspaceSize=200M",
            "-XX:MaxDirectMemorySize=100M",
            "-XX:ReservedCodeCacheSize=100M",
        ]
    );
}

#[test]
fn percentage_sizes_scale_with_the_limit() {
    let mut settings = MemorySettings::default();
    settings
        .sizes
        .insert(MemoryRegion::Heap, RegionOverride::Percent(50.0));

    for limit in [512 * MB, 4096 * MB] {
        let heuristic = WeightBalancingMemoryHeuristic::with_limit_source(
            settings.clone(),
            MemoryLimitSource::Fixed(limit),
        );
        let flags = heuristic.resolve().unwrap();
        assert_eq!(flags[0], format!("-Xmx{}M", limit / MB / 2));
    }
}

#[test]
fn invalid_weights_surface_as_heuristic_errors() {
    let mut settings = MemorySettings::default();
    settings.weights.insert(MemoryRegion::Heap, -1.0);
    let heuristic = WeightBalancingMemoryHeuristic::with_limit_source(
        settings,
        MemoryLimitSource::Fixed(1024 * MB),
    );

    let err = heuristic.resolve().unwrap_err();
    assert!(matches!(err, HeuristicError::Resolve(_)), "{err:?}");
    assert!(err.to_string().contains("heap weight"), "{err}");
}
