use jbp_config::JbpConfig;
use jbp_memory::{MemoryBudget, MemoryRegion, RegionOverride, GB, MB};

#[test]
fn sizes_accept_bytes_suffixes_and_percentages() {
    let (config, diagnostics) = JbpConfig::load_from_str_with_diagnostics(
        r#"
[memory]
default_limit = "2G"
granularity = "512k"

[memory.sizes]
metaspace = "64m"
stack = 1048576
heap = "50%"

[memory.minimums]
code_cache = "32M"
"#,
    )
    .unwrap();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let settings = config.memory_settings();
    assert_eq!(settings.default_limit, Some(2 * GB));
    assert_eq!(settings.granularity, 512 * 1024);
    assert_eq!(
        settings.sizes.get(&MemoryRegion::Metaspace),
        Some(&RegionOverride::Bytes(64 * MB))
    );
    assert_eq!(
        settings.sizes.get(&MemoryRegion::Stack),
        Some(&RegionOverride::Bytes(MB))
    );
    assert_eq!(
        settings.sizes.get(&MemoryRegion::Heap),
        Some(&RegionOverride::Percent(50.0))
    );
    assert_eq!(settings.minimums.get(&MemoryRegion::CodeCache), Some(&(32 * MB)));
}

#[test]
fn configured_weights_replace_the_defaults() {
    let (config, _) = JbpConfig::load_from_str_with_diagnostics(
        r#"
[memory.sizes]
metaspace = "64m"

[memory.weights]
heap = 3
stack = 1

[memory.minimums]
stack = "16m"

[memory.flags]
stack = "-Xss{size}"
direct_memory = ""
code_cache = ""
"#,
    )
    .unwrap();

    let settings = config.memory_settings();
    let flags = settings
        .resolver()
        .resolve(MemoryBudget::new(GB).unwrap(), &settings.flags)
        .unwrap();

    assert_eq!(
        flags,
        vec!["-Xmx720M", "-XX:MaxMetaspaceSize=64M", "-Xss240M"]
    );
}
