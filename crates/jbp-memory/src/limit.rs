use crate::cgroup::cgroup_memory_limit_bytes;
use crate::error::LimitError;
use crate::size::parse_byte_size;

/// Environment variable carrying the container memory limit (e.g. `512m`).
pub const MEMORY_LIMIT_ENV_VAR: &str = "MEMORY_LIMIT";

/// Where the total memory budget comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryLimitSource {
    /// [`MEMORY_LIMIT_ENV_VAR`], falling back to the process cgroup limit.
    #[default]
    Environment,
    /// A known limit in bytes.
    Fixed(u64),
}

impl MemoryLimitSource {
    /// `Ok(None)` means no limit could be found.
    pub fn detect(self) -> Result<Option<u64>, LimitError> {
        match self {
            MemoryLimitSource::Fixed(bytes) => Ok(Some(bytes)),
            MemoryLimitSource::Environment => {
                let env_value = std::env::var(MEMORY_LIMIT_ENV_VAR).ok();
                limit_from(env_value.as_deref(), cgroup_memory_limit_bytes)
            }
        }
    }
}

fn limit_from(
    env_value: Option<&str>,
    cgroup: impl FnOnce() -> Option<u64>,
) -> Result<Option<u64>, LimitError> {
    let Some(raw) = env_value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(cgroup());
    };

    let bytes = parse_byte_size(raw).map_err(|source| LimitError::Invalid {
        var: MEMORY_LIMIT_ENV_VAR,
        raw: raw.to_string(),
        source,
    })?;
    tracing::debug!(target: "jbp.memory", bytes, "memory limit from {MEMORY_LIMIT_ENV_VAR}");
    Ok(Some(bytes))
}
