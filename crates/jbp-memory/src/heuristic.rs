use crate::error::HeuristicError;
use crate::limit::MemoryLimitSource;
use crate::settings::MemorySettings;
use crate::types::{MemoryBudget, RegionOverride};

/// Produces the JVM memory flags for a launch.
pub trait MemoryHeuristic: Send + Sync {
    fn resolve(&self) -> Result<Vec<String>, HeuristicError>;
}

/// [`MemoryHeuristic`] that balances a detected memory limit across regions
/// by weight.
#[derive(Debug, Clone)]
pub struct WeightBalancingMemoryHeuristic {
    settings: MemorySettings,
    limit: MemoryLimitSource,
}

impl WeightBalancingMemoryHeuristic {
    pub fn new(settings: MemorySettings) -> Self {
        Self::with_limit_source(settings, MemoryLimitSource::default())
    }

    pub fn with_limit_source(settings: MemorySettings, limit: MemoryLimitSource) -> Self {
        Self { settings, limit }
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Without a budget only byte-sized overrides can be emitted.
    fn explicit_flags(&self) -> Vec<String> {
        self.settings
            .sizes
            .iter()
            .filter_map(|(region, value)| match value {
                RegionOverride::Bytes(bytes) => self.settings.flags.render(*region, *bytes),
                RegionOverride::Percent(_) => None,
            })
            .collect()
    }
}

impl MemoryHeuristic for WeightBalancingMemoryHeuristic {
    fn resolve(&self) -> Result<Vec<String>, HeuristicError> {
        let limit = self
            .limit
            .detect()?
            .filter(|bytes| *bytes > 0)
            .or(self.settings.default_limit);
        let Some(budget) = limit.and_then(MemoryBudget::new) else {
            tracing::warn!(
                target: "jbp.memory",
                "no memory limit detected; only explicitly sized regions get flags"
            );
            return Ok(self.explicit_flags());
        };

        let flags = self
            .settings
            .resolver()
            .resolve(budget, &self.settings.flags)?;
        tracing::info!(
            target: "jbp.memory",
            limit = budget.bytes(),
            flags = %flags.join(" "),
            "resolved memory flags"
        );
        Ok(flags)
    }
}
