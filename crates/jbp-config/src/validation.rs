use std::path::Path;

use jbp_memory::{RegionOverride, SIZE_PLACEHOLDER};

use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{JbpConfig, LoggingConfig};

/// Context for semantic config validation.
///
/// Relative paths in the config are resolved against `config_dir` before
/// existence checks run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidationContext<'a> {
    /// Directory containing the loaded config file.
    pub config_dir: Option<&'a Path>,
}

impl JbpConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it reports as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        self.validate_with_context(ConfigValidationContext::default())
    }

    /// Like [`JbpConfig::validate`] but with access to the config file's directory.
    #[must_use]
    pub fn validate_with_context(&self, ctx: ConfigValidationContext<'_>) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_jre(self, ctx, &mut out);
        validate_memory(self, &mut out);
        validate_logging(self, &mut out);

        out
    }
}

fn validate_jre(
    config: &JbpConfig,
    ctx: ConfigValidationContext<'_>,
    out: &mut ValidationDiagnostics,
) {
    if config.jre.version.trim().is_empty() {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "jre.version".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    let resolve = |path: &Path| match ctx.config_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    };

    if let Some(archive) = config.jre.archive.as_deref() {
        let resolved = resolve(archive);
        if !resolved.is_file() {
            out.warnings.push(ConfigWarning::JreArchiveMissing { resolved });
        }
    } else if let Some(repository) = config.jre.repository.as_deref() {
        let resolved = resolve(repository);
        if !resolved.is_dir() {
            out.warnings.push(ConfigWarning::JreRepositoryMissing { resolved });
        }
    }
}

fn validate_memory(config: &JbpConfig, out: &mut ValidationDiagnostics) {
    let memory = &config.memory;

    if memory.granularity.0 == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "memory.granularity".to_string(),
            message: "must be >= 1".to_string(),
        });
    }

    if matches!(memory.default_limit, Some(limit) if limit.0 == 0) {
        out.warnings.push(ConfigWarning::InvalidValue {
            toml_path: "memory.default_limit".to_string(),
            message: "0 is treated as no limit".to_string(),
        });
    }

    let mut any_flexible_weight = false;
    let mut any_flexible_region = false;
    for (region, weight) in &memory.weights {
        if !weight.is_finite() || *weight < 0.0 {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: format!("memory.weights.{region}"),
                message: "must be a finite number >= 0".to_string(),
            });
            continue;
        }
        if memory.sizes.contains_key(region) {
            continue;
        }
        any_flexible_region = true;
        any_flexible_weight |= *weight > 0.0;
    }
    if any_flexible_region && !any_flexible_weight {
        out.errors.push(ConfigValidationError::AllWeightsZero);
    }

    let total_percent: f64 = memory
        .sizes
        .values()
        .filter_map(|size| match size {
            RegionOverride::Percent(percent) => Some(*percent),
            RegionOverride::Bytes(_) => None,
        })
        .sum();
    if total_percent > 100.0 {
        out.errors.push(ConfigValidationError::PercentagesExceedBudget {
            total_percent: format!("{total_percent}"),
        });
    }

    for region in memory.minimums.keys() {
        if !memory.weights.contains_key(region) || memory.sizes.contains_key(region) {
            out.warnings.push(ConfigWarning::MinimumWithoutWeight {
                toml_path: format!("memory.minimums.{region}"),
            });
        }
    }

    for (region, template) in &memory.flags {
        if !template.trim().is_empty() && !template.contains(SIZE_PLACEHOLDER) {
            out.warnings.push(ConfigWarning::FlagTemplateMissingPlaceholder {
                toml_path: format!("memory.flags.{region}"),
                template: template.clone(),
            });
        }
    }
}

fn validate_logging(config: &JbpConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }
}
