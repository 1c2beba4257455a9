use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Combined diagnostics produced while loading and validating a buildpack config.
///
/// Callers always get a `JbpConfig` when deserialization succeeds, plus the
/// issues that may affect staging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    /// Keys present in the TOML that the schema does not know, as dotted paths.
    pub unknown_keys: Vec<String>,
    /// Non-fatal issues.
    pub warnings: Vec<ConfigWarning>,
    /// Inconsistencies that would make staging or launch fail.
    pub errors: Vec<ConfigValidationError>,
}

impl ConfigDiagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn extend_validation(&mut self, validation: ValidationDiagnostics) {
        self.warnings.extend(validation.warnings);
        self.errors.extend(validation.errors);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationDiagnostics {
    pub warnings: Vec<ConfigWarning>,
    pub errors: Vec<ConfigValidationError>,
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    InvalidValue {
        toml_path: String,
        message: String,
    },
    /// A minimum was set for a region that is unweighted or explicitly sized,
    /// so it never applies.
    MinimumWithoutWeight {
        toml_path: String,
    },
    FlagTemplateMissingPlaceholder {
        toml_path: String,
        template: String,
    },
    JreArchiveMissing {
        resolved: PathBuf,
    },
    JreRepositoryMissing {
        resolved: PathBuf,
    },
    LoggingLevelInvalid {
        value: String,
        normalized: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::InvalidValue { toml_path, message } => {
                write!(f, "{toml_path}: {message}")
            }
            ConfigWarning::MinimumWithoutWeight { toml_path } => {
                write!(f, "{toml_path}: region has no weight; the minimum is ignored")
            }
            ConfigWarning::FlagTemplateMissingPlaceholder {
                toml_path,
                template,
            } => write!(
                f,
                "{toml_path}: template {template:?} has no {} placeholder",
                jbp_memory::SIZE_PLACEHOLDER
            ),
            ConfigWarning::JreArchiveMissing { resolved } => {
                write!(f, "jre.archive: {} does not exist", resolved.display())
            }
            ConfigWarning::JreRepositoryMissing { resolved } => {
                write!(f, "jre.repository: {} is not a directory", resolved.display())
            }
            ConfigWarning::LoggingLevelInvalid { value, normalized } => write!(
                f,
                "logging.level: {value:?} (normalized {normalized:?}) is not a valid filter"
            ),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    InvalidValue { toml_path: String, message: String },
    /// Every weighted region without an explicit size has weight zero.
    AllWeightsZero,
    /// Percentage sizes add up to more than the whole budget.
    PercentagesExceedBudget { total_percent: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::InvalidValue { toml_path, message } => {
                write!(f, "{toml_path}: {message}")
            }
            ConfigValidationError::AllWeightsZero => f.write_str(
                "memory.weights: every region without an explicit size has weight 0",
            ),
            ConfigValidationError::PercentagesExceedBudget { total_percent } => write!(
                f,
                "memory.sizes: percentage sizes add up to {total_percent}%, more than the whole budget"
            ),
        }
    }
}

pub(crate) fn deserialize_toml_with_unknown_keys<T: DeserializeOwned>(
    text: &str,
) -> Result<(T, Vec<String>), toml::de::Error> {
    let mut unknown = Vec::<String>::new();
    let deserializer = toml::de::Deserializer::new(text);
    let value = serde_ignored::deserialize(deserializer, |path| {
        unknown.push(normalize_serde_ignored_path(path));
    })?;
    unknown.sort();
    unknown.dedup();
    Ok((value, unknown))
}

fn normalize_serde_ignored_path(path: serde_ignored::Path) -> String {
    // `serde_ignored::Path` renders with a leading `.` for root paths.
    path.to_string().trim_start_matches('.').to_string()
}
