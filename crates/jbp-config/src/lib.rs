use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use jbp_memory::{FlagTemplates, MemoryRegion, MemorySettings, RegionOverride, MB};
use parking_lot::ReentrantMutex;
use thiserror::Error;

mod diagnostics;
mod logging;
mod validation;

pub use diagnostics::{
    ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics,
};
pub use logging::{init_tracing, LoggingConfig};
pub use validation::ConfigValidationContext;

/// A byte size which supports both raw byte counts and human-friendly suffixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl Serialize for ByteSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bytes(u64),
            Human(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bytes(value) => Ok(ByteSize(value)),
            Repr::Human(value) => jbp_memory::parse_byte_size(&value)
                .map(ByteSize)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Which JRE to install and where to find it.
///
/// ```toml
/// [jre]
/// version = "1.8.0_+"
/// repository = "/var/cache/jbp/openjdk"   # directory containing index.json
/// # archive = "openjdk.tar.gz"           # bypasses the repository
/// strip_components = 1
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JreConfig {
    /// Exact version or a pattern whose last segment is `+`.
    #[serde(default = "JreConfig::default_version")]
    pub version: String,

    /// Local repository directory holding `index.json`.
    #[serde(default)]
    pub repository: Option<PathBuf>,

    /// A specific JRE tarball. When set the repository is not consulted.
    #[serde(default)]
    pub archive: Option<PathBuf>,

    /// Leading path components dropped from archive entries.
    #[serde(default = "JreConfig::default_strip_components")]
    pub strip_components: usize,
}

impl JreConfig {
    fn default_version() -> String {
        "1.8.0_+".to_owned()
    }

    fn default_strip_components() -> usize {
        1
    }
}

impl Default for JreConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            repository: None,
            archive: None,
            strip_components: Self::default_strip_components(),
        }
    }
}

/// JVM memory sizing.
///
/// ```toml
/// [memory]
/// default_limit = "1G"
///
/// [memory.weights]        # replaces the default weights entirely
/// heap = 75
/// metaspace = 10
///
/// [memory.sizes]          # explicit sizes win over weights
/// metaspace = "64m"
/// heap = "50%"
///
/// [memory.minimums]
/// stack = "16m"
///
/// [memory.flags]          # merged onto the OpenJDK defaults; "" drops a flag
/// heap = "-Xmx{size}"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Budget used when neither `MEMORY_LIMIT` nor a cgroup limit is available.
    #[serde(default)]
    pub default_limit: Option<ByteSize>,

    /// Allocation granularity; every size is rounded down to a multiple of it.
    #[serde(default = "MemoryConfig::default_granularity")]
    pub granularity: ByteSize,

    #[serde(default = "MemorySettings::default_weights")]
    pub weights: BTreeMap<MemoryRegion, f64>,

    #[serde(default)]
    pub sizes: BTreeMap<MemoryRegion, RegionOverride>,

    #[serde(default)]
    pub minimums: BTreeMap<MemoryRegion, ByteSize>,

    #[serde(default)]
    pub flags: BTreeMap<MemoryRegion, String>,
}

impl MemoryConfig {
    fn default_granularity() -> ByteSize {
        ByteSize(MB)
    }

    pub fn memory_settings(&self) -> MemorySettings {
        let flags = self
            .flags
            .iter()
            .fold(FlagTemplates::defaults(), |templates, (region, template)| {
                if template.trim().is_empty() {
                    templates.without(*region)
                } else {
                    templates.with(*region, template.clone())
                }
            });

        MemorySettings {
            weights: self.weights.clone(),
            sizes: self.sizes.clone(),
            minimums: self
                .minimums
                .iter()
                .map(|(region, bytes)| (*region, bytes.0))
                .collect(),
            granularity: self.granularity.0,
            flags,
            default_limit: self.default_limit.map(|bytes| bytes.0),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_limit: None,
            granularity: Self::default_granularity(),
            weights: MemorySettings::default_weights(),
            sizes: BTreeMap::new(),
            minimums: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }
}

/// Top-level buildpack configuration loaded from `jbp.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JbpConfig {
    #[serde(default)]
    pub jre: JreConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

/// Redact quoted values from toml/serde messages.
///
/// Repository paths and URLs can embed credentials; errors end up in staging
/// logs, so only the shape of the problem is kept.
fn sanitize_toml_error_message(message: &str) -> String {
    static QUOTED_STRING_RE: OnceLock<regex::Regex> = OnceLock::new();
    static BACKTICKED_VALUE_RE: OnceLock<regex::Regex> = OnceLock::new();

    let quoted = QUOTED_STRING_RE.get_or_init(|| {
        regex::Regex::new(r#""(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'"#)
            .expect("quoted-string regex should compile")
    });
    let out = quoted.replace_all(message, r#""<redacted>""#);

    // `unknown variant `secret`, expected ...` echoes user input; `missing field `foo`` does not.
    let backticked = BACKTICKED_VALUE_RE.get_or_init(|| {
        regex::Regex::new(r"(unknown (?:field|variant)|invalid (?:type|value): \w+) `[^`]*`")
            .expect("backticked-value regex should compile")
    });
    backticked.replace_all(&out, "$1 `<redacted>`").into_owned()
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` includes a source snippet; keep just the message.
        ConfigError::Toml(sanitize_toml_error_message(err.message()))
    }
}

impl JbpConfig {
    /// Load a config file from TOML. Relative paths are resolved against the
    /// file's directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::load_from_path_with_diagnostics(path)?.0)
    }

    /// Load a config file and report unknown keys and semantic problems.
    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let ctx = ConfigValidationContext {
            config_dir: path.parent(),
        };
        let (mut config, diagnostics) = Self::load_from_str_with_diagnostics_inner(&text, ctx)?;
        if let Some(dir) = path.parent() {
            config.resolve_relative_paths(dir);
        }
        Ok((config, diagnostics))
    }

    /// Load a config from a TOML string and return diagnostics.
    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        Self::load_from_str_with_diagnostics_inner(text, ConfigValidationContext::default())
    }

    fn load_from_str_with_diagnostics_inner(
        text: &str,
        ctx: ConfigValidationContext<'_>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) =
            diagnostics::deserialize_toml_with_unknown_keys::<JbpConfig>(text)?;

        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };
        diagnostics.extend_validation(config.validate_with_context(ctx));

        Ok((config, diagnostics))
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for path in [&mut self.jre.repository, &mut self.jre.archive, &mut self.logging.file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn memory_settings(&self) -> MemorySettings {
        self.memory.memory_settings()
    }
}

pub const JBP_CONFIG_ENV_VAR: &str = "JBP_CONFIG_PATH";

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Run `f` while holding the config environment lock.
///
/// Tests that set [`JBP_CONFIG_ENV_VAR`] must go through this so concurrent
/// discovery in other tests does not observe the temporary value.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Locate the buildpack config.
///
/// Search order:
/// 1) `JBP_CONFIG_PATH` (relative values are resolved against `buildpack_root`)
/// 2) `jbp.toml` in `buildpack_root`
/// 3) `config/jbp.toml` in `buildpack_root`
pub fn discover_config_path(buildpack_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(JBP_CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            buildpack_root.join(candidate)
        };
        return Some(path);
    }

    ["jbp.toml", "config/jbp.toml"]
        .into_iter()
        .map(|name| buildpack_root.join(name))
        .find(|path| path.is_file())
}

/// Load the config for a buildpack root, falling back to defaults when none exists.
pub fn load_for_buildpack(
    buildpack_root: &Path,
) -> Result<(JbpConfig, Option<PathBuf>, ConfigDiagnostics), ConfigError> {
    let Some(path) = discover_config_path(buildpack_root) else {
        return Ok((JbpConfig::default(), None, ConfigDiagnostics::default()));
    };

    let (config, diagnostics) = JbpConfig::load_from_path_with_diagnostics(&path)?;
    Ok((config, Some(path), diagnostics))
}
