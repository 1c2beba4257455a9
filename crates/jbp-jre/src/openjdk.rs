use std::path::{Path, PathBuf};

use jbp_config::{JbpConfig, JreConfig};
use jbp_memory::{MemoryHeuristic, MemorySettings, WeightBalancingMemoryHeuristic};

use crate::archive;
use crate::component::{Component, ComponentContext};
use crate::error::{io_at, JreError, Result};
use crate::repository::Repository;
use crate::scripts::{self, KILLJAVA_SCRIPT, MEMCALC_BINARY, MEMCALC_SCRIPT, MEMORY_SETTINGS_FILE};

/// JRE install directory, relative to the application.
pub const JAVA_HOME_DIR: &str = ".openjdk";

const COMPONENT_ID: &str = "openjdk";

/// Where the JRE tarball comes from and which version it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JreSource {
    pub version: String,
    pub archive: PathBuf,
}

impl JreSource {
    /// An explicit `archive` wins; otherwise the version pattern is resolved
    /// against the repository index.
    pub fn from_config(jre: &JreConfig) -> Result<Self> {
        if let Some(archive) = &jre.archive {
            return Ok(Self {
                version: jre.version.clone(),
                archive: archive.clone(),
            });
        }

        let Some(repository) = &jre.repository else {
            return Err(JreError::NoSource);
        };
        let (version, archive) = Repository::open(repository)?.find(&jre.version)?;
        Ok(Self { version, archive })
    }
}

/// The OpenJDK JRE component.
pub struct OpenJdk {
    source: JreSource,
    strip_components: usize,
    settings: MemorySettings,
    heuristic: Box<dyn MemoryHeuristic>,
    memcalc_executable: Option<PathBuf>,
}

impl OpenJdk {
    /// Create the component and record `JAVA_HOME` in `ctx`.
    ///
    /// `settings` are persisted for the launch-time calculation; `heuristic`
    /// validates them during compile.
    pub fn new(
        ctx: &mut ComponentContext,
        source: JreSource,
        settings: MemorySettings,
        heuristic: Box<dyn MemoryHeuristic>,
    ) -> Self {
        ctx.java_home = Some(format!("$PWD/{JAVA_HOME_DIR}"));
        Self {
            source,
            strip_components: 1,
            settings,
            heuristic,
            memcalc_executable: None,
        }
    }

    pub fn from_config(ctx: &mut ComponentContext, config: &JbpConfig) -> Result<Self> {
        let source = JreSource::from_config(&config.jre)?;
        let settings = config.memory_settings();
        let heuristic = Box::new(WeightBalancingMemoryHeuristic::new(settings.clone()));
        Ok(Self::new(ctx, source, settings, heuristic)
            .strip_components(config.jre.strip_components))
    }

    #[must_use]
    pub fn strip_components(mut self, count: usize) -> Self {
        self.strip_components = count;
        self
    }

    /// Executable installed as `<java_home>/bin/jbp` for the memcalc script.
    #[must_use]
    pub fn memcalc_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.memcalc_executable = Some(path.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.source.version
    }

    fn write_memcalc(&self, java_home: &Path) -> Result<()> {
        let settings_path = java_home.join(MEMORY_SETTINGS_FILE);
        let json = serde_json::to_string_pretty(&self.settings).map_err(|err| JreError::Json {
            message: err.to_string(),
        })?;
        std::fs::write(&settings_path, json).map_err(io_at(&settings_path))?;

        let bin = java_home.join("bin");
        scripts::write_executable(&bin.join(MEMCALC_SCRIPT), &scripts::render_memcalc())?;

        if let Some(executable) = &self.memcalc_executable {
            let dest = bin.join(MEMCALC_BINARY);
            std::fs::copy(executable, &dest).map_err(io_at(&dest))?;
            scripts::make_executable(&dest)?;
        }
        Ok(())
    }
}

impl Component for OpenJdk {
    fn detect(&self) -> Option<String> {
        Some(format!("{COMPONENT_ID}={}", self.source.version))
    }

    fn compile(&self, ctx: &ComponentContext) -> Result<()> {
        let flags = self.heuristic.resolve()?;
        tracing::info!(
            target: "jbp.jre",
            version = %self.source.version,
            flags = %flags.join(" "),
            "memory settings resolved"
        );

        let java_home = ctx.app_dir.join(JAVA_HOME_DIR);
        archive::install_tar_gz(&self.source.archive, &java_home, self.strip_components)?;

        let script_dir = Path::new(JAVA_HOME_DIR).join("bin");
        scripts::write_executable(
            &ctx.app_dir.join(&script_dir).join(KILLJAVA_SCRIPT),
            &scripts::render_killjava(&script_dir),
        )?;
        self.write_memcalc(&java_home)?;

        tracing::info!(
            target: "jbp.jre",
            version = %self.source.version,
            java_home = %java_home.display(),
            "installed OpenJDK"
        );
        Ok(())
    }

    fn release(&self, ctx: &mut ComponentContext) -> Result<()> {
        let bin = format!("$PWD/{JAVA_HOME_DIR}/bin");
        ctx.java_opts
            .push(format!("-XX:OnOutOfMemoryError={bin}/{KILLJAVA_SCRIPT}"));
        ctx.java_opts.push("-Djava.io.tmpdir=$TMPDIR");
        ctx.java_opts.push(format!("`{bin}/{MEMCALC_SCRIPT} $PWD`"));
        Ok(())
    }
}
