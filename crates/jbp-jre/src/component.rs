use std::path::{Path, PathBuf};

use crate::error::Result;

/// Options passed to the JVM at launch, in insertion order.
///
/// Values are shell fragments evaluated by the launch command, so `$PWD` and
/// backtick substitutions are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaOpts(Vec<String>);

impl JavaOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `opt` unless it is already present.
    pub fn push(&mut self, opt: impl Into<String>) {
        let opt = opt.into();
        if !self.contains(&opt) {
            self.0.push(opt);
        }
    }

    pub fn contains(&self, opt: &str) -> bool {
        self.0.iter().any(|existing| existing == opt)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Space-joined value for the `JAVA_OPTS` environment variable.
    pub fn to_env_value(&self) -> String {
        self.0.join(" ")
    }
}

/// State shared between the buildpack driver and its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentContext {
    pub app_dir: PathBuf,
    /// `JAVA_HOME` as seen by the launch command, e.g. `$PWD/.openjdk`.
    pub java_home: Option<String>,
    pub java_opts: JavaOpts,
}

impl ComponentContext {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            java_home: None,
            java_opts: JavaOpts::new(),
        }
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }
}

/// A buildpack component: detection, staging and launch configuration.
pub trait Component {
    /// The component id and version, e.g. `openjdk=1.7.0_51`, or `None` when
    /// the component does not apply.
    fn detect(&self) -> Option<String>;

    /// Install the component into the application directory.
    fn compile(&self, ctx: &ComponentContext) -> Result<()>;

    /// Contribute launch configuration.
    fn release(&self, ctx: &mut ComponentContext) -> Result<()>;
}
