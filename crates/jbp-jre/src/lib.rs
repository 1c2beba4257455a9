//! The OpenJDK JRE component of the Java buildpack.
//!
//! [`OpenJdk`] installs a JRE tarball into `<app>/.openjdk`, adds the
//! out-of-memory and memory-calculation hooks, and contributes `JAVA_HOME`
//! and `JAVA_OPTS` for launch.

mod archive;
mod component;
mod error;
mod openjdk;
mod repository;
mod scripts;

pub use archive::{extract_tar_gz, install_tar_gz};
pub use component::{Component, ComponentContext, JavaOpts};
pub use error::{JreError, Result};
pub use openjdk::{JreSource, OpenJdk, JAVA_HOME_DIR};
pub use repository::{compare_versions, version_matches, Repository, INDEX_FILE_NAME};
pub use scripts::{
    diagnostics_log_path, DIAGNOSTICS_DIR, DIAGNOSTICS_LOG_FILE, KILLJAVA_SCRIPT, MEMCALC_BINARY,
    MEMCALC_SCRIPT, MEMORY_SETTINGS_FILE,
};
