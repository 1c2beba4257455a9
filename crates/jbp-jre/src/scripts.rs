use std::path::{Path, PathBuf};

use crate::error::{io_at, Result};

const KILLJAVA_TEMPLATE: &str = include_str!("../resources/killjava.sh");
const MEMCALC_TEMPLATE: &str = include_str!("../resources/memcalc.sh");

/// Directory, relative to the application, shared by buildpack diagnostics.
pub const DIAGNOSTICS_DIR: &str = ".buildpack-diagnostics";
pub const DIAGNOSTICS_LOG_FILE: &str = "buildpack.log";

/// File names under `<java_home>/bin`.
pub const KILLJAVA_SCRIPT: &str = "killjava";
pub const MEMCALC_SCRIPT: &str = "memcalc";
/// Executable the memcalc script delegates to.
pub const MEMCALC_BINARY: &str = "jbp";
/// Persisted memory settings, relative to the JRE home.
pub const MEMORY_SETTINGS_FILE: &str = "memory.json";

pub fn diagnostics_log_path(app_dir: &Path) -> PathBuf {
    app_dir.join(DIAGNOSTICS_DIR).join(DIAGNOSTICS_LOG_FILE)
}

/// The diagnostics log as seen from a script in `script_dir`, a directory
/// inside the application given relative to it.
fn log_file_from(script_dir: &Path) -> String {
    let up = "../".repeat(script_dir.components().count());
    format!("${{SCRIPT_DIR}}/{up}{DIAGNOSTICS_DIR}/{DIAGNOSTICS_LOG_FILE}")
}

pub(crate) fn render_killjava(script_dir: &Path) -> String {
    KILLJAVA_TEMPLATE.replace("@@LOG_FILE_NAME@@", &log_file_from(script_dir))
}

pub(crate) fn render_memcalc() -> String {
    MEMCALC_TEMPLATE
        .replace("@@MEMCALC_BINARY@@", MEMCALC_BINARY)
        .replace("@@SETTINGS_FILE@@", &format!("../{MEMORY_SETTINGS_FILE}"))
}

/// Write `contents` to `path` with mode 0755.
pub(crate) fn write_executable(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_at(parent))?;
    }
    std::fs::write(path, contents).map_err(io_at(path))?;
    make_executable(path)
}

pub(crate) fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .map_err(io_at(path))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
