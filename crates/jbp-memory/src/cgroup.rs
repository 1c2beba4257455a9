#[cfg(target_os = "linux")]
use std::io;
#[cfg(target_os = "linux")]
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// cgroup paths of the current process, from `/proc/self/cgroup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSelfCgroup {
    /// cgroup v2 unified hierarchy entry (`0::/some/path`).
    pub v2_path: Option<String>,
    /// cgroup v1 memory controller entry (`5:memory:/some/path`).
    pub v1_memory_path: Option<String>,
}

/// Parse `/proc/self/cgroup` contents. Does not touch the filesystem.
pub fn parse_proc_self_cgroup(contents: &str) -> ProcSelfCgroup {
    let mut v2_path = None;
    let mut v1_memory_path = None;

    for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let mut parts = line.splitn(3, ':');
        let (Some(hierarchy_id), Some(controllers), Some(path)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let path = path.trim();

        if v2_path.is_none() && hierarchy_id == "0" && controllers.is_empty() && !path.is_empty() {
            v2_path = Some(path.to_string());
        }

        if v1_memory_path.is_none()
            && controllers
                .split(',')
                .any(|controller| controller.trim() == "memory")
        {
            v1_memory_path = Some(path.to_string());
        }
    }

    ProcSelfCgroup {
        v2_path,
        v1_memory_path,
    }
}

// 1 EiB; anything above is how runtimes spell "no limit" on cgroup v1.
const UNLIMITED_THRESHOLD_BYTES: u64 = 1 << 60;

/// Parse a cgroup memory limit (`memory.max` or `memory.limit_in_bytes`).
///
/// Returns `None` for `max`, absurdly large values and anything unparsable.
pub fn parse_cgroup_memory_limit_bytes(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "max" {
        return None;
    }

    let value = match raw.parse::<u64>() {
        Ok(value) => value,
        Err(err) => {
            static REPORTED_PARSE_ERROR: OnceLock<()> = OnceLock::new();
            if REPORTED_PARSE_ERROR.set(()).is_ok() {
                tracing::debug!(
                    target: "jbp.memory",
                    raw,
                    error = %err,
                    "failed to parse cgroup memory limit value"
                );
            }
            return None;
        }
    };

    (value < UNLIMITED_THRESHOLD_BYTES).then_some(value)
}

#[cfg(target_os = "linux")]
fn read_trimmed(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text.trim().to_string()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            static REPORTED_READ_ERROR: OnceLock<()> = OnceLock::new();
            if REPORTED_READ_ERROR.set(()).is_ok() {
                tracing::debug!(
                    target: "jbp.memory",
                    path = %path.display(),
                    error = %err,
                    "failed to read cgroup file"
                );
            }
            None
        }
    }
}

/// Smallest limit set on `cgroup_path` or any of its ancestors.
#[cfg(target_os = "linux")]
fn effective_limit_from_ancestors(
    mount: &Path,
    cgroup_path: &str,
    limit_file: &str,
) -> Option<u64> {
    let mut rel = PathBuf::from(cgroup_path.trim_start_matches('/'));
    let mut best: Option<u64> = None;

    loop {
        let candidate = mount.join(&rel).join(limit_file);
        if let Some(limit) = read_trimmed(&candidate)
            .as_deref()
            .and_then(parse_cgroup_memory_limit_bytes)
        {
            best = Some(best.map_or(limit, |best| best.min(limit)));
        }

        if !rel.pop() {
            break;
        }
    }

    best
}

/// Memory limit of the current process's cgroup, if any.
#[cfg(target_os = "linux")]
pub(crate) fn cgroup_memory_limit_bytes() -> Option<u64> {
    let contents = match std::fs::read_to_string("/proc/self/cgroup") {
        Ok(contents) => contents,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "jbp.memory",
                    error = %err,
                    "failed to read /proc/self/cgroup while probing the memory limit"
                );
            }
            return None;
        }
    };
    let parsed = parse_proc_self_cgroup(&contents);

    let v2 = parsed.v2_path.as_deref().and_then(|path| {
        effective_limit_from_ancestors(Path::new("/sys/fs/cgroup"), path, "memory.max")
    });
    v2.or_else(|| {
        parsed.v1_memory_path.as_deref().and_then(|path| {
            effective_limit_from_ancestors(
                Path::new("/sys/fs/cgroup/memory"),
                path,
                "memory.limit_in_bytes",
            )
        })
    })
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn cgroup_memory_limit_bytes() -> Option<u64> {
    None
}
