use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{JreError, Result};

pub const INDEX_FILE_NAME: &str = "index.json";

/// A local directory of JRE tarballs described by an `index.json` that maps
/// version strings to archive paths.
///
/// ```json
/// { "1.7.0_45": "openjdk-1.7.0_45.tar.gz", "1.7.0_51": "openjdk-1.7.0_51.tar.gz" }
/// ```
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    index: BTreeMap<String, String>,
}

impl Repository {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let index_path = root.join(INDEX_FILE_NAME);
        let text =
            std::fs::read_to_string(&index_path).map_err(|err| JreError::RepositoryIndex {
                path: index_path.clone(),
                message: err.to_string(),
            })?;
        let index = serde_json::from_str(&text).map_err(|err| JreError::RepositoryIndex {
            path: index_path.clone(),
            message: format!("expected a JSON object of version to archive path ({err})"),
        })?;
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Resolve `pattern` to the best matching version and its archive.
    pub fn find(&self, pattern: &str) -> Result<(String, PathBuf)> {
        let best = self
            .index
            .iter()
            .filter(|(version, _)| version_matches(pattern, version))
            .max_by(|(a, _), (b, _)| compare_versions(a, b));

        let Some((version, archive)) = best else {
            return Err(JreError::NoMatchingVersion {
                pattern: pattern.to_string(),
                repository: self.root.clone(),
            });
        };

        tracing::debug!(
            target: "jbp.jre",
            pattern,
            version = %version,
            "resolved JRE version"
        );
        Ok((version.clone(), self.root.join(archive)))
    }
}

fn segments(version: &str) -> Vec<&str> {
    version.split(['.', '_', '-']).collect()
}

/// Exact match, or prefix match when the pattern's last segment is `+`.
pub fn version_matches(pattern: &str, version: &str) -> bool {
    let pattern = pattern.trim();
    let pattern_segments = segments(pattern);
    match pattern_segments.split_last() {
        Some((&"+", prefix)) => {
            let candidate = segments(version);
            candidate.len() > prefix.len() && candidate[..prefix.len()] == *prefix
        }
        _ => pattern == version,
    }
}

/// Segment-wise ordering: numeric segments compare numerically, anything
/// else lexically. A version that is a prefix of another sorts first.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = segments(a);
    let b = segments(b);
    for (left, right) in a.iter().zip(&b) {
        let ordering = match (left.parse::<u64>(), right.parse::<u64>()) {
            (Ok(left), Ok(right)) => left.cmp(&right),
            _ => left.cmp(right),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}
