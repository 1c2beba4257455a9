use std::path::PathBuf;

use jbp_memory::HeuristicError;

pub type Result<T> = std::result::Result<T, JreError>;

/// Errors produced while locating, installing or configuring a JRE.
#[derive(Debug, thiserror::Error)]
pub enum JreError {
    #[error("no JRE source configured: set jre.archive or jre.repository")]
    NoSource,

    #[error("invalid repository index {path}: {message}")]
    RepositoryIndex { path: PathBuf, message: String },

    #[error("no JRE version in {repository} matches {pattern}")]
    NoMatchingVersion { pattern: String, repository: PathBuf },

    #[error("invalid archive path: {path:?}")]
    InvalidArchivePath { path: PathBuf },

    #[error("symlink {path:?} points outside the JRE")]
    EscapingSymlink { path: PathBuf },

    #[error("failed to read archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("memory heuristic failed: {0}")]
    Memory(#[from] HeuristicError),

    #[error("failed to serialize memory settings: {message}")]
    Json { message: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> JreError {
    let path = path.into();
    move |source| JreError::Io { path, source }
}
