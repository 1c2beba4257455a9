use std::fs::File;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::EntryType;

use crate::error::{io_at, JreError, Result};

/// Install a gzipped tarball at `dest`, replacing whatever was there.
///
/// The archive is unpacked into a staging directory next to `dest` and moved
/// into place only once every entry was written.
pub fn install_tar_gz(archive: &Path, dest: &Path, strip_components: usize) -> Result<()> {
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_at(parent))?;

    let staging = tempfile::Builder::new()
        .prefix(".jbp-jre-")
        .tempdir_in(parent)
        .map_err(io_at(parent))?;
    let entries = extract_tar_gz(archive, staging.path(), strip_components)?;

    if std::fs::symlink_metadata(dest).is_ok() {
        std::fs::remove_dir_all(dest).map_err(io_at(dest))?;
    }
    std::fs::rename(staging.path(), dest).map_err(io_at(dest))?;

    tracing::debug!(
        target: "jbp.jre",
        archive = %archive.display(),
        dest = %dest.display(),
        entries,
        "installed JRE archive"
    );
    Ok(())
}

/// Unpack a gzipped tarball into `dest`, dropping `strip_components` leading
/// path components from every entry. Returns the number of entries written.
///
/// Every write is checked against the canonical `dest`, including writes
/// through symlinks extracted earlier from the same archive.
pub fn extract_tar_gz(archive: &Path, dest: &Path, strip_components: usize) -> Result<usize> {
    let read_err = |source: std::io::Error| JreError::Archive {
        path: archive.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(read_err)?;
    std::fs::create_dir_all(dest).map_err(io_at(dest))?;
    let root = std::fs::canonicalize(dest).map_err(io_at(dest))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    let mut written = 0;

    for entry in tar.entries().map_err(read_err)? {
        let mut entry = entry.map_err(read_err)?;
        let entry_path = entry.path().map_err(read_err)?.into_owned();
        validate_archive_relative_path(&entry_path)?;
        let Some(relative) = strip_leading(&entry_path, strip_components) else {
            continue;
        };

        match entry.header().entry_type() {
            EntryType::Directory => {
                create_dir_inside(&root, &relative, &entry_path)?;
            }
            EntryType::Regular | EntryType::Continuous => {
                let out_path = prepare_entry_path(&root, &relative, &entry_path)?;
                entry.unpack(&out_path).map_err(io_at(&out_path))?;
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .map_err(read_err)?
                    .map(|target| target.into_owned())
                    .ok_or_else(|| JreError::InvalidArchivePath {
                        path: entry_path.clone(),
                    })?;
                let out_path = prepare_entry_path(&root, &relative, &entry_path)?;
                let depth = out_path
                    .parent()
                    .and_then(|parent| parent.strip_prefix(&root).ok())
                    .map_or(0, |parent| parent.components().count());
                if !symlink_stays_inside(depth, &target) {
                    return Err(JreError::EscapingSymlink { path: entry_path });
                }
                entry.unpack(&out_path).map_err(io_at(&out_path))?;

                // `..` after an earlier link walks up from the link's target,
                // not from where the link sits.
                if let Ok(resolved) = std::fs::canonicalize(&out_path) {
                    if !resolved.starts_with(&root) {
                        std::fs::remove_file(&out_path).map_err(io_at(&out_path))?;
                        return Err(JreError::EscapingSymlink { path: entry_path });
                    }
                }
            }
            other => {
                tracing::debug!(
                    target: "jbp.jre",
                    path = %entry_path.display(),
                    entry_type = ?other,
                    "skipping unsupported archive entry"
                );
                continue;
            }
        }
        written += 1;
    }

    Ok(written)
}

/// Create `relative` under `root` one component at a time, refusing to pass
/// through a symlink that resolves outside `root`. Returns the canonical
/// directory.
fn create_dir_inside(root: &Path, relative: &Path, entry_path: &Path) -> Result<PathBuf> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let resolved = std::fs::canonicalize(&current).map_err(io_at(&current))?;
                if !resolved.starts_with(root) || !resolved.is_dir() {
                    return Err(JreError::EscapingSymlink {
                        path: entry_path.to_path_buf(),
                    });
                }
                current = resolved;
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(JreError::InvalidArchivePath {
                    path: entry_path.to_path_buf(),
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                std::fs::create_dir(&current).map_err(io_at(&current))?;
            }
            Err(err) => return Err(io_at(&current)(err)),
        }
    }
    Ok(current)
}

/// Where a file or link entry lands: inside a checked parent directory, with
/// any file or link already at that name removed so the write cannot follow it.
fn prepare_entry_path(root: &Path, relative: &Path, entry_path: &Path) -> Result<PathBuf> {
    let Some(name) = relative.file_name() else {
        return Err(JreError::InvalidArchivePath {
            path: entry_path.to_path_buf(),
        });
    };
    let parent = create_dir_inside(
        root,
        relative.parent().unwrap_or_else(|| Path::new("")),
        entry_path,
    )?;
    let out_path = parent.join(name);
    if let Ok(meta) = std::fs::symlink_metadata(&out_path) {
        if !meta.is_dir() {
            std::fs::remove_file(&out_path).map_err(io_at(&out_path))?;
        }
    }
    Ok(out_path)
}

fn validate_archive_relative_path(path: &Path) -> Result<()> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(JreError::InvalidArchivePath {
                    path: path.to_path_buf(),
                })
            }
        }
    }
    Ok(())
}

fn strip_leading(path: &Path, count: usize) -> Option<PathBuf> {
    let normal: Vec<_> = path
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .collect();
    if normal.len() <= count {
        return None;
    }
    Some(normal[count..].iter().collect())
}

/// Whether a link target, followed from a directory `depth` levels below the
/// extraction root, stays inside the root.
fn symlink_stays_inside(depth: usize, target: &Path) -> bool {
    let mut depth = depth;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}
