//! Loading replay uploads from the filesystem with capability-scoped access.
//!
//! A path is either a replay file or a directory whose direct children are
//! loaded in name order. Non-replay children of a directory are skipped;
//! a file named explicitly is always loaded so the parser can reject it.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};

use crate::domain::ReplayUpload;

const REPLAY_EXTENSION: &str = "gbx";

/// Outcome of loading one path.
#[derive(Debug)]
pub struct LoadedFile {
    /// Path the bytes were read from.
    pub path: PathBuf,
    /// Upload, or the I/O error that prevented reading it.
    pub upload: io::Result<ReplayUpload>,
}

/// Read one replay file as an upload attributed to `uploader`.
///
/// # Errors
///
/// Returns an error when the path has no file name or cannot be read.
pub fn load_upload(path: &Path, uploader: &str) -> io::Result<ReplayUpload> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "replay path must be a file"))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        io::Error::other(format!(
            "open replay directory '{}': {error}",
            parent.display()
        ))
    })?;
    let mut file = directory
        .open(Path::new(file_name))
        .map_err(|error| io::Error::other(format!("open replay '{}': {error}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|error| io::Error::other(format!("read replay '{}': {error}", path.display())))?;
    Ok(ReplayUpload::new(
        file_name.to_string_lossy(),
        bytes,
        uploader,
    ))
}

/// Load every file named by `paths`, expanding directories.
///
/// Failures are reported per path; an unreadable file does not stop the
/// rest from loading.
pub fn load_uploads(paths: &[PathBuf], uploader: &str) -> Vec<LoadedFile> {
    let mut loaded = Vec::new();
    for path in paths {
        if path.is_dir() {
            match replay_entries(path) {
                Ok(entries) => loaded.extend(entries.into_iter().map(|entry| LoadedFile {
                    upload: load_upload(&entry, uploader),
                    path: entry,
                })),
                Err(error) => loaded.push(LoadedFile {
                    path: path.clone(),
                    upload: Err(error),
                }),
            }
        } else {
            loaded.push(LoadedFile {
                path: path.clone(),
                upload: load_upload(path, uploader),
            });
        }
    }
    loaded
}

fn replay_entries(directory: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = Dir::open_ambient_dir(directory, ambient_authority())?;
    let mut names = Vec::new();
    for entry in dir.entries()? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let is_replay = Path::new(&name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(REPLAY_EXTENSION));
        if is_replay {
            names.push(name);
        }
    }
    names.sort();
    Ok(names.into_iter().map(|name| directory.join(name)).collect())
}
