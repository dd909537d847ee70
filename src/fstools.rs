use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "webm", "mov", "m4v", "avi", "flv", "ts", "m2ts", "mts", "mxf",
];

pub enum DirEntryCategory {
    DoesNotExist,
    RegularFile,
    Directory,
    Unknown,
}

/// Follows symlinks, so a link to a directory is a directory.
pub fn classify_file(path: &Path) -> DirEntryCategory {
    match fs::metadata(path) {
        Ok(metadata) => {
            if metadata.is_file() {
                DirEntryCategory::RegularFile
            } else if metadata.is_dir() {
                DirEntryCategory::Directory
            } else {
                DirEntryCategory::Unknown
            }
        },
        Err(_) => DirEntryCategory::DoesNotExist,
    }
}

pub fn is_video_file(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        },
        None => false,
    }
}

/// All video files below `root`, sorted by path. Symlinks are followed;
/// loops and files reachable through more than one link are visited once.
/// `exclude` (typically the output root) is never descended into.
pub fn scan(root: &Path, exclude: Option<&Path>) -> Vec<PathBuf> {
    let exclude = exclude.and_then(|e| fs::canonicalize(e).ok());
    let mut seen = HashSet::new();
    let mut files = vec![];

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| match (&exclude, entry.file_type().is_dir()) {
            (Some(exclude), true) => fs::canonicalize(entry.path()).map(|p| p != *exclude).unwrap_or(true),
            _ => true,
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                match err.loop_ancestor() {
                    Some(ancestor) => warn!(path = ?err.path(), ancestor = %ancestor.display(), "skipping symlink loop"),
                    None => warn!("skipping unreadable entry: {}", err),
                };
                continue;
            },
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_video_file(path) {
            debug!(path = %path.display(), "skipping non-video file");
            continue;
        }

        let canonical = fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path));
        if !seen.insert(canonical) {
            debug!(path = %path.display(), "skipping file already reached through another link");
            continue;
        }

        files.push(PathBuf::from(path));
    }

    files.sort();
    files
}
