use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::containers::Container;
use crate::fstools::VIDEO_EXTENSIONS;

/// One input file and where its converted copy goes.
#[derive(Clone, Debug, PartialEq)]
pub struct FileTask {
    pub source: PathBuf,
    /// `source` relative to the input root.
    pub relative: PathBuf,
    pub destination: PathBuf,
}

impl FileTask {
    /// Returns `None` when `source` is not below `input_root` or has no
    /// file name.
    pub fn new(input_root: &Path, source: &Path, output_root: &Path, suffix: &str, container: Container) -> Option<Self> {
        let relative = source.strip_prefix(input_root).ok()?;
        let file_name = output_file_name(relative, suffix, container)?;
        let destination = match relative.parent() {
            Some(parent) => output_root.join(parent).join(file_name),
            None => output_root.join(file_name),
        };
        Some(FileTask {
            source: PathBuf::from(source),
            relative: PathBuf::from(relative),
            destination,
        })
    }
}

/// `ep01.mkv` becomes `ep01_480p.mkv`. When the container changes the old
/// extension is kept in the name (`ep01_480p.mp4.mkv`) so that `ep01.mp4`
/// and `ep01.mkv` side by side never map to the same output.
pub fn output_file_name(path: &Path, suffix: &str, container: Container) -> Option<OsString> {
    let stem = path.file_stem()?;
    let container_ext = Container::extension(container);

    let mut name = OsString::from(stem);
    name.push(suffix);
    match path.extension() {
        Some(ext) if ext == container_ext => (),
        Some(ext) => {
            name.push(".");
            name.push(ext);
        },
        None => (),
    };
    name.push(".");
    name.push(container_ext);
    Some(name)
}

/// A suffix keeps output names apart only if it cannot pass for the end of
/// a kept extension. With `4`, `a.mp4` and `a4.mp.mkv` would both become
/// `a4.mp4.mkv`.
pub fn is_unambiguous_suffix(suffix: &str) -> bool {
    let lower = suffix.to_lowercase();
    !suffix.is_empty()
        && !suffix.contains(['.', '/', '\\'])
        && !VIDEO_EXTENSIONS.iter().any(|ext| ext.ends_with(lower.as_str()))
}
