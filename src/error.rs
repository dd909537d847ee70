use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// ffprobe could not make sense of a file.
#[derive(Debug, Error)]
#[error("Error probing {path:?}: {msg}")]
pub struct ProbeError {
    path: PathBuf,
    msg: String,
}

impl ProbeError {
    pub fn for_file(path: &Path, msg: &str) -> Self {
        ProbeError {
            path: PathBuf::from(path),
            msg: String::from(msg),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A plan that cannot be turned into a command. The classifier never
/// produces one, so seeing this is a bug.
#[derive(Debug, Error)]
#[error("Error planning {path:?}: {msg}")]
pub struct PlanError {
    path: PathBuf,
    msg: String,
}

impl PlanError {
    pub fn for_file(path: &Path, msg: &str) -> Self {
        PlanError {
            path: PathBuf::from(path),
            msg: String::from(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unable to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}{}", exit_description(.code), stderr_suffix(.stderr))]
    Exited {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("error waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("aborted by stop signal")]
    Aborted,
}

impl ExecutionError {
    /// True when the program ran and reported failure, as opposed to never
    /// starting or being killed. Only these failures are worth retrying with
    /// a different plan.
    pub fn is_exit_failure(&self) -> bool {
        matches!(self, ExecutionError::Exited { .. })
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => String::from("no status (killed by signal)"),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.trim() {
        "" => String::new(),
        s => format!(": {}", s),
    }
}

/// Filesystem trouble around an output file.
#[derive(Debug, Error)]
#[error("Error writing {path:?}: {source}")]
pub struct FileError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl FileError {
    pub fn for_file(path: &Path, source: io::Error) -> Self {
        FileError {
            path: PathBuf::from(path),
            source,
        }
    }
}

/// Everything that can fail a single file. None of these stop the batch.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Fatal problems found before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0:?} does not exist.")]
    InputMissing(PathBuf),

    #[error("{0:?} is not a directory.")]
    InputNotDirectory(PathBuf),

    #[error("Output directory {0:?} is inside a file, not a directory.")]
    OutputNotDirectory(PathBuf),

    #[error("Invalid value {value:?} for --{option}; expected one of: {expected}")]
    InvalidOption {
        option: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Output directory {0:?} is the input directory.")]
    OutputIsInput(PathBuf),

    #[error("Invalid --suffix {0:?}: must be non-empty, without dots or path separators, and must not look like the end of a video extension.")]
    InvalidSuffix(String),

    #[error("{0} is not installed or not on PATH.")]
    ToolMissing(&'static str),

    #[error("hardware decoding was forced but ffmpeg reports no usable method")]
    HwAccelUnavailable,
}
