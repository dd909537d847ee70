use std::fmt::Display;
use std::path::PathBuf;

use crate::error::TaskError;
use crate::ffmpeg::command::FfmpegCommand;
use crate::plan::PlanKind;

/// Where a file is in its pipeline. Only the driver moves it forward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FileState {
    Pending,
    Probed,
    Planned,
    Executing,
    Done,
    Failed,
}

impl Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state_str = match self {
            FileState::Pending => "pending",
            FileState::Probed => "probed",
            FileState::Planned => "planned",
            FileState::Executing => "executing",
            FileState::Done => "done",
            FileState::Failed => "failed",
        };
        write!(f, "{}", state_str)
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    /// Converted and renamed into place.
    Done(PlanKind),
    /// Dry run: the command was built but not run.
    Planned(PlanKind),
    Skipped(String),
    Failed(TaskError),
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }
}

impl Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOutcome::Done(PlanKind::Transcode) => write!(f, "✅ transcoded"),
            FileOutcome::Done(PlanKind::RemuxOnly) => write!(f, "✅ remuxed (audio re-encoded)"),
            FileOutcome::Planned(kind) => write!(f, "🔎 would {}", kind),
            FileOutcome::Skipped(reason) => write!(f, "🤷 skipped: {}", reason),
            FileOutcome::Failed(err) => write!(f, "🚫 {}", err),
        }
    }
}

/// What happened to one file.
#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: FileOutcome,
    /// Last command built for the file, the one that ran or would run.
    pub command: Option<FfmpegCommand>,
    pub source_size: Option<u64>,
    pub output_size: Option<u64>,
}

impl FileReport {
    pub fn new(source: PathBuf, destination: PathBuf, outcome: FileOutcome) -> Self {
        FileReport {
            source,
            destination,
            outcome,
            command: None,
            source_size: None,
            output_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use std::path::Path;

    #[test]
    fn test_outcome_display() {
        assert_eq!(FileOutcome::Done(PlanKind::Transcode).to_string(), "✅ transcoded");
        assert_eq!(FileOutcome::Planned(PlanKind::RemuxOnly).to_string(), "🔎 would remux");
        assert_eq!(FileOutcome::Skipped(String::from("output exists")).to_string(), "🤷 skipped: output exists");
        let failed = FileOutcome::Failed(TaskError::from(ProbeError::for_file(Path::new("x.mkv"), "boom")));
        assert!(failed.is_failure());
        assert_eq!(failed.to_string(), "🚫 Error probing \"x.mkv\": boom");
    }
}
