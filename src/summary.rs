use std::fmt::Display;
use std::process::ExitCode;

use human_repr::HumanCount;

use crate::plan::PlanKind;
use crate::transcode_state::{FileOutcome, FileReport};

/// End-of-run tally. Failures are listed with their reasons so the batch
/// can be re-run for just those files.
#[derive(Debug, Default)]
pub struct Summary {
    pub reports: Vec<FileReport>,
    /// Files never started because a stop was requested.
    pub unprocessed: usize,
}

impl Summary {
    pub fn new() -> Self {
        Summary::default()
    }

    pub fn push(&mut self, report: FileReport) {
        self.reports.push(report);
    }

    pub fn transcoded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Done(PlanKind::Transcode)))
    }

    pub fn remuxed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Done(PlanKind::RemuxOnly)))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Planned(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| o.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.reports.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.is_success() {
            true => ExitCode::SUCCESS,
            false => ExitCode::FAILURE,
        }
    }

    fn count<F: Fn(&FileOutcome) -> bool>(&self, f: F) -> usize {
        self.reports.iter().filter(|r| f(&r.outcome)).count()
    }

    fn bytes(&self) -> (u64, u64) {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, FileOutcome::Done(_)))
            .fold((0, 0), |(i, o), r| (i + r.source_size.unwrap_or(0), o + r.output_size.unwrap_or(0)))
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Summary: Transcoded={}, Remuxed={}", self.transcoded(), self.remuxed())?;
        if self.planned() > 0 {
            write!(f, ", Planned={}", self.planned())?;
        }
        write!(f, ", Skipped={}, Failed={}", self.skipped(), self.failed())?;
        if self.unprocessed > 0 {
            write!(f, ", Unprocessed={}", self.unprocessed)?;
        }

        let (source, output) = self.bytes();
        if source > 0 {
            write!(f, "\n{} -> {}", source.human_count_bytes(), output.human_count_bytes())?;
        }

        if !self.is_success() {
            write!(f, "\nFailed files:")?;
            for report in self.failures() {
                write!(f, "\n  {}: {}", report.source.display(), report.outcome)?;
            }
        }
        Ok(())
    }
}
