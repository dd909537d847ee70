use std::fs;
use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, error, info, warn};

use crate::classifier::{classify, ClassifierOptions};
use crate::containers::Container;
use crate::error::{ExecutionError, FileError, PlanError, TaskError};
use crate::ffmpeg::command::CommandBuilder;
use crate::ffmpeg::Toolchain;
use crate::file_task::FileTask;
use crate::plan::{ConversionPlan, PlanKind};
use crate::stop::StopSignal;
use crate::summary::Summary;
use crate::transcode_state::{FileOutcome, FileReport, FileState};

#[derive(Clone, Debug, Default)]
pub struct DriverOptions {
    pub dry_run: bool,
    pub overwrite: bool,
    pub classifier: ClassifierOptions,
}

/// Walks a batch of files one at a time. A failing file is recorded and
/// the batch moves on; only the stop signal ends it early.
pub struct Driver {
    toolchain: Box<dyn Toolchain>,
    builder: CommandBuilder,
    options: DriverOptions,
    stop: StopSignal,
}

impl Driver {
    pub fn new(toolchain: Box<dyn Toolchain>, builder: CommandBuilder, options: DriverOptions, stop: StopSignal) -> Self {
        Driver {
            toolchain,
            builder,
            options,
            stop,
        }
    }

    pub fn run(&self, tasks: &[FileTask]) -> Summary {
        let mut summary = Summary::new();
        let total = tasks.len();

        for (i, task) in tasks.iter().enumerate() {
            if self.stop.should_stop() {
                summary.unprocessed = total - i;
                warn!(remaining = summary.unprocessed, "stop requested, not starting further files");
                break;
            }

            println!("[{}/{}] {}", i + 1, total, task.relative.display());
            let report = self.process(task);
            match &report.outcome {
                FileOutcome::Failed(err) => error!(path = %task.source.display(), "{}", err),
                FileOutcome::Skipped(reason) => info!(path = %task.source.display(), "skipped: {}", reason),
                outcome => debug!(path = %task.source.display(), "{}", outcome),
            };
            println!("    {}", report.outcome);
            summary.push(report);
        }

        summary
    }

    pub fn process(&self, task: &FileTask) -> FileReport {
        let mut report = FileReport::new(task.source.clone(), task.destination.clone(), FileOutcome::Skipped(String::new()));
        report.outcome = match self.convert(task, &mut report) {
            Ok(outcome) => outcome,
            Err(err) => {
                transition(task, FileState::Failed);
                FileOutcome::Failed(err)
            },
        };
        report
    }

    fn convert(&self, task: &FileTask, report: &mut FileReport) -> Result<FileOutcome, TaskError> {
        transition(task, FileState::Pending);
        if task.destination.exists() && !self.options.overwrite {
            return Ok(FileOutcome::Skipped(format!("{} already exists", task.destination.display())));
        }

        let probe = self.toolchain.probe(&task.source)?;
        transition(task, FileState::Probed);
        debug!(path = %task.source.display(), "{}", probe);
        if !probe.has_video() {
            return Ok(FileOutcome::Skipped(String::from("no video stream")));
        }
        report.source_size = fs::metadata(&task.source).ok().map(|m| m.len());

        let plan = classify(&probe, &self.options.classifier);
        transition(task, FileState::Planned);
        match plan.kind {
            PlanKind::RemuxOnly => info!(path = %task.source.display(), "already 480p baseline h264, remuxing"),
            PlanKind::Transcode => info!(path = %task.source.display(), reasons = ?plan.reasons, "transcoding"),
        };
        for warning in &plan.warnings {
            warn!(path = %task.source.display(), "{}", warning);
        }

        if self.options.dry_run {
            let command = self.builder.build(task, &plan, &task.destination);
            println!("    {}", command);
            report.command = Some(command);
            return Ok(FileOutcome::Planned(plan.kind));
        }

        let parent = task
            .destination
            .parent()
            .ok_or_else(|| PlanError::for_file(&task.destination, "destination has no parent directory"))?;
        fs::create_dir_all(parent).map_err(|err| FileError::for_file(parent, err))?;

        let kind = self.execute(task, plan, parent, probe.duration, report)?;
        report.output_size = fs::metadata(&task.destination).ok().map(|m| m.len());
        transition(task, FileState::Done);
        Ok(FileOutcome::Done(kind))
    }

    /// Runs the plan, falling back to a cheaper-to-get-right plan when
    /// ffmpeg rejects it. Returns the kind of plan that succeeded.
    fn execute(&self, task: &FileTask, plan: ConversionPlan, parent: &Path, duration: Option<f64>, report: &mut FileReport) -> Result<PlanKind, TaskError> {
        let mut plan = plan;
        loop {
            let temp = self.temp_path(task, parent)?;
            let command = self.builder.build(task, &plan, &temp);
            debug!(path = %task.source.display(), "{}", command);
            report.command = Some(command.clone());

            transition(task, FileState::Executing);
            match self.toolchain.execute(&command, duration, &self.stop) {
                Ok(()) => {
                    temp.persist(&task.destination)
                        .map_err(|err| FileError::for_file(&task.destination, err.error))?;
                    return Ok(plan.kind);
                },
                Err(err) => {
                    // dropping the temp path removes whatever ffmpeg left behind
                    drop(temp);
                    match self.fallback(&plan, &err) {
                        Some(next) => {
                            warn!(path = %task.source.display(), "{}; retrying: {}", err, describe_fallback(&plan));
                            plan = next;
                        },
                        None => return Err(err.into()),
                    }
                },
            };
        }
    }

    fn fallback(&self, plan: &ConversionPlan, err: &ExecutionError) -> Option<ConversionPlan> {
        if !err.is_exit_failure() {
            return None;
        }
        match plan.kind {
            PlanKind::RemuxOnly => Some(plan.escalate(self.options.classifier.hardware_decode)),
            PlanKind::Transcode if plan.hardware_decode && self.builder.hwaccel().is_some() => Some(plan.without_hardware_decode()),
            PlanKind::Transcode => None,
        }
    }

    /// Hidden file next to the destination, so the final rename never
    /// crosses filesystems.
    fn temp_path(&self, task: &FileTask, parent: &Path) -> Result<TempPath, FileError> {
        let name = task
            .destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let suffix = format!(".partial.{}", Container::extension(self.options.classifier.container));
        let prefix = format!(".{}.", name);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(&suffix);

        // ffmpeg truncates rather than recreates, so the temp file's mode is
        // what gets published; 0o666 is still filtered through the umask
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }

        builder
            .tempfile_in(parent)
            .map(|f| f.into_temp_path())
            .map_err(|err| FileError::for_file(parent, err))
    }
}

fn describe_fallback(plan: &ConversionPlan) -> &'static str {
    match plan.kind {
        PlanKind::RemuxOnly => "full transcode",
        PlanKind::Transcode => "software decode",
    }
}

fn transition(task: &FileTask, state: FileState) {
    debug!(path = %task.source.display(), state = %state, "state");
}
