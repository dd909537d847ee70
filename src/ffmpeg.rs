use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::warn;

use crate::error::{ConfigError, ExecutionError, ProbeError};
use crate::probe::{probe_file, MediaProbe};
use crate::stop::StopSignal;
use crate::transcoder;
use command::FfmpegCommand;

pub mod command;
pub mod hwaccel;

/// The two things this tool needs from the outside world: stream metadata
/// for a file, and running an ffmpeg command to completion.
pub trait Toolchain {
    fn probe(&self, path: &Path) -> Result<MediaProbe, ProbeError>;

    fn execute(&self, command: &FfmpegCommand, duration: Option<f64>, stop: &StopSignal) -> Result<(), ExecutionError>;
}

/// Moves a child out of the terminal's foreground process group, so Ctrl-C
/// reaches only this process and the stop signal decides what happens next.
pub fn own_process_group(cmd: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd
}

pub struct FFmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FFmpeg {
    /// Finds ffmpeg and ffprobe on PATH.
    pub fn locate() -> Result<Self, ConfigError> {
        Ok(FFmpeg {
            ffmpeg: which::which("ffmpeg").map_err(|_| ConfigError::ToolMissing("ffmpeg"))?,
            ffprobe: which::which("ffprobe").map_err(|_| ConfigError::ToolMissing("ffprobe"))?,
        })
    }

    pub fn is_installed(&self) -> bool {
        let cmd = own_process_group(&mut Command::new(&self.ffmpeg))
            .arg("-version")
            .stdin(Stdio::null())
            .output();
        match cmd {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    /// Hardware decode methods this ffmpeg build was compiled with. An
    /// ffmpeg that cannot answer is treated as having none.
    pub fn hwaccels(&self) -> Vec<String> {
        let output = own_process_group(&mut Command::new(&self.ffmpeg))
            .args(["-hide_banner", "-hwaccels"])
            .stdin(Stdio::null())
            .output();
        match output {
            Ok(output) if output.status.success() => hwaccel::parse_hwaccels(&String::from_utf8_lossy(&output.stdout)),
            Ok(output) => {
                warn!(status = ?output.status.code(), "ffmpeg -hwaccels failed; using software decode");
                vec![]
            },
            Err(err) => {
                warn!("unable to run ffmpeg -hwaccels ({}); using software decode", err);
                vec![]
            },
        }
    }
}

impl Toolchain for FFmpeg {
    fn probe(&self, path: &Path) -> Result<MediaProbe, ProbeError> {
        probe_file(&self.ffprobe, path)
    }

    fn execute(&self, command: &FfmpegCommand, duration: Option<f64>, stop: &StopSignal) -> Result<(), ExecutionError> {
        transcoder::run(&self.ffmpeg, command, duration, stop)
    }
}
