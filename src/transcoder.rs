use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use human_repr::HumanCount;
use kdam::{term, tqdm, Bar, BarExt};
use tracing::{debug, warn};

use crate::error::ExecutionError;
use crate::ffmpeg::command::FfmpegCommand;
use crate::ffmpeg::own_process_group;
use crate::stop::StopSignal;

/// Lines of ffmpeg's stderr kept for the failure message.
const STDERR_TAIL_LINES: usize = 5;

/// How often the abort flag and the child's exit are checked.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct CompressionProgress {
    pub out_time_us: u64,
    pub fps: f64,
    pub total_size: usize,
    pub speed: String,
}

impl CompressionProgress {
    pub fn new() -> Self {
        CompressionProgress {
            out_time_us: 0,
            fps: 0.0,
            total_size: 0,
            speed: String::new(),
        }
    }

    fn seconds(&self) -> usize {
        (self.out_time_us / 1_000_000) as usize
    }
}

enum FFmpegStdoutResult {
    Continue,
    Render,
}

/// Runs ffmpeg to completion. No timeout: encodes of long files are
/// expected to take hours. `duration` (seconds) only sizes the progress bar.
pub fn run(program: &Path, command: &FfmpegCommand, duration: Option<f64>, stop: &StopSignal) -> Result<(), ExecutionError> {
    let name = program.display().to_string();
    let mut child = own_process_group(&mut Command::new(program))
        .args(command.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExecutionError::Spawn {
            program: name.clone(),
            source,
        })?;
    debug!(pid = child.id(), "spawned {}", name);

    let stderr = child.stderr.take();
    let stderr_thread = thread::spawn(move || read_stderr_tail(stderr));
    let stdout = child.stdout.take();

    let child = Arc::new(Mutex::new(child));
    let finished = Arc::new(AtomicBool::new(false));
    let watcher = {
        let (child, finished, stop) = (Arc::clone(&child), Arc::clone(&finished), stop.clone());
        thread::spawn(move || watch_for_abort(&child, &finished, &stop))
    };

    if let Some(stdout) = stdout {
        consume_stdout(stdout, duration, command.output());
    }

    let status = wait(&child, &name);
    finished.store(true, Ordering::SeqCst);
    let aborted = watcher.join().unwrap_or(false);
    let status = status?;
    let stderr = stderr_thread.join().unwrap_or_default();

    if aborted {
        return Err(ExecutionError::Aborted);
    }

    match status.success() {
        true => Ok(()),
        false => Err(ExecutionError::Exited {
            program: name,
            code: status.code(),
            stderr,
        }),
    }
}

/// Kills the child once an abort is requested, whether or not ffmpeg is
/// still printing progress. Returns true if it did.
fn watch_for_abort(child: &Mutex<Child>, finished: &AtomicBool, stop: &StopSignal) -> bool {
    while !finished.load(Ordering::SeqCst) {
        if stop.should_abort() {
            let mut child = child.lock().unwrap_or_else(|e| e.into_inner());
            warn!(pid = child.id(), "killing ffmpeg");
            return match child.kill() {
                Ok(()) => true,
                Err(err) => {
                    warn!(pid = child.id(), "error killing ffmpeg: {}", err);
                    false
                },
            };
        }
        thread::sleep(POLL_INTERVAL);
    }
    false
}

fn wait(child: &Mutex<Child>, name: &str) -> Result<ExitStatus, ExecutionError> {
    loop {
        let polled = child.lock().unwrap_or_else(|e| e.into_inner()).try_wait();
        match polled {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(ExecutionError::Wait {
                    program: String::from(name),
                    source,
                })
            },
        }
    }
}

/// Drives the progress bar from `-progress pipe:1` until ffmpeg closes it.
fn consume_stdout(stdout: ChildStdout, duration: Option<f64>, output: &Path) {
    term::init(false);

    let label = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut pbar = tqdm!(
        total = duration.map(|d| d.ceil() as usize).unwrap_or(0),
        desc = label,
        unit = "s",
        position = 0,
        force_refresh = true
    );

    let mut progress = CompressionProgress::new();
    let stdout_reader = BufReader::new(stdout);
    for line in stdout_reader.lines() {
        if let Ok(l) = line {
            match handle_ffmpeg_stdout_line(&l, &mut progress) {
                FFmpegStdoutResult::Continue => (),
                FFmpegStdoutResult::Render => render(&mut pbar, &progress, duration),
            }
        }
    }

    eprintln!();
}

fn render(pbar: &mut Bar, progress: &CompressionProgress, duration: Option<f64>) {
    let predicted = match duration {
        Some(d) => predict_compressed_size(progress.total_size, d, progress.out_time_us),
        None => 0,
    };
    pbar.set_postfix(format!("{} (~{}) {} {:.0}fps",
        progress.total_size.human_count_bytes(),
        predicted.human_count_bytes(),
        progress.speed,
        progress.fps));
    let _ = pbar.update_to(progress.seconds());
}

fn handle_ffmpeg_stdout_line(line: &str, progress: &mut CompressionProgress) -> FFmpegStdoutResult {
    match line.split_once('=') {
        Some((key, value)) => match key.trim() {
            "fps" => {
                progress.fps = value.trim().parse().unwrap_or(progress.fps);
                FFmpegStdoutResult::Continue
            },
            // out_time_ms is microseconds too, ffmpeg never fixed the name
            "out_time_us" | "out_time_ms" => {
                progress.out_time_us = value.trim().parse().unwrap_or(progress.out_time_us);
                FFmpegStdoutResult::Continue
            },
            "total_size" => {
                progress.total_size = value.trim().parse().unwrap_or(progress.total_size);
                FFmpegStdoutResult::Continue
            },
            "speed" => {
                progress.speed = String::from(value.trim());
                FFmpegStdoutResult::Continue
            },
            "progress" => FFmpegStdoutResult::Render,
            _ => FFmpegStdoutResult::Continue,
        },
        None => FFmpegStdoutResult::Continue,
    }
}

fn read_stderr_tail(stderr: Option<ChildStderr>) -> String {
    let mut buf = Vec::new();
    if let Some(stream) = stderr {
        let _ = BufReader::new(stream).read_to_end(&mut buf);
    }
    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("; ")
}

fn predict_compressed_size(compressed_size: usize, duration: f64, out_time_us: u64) -> usize {
    match out_time_us {
        0 => 0,
        _ => ((compressed_size as f64) * (duration * 1_000_000.0 / (out_time_us as f64))) as usize,
    }
}
