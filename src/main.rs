pub mod classifier;
pub mod codecs;
pub mod config;
pub mod containers;
pub mod driver;
pub mod error;
pub mod ffmpeg;
pub mod file_task;
pub mod fstools;
pub mod plan;
pub mod probe;
pub mod quality;
pub mod stop;
pub mod summary;
pub mod transcode_state;
pub mod transcoder;

use std::process::ExitCode;

use rustop::opts;
use tracing::{info, warn};

use classifier::ClassifierOptions;
use config::{CliOptions, Config};
use driver::{Driver, DriverOptions};
use error::ConfigError;
use ffmpeg::command::CommandBuilder;
use ffmpeg::hwaccel::{self, HwAccelPreference};
use ffmpeg::FFmpeg;
use file_task::FileTask;
use stop::StopSignal;

/// Exit status for problems found before any file is touched.
const CONFIG_ERROR: u8 = 2;

fn main() -> ExitCode {
    let (args, _rest) = opts! {
        synopsis "Shrink a video library to 480p baseline H.264 for old devices, mirroring the directory tree.";
        opt dry_run:bool=false, desc:"Print the ffmpeg commands that would run, but don't create anything.";
        opt no_attachments:bool=false, desc:"Drop attachment streams (fonts) instead of copying them.";
        opt hwaccel:String=String::from("auto"), short:'H', desc:"Hardware decoding. [auto, force, off]";
        opt suffix:String=String::from("_480p"), desc:"Appended to each output file stem.";
        opt container:String=String::from("mkv"), desc:"Output container. [mkv, mp4]";
        opt quality:String=String::from("great"), desc:"Encoding quality. [insane, excellent, great, good, fast]";
        opt tune:String=String::from("animation"), desc:"x264 tune, or \"none\".";
        opt overwrite:bool=false, desc:"Replace existing outputs instead of skipping them.";
        opt verbose:bool=false, desc:"Debug logging.";
        param input:String, desc:"Input directory";
        param output:String, desc:"Output directory";
    }.parse_or_exit();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        match args.verbose {
            true => String::from("debug"),
            false => String::from("info"),
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = CliOptions {
        input: args.input,
        output: args.output,
        dry_run: args.dry_run,
        no_attachments: args.no_attachments,
        hwaccel: args.hwaccel,
        suffix: args.suffix,
        container: args.container,
        quality: args.quality,
        tune: args.tune,
        overwrite: args.overwrite,
    };

    match Config::new(&cli).and_then(|config| run(&config)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(CONFIG_ERROR)
        },
    }
}

fn run(config: &Config) -> Result<ExitCode, ConfigError> {
    let f = FFmpeg::locate()?;
    if !f.is_installed() {
        return Err(ConfigError::ToolMissing("ffmpeg"));
    }

    let available = match config.hwaccel {
        HwAccelPreference::Off => vec![],
        _ => f.hwaccels(),
    };
    let hwaccel = hwaccel::resolve(config.hwaccel, &available)?;
    match &hwaccel {
        Some(method) => info!("hardware decode: {}", method),
        None => info!("hardware decode: off"),
    };

    let stop = StopSignal::install().unwrap_or_else(|err| {
        warn!("unable to install signal handlers ({}); Ctrl-C will abort immediately", err);
        StopSignal::new()
    });

    let tasks: Vec<FileTask> = fstools::scan(&config.input, Some(&config.output))
        .iter()
        .filter_map(|source| FileTask::new(&config.input, source, &config.output, &config.suffix, config.container))
        .collect();
    info!(input = %config.input.display(), output = %config.output.display(), "{} video files found", tasks.len());

    let builder = CommandBuilder::new(hwaccel, config.container)
        .quality(config.quality)
        .tune(config.tune.clone());
    let options = DriverOptions {
        dry_run: config.dry_run,
        overwrite: config.overwrite,
        classifier: ClassifierOptions {
            container: config.container,
            preserve_attachments: config.preserve_attachments,
            hardware_decode: config.hwaccel != HwAccelPreference::Off,
        },
    };

    let summary = Driver::new(Box::new(f), builder, options, stop).run(&tasks);
    println!("{}", summary);
    Ok(summary.exit_code())
}
