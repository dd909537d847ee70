use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::codecs::Codec;
use crate::containers::Container;
use crate::file_task::FileTask;
use crate::plan::{ConversionPlan, PlanKind, ScaleTarget, StreamAction};
use crate::quality::Quality;
use super::hwaccel::HwAccel;

pub const PROFILE: &str = "baseline";
pub const LEVEL: &str = "3.0";
pub const PIX_FMT: &str = "yuv420p";
pub const AUDIO_BITRATE: &str = "160k";
pub const AUDIO_CHANNELS: &str = "2";
pub const MAX_MUXING_QUEUE_SIZE: &str = "4096";

/// A complete ffmpeg argument list, without the program name.
#[derive(Clone, Debug, PartialEq)]
pub struct FfmpegCommand {
    args: Vec<OsString>,
    output: PathBuf,
}

impl FfmpegCommand {
    /// `output` must be the last element of `args`.
    pub fn new(args: Vec<OsString>, output: PathBuf) -> Self {
        FfmpegCommand { args, output }
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// True when `flag` is immediately followed by `value`.
    pub fn has_pair(&self, flag: &str, value: &str) -> bool {
        self.args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    pub fn value_of(&self, flag: &str) -> Option<&OsString> {
        self.args.windows(2).find(|w| w[0] == flag).map(|w| &w[1])
    }
}

impl Display for FfmpegCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ffmpeg")?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

/// POSIX single-quote escaping, so dry-run output can be pasted into a shell.
fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return String::from("''");
    }
    if s.bytes().all(|b| matches!(b,
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' |
        b'_' | b'-' | b'.' | b'/' | b':' | b'@' | b'%' | b'+' | b'=' | b','
    )) {
        return String::from(s);
    }
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}

/// Turns plans into ffmpeg invocations. Holds the per-run settings; the
/// hardware method is detected once before the batch starts.
pub struct CommandBuilder {
    hwaccel: Option<HwAccel>,
    container: Container,
    quality: Quality,
    tune: Option<String>,
}

impl CommandBuilder {
    pub fn new(hwaccel: Option<HwAccel>, container: Container) -> Self {
        CommandBuilder {
            hwaccel,
            container,
            quality: Quality::default(),
            tune: Some(String::from("animation")),
        }
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn tune(mut self, tune: Option<String>) -> Self {
        self.tune = tune;
        self
    }

    pub fn hwaccel(&self) -> Option<&HwAccel> {
        self.hwaccel.as_ref()
    }

    /// `output` is where ffmpeg writes, usually a temp file next to
    /// `task.destination`.
    pub fn build(&self, task: &FileTask, plan: &ConversionPlan, output: &Path) -> FfmpegCommand {
        fn os(s: &str) -> OsString { OsString::from(s) }

        let mut args = vec![
            os("-hide_banner"),
            os("-nostdin"),
            os("-nostats"),
            os("-loglevel"), os("error"),
            os("-progress"), os("pipe:1"),
            os("-y"),
        ];

        if let Some(hwaccel) = self.hardware_decode(plan) {
            args.push(os("-hwaccel")); args.push(os(hwaccel.name()));
        }

        args.push(os("-i")); args.push(task.source.clone().into_os_string());

        // everything in, then carve out what the container cannot hold
        args.push(os("-map")); args.push(os("0"));
        if plan.aux.subtitles == StreamAction::Drop {
            args.push(os("-map")); args.push(os("-0:s?"));
        }
        if plan.aux.attachments == StreamAction::Drop {
            args.push(os("-map")); args.push(os("-0:t?"));
        }
        args.push(os("-map_metadata")); args.push(os("0"));
        args.push(os("-map_chapters"));
        args.push(os(match plan.aux.chapters {
            StreamAction::Drop => "-1",
            _ => "0",
        }));

        match plan.kind {
            PlanKind::RemuxOnly => {
                args.push(os("-c:v")); args.push(os("copy"));
            },
            PlanKind::Transcode => {
                args.append(&mut self.video_parameters(plan).iter().map(|s| os(s)).collect());
            },
        };

        args.push(os("-c:a")); args.push(os(Codec::AAC.encoder().unwrap_or("aac")));
        args.push(os("-b:a")); args.push(os(AUDIO_BITRATE));
        args.push(os("-ac")); args.push(os(AUDIO_CHANNELS));

        if plan.aux.subtitles == StreamAction::Copy {
            args.push(os("-c:s")); args.push(os("copy"));
        }
        if plan.aux.attachments == StreamAction::Copy {
            args.push(os("-c:t")); args.push(os("copy"));
        }

        args.push(os("-max_muxing_queue_size")); args.push(os(MAX_MUXING_QUEUE_SIZE));
        args.push(os("-threads")); args.push(os("0"));

        // explicity set container format, the temp file name says nothing useful
        args.append(&mut Container::parameters(self.container).iter().map(|s| os(s)).collect());

        args.push(output.as_os_str().to_os_string());

        FfmpegCommand::new(args, PathBuf::from(output))
    }

    fn hardware_decode(&self, plan: &ConversionPlan) -> Option<&HwAccel> {
        match (plan.kind, plan.hardware_decode) {
            (PlanKind::Transcode, true) => self.hwaccel.as_ref(),
            _ => None,
        }
    }

    /// With cover art present, `:V` keeps the encoder and the scale filter
    /// off attached pictures, which are stream copied instead.
    fn video_parameters(&self, plan: &ConversionPlan) -> Vec<String> {
        let mut params = vec![];
        let v = match plan.aux.cover_art {
            StreamAction::Copy => {
                params.push(String::from("-c:v"));
                params.push(String::from("copy"));
                "V"
            },
            _ => "v",
        };
        params.append(&mut vec![
            format!("-c:{}", v), String::from(Codec::H264.encoder().unwrap_or("libx264")),
            format!("-profile:{}", v), String::from(PROFILE),
            format!("-level:{}", v), String::from(LEVEL),
            match v {
                "v" => String::from("-pix_fmt"),
                _ => format!("-pix_fmt:{}", v),
            }, String::from(PIX_FMT),
            match v {
                "v" => String::from("-vf"),
                _ => format!("-filter:{}", v),
            }, scale_filter(plan.scale),
        ]);
        params.append(&mut Quality::parameters(self.quality));
        if let Some(tune) = &self.tune {
            params.push(String::from("-tune"));
            params.push(tune.clone());
        }
        params
    }
}

/// The source size is usually known, in which case the exact output size is
/// baked in. Otherwise ffmpeg computes the fit at runtime, turning the box
/// upright for portrait frames.
pub fn scale_filter(scale: ScaleTarget) -> String {
    match scale {
        ScaleTarget::Exact(resolution) => format!("scale={}:{},setsar=1", resolution.width, resolution.height),
        ScaleTarget::Bounded { long, short } => {
            let factor = format!(
                "min(1\\,if(gte(iw\\,ih)\\,min({l}/iw\\,{s}/ih)\\,min({s}/iw\\,{l}/ih)))",
                l = long,
                s = short);
            format!("scale=trunc(iw*{f}/2)*2:trunc(ih*{f}/2)*2,setsar=1", f = factor)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, ClassifierOptions};
    use crate::codecs::Profile;
    use crate::plan::AuxStreams;
    use crate::probe::{MediaProbe, Resolution};

    fn task() -> FileTask {
        FileTask::new(
            Path::new("/in"),
            Path::new("/in/Show/ep01.mkv"),
            Path::new("/out"),
            "_480p",
            Container::Matroska).unwrap()
    }

    fn probe_1080p_high() -> MediaProbe {
        MediaProbe {
            video_codec: Some(Codec::H264),
            resolution: Some(Resolution::new(1920, 1080)),
            pix_fmt: Some(String::from("yuv420p")),
            profile: Some(Profile::High),
            level: Some(41),
            audio_codec: Some(Codec::Unknown(String::from("flac"))),
            audio_channels: Some(6),
            audio_streams: 1,
            has_subtitles: true,
            has_attachments: true,
            has_chapters: true,
            ..MediaProbe::empty()
        }
    }

    fn probe_480p_baseline() -> MediaProbe {
        MediaProbe {
            video_codec: Some(Codec::H264),
            resolution: Some(Resolution::new(854, 480)),
            pix_fmt: Some(String::from("yuv420p")),
            profile: Some(Profile::Baseline),
            level: Some(30),
            audio_codec: Some(Codec::AAC),
            audio_channels: Some(2),
            audio_bitrate: Some(160_000),
            audio_streams: 1,
            ..MediaProbe::empty()
        }
    }

    fn build(builder: &CommandBuilder, probe: &MediaProbe) -> FfmpegCommand {
        let task = task();
        let plan = classify(probe, &ClassifierOptions::default());
        builder.build(&task, &plan, &task.destination)
    }

    #[test]
    fn test_transcode_1080p_high() {
        let builder = CommandBuilder::new(None, Container::Matroska);
        let cmd = build(&builder, &probe_1080p_high());
        assert!(cmd.has_pair("-c:v", "libx264"));
        assert!(cmd.has_pair("-profile:v", "baseline"));
        assert!(cmd.has_pair("-level:v", "3.0"));
        assert!(cmd.has_pair("-pix_fmt", "yuv420p"));
        assert!(cmd.has_pair("-vf", "scale=852:480,setsar=1"));
        assert!(cmd.has_pair("-c:a", "aac"));
        assert!(cmd.has_pair("-b:a", "160k"));
        assert!(cmd.has_pair("-ac", "2"));
        assert!(cmd.has_pair("-c:s", "copy"));
        assert!(cmd.has_pair("-c:t", "copy"));
        assert!(cmd.has_pair("-map_chapters", "0"));
        assert!(cmd.has_pair("-preset", "medium"));
        assert!(cmd.has_pair("-crf", "18"));
        assert!(cmd.has_pair("-tune", "animation"));
        assert!(cmd.has_pair("-f", "matroska"));
        assert!(!cmd.has_flag("-hwaccel"));
        assert_eq!(cmd.args().last().unwrap(), "/out/Show/ep01_480p.mkv");
    }

    #[test]
    fn test_remux_480p_baseline() {
        let builder = CommandBuilder::new(Some(HwAccel::new("vaapi")), Container::Matroska);
        let cmd = build(&builder, &probe_480p_baseline());
        assert!(cmd.has_pair("-c:v", "copy"));
        assert!(cmd.has_pair("-c:a", "aac"));
        assert!(cmd.has_pair("-b:a", "160k"));
        assert!(cmd.has_pair("-ac", "2"));
        for flag in ["-profile:v", "-level:v", "-vf", "-crf", "-preset", "-pix_fmt", "-hwaccel", "-tune"] {
            assert!(!cmd.has_flag(flag), "remux must not carry {}", flag);
        }
        assert!(!cmd.has_flag("-c:s"));
        assert!(!cmd.has_flag("-c:t"));
    }

    #[test]
    fn test_hwaccel_goes_before_input() {
        let builder = CommandBuilder::new(Some(HwAccel::new("vaapi")), Container::Matroska);
        let cmd = build(&builder, &probe_1080p_high());
        let args: Vec<String> = cmd.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let hw = args.iter().position(|a| a == "-hwaccel").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(hw < input);
        assert_eq!(args[hw + 1], "vaapi");
    }

    #[test]
    fn test_software_decode_when_plan_says_so() {
        let builder = CommandBuilder::new(Some(HwAccel::new("cuda")), Container::Matroska);
        let task = task();
        let plan = classify(&probe_1080p_high(), &ClassifierOptions::default()).without_hardware_decode();
        let cmd = builder.build(&task, &plan, &task.destination);
        assert!(!cmd.has_flag("-hwaccel"));
        assert!(cmd.has_pair("-c:v", "libx264"));
    }

    #[test]
    fn test_mp4_drops_subtitles_and_attachments() {
        let builder = CommandBuilder::new(None, Container::MP4);
        let task = task();
        let options = ClassifierOptions { container: Container::MP4, ..ClassifierOptions::default() };
        let plan = classify(&probe_1080p_high(), &options);
        let cmd = builder.build(&task, &plan, Path::new("/out/Show/ep01_480p.mkv.mp4"));
        assert!(cmd.has_pair("-map", "-0:s?"));
        assert!(cmd.has_pair("-map", "-0:t?"));
        assert!(!cmd.has_flag("-c:s"));
        assert!(!cmd.has_flag("-c:t"));
        assert!(cmd.has_pair("-movflags", "+faststart"));
        assert!(cmd.has_pair("-f", "mp4"));
    }

    #[test]
    fn test_transcode_always_caps_resolution() {
        let builder = CommandBuilder::new(None, Container::Matroska).tune(None);
        let task = task();
        let plan = classify(&MediaProbe::empty(), &ClassifierOptions::default());
        assert_eq!(plan.aux, AuxStreams::none());
        let cmd = builder.build(&task, &plan, &task.destination);
        assert!(cmd.has_pair("-profile:v", "baseline"));
        assert!(cmd.has_pair("-level:v", "3.0"));
        let vf = cmd.value_of("-vf").unwrap().to_string_lossy().into_owned();
        assert!(vf.starts_with("scale=trunc(iw*min(1\\,if(gte(iw\\,ih)\\,min(854/iw\\,480/ih)\\,min(480/iw\\,854/ih)))/2)*2:"));
        assert!(!cmd.has_flag("-tune"));
    }

    #[test]
    fn test_bounded_scale_turns_box_for_portrait() {
        let filter = scale_filter(ScaleTarget::Bounded { long: 854, short: 480 });
        let factor = "min(1\\,if(gte(iw\\,ih)\\,min(854/iw\\,480/ih)\\,min(480/iw\\,854/ih)))";
        assert_eq!(filter, format!("scale=trunc(iw*{f}/2)*2:trunc(ih*{f}/2)*2,setsar=1", f = factor));
        assert_eq!(scale_filter(ScaleTarget::Exact(Resolution::new(480, 854))), "scale=480:854,setsar=1");
    }

    #[test]
    fn test_cover_art_is_copied_not_scaled() {
        let builder = CommandBuilder::new(None, Container::MP4);
        let task = task();
        let mut probe = probe_1080p_high();
        probe.has_cover_art = true;
        let options = ClassifierOptions { container: Container::MP4, ..ClassifierOptions::default() };
        let plan = classify(&probe, &options);
        let cmd = builder.build(&task, &plan, Path::new("/out/Show/ep01_480p.mkv.mp4"));

        let args: Vec<String> = cmd.args().iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let copy = args.windows(2).position(|w| w[0] == "-c:v" && w[1] == "copy").unwrap();
        let encode = args.windows(2).position(|w| w[0] == "-c:V" && w[1] == "libx264").unwrap();
        assert!(copy < encode);
        assert!(cmd.has_pair("-profile:V", "baseline"));
        assert!(cmd.has_pair("-level:V", "3.0"));
        assert!(cmd.has_pair("-pix_fmt:V", "yuv420p"));
        assert!(cmd.has_pair("-filter:V", "scale=852:480,setsar=1"));
        assert!(!cmd.has_flag("-vf"));

        let remux = classify(&probe_480p_baseline(), &options);
        assert!(builder.build(&task, &remux, &task.destination).has_pair("-c:v", "copy"));
    }

    #[test]
    fn test_quality_override() {
        let builder = CommandBuilder::new(None, Container::Matroska).quality(Quality::Fast);
        let cmd = build(&builder, &probe_1080p_high());
        assert!(cmd.has_pair("-crf", "24"));
        assert!(cmd.has_pair("-preset", "veryfast"));
    }

    #[test]
    fn test_display_quotes_paths() {
        let builder = CommandBuilder::new(None, Container::Matroska);
        let task = FileTask::new(Path::new("/in"), Path::new("/in/It's Show.mkv"), Path::new("/out"), "_480p", Container::Matroska).unwrap();
        let plan = classify(&probe_480p_baseline(), &ClassifierOptions::default());
        let line = builder.build(&task, &plan, &task.destination).to_string();
        assert!(line.starts_with("ffmpeg -hide_banner "));
        assert!(line.contains("-i '/in/It'\"'\"'s Show.mkv'"));
        assert!(line.ends_with("'/out/It'\"'\"'s Show_480p.mkv'"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("pipe:1"), "pipe:1");
        assert_eq!(shell_quote("a b"), "'a b'");
    }
}
