use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::process::{Command, Stdio};
use serde::Deserialize;
use tracing::debug;

use crate::codecs::{Codec, Profile};
use crate::error::ProbeError;
use crate::ffmpeg::own_process_group;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl Resolution {
    pub fn new(width: u64, height: u64) -> Self {
        Resolution { width, height }
    }

    pub fn shorter(&self) -> u64 {
        u64::min(self.width, self.height)
    }

    pub fn longer(&self) -> u64 {
        u64::max(self.width, self.height)
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Stream characteristics of one input file. Anything ffprobe left out is
/// `None`; consumers treat `None` as "does not meet the target".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaProbe {
    pub video_codec: Option<Codec>,
    pub resolution: Option<Resolution>,
    pub pix_fmt: Option<String>,
    pub profile: Option<Profile>,
    /// ffprobe's integer form, 30 for level 3.0.
    pub level: Option<i64>,
    pub audio_codec: Option<Codec>,
    pub audio_channels: Option<u64>,
    pub audio_bitrate: Option<u64>,
    pub audio_streams: usize,
    pub has_subtitles: bool,
    pub has_attachments: bool,
    pub has_chapters: bool,
    /// Embedded cover images, which ffprobe lists as video streams.
    pub has_cover_art: bool,
    /// Seconds.
    pub duration: Option<f64>,
}

impl MediaProbe {
    pub fn empty() -> Self {
        MediaProbe::default()
    }

    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }
}

impl Display for MediaProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let codec = self.video_codec.as_ref().map(|c| c.to_string()).unwrap_or_else(|| String::from("-"));
        let profile = self.profile.as_ref().map(|p| p.to_string()).unwrap_or_else(|| String::from("-"));
        let resolution = self.resolution.map(|r| r.to_string()).unwrap_or_else(|| String::from("-x-"));
        let pix_fmt = self.pix_fmt.as_deref().unwrap_or("-");
        let audio = self.audio_codec.as_ref().map(|c| c.to_string()).unwrap_or_else(|| String::from("-"));
        write!(f, "{} {} {} {} / {}", codec, profile, resolution, pix_fmt, audio)?;
        if let Some(channels) = self.audio_channels {
            write!(f, " {}ch", channels)?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonOutput {
    #[serde(default)]
    pub streams: Vec<FFProbeJsonStream>,
    #[serde(default)]
    pub chapters: Vec<serde_json::Value>,
    pub format: Option<FFProbeJsonFormat>,
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonStream {
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub profile: Option<String>,
    pub level: Option<i64>,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub pix_fmt: Option<String>,
    pub channels: Option<u64>,
    pub bit_rate: Option<String>,
    #[serde(default)]
    pub disposition: HashMap<String, i64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl FFProbeJsonStream {
    fn is_attached_picture(&self) -> bool {
        self.disposition.get("attached_pic").copied().unwrap_or(0) == 1
    }

    /// Matroska muxers often leave `bit_rate` empty and record the
    /// statistics in a `BPS` tag instead.
    fn bitrate(&self) -> Option<u64> {
        self.bit_rate
            .as_deref()
            .and_then(|b| b.parse().ok())
            .or_else(|| {
                self.tags
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("bps") || k.to_lowercase().starts_with("bps-"))
                    .and_then(|(_, v)| v.parse().ok())
            })
    }
}

#[derive(Deserialize, Debug)]
struct FFProbeJsonFormat {
    pub duration: Option<String>,
}

pub fn probe_file(ffprobe: &Path, path: &Path) -> Result<MediaProbe, ProbeError> {
    let output = own_process_group(&mut Command::new(ffprobe))
        .args(["-v", "error", "-of", "json", "-show_streams", "-show_chapters", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ProbeError::for_file(path, &format!("unable to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let msg = match stderr.trim() {
            "" => String::from("ffprobe did not exit successfully."),
            s => format!("ffprobe did not exit successfully: {}", s),
        };
        return Err(ProbeError::for_file(path, &msg));
    }

    let utf8 = String::from_utf8(output.stdout)
        .map_err(|_| ProbeError::for_file(path, "ffprobe output is not valid UTF-8."))?;
    parse_probe_output(path, &utf8)
}

pub fn parse_probe_output(path: &Path, json: &str) -> Result<MediaProbe, ProbeError> {
    let deserialized = serde_json::from_str::<FFProbeJsonOutput>(json)
        .map_err(|e| ProbeError::for_file(path, &format!("unexpected ffprobe output: {}", e)))?;

    let video = deserialized.streams.iter()
        .find(|s| s.codec_type.as_deref() == Some("video") && !s.is_attached_picture());
    let audio: Vec<&FFProbeJsonStream> = deserialized.streams.iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .collect();
    let first_audio = audio.first();

    let probe = MediaProbe {
        video_codec: video.and_then(|v| v.codec_name.as_deref()).map(Codec::from_str),
        resolution: video.and_then(|v| match (v.width, v.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Resolution::new(w, h)),
            _ => None,
        }),
        pix_fmt: video.and_then(|v| v.pix_fmt.clone()),
        profile: video.and_then(|v| v.profile.as_deref()).map(Profile::from_str),
        level: video.and_then(|v| v.level).filter(|l| *l > 0),
        audio_codec: first_audio.and_then(|a| a.codec_name.as_deref()).map(Codec::from_str),
        audio_channels: first_audio.and_then(|a| a.channels),
        audio_bitrate: first_audio.and_then(|a| a.bitrate()),
        audio_streams: audio.len(),
        has_subtitles: deserialized.streams.iter().any(|s| s.codec_type.as_deref() == Some("subtitle")),
        has_attachments: deserialized.streams.iter().any(|s| s.codec_type.as_deref() == Some("attachment")),
        has_chapters: !deserialized.chapters.is_empty(),
        has_cover_art: deserialized.streams.iter().any(|s| s.codec_type.as_deref() == Some("video") && s.is_attached_picture()),
        duration: deserialized.format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0),
    };

    debug!(path = %path.display(), probe = %probe, "probed");
    Ok(probe)
}
