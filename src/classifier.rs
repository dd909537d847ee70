use crate::codecs::{is_yuv420, Codec};
use crate::containers::Container;
use crate::plan::{AuxStreams, ConversionPlan, PlanKind, ScaleTarget, StreamAction};
use crate::probe::{MediaProbe, Resolution};

/// Longer side of the 480p box (16:9 at 480 lines).
pub const MAX_LONG_SIDE: u64 = 854;
/// Shorter side of the 480p box, the "480" in 480p.
pub const MAX_SHORT_SIDE: u64 = 480;

pub const TARGET_CODEC: Codec = Codec::H264;

#[derive(Clone, Debug)]
pub struct ClassifierOptions {
    pub container: Container,
    pub preserve_attachments: bool,
    pub hardware_decode: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        ClassifierOptions {
            container: Container::Matroska,
            preserve_attachments: true,
            hardware_decode: true,
        }
    }
}

/// Decides between remux and transcode. Pure; missing probe fields count
/// against the file, so anything unclear gets re-encoded.
pub fn classify(probe: &MediaProbe, options: &ClassifierOptions) -> ConversionPlan {
    let mut reasons = vec![];

    match &probe.video_codec {
        Some(codec) if *codec == TARGET_CODEC => (),
        Some(codec) => reasons.push(format!("codec {} is not {}", codec, TARGET_CODEC)),
        None => reasons.push(String::from("video codec unknown")),
    };

    match &probe.profile {
        Some(profile) if profile.is_baseline() => (),
        Some(profile) => reasons.push(format!("profile {} is not baseline", profile)),
        None => reasons.push(String::from("profile unknown")),
    };

    match &probe.pix_fmt {
        Some(pix_fmt) if is_yuv420(pix_fmt) => (),
        Some(pix_fmt) => reasons.push(format!("pixel format {} is not 4:2:0", pix_fmt)),
        None => reasons.push(String::from("pixel format unknown")),
    };

    match probe.resolution {
        Some(resolution) if fits_480p(resolution) => (),
        Some(resolution) => reasons.push(format!("{} is larger than 480p", resolution)),
        None => reasons.push(String::from("resolution unknown")),
    };

    let kind = match reasons.is_empty() {
        true => PlanKind::RemuxOnly,
        false => PlanKind::Transcode,
    };

    let mut warnings = vec![];
    let aux = plan_aux_streams(probe, options, &mut warnings);

    ConversionPlan {
        kind,
        scale: match probe.resolution {
            Some(resolution) => ScaleTarget::Exact(fit_within(resolution, MAX_LONG_SIDE, MAX_SHORT_SIDE)),
            None => ScaleTarget::Bounded { long: MAX_LONG_SIDE, short: MAX_SHORT_SIDE },
        },
        hardware_decode: kind == PlanKind::Transcode && options.hardware_decode,
        aux,
        reasons,
        warnings,
    }
}

/// Orientation-aware: 854x480 and 480x854 both fit.
pub fn fits_480p(resolution: Resolution) -> bool {
    resolution.shorter() <= MAX_SHORT_SIDE && resolution.longer() <= MAX_LONG_SIDE
}

/// Largest even-sided size with the source aspect ratio that fits inside
/// the box. Never upscales.
pub fn fit_within(source: Resolution, long_cap: u64, short_cap: u64) -> Resolution {
    let (long, short) = (source.longer(), source.shorter());
    let (new_long, new_short) = if long <= long_cap && short <= short_cap {
        (long, short)
    } else if long_cap * short < short_cap * long {
        (long_cap, short * long_cap / long)
    } else {
        (long * short_cap / short, short_cap)
    };

    let (new_long, new_short) = (even(new_long), even(new_short));
    match source.is_portrait() {
        true => Resolution::new(new_short, new_long),
        false => Resolution::new(new_long, new_short),
    }
}

fn even(n: u64) -> u64 {
    u64::max(2, n - n % 2)
}

fn plan_aux_streams(probe: &MediaProbe, options: &ClassifierOptions, warnings: &mut Vec<String>) -> AuxStreams {
    let container = options.container;
    let mut aux = AuxStreams::none();

    if probe.has_subtitles {
        aux.subtitles = if Container::supports_subtitle_copy(container) {
            StreamAction::Copy
        } else {
            warnings.push(format!("dropping subtitle streams: {} cannot hold them", container.to_string()));
            StreamAction::Drop
        };
    }

    if probe.has_attachments {
        aux.attachments = if !options.preserve_attachments {
            StreamAction::Drop
        } else if Container::supports_attachments(container) {
            StreamAction::Copy
        } else {
            warnings.push(format!("dropping attachment streams: {} cannot hold them", container.to_string()));
            StreamAction::Drop
        };
    }

    if probe.has_chapters {
        aux.chapters = if Container::supports_chapters(container) {
            StreamAction::Copy
        } else {
            warnings.push(format!("dropping chapters: {} cannot hold them", container.to_string()));
            StreamAction::Drop
        };
    }

    if probe.has_cover_art {
        aux.cover_art = StreamAction::Copy;
    }

    aux
}
