use std::fmt::Display;

use crate::probe::Resolution;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlanKind {
    /// Keep the video bitstream, re-encode audio only.
    RemuxOnly,
    Transcode,
}

impl Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanKind::RemuxOnly => write!(f, "remux"),
            PlanKind::Transcode => write!(f, "transcode"),
        }
    }
}

/// Output frame size for a transcode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleTarget {
    /// Computed from the probed source size; both sides even.
    Exact(Resolution),
    /// Source size unknown, let ffmpeg fit the frame into the box at runtime.
    Bounded { long: u64, short: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StreamAction {
    Absent,
    Copy,
    Drop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuxStreams {
    pub subtitles: StreamAction,
    pub attachments: StreamAction,
    pub chapters: StreamAction,
    /// Attached pictures are always copied as they are.
    pub cover_art: StreamAction,
}

impl AuxStreams {
    pub fn none() -> Self {
        AuxStreams {
            subtitles: StreamAction::Absent,
            attachments: StreamAction::Absent,
            chapters: StreamAction::Absent,
            cover_art: StreamAction::Absent,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversionPlan {
    pub kind: PlanKind,
    pub scale: ScaleTarget,
    /// Hardware decode is wanted; the builder still needs a detected method.
    pub hardware_decode: bool,
    pub aux: AuxStreams,
    /// Why the file could not simply be remuxed. Empty for RemuxOnly.
    pub reasons: Vec<String>,
    /// Non-fatal notes, e.g. streams the output container cannot hold.
    pub warnings: Vec<String>,
}

impl ConversionPlan {
    /// Same file, full re-encode. Used when a remux attempt fails.
    pub fn escalate(&self, hardware_decode: bool) -> ConversionPlan {
        let mut plan = self.clone();
        plan.kind = PlanKind::Transcode;
        plan.hardware_decode = hardware_decode;
        plan.reasons.push(String::from("remux failed"));
        plan
    }

    pub fn without_hardware_decode(&self) -> ConversionPlan {
        let mut plan = self.clone();
        plan.hardware_decode = false;
        plan
    }
}
