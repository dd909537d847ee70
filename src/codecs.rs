use std::fmt::Display;

#[derive(Clone, Debug, PartialEq)]
pub enum Codec {
    Unknown(String),
    AV1,
    HEVC,
    H264,
    MPEG4,
    AAC,
    AC3,
    Opus,
}

impl Codec {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "av1" => Codec::AV1,
            "hevc" | "h265" => Codec::HEVC,
            "h264" | "avc" => Codec::H264,
            "mpeg4" => Codec::MPEG4,
            "aac" => Codec::AAC,
            "ac3" => Codec::AC3,
            "opus" => Codec::Opus,
            _ => Codec::Unknown(String::from(s)),
        }
    }

    /// ffmpeg encoder used when producing this codec.
    pub fn encoder(&self) -> Option<&'static str> {
        match self {
            Codec::H264 => Some("libx264"),
            Codec::AAC => Some("aac"),
            Codec::HEVC => Some("libx265"),
            Codec::AV1 => Some("libsvtav1"),
            Codec::Opus => Some("libopus"),
            Codec::AC3 => Some("ac3"),
            Codec::MPEG4 | Codec::Unknown(_) => None,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::Unknown(String::new())
    }
}

impl Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Codec::Unknown(codec) => write!(f, "{}", codec.to_lowercase()),
            _ => write!(f, "{}", format!("{:?}", self).to_lowercase()),
        }
    }
}

/// H.264 profile as reported by ffprobe.
#[derive(Clone, Debug, PartialEq)]
pub enum Profile {
    Baseline,
    ConstrainedBaseline,
    Main,
    High,
    Other(String),
}

impl Profile {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Profile::Baseline,
            "constrained baseline" | "constrained_baseline" => Profile::ConstrainedBaseline,
            "main" => Profile::Main,
            "high" => Profile::High,
            _ => Profile::Other(String::from(s)),
        }
    }

    /// Constrained Baseline is a subset of Baseline, so decoders that take
    /// one take the other.
    pub fn is_baseline(&self) -> bool {
        matches!(self, Profile::Baseline | Profile::ConstrainedBaseline)
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Baseline => write!(f, "Baseline"),
            Profile::ConstrainedBaseline => write!(f, "Constrained Baseline"),
            Profile::Main => write!(f, "Main"),
            Profile::High => write!(f, "High"),
            Profile::Other(s) => write!(f, "{}", s),
        }
    }
}

/// 8-bit 4:2:0, full or limited range.
pub fn is_yuv420(pix_fmt: &str) -> bool {
    matches!(pix_fmt.to_lowercase().as_str(), "yuv420p" | "yuvj420p")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Codec::AV1), "av1");
        assert_eq!(format!("{}", Codec::HEVC), "hevc");
        assert_eq!(format!("{}", Codec::H264), "h264");
        assert_eq!(format!("{}", Codec::AAC), "aac");
        assert_eq!(format!("{}", Codec::Unknown(String::from("VP9"))), "vp9");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Codec::from_str("H264"), Codec::H264);
        assert_eq!(Codec::from_str("hevc"), Codec::HEVC);
        assert_eq!(Codec::from_str("vp9"), Codec::Unknown(String::from("vp9")));
    }

    #[test]
    fn test_encoder() {
        assert_eq!(Codec::H264.encoder(), Some("libx264"));
        assert_eq!(Codec::AAC.encoder(), Some("aac"));
        assert_eq!(Codec::Unknown(String::from("vp9")).encoder(), None);
    }

    #[test]
    fn test_profile() {
        assert!(Profile::from_str("Baseline").is_baseline());
        assert!(Profile::from_str("Constrained Baseline").is_baseline());
        assert!(!Profile::from_str("High").is_baseline());
        assert!(!Profile::from_str("Main").is_baseline());
        assert_eq!(Profile::from_str("High 10"), Profile::Other(String::from("High 10")));
    }

    #[test]
    fn test_is_yuv420() {
        assert!(is_yuv420("yuv420p"));
        assert!(is_yuv420("yuvj420p"));
        assert!(!is_yuv420("yuv420p10le"));
        assert!(!is_yuv420("yuv444p"));
    }
}
