use std::fmt::Display;
use std::str::FromStr;

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HwAccelPreference {
    /// Use hardware decode when ffmpeg offers a known method.
    Auto,
    /// Refuse to start without a hardware method.
    Force,
    Off,
}

impl FromStr for HwAccelPreference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(HwAccelPreference::Auto),
            "force" | "on" => Ok(HwAccelPreference::Force),
            "off" | "none" => Ok(HwAccelPreference::Off),
            _ => Err(ConfigError::InvalidOption {
                option: "hwaccel",
                value: String::from(s),
                expected: "auto, force, off",
            }),
        }
    }
}

/// A `-hwaccel` method name as listed by `ffmpeg -hwaccels`.
#[derive(Clone, Debug, PartialEq)]
pub struct HwAccel(String);

impl HwAccel {
    pub fn new(name: &str) -> Self {
        HwAccel(String::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for HwAccel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(target_os = "windows")]
const PREFERRED: &[&str] = &["d3d11va", "dxva2", "qsv", "cuda", "vulkan"];

#[cfg(target_os = "macos")]
const PREFERRED: &[&str] = &["videotoolbox"];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const PREFERRED: &[&str] = &["vaapi", "qsv", "cuda", "vdpau"];

/// Method names from `ffmpeg -hide_banner -hwaccels` output.
pub fn parse_hwaccels(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.to_lowercase().starts_with("hardware acceleration methods"))
        .filter_map(|l| l.split_whitespace().next())
        .map(|l| l.to_lowercase())
        .collect()
}

pub fn choose(available: &[String], preferred: &[&str]) -> Option<HwAccel> {
    preferred
        .iter()
        .find(|p| available.iter().any(|a| a == *p))
        .map(|p| HwAccel::new(p))
}

/// Turns the user's preference and what ffmpeg offers into the single
/// method every transcode of this run will use.
pub fn resolve(preference: HwAccelPreference, available: &[String]) -> Result<Option<HwAccel>, ConfigError> {
    match preference {
        HwAccelPreference::Off => Ok(None),
        HwAccelPreference::Auto => Ok(choose(available, PREFERRED)),
        HwAccelPreference::Force => match choose(available, PREFERRED) {
            Some(hwaccel) => Ok(Some(hwaccel)),
            None => Err(ConfigError::HwAccelUnavailable),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HWACCELS: &str = "Hardware acceleration methods:\nvdpau\ncuda\nvaapi\nqsv\ndrm\nopencl\nvulkan\n\n";

    #[test]
    fn test_parse_hwaccels() {
        assert_eq!(parse_hwaccels(HWACCELS), vec!["vdpau", "cuda", "vaapi", "qsv", "drm", "opencl", "vulkan"]);
        assert!(parse_hwaccels("Hardware acceleration methods:\n").is_empty());
    }

    #[test]
    fn test_choose_follows_preference_order() {
        let available = parse_hwaccels(HWACCELS);
        assert_eq!(choose(&available, &["vaapi", "cuda"]), Some(HwAccel::new("vaapi")));
        assert_eq!(choose(&available, &["d3d11va", "cuda"]), Some(HwAccel::new("cuda")));
        assert_eq!(choose(&available, &["videotoolbox"]), None);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve(HwAccelPreference::Off, &parse_hwaccels(HWACCELS)).unwrap(), None);
        assert_eq!(resolve(HwAccelPreference::Auto, &[]).unwrap(), None);
        assert!(matches!(resolve(HwAccelPreference::Force, &[]), Err(ConfigError::HwAccelUnavailable)));
    }

    #[test]
    fn test_preference_from_str() {
        assert_eq!("AUTO".parse::<HwAccelPreference>().unwrap(), HwAccelPreference::Auto);
        assert_eq!("force".parse::<HwAccelPreference>().unwrap(), HwAccelPreference::Force);
        assert_eq!("off".parse::<HwAccelPreference>().unwrap(), HwAccelPreference::Off);
        assert!("gpu".parse::<HwAccelPreference>().is_err());
    }
}
