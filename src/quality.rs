/// x264 rate control presets. Great matches what the tool has always used
/// (crf 18, preset medium).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Quality {
    Insane,
    Excellent,
    Great,
    Good,
    Fast,
}

impl Quality {
    pub fn from_name(name: &str) -> Option<Quality> {
        match name.to_lowercase().as_str() {
            "insane" => Some(Quality::Insane),
            "excellent" => Some(Quality::Excellent),
            "great" => Some(Quality::Great),
            "good" => Some(Quality::Good),
            "fast" => Some(Quality::Fast),
            _ => None,
        }
    }

    pub fn crf(quality: Quality) -> u8 {
        match quality {
            Quality::Insane => 12,
            Quality::Excellent => 16,
            Quality::Great => 18,
            Quality::Good => 22,
            Quality::Fast => 24,
        }
    }

    pub fn preset(quality: Quality) -> &'static str {
        match quality {
            Quality::Insane => "veryslow",
            Quality::Excellent => "slower",
            Quality::Great => "medium",
            Quality::Good => "fast",
            Quality::Fast => "veryfast",
        }
    }

    pub fn parameters(quality: Quality) -> Vec<String> {
        vec![
            String::from("-preset"), String::from(Quality::preset(quality)),
            String::from("-crf"), Quality::crf(quality).to_string(),
        ]
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Great
    }
}
