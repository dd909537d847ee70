#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Container {
    Matroska,
    MP4,
}

impl ToString for Container {
    fn to_string(&self) -> String {
        match self {
            Container::Matroska => String::from("matroska"),
            Container::MP4 => String::from("mp4"),
        }
    }
}

impl Container {
    pub fn from_name(name: &str) -> Option<Container> {
        match name.to_lowercase().as_str() {
            "mkv" | "matroska" => Some(Container::Matroska),
            "mp4" => Some(Container::MP4),
            _ => None,
        }
    }

    pub fn extension(container: Container) -> &'static str {
        match container {
            Container::Matroska => "mkv",
            Container::MP4 => "mp4",
        }
    }

    pub fn parameters(container: Container) -> Vec<String> {
        match container {
            Container::Matroska => vec![
                String::from("-f"),
                container.to_string(),
            ],
            Container::MP4 => vec![
                String::from("-movflags"),
                String::from("+faststart"),
                String::from("-f"),
                container.to_string(),
            ],
        }
    }

    /// Text and bitmap subtitles as found in the wild (ASS, PGS, VobSub)
    /// can only be stream-copied into Matroska.
    pub fn supports_subtitle_copy(container: Container) -> bool {
        matches!(container, Container::Matroska)
    }

    pub fn supports_attachments(container: Container) -> bool {
        matches!(container, Container::Matroska)
    }

    pub fn supports_chapters(_container: Container) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string() {
        assert_eq!(Container::Matroska.to_string(), String::from("matroska"));
        assert_eq!(Container::MP4.to_string(), String::from("mp4"));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Container::from_name("MKV"), Some(Container::Matroska));
        assert_eq!(Container::from_name("matroska"), Some(Container::Matroska));
        assert_eq!(Container::from_name("mp4"), Some(Container::MP4));
        assert_eq!(Container::from_name("avi"), None);
    }

    #[test]
    fn test_mp4_parameters() {
        assert_eq!(Container::parameters(Container::MP4), vec!["-movflags", "+faststart", "-f", "mp4"]);
        assert!(!Container::supports_attachments(Container::MP4));
        assert!(Container::supports_attachments(Container::Matroska));
    }
}
