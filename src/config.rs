use std::fs;
use std::path::{Path, PathBuf};

use crate::containers::Container;
use crate::error::ConfigError;
use crate::ffmpeg::hwaccel::HwAccelPreference;
use crate::file_task::is_unambiguous_suffix;
use crate::fstools::{classify_file, DirEntryCategory};
use crate::quality::Quality;

/// Command line values as typed by the user.
#[derive(Clone, Debug)]
pub struct CliOptions {
    pub input: String,
    pub output: String,
    pub dry_run: bool,
    pub no_attachments: bool,
    pub hwaccel: String,
    pub suffix: String,
    pub container: String,
    pub quality: String,
    pub tune: String,
    pub overwrite: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        CliOptions {
            input: String::new(),
            output: String::new(),
            dry_run: false,
            no_attachments: false,
            hwaccel: String::from("auto"),
            suffix: String::from("_480p"),
            container: String::from("mkv"),
            quality: String::from("great"),
            tune: String::from("animation"),
            overwrite: false,
        }
    }
}

/// Validated run settings.
#[derive(Clone, Debug)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dry_run: bool,
    pub preserve_attachments: bool,
    pub hwaccel: HwAccelPreference,
    pub suffix: String,
    pub container: Container,
    pub quality: Quality,
    pub tune: Option<String>,
    pub overwrite: bool,
}

impl Config {
    pub fn new(cli: &CliOptions) -> Result<Self, ConfigError> {
        let input = PathBuf::from(&cli.input);
        match classify_file(&input) {
            DirEntryCategory::Directory => (),
            DirEntryCategory::DoesNotExist => return Err(ConfigError::InputMissing(input)),
            _ => return Err(ConfigError::InputNotDirectory(input)),
        };

        let output = PathBuf::from(&cli.output);
        match classify_file(&output) {
            DirEntryCategory::Directory | DirEntryCategory::DoesNotExist => (),
            _ => return Err(ConfigError::OutputNotDirectory(output)),
        };
        if same_directory(&input, &output) {
            return Err(ConfigError::OutputIsInput(output));
        }

        if !is_unambiguous_suffix(&cli.suffix) {
            return Err(ConfigError::InvalidSuffix(cli.suffix.clone()));
        }

        let container = Container::from_name(&cli.container).ok_or_else(|| ConfigError::InvalidOption {
            option: "container",
            value: cli.container.clone(),
            expected: "mkv, mp4",
        })?;
        let quality = Quality::from_name(&cli.quality).ok_or_else(|| ConfigError::InvalidOption {
            option: "quality",
            value: cli.quality.clone(),
            expected: "insane, excellent, great, good, fast",
        })?;

        let tune = match cli.tune.trim() {
            "" | "none" => None,
            t => Some(String::from(t)),
        };

        Ok(Config {
            input,
            output,
            dry_run: cli.dry_run,
            preserve_attachments: !cli.no_attachments,
            hwaccel: cli.hwaccel.parse()?,
            suffix: cli.suffix.clone(),
            container,
            quality,
            tune,
            overwrite: cli.overwrite,
        })
    }
}

/// The output root may not exist yet; compare canonical forms when it does.
fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(input: &Path, output: &Path) -> CliOptions {
        CliOptions {
            input: input.to_string_lossy().into_owned(),
            output: output.to_string_lossy().into_owned(),
            ..CliOptions::default()
        }
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(&cli(dir.path(), &dir.path().join("out"))).unwrap();
        assert_eq!(config.container, Container::Matroska);
        assert_eq!(config.quality, Quality::Great);
        assert_eq!(config.hwaccel, HwAccelPreference::Auto);
        assert_eq!(config.tune, Some(String::from("animation")));
        assert_eq!(config.suffix, "_480p");
        assert!(config.preserve_attachments);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_input_must_be_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(Config::new(&cli(&missing, dir.path())), Err(ConfigError::InputMissing(_))));

        let file = dir.path().join("a.mkv");
        fs::write(&file, b"").unwrap();
        assert!(matches!(Config::new(&cli(&file, &dir.path().join("out"))), Err(ConfigError::InputNotDirectory(_))));
        assert!(matches!(Config::new(&cli(dir.path(), &file)), Err(ConfigError::OutputNotDirectory(_))));
    }

    #[test]
    fn test_output_must_differ_from_input() {
        let dir = tempfile::tempdir().unwrap();
        let same = dir.path().join(".");
        assert!(matches!(Config::new(&cli(dir.path(), &same)), Err(ConfigError::OutputIsInput(_))));
    }

    #[test]
    fn test_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let base = cli(dir.path(), &dir.path().join("out"));

        let bad_container = CliOptions { container: String::from("avi"), ..base.clone() };
        assert!(matches!(Config::new(&bad_container), Err(ConfigError::InvalidOption { option: "container", .. })));

        let bad_quality = CliOptions { quality: String::from("ultra"), ..base.clone() };
        assert!(matches!(Config::new(&bad_quality), Err(ConfigError::InvalidOption { option: "quality", .. })));

        let bad_hwaccel = CliOptions { hwaccel: String::from("maybe"), ..base.clone() };
        assert!(matches!(Config::new(&bad_hwaccel), Err(ConfigError::InvalidOption { option: "hwaccel", .. })));

        let bad_suffix = CliOptions { suffix: String::from("a/b"), ..base.clone() };
        assert!(matches!(Config::new(&bad_suffix), Err(ConfigError::InvalidSuffix(_))));

        let empty_suffix = CliOptions { suffix: String::new(), ..base.clone() };
        assert!(matches!(Config::new(&empty_suffix), Err(ConfigError::InvalidSuffix(_))));

        let extension_tail = CliOptions { suffix: String::from("4"), ..base.clone() };
        assert!(matches!(Config::new(&extension_tail), Err(ConfigError::InvalidSuffix(_))));

        let dotted = CliOptions { suffix: String::from("_480p.small"), ..base };
        assert!(matches!(Config::new(&dotted), Err(ConfigError::InvalidSuffix(_))));
    }

    #[test]
    fn test_options_are_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let options = CliOptions {
            container: String::from("MP4"),
            quality: String::from("fast"),
            hwaccel: String::from("off"),
            tune: String::from("none"),
            no_attachments: true,
            dry_run: true,
            ..cli(dir.path(), &dir.path().join("out"))
        };
        let config = Config::new(&options).unwrap();
        assert_eq!(config.container, Container::MP4);
        assert_eq!(config.quality, Quality::Fast);
        assert_eq!(config.hwaccel, HwAccelPreference::Off);
        assert_eq!(config.tune, None);
        assert!(!config.preserve_attachments);
        assert!(config.dry_run);
    }
}
