//! Configuration file (`config.toml`) with the session defaults, the output
//! encoding and the picker budget.
//!
//! ```toml
//! [session]
//! filter = "pixellate"
//! intensity = 0.5
//! radius = 100.0
//! scale = 10.0
//!
//! [output]
//! format = "jpeg"
//! quality = 85
//! album_dir = "/home/me/Pictures/Instafilter"
//!
//! [picker]
//! max_pixels = 40000000
//! ```
//!
//! Missing keys fall back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::{FilterParameters, FilterVariant};
use crate::io::SaveFormat;

pub const APP_DIR_NAME: &str = "Instafilter";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub picker: PickerConfig,
}

/// Filter and slider values a session starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub filter: FilterVariant,
    pub intensity: f32,
    pub radius: f32,
    pub scale: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let p = FilterParameters::default();
        Self {
            filter: FilterVariant::default(),
            intensity: p.intensity,
            radius: p.radius,
            scale: p.scale,
        }
    }
}

impl SessionConfig {
    pub fn parameters(&self) -> FilterParameters {
        FilterParameters {
            intensity: self.intensity,
            radius: self.radius,
            scale: self.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: SaveFormat,
    /// JPEG quality, 1–100.
    pub quality: u8,
    /// Album directory for interactive saves. `None` uses the platform
    /// pictures directory.
    pub album_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: SaveFormat::Png,
            quality: 90,
            album_dir: None,
        }
    }
}

impl OutputConfig {
    pub fn album_dir(&self) -> PathBuf {
        self.album_dir.clone().unwrap_or_else(pictures_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Images with more pixels than this are refused before decoding.
    pub max_pixels: u64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self { max_pixels: 40_000_000 }
    }
}

impl Config {
    /// Parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the platform config file if it exists,
    /// else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let default_path = default_config_path();
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            log::debug!("no config at {}, using defaults", default_path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Invalid(format!(
                "output.quality must be 1-100, got {}",
                self.output.quality
            )));
        }
        if self.picker.max_pixels == 0 {
            return Err(ConfigError::Invalid("picker.max_pixels must be positive".into()));
        }
        let p = self.session.parameters();
        for (name, value) in [("intensity", p.intensity), ("radius", p.radius), ("scale", p.scale)] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("session.{name} must be a finite number")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Platform directories
// ============================================================================

pub fn default_config_path() -> PathBuf {
    data_dir().join(APP_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Platform data directory (without the app sub-folder).
pub fn data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Default album location: `<Pictures>/Instafilter`, falling back to the
/// home directory when the platform has no pictures folder.
pub fn pictures_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(text: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let (_dir, path) = write_config("");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let (_dir, path) = write_config(
            r#"
            [session]
            filter = "Gaussian Blur"
            radius = 12.5

            [output]
            format = "jpeg"
            quality = 70
            "#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.session.filter, FilterVariant::GaussianBlur);
        assert_eq!(config.session.radius, 12.5);
        assert_eq!(config.session.intensity, 0.5);
        assert_eq!(config.output.format, SaveFormat::Jpeg);
        assert_eq!(config.output.quality, 70);
        assert_eq!(config.picker, PickerConfig::default());
    }

    #[test]
    fn unknown_filter_is_a_parse_error() {
        let (_dir, path) = write_config("[session]\nfilter = \"posterize\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn out_of_range_quality_is_invalid() {
        let (_dir, path) = write_config("[output]\nquality = 0\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(Config::resolve(Some(&missing)), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn default_album_lives_in_pictures_folder() {
        let dir = pictures_dir();
        assert!(dir.ends_with(APP_DIR_NAME));
        if let Some(pictures) = dirs::picture_dir() {
            assert_eq!(dir, pictures.join(APP_DIR_NAME));
        }
        assert_eq!(OutputConfig::default().album_dir(), dir);
    }

    #[test]
    fn explicit_album_dir_wins() {
        let (_dir, path) = write_config("[output]\nalbum_dir = \"/tmp/photos\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.output.album_dir(), PathBuf::from("/tmp/photos"));
    }
}
