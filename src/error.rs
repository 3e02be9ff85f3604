//! Error types for each concern of the crate.
//!
//! Nothing here terminates a session: save and pick failures are reported
//! once and the session keeps its state.

use std::path::PathBuf;

/// Failures surfaced by [`crate::session::FilterSession`] entry points.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// Save was requested before any output image existed.
    #[error("Please select a picture first!")]
    NoImageSelected,
}

/// The photo library could not persist an image.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// The picker could not deliver an image. Always converted to a dismissal.
#[derive(Debug, thiserror::Error)]
pub enum PickError {
    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("'{path}' is {width}x{height}, above the {max_pixels} pixel limit")]
    TooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_pixels: u64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseFilterError {
    #[error("unknown filter '{0}' (choose one of: crystallize, edges, gaussian-blur, pixellate, sepia, unsharp-mask, vignette)")]
    UnknownFilter(String),

    #[error("unknown parameter '{0}' (choose one of: intensity, radius, scale)")]
    UnknownSlot(String),
}
