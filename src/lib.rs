//! Instafilter: a filter session that keeps a picked photo, the selected
//! filter and its slider values in sync with a derived output image, plus
//! the picker and photo-library collaborators around it.

pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod library;
pub mod logger;
pub mod ops;
pub mod picker;
pub mod session;
pub mod shell;

pub use error::{ConfigError, LibraryError, ParseFilterError, PickError, SessionError};
pub use filter::{AppliedParameters, FilterParameters, FilterVariant, ParameterSlot};
pub use io::SaveFormat;
pub use library::{AlbumLibrary, FileTarget, PhotoLibrary, SaveCallback, SaveResult, SavedPhoto};
pub use ops::{CpuTransform, ImageTransform};
pub use picker::{FilePicker, ImagePicker, PickCallback, PickOutcome};
pub use session::{FilterSession, RecomputeOutcome};
