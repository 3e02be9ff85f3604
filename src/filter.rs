//! Filter variants, parameter slots and the variant → slot capability table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseFilterError;

/// One of the three adjustable numeric controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterSlot {
    Intensity,
    Radius,
    Scale,
}

impl ParameterSlot {
    pub const ALL: [ParameterSlot; 3] = [Self::Intensity, Self::Radius, Self::Scale];

    pub fn name(self) -> &'static str {
        match self {
            Self::Intensity => "intensity",
            Self::Radius => "radius",
            Self::Scale => "scale",
        }
    }

    /// Inclusive slider range. Values outside it are only reachable through
    /// the library API, never through the UI.
    pub fn ui_range(self) -> (f32, f32) {
        match self {
            Self::Intensity => (0.0, 1.0),
            Self::Radius | Self::Scale => (0.0, 500.0),
        }
    }

    /// Clamp to [`ParameterSlot::ui_range`].
    pub fn clamp_to_ui(self, value: f32) -> f32 {
        let (lo, hi) = self.ui_range();
        value.clamp(lo, hi)
    }
}

impl fmt::Display for ParameterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterSlot {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "intensity" => Ok(Self::Intensity),
            "radius" => Ok(Self::Radius),
            "scale" => Ok(Self::Scale),
            other => Err(ParseFilterError::UnknownSlot(other.to_string())),
        }
    }
}

/// The fixed set of image transforms offered to the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterVariant {
    #[default]
    Sepia,
    Crystallize,
    Edges,
    GaussianBlur,
    Pixellate,
    UnsharpMask,
    Vignette,
}

use FilterVariant::*;
use ParameterSlot::{Intensity, Radius, Scale};

impl FilterVariant {
    /// Every variant in declaration order.
    pub const ALL: [FilterVariant; 7] = [
        Sepia,
        Crystallize,
        Edges,
        GaussianBlur,
        Pixellate,
        UnsharpMask,
        Vignette,
    ];

    /// Order of the "Select a filter" menu.
    pub const MENU: [FilterVariant; 7] = [
        Crystallize,
        Edges,
        GaussianBlur,
        Pixellate,
        Sepia,
        UnsharpMask,
        Vignette,
    ];

    /// Human-readable label shown under the preview.
    pub fn label(self) -> &'static str {
        match self {
            Sepia => "Sepia Tone",
            Crystallize => "Crystallize",
            Edges => "Edges",
            GaussianBlur => "Gaussian Blur",
            Pixellate => "Pixellate",
            UnsharpMask => "Unsharp Mask",
            Vignette => "Vignette",
        }
    }

    /// Lowercase, dash-separated name used in file names and config files.
    pub fn slug(self) -> &'static str {
        match self {
            Sepia => "sepia",
            Crystallize => "crystallize",
            Edges => "edges",
            GaussianBlur => "gaussian-blur",
            Pixellate => "pixellate",
            UnsharpMask => "unsharp-mask",
            Vignette => "vignette",
        }
    }

    /// Parameter slots this variant reads.
    pub fn slots(self) -> &'static [ParameterSlot] {
        match self {
            Sepia => &[Intensity],
            Crystallize => &[Radius],
            Edges => &[Intensity],
            GaussianBlur => &[Radius],
            Pixellate => &[Scale],
            UnsharpMask => &[Radius, Intensity],
            Vignette => &[Radius, Intensity],
        }
    }

    pub fn accepts(self, slot: ParameterSlot) -> bool {
        self.slots().contains(&slot)
    }
}

impl fmt::Display for FilterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterVariant {
    type Err = ParseFilterError;

    /// Accepts labels and slugs, ignoring case and `-`/`_`/space separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "sepia" | "sepiatone" => Ok(Sepia),
            "crystallize" => Ok(Crystallize),
            "edges" => Ok(Edges),
            "gaussianblur" | "blur" => Ok(GaussianBlur),
            "pixellate" | "pixelate" => Ok(Pixellate),
            "unsharpmask" | "unsharp" => Ok(UnsharpMask),
            "vignette" => Ok(Vignette),
            _ => Err(ParseFilterError::UnknownFilter(s.trim().to_string())),
        }
    }
}

impl Serialize for FilterVariant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.slug())
    }
}

impl<'de> Deserialize<'de> for FilterVariant {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

pub const DEFAULT_INTENSITY: f32 = 0.5;
pub const DEFAULT_RADIUS: f32 = 100.0;
pub const DEFAULT_SCALE: f32 = 10.0;

/// The three slider values. They persist across filter switches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParameters {
    pub intensity: f32,
    pub radius: f32,
    pub scale: f32,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            intensity: DEFAULT_INTENSITY,
            radius: DEFAULT_RADIUS,
            scale: DEFAULT_SCALE,
        }
    }
}

impl FilterParameters {
    pub fn get(&self, slot: ParameterSlot) -> f32 {
        match slot {
            Intensity => self.intensity,
            Radius => self.radius,
            Scale => self.scale,
        }
    }

    pub fn set(&mut self, slot: ParameterSlot, value: f32) {
        match slot {
            Intensity => self.intensity = value,
            Radius => self.radius = value,
            Scale => self.scale = value,
        }
    }

    /// Keep only the slots `variant` declares.
    pub fn applied_to(&self, variant: FilterVariant) -> AppliedParameters {
        let pick = |slot| variant.accepts(slot).then(|| self.get(slot));
        AppliedParameters {
            intensity: pick(Intensity),
            radius: pick(Radius),
            scale: pick(Scale),
        }
    }
}

/// Parameters as handed to a transform: undeclared slots are `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AppliedParameters {
    pub intensity: Option<f32>,
    pub radius: Option<f32>,
    pub scale: Option<f32>,
}

impl AppliedParameters {
    pub fn get(&self, slot: ParameterSlot) -> Option<f32> {
        match slot {
            Intensity => self.intensity,
            Radius => self.radius,
            Scale => self.scale,
        }
    }

    pub fn intensity_or_default(&self) -> f32 {
        self.intensity.unwrap_or(DEFAULT_INTENSITY)
    }

    pub fn radius_or_default(&self) -> f32 {
        self.radius.unwrap_or(DEFAULT_RADIUS)
    }

    pub fn scale_or_default(&self) -> f32 {
        self.scale.unwrap_or(DEFAULT_SCALE)
    }

    /// `true` when every present value is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.intensity, self.radius, self.scale]
            .into_iter()
            .flatten()
            .all(f32::is_finite)
    }
}
