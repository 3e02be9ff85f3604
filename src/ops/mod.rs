// ============================================================================
// OPS: the image transform collaborator and its CPU implementation
// ============================================================================

pub mod adjustments;
pub mod effects;
pub mod filters;

use image::RgbaImage;

use crate::filter::{AppliedParameters, FilterVariant};

/// Given a source bitmap, a filter kind and the declared parameters, produce
/// an output bitmap or nothing.
pub trait ImageTransform {
    fn apply(
        &self,
        source: &RgbaImage,
        variant: FilterVariant,
        params: &AppliedParameters,
    ) -> Option<RgbaImage>;
}

/// Rayon-parallel CPU filters.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuTransform;

impl ImageTransform for CpuTransform {
    fn apply(
        &self,
        source: &RgbaImage,
        variant: FilterVariant,
        params: &AppliedParameters,
    ) -> Option<RgbaImage> {
        // Degenerate extent or unusable numbers: nothing to show.
        if source.width() == 0 || source.height() == 0 || !params.is_finite() {
            return None;
        }

        let out = match variant {
            FilterVariant::Sepia => adjustments::sepia(source, params.intensity_or_default()),
            FilterVariant::Crystallize => effects::crystallize(source, params.radius_or_default()),
            FilterVariant::Edges => effects::edges(source, params.intensity_or_default()),
            FilterVariant::GaussianBlur => {
                filters::gaussian_blur(source, params.radius_or_default())
            }
            FilterVariant::Pixellate => effects::pixellate(source, params.scale_or_default()),
            FilterVariant::UnsharpMask => effects::unsharp_mask(
                source,
                params.radius_or_default(),
                params.intensity_or_default(),
            ),
            FilterVariant::Vignette => effects::vignette(
                source,
                params.intensity_or_default(),
                params.radius_or_default(),
            ),
        };
        Some(out)
    }
}
