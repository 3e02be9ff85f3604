// ============================================================================
// COLOR ADJUSTMENTS: per-pixel tone mapping
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Apply a per-pixel transform.
/// `transform` receives (r, g, b, a) as f32 and returns (r, g, b, a) as f32.
pub(crate) fn apply_pixel_transform<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let mut out = src.clone();
    let dst: &mut [u8] = &mut out;
    dst.par_chunks_mut(4).for_each(|px| {
        let (nr, ng, nb, na) =
            transform(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32);
        px[0] = nr.round().clamp(0.0, 255.0) as u8;
        px[1] = ng.round().clamp(0.0, 255.0) as u8;
        px[2] = nb.round().clamp(0.0, 255.0) as u8;
        px[3] = na.round().clamp(0.0, 255.0) as u8;
    });
    out
}

/// Sepia tone blended with the original by `intensity` (0 = untouched, 1 = full sepia).
pub fn sepia(src: &RgbaImage, intensity: f32) -> RgbaImage {
    let t = intensity;
    apply_pixel_transform(src, |r, g, b, a| {
        let sr = (0.393 * r + 0.769 * g + 0.189 * b).min(255.0);
        let sg = (0.349 * r + 0.686 * g + 0.168 * b).min(255.0);
        let sb = (0.272 * r + 0.534 * g + 0.131 * b).min(255.0);
        (
            r + (sr - r) * t,
            g + (sg - g) * t,
            b + (sb - b) * t,
            a,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn zero_intensity_leaves_pixels() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([10, 200, 30, 128]));
        assert_eq!(sepia(&img, 0.0), img);
    }

    #[test]
    fn full_intensity_matches_matrix() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 255]));
        let out = sepia(&img, 1.0);
        // 0.393+0.769+0.189 = 1.351 -> 135.1
        assert_eq!(*out.get_pixel(0, 0), Rgba([135, 120, 94, 255]));
    }

    #[test]
    fn white_saturates_without_wrapping() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let out = sepia(&img, 1.0);
        let p = out.get_pixel(0, 0);
        assert_eq!(p[0], 255);
        assert_eq!(p[1], 255);
        assert!(p[2] < 255);
    }
}
