// ============================================================================
// BLUR FILTERS: separable Gaussian blur on RGBA buffers
// ============================================================================
//
// Small sigmas use an exact truncated kernel. Large sigmas (the slider goes
// well past what an exact kernel can do interactively) switch to three
// running-sum box passes, which converge on the same Gaussian response.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// Above this sigma the exact kernel is replaced by the box approximation.
const EXACT_SIGMA_LIMIT: f32 = 12.0;

/// Number of box passes used to approximate a large Gaussian.
const BOX_PASSES: usize = 3;

/// Gaussian blur with standard deviation `sigma`, clamp-to-edge sampling.
/// A non-positive sigma returns a copy of the source.
pub fn gaussian_blur(src: &RgbaImage, sigma: f32) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 || sigma <= 0.0 {
        return src.clone();
    }

    let buf: Vec<f32> = src.as_raw().iter().map(|&b| b as f32).collect();
    let blurred = if sigma <= EXACT_SIGMA_LIMIT {
        exact_blur(&buf, w, h, sigma)
    } else {
        box_approximated_blur(buf, w, h, sigma)
    };

    to_image(&blurred, w, h)
}

// ---------------------------------------------------------------------------
//  Exact kernel
// ---------------------------------------------------------------------------

/// Build a 1-D Gaussian kernel truncated at ceil(3*sigma).
fn build_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..len)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let inv = 1.0 / kernel.iter().sum::<f32>();
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

fn exact_blur(buf_in: &[f32], w: usize, h: usize, sigma: f32) -> Vec<f32> {
    let kernel = build_gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let stride = w * 4;

    // --- Horizontal pass (parallel by row) ---
    let mut buf_h = vec![0.0f32; w * h * 4];
    buf_h.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &buf_in[y * stride..(y + 1) * stride];
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius as isize).clamp(0, w as isize - 1)
                    as usize;
                for c in 0..4 {
                    acc[c] += row_in[sx * 4 + c] * kv;
                }
            }
            row_out[x * 4..x * 4 + 4].copy_from_slice(&acc);
        }
    });

    // --- Vertical pass (parallel by row) ---
    let mut buf_v = vec![0.0f32; w * h * 4];
    buf_v.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - radius as isize).clamp(0, h as isize - 1)
                    as usize;
                let idx = sy * stride + x * 4;
                for c in 0..4 {
                    acc[c] += buf_h[idx + c] * kv;
                }
            }
            row_out[x * 4..x * 4 + 4].copy_from_slice(&acc);
        }
    });

    buf_v
}

// ---------------------------------------------------------------------------
//  Box approximation (large sigma)
// ---------------------------------------------------------------------------

/// Box half-widths whose successive application matches a Gaussian of `sigma`.
fn box_radii(sigma: f32, passes: usize) -> Vec<usize> {
    let n = passes as f32;
    let ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut lower = ideal.floor() as usize;
    if lower % 2 == 0 {
        lower = lower.saturating_sub(1).max(1);
    }
    let upper = lower + 2;
    let l = lower as f32;
    // Number of passes that use the smaller box; float->int casts saturate at 0.
    let m = ((12.0 * sigma * sigma - n * l * l - 4.0 * n * l - 3.0 * n) / (-4.0 * l - 4.0))
        .round() as usize;
    (0..passes)
        .map(|i| if i < m { lower / 2 } else { upper / 2 })
        .collect()
}

fn box_approximated_blur(mut buf: Vec<f32>, w: usize, h: usize, sigma: f32) -> Vec<f32> {
    let radii = box_radii(sigma, BOX_PASSES);
    let mut scratch = vec![0.0f32; w * h * 4];

    for &r in &radii {
        box_pass_rows(&buf, &mut scratch, w, r);
        std::mem::swap(&mut buf, &mut scratch);
    }

    // Columns: transpose, run the same row pass, transpose back.
    let mut cols = transpose(&buf, w, h);
    let mut cols_scratch = vec![0.0f32; w * h * 4];
    for &r in &radii {
        box_pass_rows(&cols, &mut cols_scratch, h, r);
        std::mem::swap(&mut cols, &mut cols_scratch);
    }
    transpose(&cols, h, w)
}

/// One running-sum box pass along rows of width `w`, clamp-to-edge.
fn box_pass_rows(src: &[f32], dst: &mut [f32], w: usize, r: usize) {
    let stride = w * 4;
    let inv = 1.0 / (2 * r + 1) as f32;
    let last = w as isize - 1;

    dst.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row = &src[y * stride..(y + 1) * stride];
        let mut acc = [0.0f32; 4];
        for k in -(r as isize)..=(r as isize) {
            let sx = k.clamp(0, last) as usize;
            for c in 0..4 {
                acc[c] += row[sx * 4 + c];
            }
        }
        for x in 0..w {
            for c in 0..4 {
                row_out[x * 4 + c] = acc[c] * inv;
            }
            let leaving = (x as isize - r as isize).clamp(0, last) as usize;
            let entering = (x as isize + r as isize + 1).clamp(0, last) as usize;
            for c in 0..4 {
                acc[c] += row[entering * 4 + c] - row[leaving * 4 + c];
            }
        }
    });
}

/// Transpose a `w`×`h` interleaved RGBA f32 buffer into `h`×`w`.
fn transpose(src: &[f32], w: usize, h: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; w * h * 4];
    out.par_chunks_mut(h * 4).enumerate().for_each(|(x, row_out)| {
        for y in 0..h {
            let si = (y * w + x) * 4;
            row_out[y * 4..y * 4 + 4].copy_from_slice(&src[si..si + 4]);
        }
    });
    out
}

fn to_image(buf: &[f32], w: usize, h: usize) -> RgbaImage {
    let mut out = RgbaImage::new(w as u32, h as u32);
    let dst: &mut [u8] = &mut out;
    dst.par_iter_mut()
        .zip(buf.par_iter())
        .for_each(|(d, &v)| *d = v.round().clamp(0.0, 255.0) as u8);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn kernel_is_normalised() {
        let k = build_gaussian_kernel(2.5);
        assert_eq!(k.len(), 2 * 8 + 1);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_sigma_is_identity() {
        let img = checker(5, 4);
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn uniform_image_stays_uniform() {
        for sigma in [1.5, 40.0] {
            let img = RgbaImage::from_pixel(17, 9, Rgba([90, 120, 200, 255]));
            let out = gaussian_blur(&img, sigma);
            assert!(out.pixels().all(|p| *p == Rgba([90, 120, 200, 255])), "sigma {sigma}");
        }
    }

    #[test]
    fn checkerboard_flattens_towards_grey() {
        for sigma in [3.0, 30.0] {
            let out = gaussian_blur(&checker(32, 32), sigma);
            let p = out.get_pixel(16, 16);
            assert!((p[0] as i32 - 128).abs() < 20, "sigma {sigma}: got {}", p[0]);
        }
    }

    #[test]
    fn box_radii_grow_with_sigma() {
        let small = box_radii(13.0, 3);
        let large = box_radii(100.0, 3);
        assert_eq!(small.len(), 3);
        assert!(large.iter().sum::<usize>() > small.iter().sum::<usize>());
    }

    #[test]
    fn blur_is_deterministic() {
        let img = checker(20, 11);
        assert_eq!(gaussian_blur(&img, 100.0), gaussian_blur(&img, 100.0));
    }
}
