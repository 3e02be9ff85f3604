// ============================================================================
// EFFECTS: rayon-parallelized stylize / distort effects
// ============================================================================
//
// Effects are grouped into categories:
//   - Distort: Crystallize, Pixellate
//   - Stylize: Edges, Unsharp Mask, Vignette
//
// Every effect is a pure function of its inputs: same image and parameters
// give bit-identical output.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use crate::ops::filters::gaussian_blur;

/// Seed for the crystallize cell jitter. Fixed so recomputes are stable.
const CRYSTALLIZE_SEED: u32 = 0x1F2E_3D4C;

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Per-pixel transform that also receives pixel coordinates.
fn apply_per_pixel<F>(flat: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(u32, u32, f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let w = flat.width() as usize;
    let stride = w * 4;
    let mut out = flat.clone();
    if w == 0 {
        return out;
    }
    let dst: &mut [u8] = &mut out;

    dst.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let pi = x * 4;
            let (nr, ng, nb, na) = transform(
                x as u32,
                y as u32,
                row[pi] as f32,
                row[pi + 1] as f32,
                row[pi + 2] as f32,
                row[pi + 3] as f32,
            );
            row[pi] = nr.round().clamp(0.0, 255.0) as u8;
            row[pi + 1] = ng.round().clamp(0.0, 255.0) as u8;
            row[pi + 2] = nb.round().clamp(0.0, 255.0) as u8;
            row[pi + 3] = na.round().clamp(0.0, 255.0) as u8;
        }
    });

    out
}

/// Simple hash for deterministic jitter.
#[inline]
fn hash_u32(mut x: u32) -> u32 {
    x = x.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}

/// Hash to f32 in [0, 1).
#[inline]
fn hash_f32(x: u32, y: u32, seed: u32) -> f32 {
    let h = hash_u32(
        x.wrapping_mul(374761393)
            .wrapping_add(y.wrapping_mul(668265263))
            .wrapping_add(seed),
    );
    (h & 0x00FFFFFF) as f32 / 16777216.0
}

// ============================================================================
// DISTORT
// ============================================================================

// --- Crystallize (Voronoi polygon effect) ---

/// Jittered-grid Voronoi lookup shared by the averaging and painting passes.
struct VoronoiGrid {
    cell: f32,
    cells_x: i32,
    cells_y: i32,
    seeds: Vec<(f32, f32)>,
}

impl VoronoiGrid {
    fn new(w: u32, h: u32, cell: f32, seed: u32) -> Self {
        let cells_x = ((w as f32 / cell).ceil() as i32).max(1);
        let cells_y = ((h as f32 / cell).ceil() as i32).max(1);
        let mut seeds = Vec::with_capacity((cells_x * cells_y) as usize);
        for cy in 0..cells_y {
            for cx in 0..cells_x {
                let jx = hash_f32(cx as u32, cy as u32, seed);
                let jy = hash_f32(cx as u32, cy as u32, seed.wrapping_add(77));
                seeds.push(((cx as f32 + jx) * cell, (cy as f32 + jy) * cell));
            }
        }
        Self { cell, cells_x, cells_y, seeds }
    }

    fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Index of the nearest seed point, searching the 3×3 neighbourhood.
    fn nearest(&self, x: u32, y: u32) -> usize {
        let gcx = (x as f32 / self.cell) as i32;
        let gcy = (y as f32 / self.cell) as i32;
        let px = x as f32 + 0.5;
        let py = y as f32 + 0.5;

        let mut best_dist = f32::MAX;
        let mut best_idx = 0usize;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let nx = gcx + dx;
                let ny = gcy + dy;
                if nx < 0 || ny < 0 || nx >= self.cells_x || ny >= self.cells_y {
                    continue;
                }
                let idx = (ny * self.cells_x + nx) as usize;
                let (sx, sy) = self.seeds[idx];
                let d = (px - sx) * (px - sx) + (py - sy) * (py - sy);
                if d < best_dist {
                    best_dist = d;
                    best_idx = idx;
                }
            }
        }
        best_idx
    }
}

/// Fill Voronoi cells of roughly `radius` pixels with their average colour.
pub fn crystallize(flat: &RgbaImage, radius: f32) -> RgbaImage {
    let cs = radius.max(2.0);
    let (w, h) = flat.dimensions();
    if w == 0 || h == 0 {
        return flat.clone();
    }

    let grid = VoronoiGrid::new(w, h, cs, CRYSTALLIZE_SEED);
    let stride = w as usize * 4;

    // Each row computes its nearest-cell indices once; they are reused below.
    let assignment: Vec<Vec<usize>> = (0..h)
        .into_par_iter()
        .map(|y| (0..w).map(|x| grid.nearest(x, y)).collect())
        .collect();

    let src_raw = flat.as_raw();
    let mut sums: Vec<[f64; 4]> = vec![[0.0; 4]; grid.len()];
    let mut counts: Vec<u32> = vec![0; grid.len()];
    for (y, row) in assignment.iter().enumerate() {
        for (x, &idx) in row.iter().enumerate() {
            let si = y * stride + x * 4;
            for c in 0..4 {
                sums[idx][c] += src_raw[si + c] as f64;
            }
            counts[idx] += 1;
        }
    }

    let averages: Vec<[u8; 4]> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &count)| {
            if count == 0 {
                return [0; 4];
            }
            let inv = 1.0 / count as f64;
            sum.map(|v| (v * inv).round().clamp(0.0, 255.0) as u8)
        })
        .collect();

    let mut out = RgbaImage::new(w, h);
    let dst: &mut [u8] = &mut out;
    dst.par_chunks_mut(stride)
        .zip(assignment.par_iter())
        .for_each(|(row_out, row_idx)| {
            for (x, &idx) in row_idx.iter().enumerate() {
                row_out[x * 4..x * 4 + 4].copy_from_slice(&averages[idx]);
            }
        });

    out
}

// --- Pixellate ---

/// Square blocks of side `scale`, each painted with its centre pixel.
/// Scales below one pixel leave the image unchanged.
pub fn pixellate(flat: &RgbaImage, scale: f32) -> RgbaImage {
    let bs = scale.round().max(1.0) as u32;
    let (w, h) = flat.dimensions();
    if w == 0 || h == 0 || bs == 1 {
        return flat.clone();
    }

    let src_raw = flat.as_raw();
    let stride = w as usize * 4;
    let mut out = RgbaImage::new(w, h);
    let dst: &mut [u8] = &mut out;

    dst.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let by = ((y as u32 / bs) * bs + bs / 2).min(h - 1) as usize;
        for x in 0..w as usize {
            let bx = ((x as u32 / bs) * bs + bs / 2).min(w - 1) as usize;
            let si = by * stride + bx * 4;
            row_out[x * 4..x * 4 + 4].copy_from_slice(&src_raw[si..si + 4]);
        }
    });

    out
}

// ============================================================================
// STYLIZE
// ============================================================================

// --- Edges (colour Sobel) ---

/// Per-channel Sobel gradient magnitude scaled by `intensity`, on black.
/// Alpha is preserved.
pub fn edges(flat: &RgbaImage, intensity: f32) -> RgbaImage {
    let w = flat.width() as usize;
    let h = flat.height() as usize;
    if w == 0 || h == 0 {
        return flat.clone();
    }

    let src_raw = flat.as_raw();
    let stride = w * 4;
    let mut out = RgbaImage::new(w as u32, h as u32);
    let dst: &mut [u8] = &mut out;

    let sample = |px: isize, py: isize, c: usize| -> f32 {
        let cx = px.clamp(0, w as isize - 1) as usize;
        let cy = py.clamp(0, h as isize - 1) as usize;
        src_raw[cy * stride + cx * 4 + c] as f32
    };

    dst.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let iy = y as isize;
        for x in 0..w {
            let ix = x as isize;
            let pi = x * 4;
            for c in 0..3 {
                let gx = -sample(ix - 1, iy - 1, c) - 2.0 * sample(ix - 1, iy, c)
                    - sample(ix - 1, iy + 1, c)
                    + sample(ix + 1, iy - 1, c)
                    + 2.0 * sample(ix + 1, iy, c)
                    + sample(ix + 1, iy + 1, c);
                let gy = -sample(ix - 1, iy - 1, c) - 2.0 * sample(ix, iy - 1, c)
                    - sample(ix + 1, iy - 1, c)
                    + sample(ix - 1, iy + 1, c)
                    + 2.0 * sample(ix, iy + 1, c)
                    + sample(ix + 1, iy + 1, c);
                let mag = (gx * gx + gy * gy).sqrt() * intensity;
                row_out[pi + c] = mag.round().clamp(0.0, 255.0) as u8;
            }
            row_out[pi + 3] = src_raw[y * stride + pi + 3];
        }
    });

    out
}

// --- Unsharp mask ---

/// `original + intensity * (original - blur(radius))` on the colour channels.
pub fn unsharp_mask(flat: &RgbaImage, radius: f32, intensity: f32) -> RgbaImage {
    let blurred = gaussian_blur(flat, radius);
    let blur_raw = blurred.as_raw();
    let stride = flat.width() as usize * 4;
    let mut out = flat.clone();
    if stride == 0 {
        return out;
    }
    let dst: &mut [u8] = &mut out;

    dst.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        let blur_row = &blur_raw[y * stride..(y + 1) * stride];
        for (px, bpx) in row.chunks_exact_mut(4).zip(blur_row.chunks_exact(4)) {
            for c in 0..3 {
                let s = px[c] as f32;
                let b = bpx[c] as f32;
                px[c] = (s + intensity * (s - b)).round().clamp(0.0, 255.0) as u8;
            }
        }
    });

    out
}

// --- Vignette ---

/// Darken towards the corners. Pixels `radius` or more from the centre are
/// darkened by the full `intensity`; inside, the falloff is quadratic.
pub fn vignette(flat: &RgbaImage, intensity: f32, radius: f32) -> RgbaImage {
    let cx = flat.width() as f32 / 2.0;
    let cy = flat.height() as f32 / 2.0;
    let reach = radius.max(1.0);

    apply_per_pixel(flat, |x, y, r, g, b, a| {
        let dx = x as f32 + 0.5 - cx;
        let dy = y as f32 + 0.5 - cy;
        let dist = (dx * dx + dy * dy).sqrt() / reach;
        let vf = (1.0 - intensity * dist.min(1.0).powi(2)).clamp(0.0, 1.0);
        (r * vf, g * vf, b * vf, a)
    })
}
