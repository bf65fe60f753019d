//! The interference formula shared by every backend.
//!
//! The GPU kernel in `metal.rs` repeats the steps after `progress_at` in MSL;
//! keep the two in lockstep (same operation order, f32 throughout).

use super::palette::LUT_SIZE;

#[inline]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Scalar pattern value in [0,1] for a pixel at radial `progress`.
///
/// The two products are reduced to their fractional parts before they are
/// summed. With `frequency` near 1e6 a single `progress * (frequency + phase)`
/// would leave no mantissa bits for the fractional part in f32.
#[inline]
pub fn pattern(progress: f32, frequency: f32, phase: f32) -> f32 {
    let v1 = fract(progress * frequency);
    let v2 = fract(progress * phase);
    let raw = fract(v1 + v2);
    triangle_fold(raw)
}

#[inline]
pub fn triangle_fold(raw: f32) -> f32 {
    if raw <= 0.5 { raw * 2.0 } else { (1.0 - raw) * 2.0 }
}

/// Normalized distance of pixel `(x, y)`'s center from the surface center:
/// 0 at the center, ~1 at the corners.
#[inline]
pub fn progress_at(x: usize, y: usize, w: usize, h: usize) -> f32 {
    let cx = w as f32 * 0.5;
    let cy = h as f32 * 0.5;
    let max_distance = (cx * cx + cy * cy).sqrt();
    if max_distance <= 0.0 {
        return 0.0;
    }
    let dx = x as f32 + 0.5 - cx;
    let dy = y as f32 + 0.5 - cy;
    (dx * dx + dy * dy).sqrt() / max_distance
}

/// Row-major progress values for every pixel of a `w`x`h` grid. Both
/// backends read progress from this table so neither recomputes the `sqrt`.
pub fn progress_table(w: usize, h: usize) -> Vec<f32> {
    let mut table = Vec::with_capacity(w.saturating_mul(h));
    for y in 0..h {
        for x in 0..w {
            table.push(progress_at(x, y, w, h));
        }
    }
    table
}

#[inline]
pub fn lut_index(t: f32) -> usize {
    let idx = (t.clamp(0.0, 1.0) * (LUT_SIZE - 1) as f32).floor() as usize;
    idx.min(LUT_SIZE - 1)
}
