use moire_tui::visual::palette::LUT_SIZE;
use moire_tui::visual::pattern::{fract, lut_index, pattern, progress_at, triangle_fold};

#[test]
fn pattern_stays_in_unit_range() {
    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..20_000 {
        let progress = rng.f32();
        let frequency = rng.f32() * 1_000_000.0;
        let phase = rng.f32() * 500.0;
        let t = pattern(progress, frequency, phase);
        assert!(
            (0.0..=1.0).contains(&t),
            "pattern({progress}, {frequency}, {phase}) = {t}"
        );
    }
}

#[test]
fn triangle_fold_is_symmetric() {
    assert!((triangle_fold(0.3) - 0.6).abs() < 1e-6);
    assert!((triangle_fold(0.7) - 0.6).abs() < 1e-6);
    assert_eq!(triangle_fold(0.0), 0.0);
    assert_eq!(triangle_fold(0.5), 1.0);
}

#[test]
fn center_pixel_is_dark_end_of_pattern() {
    assert_eq!(pattern(0.0, 12345.0, 3.0), 0.0);
}

#[test]
fn zero_frequency_and_phase_is_flat() {
    for p in [0.0f32, 0.25, 0.5, 0.99] {
        assert_eq!(pattern(p, 0.0, 0.0), 0.0);
    }
}

fn pattern_f64(progress: f32, frequency: f64, phase: f32) -> f64 {
    let v1 = (progress as f64 * frequency).fract();
    let v2 = (progress as f64 * phase as f64).fract();
    let raw = (v1 + v2).fract();
    if raw <= 0.5 { raw * 2.0 } else { (1.0 - raw) * 2.0 }
}

#[test]
fn split_fract_keeps_fractional_part_of_each_product() {
    let mut rng = fastrand::Rng::with_seed(11);
    for _ in 0..2_000 {
        let progress = rng.f32();
        let frequency = 900_000.0f32;
        let phase = rng.f32() * 10.0;
        let t = pattern(progress, frequency, phase);

        let v1 = fract(progress * frequency);
        let v2 = fract(progress * phase);
        assert_eq!(t, triangle_fold(fract(v1 + v2)));
        // A single fused product would round away every fractional bit here.
        assert!((0.0..1.0).contains(&v1));
    }
}

#[test]
fn pattern_tracks_f64_closely_at_mid_frequency() {
    let mut rng = fastrand::Rng::with_seed(12);
    let frequency = 1023.0f32;
    for _ in 0..5_000 {
        let progress = rng.f32();
        let phase = rng.f32() * 50.0;
        let t = pattern(progress, frequency, phase) as f64;
        let want = pattern_f64(progress, frequency as f64, phase);
        assert!((t - want).abs() < 1e-3, "progress={progress} phase={phase}: {t} vs {want}");
    }
}

#[test]
fn pattern_error_at_top_frequency_is_bounded() {
    // Products near 2^20 keep 1/16 of resolution in f32. Rounding the
    // frequency and the product each cost up to half of that, and the fold
    // doubles the result.
    let frequency = 2f64.powf(20.0 * 0.99) - 1.0;
    let mut rng = fastrand::Rng::with_seed(13);
    let mut worst = 0.0f64;
    for _ in 0..20_000 {
        let progress = rng.f32();
        let phase = rng.f32() * 10.0;
        let t = pattern(progress, frequency as f32, phase) as f64;
        worst = worst.max((t - pattern_f64(progress, frequency, phase)).abs());
    }
    assert!(worst < 0.13, "worst deviation {worst}");
}

#[test]
fn fract_is_non_negative() {
    assert!((fract(-0.25) - 0.75).abs() < 1e-7);
    assert_eq!(fract(3.0), 0.0);
}

#[test]
fn progress_is_zero_at_center_and_one_near_corners() {
    let (w, h) = (800, 600);
    let center = progress_at(399, 299, w, h);
    assert!(center < 0.002, "center progress {center}");
    let corner = progress_at(0, 0, w, h);
    assert!(corner > 0.998 && corner <= 1.0, "corner progress {corner}");
    let far = progress_at(w - 1, h - 1, w, h);
    assert!((far - corner).abs() < 1e-6);
}

#[test]
fn progress_never_exceeds_one() {
    let mut rng = fastrand::Rng::with_seed(3);
    for _ in 0..5_000 {
        let w = rng.usize(1..2000);
        let h = rng.usize(1..2000);
        let p = progress_at(rng.usize(0..w), rng.usize(0..h), w, h);
        assert!((0.0..=1.0).contains(&p), "{p} for {w}x{h}");
    }
}

#[test]
fn lut_index_floors_into_table() {
    assert_eq!(lut_index(0.0), 0);
    assert_eq!(lut_index(1.0), LUT_SIZE - 1);
    assert_eq!(lut_index(0.5), 511);
    assert_eq!(lut_index(-1.0), 0);
    assert_eq!(lut_index(7.0), LUT_SIZE - 1);
}
