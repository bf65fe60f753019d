use moire_tui::capability::probe_with;
use moire_tui::config::{EngineMode, RendererMode};
use moire_tui::controls::ControlState;
use moire_tui::mapping::MappingRanges;
use moire_tui::session::Session;
use moire_tui::visual::cpu::{downsample_scale, draw_size};
use moire_tui::visual::palette::PaletteSet;
use moire_tui::visual::pattern::{lut_index, pattern};
use moire_tui::visual::{Backend, CpuBackend, FrameParams, DEFAULT_PIXEL_BUDGET};
use std::collections::HashSet;

fn params(columns: usize, rows: usize) -> FrameParams {
    FrameParams {
        frequency_scalar: 1023.0,
        phase: 0.0,
        palette: 0,
        columns,
        rows,
    }
}

// ── Downsampling ────────────────────────────────────────────────────────────

#[test]
fn downsample_kicks_in_just_over_budget() {
    assert_eq!(downsample_scale(1200, 900, DEFAULT_PIXEL_BUDGET), 2);
    assert_eq!(draw_size(1200, 900, 2), (600, 450));
}

#[test]
fn budget_is_inclusive() {
    assert_eq!(downsample_scale(1000, 1000, DEFAULT_PIXEL_BUDGET), 1);
    assert_eq!(downsample_scale(1, 1, DEFAULT_PIXEL_BUDGET), 1);
}

#[test]
fn large_surfaces_scale_by_ceil_sqrt() {
    // 3840x2160 = 8.29M pixels -> sqrt(8.29) = 2.88 -> 3
    assert_eq!(downsample_scale(3840, 2160, DEFAULT_PIXEL_BUDGET), 3);
    assert_eq!(draw_size(3840, 2160, 3), (1280, 720));
}

#[test]
fn draw_size_never_collapses_to_zero() {
    assert_eq!(draw_size(3, 10_000, 5), (1, 2000));
}

// ── CPU backend ─────────────────────────────────────────────────────────────

#[test]
fn cpu_skips_zero_sized_grid() {
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    assert!(cpu.render_frame(&params(0, 10)).is_none());
    assert!(cpu.render_frame(&params(10, 0)).is_none());
    assert_eq!(cpu.cache_generation(), 0);
}

#[test]
fn cpu_output_is_opaque_and_grid_sized() {
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    let px = cpu.render_frame(&params(64, 48)).unwrap();
    assert_eq!(px.len(), 64 * 48 * 4);
    assert!(px.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn cpu_pixels_come_from_lut() {
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    let p = FrameParams {
        phase: 0.37,
        palette: 4,
        ..params(50, 30)
    };
    let px = cpu.render_frame(&p).unwrap().to_vec();
    let progress = cpu.progress_table().to_vec();
    let lut = PaletteSet::builtin().get_or_default(4);
    for (i, &pr) in progress.iter().enumerate() {
        let want = lut.color(lut_index(pattern(pr, p.frequency_scalar, p.phase)));
        assert_eq!(&px[i * 4..i * 4 + 3], &want[..], "pixel {i}");
    }
}

#[test]
fn cpu_progress_cache_is_reused_for_same_size() {
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    cpu.render_frame(&params(100, 80)).unwrap();
    assert_eq!(cpu.cache_generation(), 1);
    for phase in [0.1f32, 0.2, 0.3] {
        cpu.render_frame(&FrameParams { phase, ..params(100, 80) }).unwrap();
    }
    assert_eq!(cpu.cache_generation(), 1);

    cpu.render_frame(&params(120, 80)).unwrap();
    assert_eq!(cpu.cache_generation(), 2);
    assert_eq!(cpu.progress_table().len(), 120 * 80);
}

#[test]
fn cpu_downsampled_frame_is_stretched_to_grid() {
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    let px = cpu.render_frame(&params(1200, 900)).unwrap().to_vec();
    assert_eq!(cpu.scale(), 2);
    assert_eq!(cpu.draw_size(), (600, 450));
    assert_eq!(px.len(), 1200 * 900 * 4);
    // Nearest-neighbour: each 2x2 block is one source pixel.
    let w = 1200;
    for (x, y) in [(0usize, 0usize), (10, 20), (598, 300), (1198, 898)] {
        let a = &px[(y * w + x) * 4..(y * w + x) * 4 + 4];
        let b = &px[(y * w + x + 1) * 4..(y * w + x + 1) * 4 + 4];
        let c = &px[((y + 1) * w + x) * 4..((y + 1) * w + x) * 4 + 4];
        assert_eq!(a, b);
        assert_eq!(a, c);
    }
}

#[test]
fn cpu_small_budget_forces_downsampling() {
    let mut cpu = CpuBackend::new(100);
    cpu.render_frame(&params(40, 40)).unwrap();
    assert_eq!(cpu.scale(), 4);
    assert_eq!(cpu.draw_size(), (10, 10));
}

#[test]
fn cpu_unknown_palette_renders_as_first() {
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    let first = cpu.render_frame(&params(32, 32)).unwrap().to_vec();
    let other = cpu
        .render_frame(&FrameParams { palette: 42, ..params(32, 32) })
        .unwrap()
        .to_vec();
    assert_eq!(first, other);
}

#[test]
fn cpu_teardown_releases_buffers() {
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    cpu.render_frame(&params(20, 20)).unwrap();
    cpu.teardown();
    assert!(cpu.progress_table().is_empty());
    assert_eq!(cpu.draw_size(), (0, 0));
    // Rendering again rebuilds rather than reusing stale state.
    cpu.render_frame(&params(20, 20)).unwrap();
    assert_eq!(cpu.cache_generation(), 2);
}

// ── Capability probe ────────────────────────────────────────────────────────

#[test]
fn probe_resolves_auto_to_concrete_engine() {
    let with_gpu = probe_with(EngineMode::Auto, RendererMode::HalfBlock, false, true);
    assert_eq!(with_gpu.engine, EngineMode::Gpu);
    let without = probe_with(EngineMode::Auto, RendererMode::HalfBlock, false, false);
    assert_eq!(without.engine, EngineMode::Cpu);
}

#[test]
fn probe_falls_back_when_gpu_missing() {
    let r = probe_with(EngineMode::Gpu, RendererMode::Ascii, false, false);
    assert_eq!(r.engine, EngineMode::Cpu);
    assert!(r.changed());
    assert!(r.notes().iter().any(|n| n.contains("falling back")));
}

#[test]
fn probe_keeps_renderer_when_probe_disabled() {
    let r = probe_with(EngineMode::Cpu, RendererMode::Kitty, false, false);
    assert_eq!(r.renderer, RendererMode::Kitty);
    assert!(r.status_label().starts_with("off"));
}

#[test]
fn backend_init_honours_cpu_choice() {
    let mut report = probe_with(EngineMode::Cpu, RendererMode::HalfBlock, false, true);
    let backend = Backend::init(&mut report, DEFAULT_PIXEL_BUDGET);
    assert_eq!(backend.label(), "cpu");
    assert!(!report.changed());
    backend.teardown();
}

#[test]
fn backend_init_resolves_unprobed_auto() {
    let mut report = probe_with(EngineMode::Cpu, RendererMode::HalfBlock, false, false);
    report.engine = EngineMode::Auto;
    let backend = Backend::init(&mut report, DEFAULT_PIXEL_BUDGET);
    assert_ne!(report.engine, EngineMode::Auto);
    let want = if report.engine == EngineMode::Gpu { "metal" } else { "cpu" };
    assert_eq!(backend.label(), want);
    assert_eq!(report.gpu_available, moire_tui::capability::has_gpu_capability());
    backend.teardown();
}

#[cfg(not(target_os = "macos"))]
#[test]
fn backend_init_falls_back_to_cpu_without_metal() {
    let mut report = probe_with(EngineMode::Gpu, RendererMode::HalfBlock, false, true);
    let backend = Backend::init(&mut report, DEFAULT_PIXEL_BUDGET);
    assert_eq!(backend.label(), "cpu");
    assert_eq!(report.engine, EngineMode::Cpu);
    assert!(report.changed());
}

// ── End to end ──────────────────────────────────────────────────────────────

#[test]
fn session_renders_moire_on_cpu() {
    let controls = ControlState::new(0.75, 0.5, 0.25, 0);
    let mut session = Session::new(controls, MappingRanges::default()).with_pinned_controls();
    session.observe_surface(800, 600);
    session.driver_mut().start();
    let mut backend = Backend::Cpu(CpuBackend::new(DEFAULT_PIXEL_BUDGET));

    let mut ready_calls = 0usize;
    let (p, px) = {
        let mut sink = |ready: bool| {
            assert!(ready);
            ready_calls += 1;
        };
        let (p, px) = session.render_frame(&mut backend, &mut sink).unwrap();
        (p, px.to_vec())
    };
    assert_eq!(ready_calls, 1);
    assert_eq!((p.columns, p.rows), (214, 160));
    assert_eq!(px.len(), 214 * 160 * 4);

    let colors: HashSet<[u8; 3]> = px.chunks_exact(4).map(|c| [c[0], c[1], c[2]]).collect();
    assert!(colors.len() >= 2, "expected a pattern, got {} colors", colors.len());

    if let Backend::Cpu(cpu) = &backend {
        let table = cpu.progress_table();
        let center = table[80 * 214 + 107];
        assert!(center < 0.02, "center progress {center}");
        assert!(table[0] > 0.98, "corner progress {}", table[0]);
    }

    // Later frames don't report ready again.
    session.advance();
    let mut again = 0usize;
    session
        .render_frame(&mut backend, &mut |_ready: bool| again += 1)
        .unwrap();
    assert_eq!(again, 0);
    assert!(session.is_ready());
}

#[test]
fn session_skips_zero_surface_without_reporting_ready() {
    let mut session =
        Session::new(ControlState::default(), MappingRanges::default()).with_pinned_controls();
    session.observe_surface(0, 0);
    let mut backend = Backend::Cpu(CpuBackend::new(DEFAULT_PIXEL_BUDGET));
    let mut calls = 0usize;
    assert!(session
        .render_frame(&mut backend, &mut |_ready: bool| calls += 1)
        .is_none());
    assert_eq!(calls, 0);
    assert!(!session.is_ready());
}

// ── GPU parity ──────────────────────────────────────────────────────────────

#[cfg(target_os = "macos")]
fn assert_metal_matches_cpu(p: FrameParams) {
    use moire_tui::visual::MetalBackend;

    let mut gpu = match MetalBackend::new() {
        Ok(g) => g,
        Err(err) => {
            eprintln!("skipping metal parity check: {err}");
            return;
        }
    };
    let mut cpu = CpuBackend::new(DEFAULT_PIXEL_BUDGET);
    let a = cpu.render_frame(&p).unwrap().to_vec();
    let b = gpu.render_frame(&p).unwrap().to_vec();
    assert_eq!(a.len(), b.len());

    let off: Vec<usize> = a
        .chunks_exact(4)
        .zip(b.chunks_exact(4))
        .enumerate()
        .filter(|(_, (x, y))| (0..3).any(|c| (x[c] as i32 - y[c] as i32).abs() > 1))
        .map(|(i, _)| i)
        .collect();
    assert!(
        off.is_empty(),
        "frequency {}: {} of {} pixels differ by more than 1 (first at {:?})",
        p.frequency_scalar,
        off.len(),
        p.columns * p.rows,
        off.first()
    );
    gpu.teardown();
}

#[cfg(target_os = "macos")]
#[test]
fn metal_matches_cpu_at_low_frequency() {
    assert_metal_matches_cpu(FrameParams {
        frequency_scalar: 64.0,
        phase: 1.25,
        palette: 2,
        columns: 96,
        rows: 64,
    });
}

#[cfg(target_os = "macos")]
#[test]
fn metal_matches_cpu_at_top_of_frequency_range() {
    let top = moire_tui::mapping::frequency_scalar(1.0, &MappingRanges::default()) as f32;
    assert!(top > 1e5);
    assert_metal_matches_cpu(FrameParams {
        frequency_scalar: top,
        phase: 3.7125,
        palette: 5,
        columns: 214,
        rows: 160,
    });
}
