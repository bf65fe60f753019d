use std::time::{Duration, Instant};

use anyhow::Result;
use moire_tui::controls::{ControlMsg, ControlState};
use moire_tui::mapping::MappingRanges;
use moire_tui::session::Session;
use moire_tui::visual::palette::{palette_name, PALETTE_COUNT};
use moire_tui::visual::{Backend, CpuBackend, DEFAULT_PIXEL_BUDGET};

#[cfg(target_os = "macos")]
use moire_tui::visual::MetalBackend;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Cpu,
    Metal,
    Both,
}

struct Args {
    mode: Mode,
    frames: usize,
    sizes: Vec<(usize, usize)>,
    pixel_budget: usize,
    seed: u64,
    ci_smoke: bool,
    quick: bool,
    max_ms: f64,
}

const DEFAULT_SIZES: [(usize, usize); 4] = [(320, 180), (1280, 720), (1920, 1080), (2560, 1440)];

fn parse_args() -> Args {
    let mut args = Args {
        mode: Mode::Cpu,
        frames: 120,
        sizes: DEFAULT_SIZES.to_vec(),
        pixel_budget: DEFAULT_PIXEL_BUDGET,
        seed: 0x6d6f_6972_65,
        ci_smoke: false,
        quick: false,
        max_ms: 40.0,
    };
    let mut w: Option<usize> = None;
    let mut h: Option<usize> = None;

    let argv = std::env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < argv.len() {
        let k = argv[i].as_str();
        let v = argv.get(i + 1).map(|s| s.as_str());
        match (k, v) {
            ("--mode", Some("cpu")) => {
                args.mode = Mode::Cpu;
                i += 2;
            }
            ("--mode", Some("metal")) | ("--mode", Some("gpu")) => {
                args.mode = Mode::Metal;
                i += 2;
            }
            ("--mode", Some("both")) => {
                args.mode = Mode::Both;
                i += 2;
            }
            ("--frames", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.frames = n.max(1);
                }
                i += 2;
            }
            ("--w", Some(x)) => {
                w = x.parse::<usize>().ok().map(|n| n.max(1));
                i += 2;
            }
            ("--h", Some(x)) => {
                h = x.parse::<usize>().ok().map(|n| n.max(1));
                i += 2;
            }
            ("--pixel-budget", Some(x)) => {
                if let Ok(n) = x.parse::<usize>() {
                    args.pixel_budget = n.max(1);
                }
                i += 2;
            }
            ("--seed", Some(x)) => {
                if let Ok(n) = x.parse::<u64>() {
                    args.seed = n;
                }
                i += 2;
            }
            ("--ci-smoke", Some(x)) if !x.starts_with("--") => {
                args.ci_smoke = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--ci-smoke", _) => {
                args.ci_smoke = true;
                i += 1;
            }
            ("--quick", Some(x)) if !x.starts_with("--") => {
                args.quick = parse_bool(x).unwrap_or(true);
                i += 2;
            }
            ("--quick", _) => {
                args.quick = true;
                i += 1;
            }
            ("--max-ms", Some(x)) => {
                if let Ok(v) = x.parse::<f64>() {
                    args.max_ms = v.max(0.1);
                }
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    if let (Some(w), Some(h)) = (w, h) {
        args.sizes = vec![(w, h)];
    }
    if args.quick {
        args.frames = args.frames.min(30);
        args.sizes.truncate(2);
    }
    args
}

fn parse_bool(s: &str) -> Option<bool> {
    let v = s.trim().to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Controls near the interesting part of each slider, jittered per run.
fn jittered_controls(rng: &mut fastrand::Rng, palette: usize) -> ControlState {
    ControlState::new(
        0.70 + rng.f32() * 0.25,
        0.60 + rng.f32() * 0.30,
        0.10 + rng.f32() * 0.40,
        palette,
    )
}

fn is_uniform(px: &[u8]) -> bool {
    match px.chunks_exact(4).next() {
        Some(first) => px.chunks_exact(4).all(|p| p[..3] == first[..3]),
        None => true,
    }
}

struct RunStats {
    ms_per_frame: f64,
    rendered: usize,
    uniform: usize,
    scale: usize,
}

fn run_frames(backend: &mut Backend, args: &Args, w: usize, h: usize, palette: usize, rng: &mut fastrand::Rng) -> RunStats {
    let mut session = Session::new(jittered_controls(rng, palette), MappingRanges::default())
        .with_pinned_controls();
    session.observe_surface(w, h);
    session.driver_mut().start();

    let mut total = Duration::ZERO;
    let mut rendered = 0usize;
    let mut uniform = 0usize;
    for f in 0..args.frames {
        if f > 0 && f % 30 == 0 {
            session.dispatch(ControlMsg::NudgeFrequency((rng.f32() - 0.5) * 0.02));
        }
        let start = Instant::now();
        let frame = session.render_frame(backend, &mut |_ready: bool| {});
        total += start.elapsed();
        if let Some((_, px)) = frame {
            rendered += 1;
            if is_uniform(px) {
                uniform += 1;
            }
        }
        session.advance();
    }

    RunStats {
        ms_per_frame: total.as_secs_f64() * 1000.0 / args.frames.max(1) as f64,
        rendered,
        uniform,
        scale: backend.scale(),
    }
}

fn bench_backend(label: &str, backend: &mut Backend, args: &Args) -> Result<()> {
    let mut rng = fastrand::Rng::with_seed(args.seed);
    let mut uniform_runs = Vec::<String>::new();
    let mut slow_runs = Vec::<(String, f64)>::new();

    println!(
        "{label} benchmark: palettes={} frames/run={} sizes={} budget={} quick={}",
        PALETTE_COUNT,
        args.frames,
        args.sizes.len(),
        args.pixel_budget,
        args.quick
    );

    for &(w, h) in &args.sizes {
        for palette in 0..PALETTE_COUNT {
            let stats = run_frames(backend, args, w, h, palette, &mut rng);
            let tag = format!("{}x{} {}", w, h, palette_name(palette));
            println!(
                "  {:<28} {:>8.3} ms/frame  scale=1/{}  rendered={:>3}/{}  uniform={}",
                tag, stats.ms_per_frame, stats.scale, stats.rendered, args.frames, stats.uniform
            );
            if stats.rendered == 0 || stats.uniform > 0 {
                uniform_runs.push(tag.clone());
            }
            if stats.ms_per_frame > args.max_ms {
                slow_runs.push((tag, stats.ms_per_frame));
            }
        }
    }

    if args.ci_smoke {
        if !uniform_runs.is_empty() {
            return Err(anyhow::anyhow!(
                "{label} ci smoke failed: uniform or empty output in {}",
                uniform_runs.join(", ")
            ));
        }
        if !slow_runs.is_empty() {
            let detail = slow_runs
                .iter()
                .map(|(tag, ms)| format!("{tag} ({ms:.2}ms)"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(anyhow::anyhow!(
                "{label} ci smoke failed: frames slower than {:.1}ms: {detail}",
                args.max_ms
            ));
        }
        println!("{label} ci smoke passed");
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn bench_metal(args: &Args) -> Result<()> {
    let gpu = MetalBackend::new().map_err(|e| anyhow::anyhow!("metal init: {e}"))?;
    println!("metal device: {}", gpu.device_name());
    let mut backend = Backend::Gpu(gpu);
    let result = bench_backend("Metal", &mut backend, args);
    backend.teardown();
    result
}

#[cfg(not(target_os = "macos"))]
fn bench_metal(_args: &Args) -> Result<()> {
    println!("Metal benchmark skipped: not on macOS");
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();

    if matches!(args.mode, Mode::Cpu | Mode::Both) {
        let mut backend = Backend::Cpu(CpuBackend::new(args.pixel_budget));
        let result = bench_backend("CPU", &mut backend, &args);
        backend.teardown();
        result?;
    }
    if matches!(args.mode, Mode::Metal | Mode::Both) {
        bench_metal(&args)?;
    }
    Ok(())
}
