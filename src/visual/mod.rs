pub mod cpu;
pub mod palette;
pub mod pattern;
#[cfg(target_os = "macos")]
mod metal;

use crate::capability::{CapabilityReport, has_gpu_capability};
use crate::config::EngineMode;
use std::fmt;

pub use cpu::{CpuBackend, DEFAULT_PIXEL_BUDGET};
#[cfg(target_os = "macos")]
pub use self::metal::MetalBackend;

/// Everything a backend needs for one frame. Built fresh from a consistent
/// snapshot of controls and phase; carries no identity between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    pub frequency_scalar: f32,
    pub phase: f32,
    pub palette: usize,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    NoDevice,
    ShaderCompile(String),
    PipelineLink(String),
    Resource(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice => write!(f, "no GPU device available"),
            Self::ShaderCompile(msg) => write!(f, "shader compile failed: {msg}"),
            Self::PipelineLink(msg) => write!(f, "pipeline link failed: {msg}"),
            Self::Resource(msg) => write!(f, "GPU resource allocation failed: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// The renderer chosen for this session. Picked once, never switched.
pub enum Backend {
    Cpu(CpuBackend),
    #[cfg(target_os = "macos")]
    Gpu(MetalBackend),
}

impl Backend {
    /// Bring up the backend named by `report.engine`. A GPU failure is not an
    /// error for the caller: it is recorded on `report` and the CPU path is
    /// returned instead.
    pub fn init(report: &mut CapabilityReport, pixel_budget: usize) -> Self {
        if report.engine == EngineMode::Auto {
            let gpu = has_gpu_capability();
            report.gpu_available = gpu;
            report.engine = if gpu { EngineMode::Gpu } else { EngineMode::Cpu };
            log::debug!("unresolved auto engine; gpu available: {gpu}");
            report.push_note(format!("auto engine resolved to {:?} at init", report.engine));
        }
        match report.engine {
            EngineMode::Cpu | EngineMode::Auto => {
                log::info!("using cpu backend (pixel budget {pixel_budget})");
                Self::Cpu(CpuBackend::new(pixel_budget))
            }
            EngineMode::Gpu => Self::init_gpu(report, pixel_budget),
        }
    }

    #[cfg(target_os = "macos")]
    fn init_gpu(report: &mut CapabilityReport, pixel_budget: usize) -> Self {
        match MetalBackend::new() {
            Ok(gpu) => {
                log::info!("using metal backend on {}", gpu.device_name());
                Self::Gpu(gpu)
            }
            Err(err) => {
                log::warn!("metal backend unavailable, falling back to cpu: {err}");
                report.record_engine_fallback(
                    EngineMode::Cpu,
                    format!("metal init failed ({err}); falling back to cpu engine"),
                );
                Self::Cpu(CpuBackend::new(pixel_budget))
            }
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn init_gpu(report: &mut CapabilityReport, pixel_budget: usize) -> Self {
        log::warn!("gpu backend requires metal; falling back to cpu");
        report.record_engine_fallback(
            EngineMode::Cpu,
            "gpu backend unsupported on this platform; falling back to cpu engine",
        );
        Self::Cpu(CpuBackend::new(pixel_budget))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cpu(_) => "cpu",
            #[cfg(target_os = "macos")]
            Self::Gpu(_) => "metal",
        }
    }

    /// Downsample factor applied to the last frame (always 1 on the GPU).
    pub fn scale(&self) -> usize {
        match self {
            Self::Cpu(cpu) => cpu.scale(),
            #[cfg(target_os = "macos")]
            Self::Gpu(_) => 1,
        }
    }

    /// RGBA pixels for `params.columns` x `params.rows`, or `None` when the
    /// frame was skipped (degenerate size, GPU hiccup). Callers keep showing
    /// the previous frame on `None`.
    pub fn render_frame(&mut self, params: &FrameParams) -> Option<&[u8]> {
        match self {
            Self::Cpu(cpu) => cpu.render_frame(params),
            #[cfg(target_os = "macos")]
            Self::Gpu(gpu) => gpu.render_frame(params),
        }
    }

    pub fn teardown(self) {
        match self {
            Self::Cpu(mut cpu) => cpu.teardown(),
            #[cfg(target_os = "macos")]
            Self::Gpu(mut gpu) => gpu.teardown(),
        }
    }
}

/// Nearest-neighbour RGBA stretch of `src` (`sw`x`sh`) onto `dst` (`dw`x`dh`).
/// No filtering: every destination pixel copies exactly one source pixel.
pub fn stretch_nearest(src: &[u8], sw: usize, sh: usize, dst: &mut [u8], dw: usize, dh: usize) {
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }
    if src.len() < sw * sh * 4 || dst.len() < dw * dh * 4 {
        return;
    }
    if sw == dw && sh == dh {
        dst[..dw * dh * 4].copy_from_slice(&src[..sw * sh * 4]);
        return;
    }

    let src_row_bytes = sw * 4;
    let dst_row_bytes = dw * 4;
    for y in 0..dh {
        let sy = (y * sh / dh).min(sh - 1);
        let src_row = &src[sy * src_row_bytes..(sy + 1) * src_row_bytes];
        let dst_row = &mut dst[y * dst_row_bytes..(y + 1) * dst_row_bytes];
        for x in 0..dw {
            let sx = (x * sw / dw).min(sw - 1);
            dst_row[x * 4..x * 4 + 4].copy_from_slice(&src_row[sx * 4..sx * 4 + 4]);
        }
    }
}
