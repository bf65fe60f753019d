use crate::config::{EngineMode, RendererMode};

#[derive(Debug, Clone)]
pub struct CapabilityReport {
    pub auto_probe: bool,
    pub gpu_available: bool,
    pub requested_engine: EngineMode,
    pub requested_renderer: RendererMode,
    pub engine: EngineMode,
    pub renderer: RendererMode,
    notes: Vec<String>,
}

impl CapabilityReport {
    pub fn changed(&self) -> bool {
        self.engine != self.requested_engine || self.renderer != self.requested_renderer
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn record_engine_fallback(&mut self, to: EngineMode, reason: impl Into<String>) {
        self.engine = to;
        self.notes.push(reason.into());
    }

    pub fn status_label(&self) -> String {
        if !self.auto_probe {
            return format!(
                "off (engine={:?}, renderer={:?})",
                self.engine, self.renderer
            );
        }
        if self.changed() {
            return format!(
                "fallback eng {:?}->{:?}, ren {:?}->{:?}",
                self.requested_engine, self.engine, self.requested_renderer, self.renderer
            );
        }
        format!("ok eng={:?}, ren={:?}", self.engine, self.renderer)
    }
}

/// One-time GPU probe: true when a Metal device can be obtained.
pub fn has_gpu_capability() -> bool {
    #[cfg(target_os = "macos")]
    {
        metal::Device::system_default().is_some()
    }

    #[cfg(not(target_os = "macos"))]
    {
        false
    }
}

/// Resolve requested engine/renderer against what this host can do.
/// `Auto` always resolves to a concrete engine.
pub fn probe_runtime(
    requested_engine: EngineMode,
    requested_renderer: RendererMode,
    auto_probe: bool,
) -> CapabilityReport {
    probe_with(requested_engine, requested_renderer, auto_probe, has_gpu_capability())
}

/// [`probe_runtime`] with the GPU probe result injected.
pub fn probe_with(
    requested_engine: EngineMode,
    requested_renderer: RendererMode,
    auto_probe: bool,
    gpu_available: bool,
) -> CapabilityReport {
    let mut report = CapabilityReport {
        auto_probe,
        gpu_available,
        requested_engine,
        requested_renderer,
        engine: requested_engine,
        renderer: requested_renderer,
        notes: Vec::new(),
    };

    match requested_engine {
        EngineMode::Cpu => {}
        EngineMode::Auto => {
            report.engine = if gpu_available { EngineMode::Gpu } else { EngineMode::Cpu };
            report.push_note(format!(
                "auto engine resolved to {:?} (gpu available: {gpu_available})",
                report.engine
            ));
        }
        EngineMode::Gpu if !gpu_available => {
            report.record_engine_fallback(
                EngineMode::Cpu,
                "no gpu device available; falling back to cpu engine",
            );
        }
        EngineMode::Gpu => {
            report.push_note("gpu pipeline validation pending during backend initialization");
        }
    }

    if !auto_probe {
        report.push_note("renderer probe disabled by --auto-probe=false");
        return report;
    }

    if requested_renderer == RendererMode::Kitty && !kitty_graphics_available() {
        report.renderer = RendererMode::HalfBlock;
        report.push_note("kitty graphics unavailable in this terminal; falling back to half-block renderer");
    }

    if report.notes.is_empty() {
        report.push_note("probe selected requested engine/renderer with no fallback");
    }

    report
}

fn kitty_graphics_available() -> bool {
    if let Ok(v) = std::env::var("MOIRE_FORCE_KITTY") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => return true,
            "0" | "false" | "no" | "off" => return false,
            _ => {}
        }
    }

    if std::env::var("KITTY_WINDOW_ID").is_ok() {
        return true;
    }

    let term = std::env::var("TERM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    if term.contains("kitty") {
        return true;
    }

    let term_program = std::env::var("TERM_PROGRAM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    term_program.contains("ghostty") || term_program.contains("kitty")
}
