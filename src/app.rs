use crate::animation::{FrameClock, TickSource};
use crate::capability::{probe_runtime, CapabilityReport};
use crate::config::{Config, RendererMode};
use crate::controls::{ControlMsg, ControlState};
use crate::mapping::MappingRanges;
use crate::prefs::{prefs_storage_path, ControlPrefs};
use crate::render::{AsciiRenderer, Frame, HalfBlockRenderer, KittyRenderer, Renderer};
use crate::session::Session;
use crate::terminal::TerminalGuard;
use crate::visual::palette::{palette_name, PALETTE_COUNT};
use crate::visual::{stretch_nearest, Backend};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, Instant};

const RESOLUTION_STEP: f32 = 0.05;
// The frequency curve is exponential; keep keyboard steps fine.
const FREQUENCY_STEP: f32 = 0.005;
const SPEED_STEP: f32 = 0.05;

/// What a key press asks the loop to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    Quit,
    Control(ControlMsg),
    TogglePause,
    ToggleHud,
    ToggleHelp,
    None,
}

pub fn key_action(code: KeyCode, mods: KeyModifiers) -> KeyAction {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return KeyAction::Quit;
    }

    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Left => KeyAction::Control(ControlMsg::NudgeFrequency(-FREQUENCY_STEP)),
        KeyCode::Right => KeyAction::Control(ControlMsg::NudgeFrequency(FREQUENCY_STEP)),
        KeyCode::Up => KeyAction::Control(ControlMsg::NudgeResolution(RESOLUTION_STEP)),
        KeyCode::Down => KeyAction::Control(ControlMsg::NudgeResolution(-RESOLUTION_STEP)),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            KeyAction::Control(ControlMsg::NudgeSpeed(SPEED_STEP))
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            KeyAction::Control(ControlMsg::NudgeSpeed(-SPEED_STEP))
        }
        KeyCode::Char('p') => KeyAction::Control(ControlMsg::CyclePalette(1)),
        KeyCode::Char('P') => KeyAction::Control(ControlMsg::CyclePalette(-1)),
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            if index < PALETTE_COUNT {
                KeyAction::Control(ControlMsg::SetPalette(index))
            } else {
                KeyAction::None
            }
        }
        KeyCode::Char(' ') => KeyAction::TogglePause,
        KeyCode::Char('i') | KeyCode::Char('I') => KeyAction::ToggleHud,
        KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(1) => {
            KeyAction::ToggleHelp
        }
        _ => KeyAction::None,
    }
}

pub fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    // The terminal belongs to the renderer; only log when asked to.
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_micros()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .try_init()
            .context("install logger")?;
    } else if std::env::var_os("RUST_LOG").is_some() {
        env_logger::Builder::from_default_env()
            .try_init()
            .context("install logger")?;
    }
    Ok(())
}

/// Stored prefs with command-line values layered on top.
pub fn initial_prefs(cfg: &Config, stored: ControlPrefs) -> ControlPrefs {
    stored.merged(ControlPrefs {
        resolution: cfg.resolution,
        frequency: cfg.frequency,
        speed: cfg.speed,
        palette: cfg.palette,
    })
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    init_logging(cfg.log_file.as_deref())?;

    let prefs_path = cfg.prefs.clone().or_else(prefs_storage_path);
    let stored = match ControlPrefs::load(prefs_path.as_deref()) {
        Ok(p) => p,
        Err(err) => {
            log::warn!("ignoring unreadable prefs: {err}");
            ControlPrefs::default()
        }
    };
    let prefs = initial_prefs(&cfg, stored);
    let mut session = Session::new(prefs.apply_to(ControlState::default()), MappingRanges::default());
    if !prefs.is_empty() {
        session = session.with_pinned_controls();
    }

    let mut report = probe_runtime(cfg.engine, cfg.renderer, cfg.auto_probe);
    for note in report.notes() {
        log::info!("probe: {note}");
    }
    let mut backend = Backend::init(&mut report, cfg.pixel_budget);

    let result = run_loop(&cfg, &report, &mut session, &mut backend);
    session.driver_mut().stop();
    backend.teardown();

    if cfg.save_prefs {
        ControlPrefs::from_controls(&session.controls())
            .save(prefs_path.as_deref())
            .context("save control prefs")?;
    }
    result
}

fn run_loop(
    cfg: &Config,
    report: &CapabilityReport,
    session: &mut Session,
    backend: &mut Backend,
) -> anyhow::Result<()> {
    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());

    let mut renderer: Box<dyn Renderer> = match report.renderer {
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Kitty => Box::new(KittyRenderer::new()),
    };
    let cell_px = cell_pixels(report.renderer);

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.1 < 2 || last_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut show_hud = true;
    let mut show_help = false;
    let mut fps = FpsCounter::new();
    let mut clock = FrameClock::new(cfg.fps);
    let mut surface: Vec<u8> = Vec::new();
    let mut has_frame = false;
    let mut last_frame_ms = 0.0f32;

    session.driver_mut().start();

    while clock.next_tick() {
        let now = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    match key_action(k.code, k.modifiers) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Control(msg) => session.dispatch(msg),
                        KeyAction::TogglePause => session.driver_mut().toggle(),
                        KeyAction::ToggleHud => show_hud = !show_hud,
                        KeyAction::ToggleHelp => show_help = !show_help,
                        KeyAction::None => {}
                    }
                }
                Event::Resize(c, r) => last_size = (c, r),
                _ => {}
            }
        }

        // Resize events can be missed in some terminals.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
        }
        let (term_cols, term_rows) = last_size;

        // Controls stay hidden until there is something on screen.
        let hud = if show_hud && session.is_ready() {
            build_wrapped_hud(
                term_cols as usize,
                session,
                backend,
                report,
                renderer.name(),
                fps.fps(),
                last_frame_ms,
            )
        } else {
            String::new()
        };
        let hud_rows = hud_rows_for_text(term_rows, &hud);
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);
        let w = (term_cols as usize).saturating_mul(cell_px.0);
        let h = (visual_rows as usize).saturating_mul(cell_px.1);
        session.observe_surface(w, h);

        let need = w.saturating_mul(h).saturating_mul(4);
        if surface.len() != need {
            surface.clear();
            surface.resize(need, 0);
            has_frame = false;
        }

        let engine_start = Instant::now();
        match session.render_frame(backend, &mut |ready: bool| {
            log::info!("first frame presented (ready={ready})");
        }) {
            Some((params, pixels)) => {
                stretch_nearest(pixels, params.columns, params.rows, &mut surface, w, h);
                has_frame = true;
            }
            None => log::debug!("frame skipped at surface {w}x{h}"),
        }
        last_frame_ms = engine_start.elapsed().as_secs_f32() * 1000.0;

        if has_frame {
            let frame = Frame {
                term_cols,
                term_rows,
                visual_rows,
                pixel_width: w,
                pixel_height: h,
                pixels_rgba: &surface,
                hud: &hud,
                hud_rows,
                overlay: show_help.then(help_popup_text),
                sync_updates: cfg.sync_updates,
            };
            renderer.render(&frame, &mut out)?;
        }

        fps.tick();
        session.advance();
        log::trace!("frame took {:.2}ms", now.elapsed().as_secs_f32() * 1000.0);
    }
    Ok(())
}

/// Surface pixels per terminal cell. Kitty uses the terminal's reported
/// cell size when available.
fn cell_pixels(renderer: RendererMode) -> (usize, usize) {
    if renderer == RendererMode::Kitty {
        if let Ok(ws) = crossterm::terminal::window_size() {
            if ws.columns > 0 && ws.rows > 0 && ws.width > 0 && ws.height > 0 {
                let cw = (ws.width / ws.columns).max(1) as usize;
                let ch = (ws.height / ws.rows).max(1) as usize;
                return (cw, ch);
            }
        }
    }
    renderer.cell_pixels()
}

fn hud_rows_for_text(term_rows: u16, hud: &str) -> u16 {
    if hud.is_empty() {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows)
}

fn build_wrapped_hud(
    cols: usize,
    session: &Session,
    backend: &Backend,
    report: &CapabilityReport,
    renderer_name: &str,
    fps: f32,
    frame_ms: f32,
) -> String {
    let c = session.controls();
    let (grid_w, grid_h) = session
        .frame_params()
        .map(|p| (p.columns, p.rows))
        .unwrap_or((0, 0));
    let logical_lines = vec![
        format!(
            "Palette: {} ({}/{}) | Res: {:.2} (cell {:.1}px) | Freq: {:.3} (x{:.1}) | Speed: {:.2} ({:.4}/tick) | Phase: {:.4}{}",
            palette_name(c.palette),
            c.palette + 1,
            PALETTE_COUNT,
            c.resolution,
            session.cell_size(),
            c.frequency,
            session.frequency_scalar(),
            c.speed,
            session.speed_scalar(),
            session.phase(),
            if session.driver().is_running() { "" } else { " (paused)" },
        ),
        format!(
            "Engine: {} | Renderer: {} | Grid: {}x{} | Scale: 1/{} | ms: {:>4.1} | FPS: {:>4.1} | Probe: {}",
            backend.label(),
            renderer_name,
            grid_w,
            grid_h,
            backend.scale(),
            frame_ms,
            fps,
            report.status_label(),
        ),
        "Keys: ←/→ frequency | ↑/↓ resolution | +/- speed | p/1-7 palette | space pause | i HUD | ?/h help | q quit".to_string(),
    ];

    wrap_hud_lines(cols, &logical_lines).join("\n")
}

fn wrap_hud_lines(cols: usize, lines: &[String]) -> Vec<String> {
    let width = cols.max(1);
    let mut out = Vec::new();
    for line in lines {
        out.extend(hard_wrap_line(line, width));
    }
    out
}

fn hard_wrap_line(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

fn help_popup_text() -> &'static str {
    "Moire Hotkeys\n\
←/→  frequency down/up (restarts the phase)\n\
↑/↓  resolution up/down\n\
+ / -  speed up/down\n\
p / P  next/previous palette\n\
1-7  pick palette\n\
space  pause/resume animation\n\
i  show/hide HUD\n\
? or h or F1  toggle this help\n\
q or esc  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
