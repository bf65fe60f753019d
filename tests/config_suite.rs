use clap::Parser;
use crossterm::event::{KeyCode, KeyModifiers};
use moire_tui::app::{initial_prefs, key_action, KeyAction};
use moire_tui::config::{Config, EngineMode, RendererMode};
use moire_tui::controls::{ControlMsg, ControlState};
use moire_tui::prefs::{ControlPrefs, PrefsError};

fn parse(args: &[&str]) -> Config {
    let mut argv = vec!["moire_tui"];
    argv.extend_from_slice(args);
    Config::try_parse_from(argv).expect("args should parse")
}

// ── CLI ─────────────────────────────────────────────────────────────────────

#[test]
fn cli_defaults() {
    let cfg = parse(&[]);
    assert_eq!(cfg.engine, EngineMode::Auto);
    assert_eq!(cfg.renderer, RendererMode::HalfBlock);
    assert_eq!(cfg.fps, 60);
    assert_eq!(cfg.pixel_budget, 1_000_000);
    assert!(cfg.sync_updates);
    assert!(cfg.auto_probe);
    assert!(!cfg.save_prefs);
    assert!(cfg.log_file.is_none());
    assert_eq!(cfg.palette, None);
}

#[test]
fn cli_accepts_aliases() {
    assert_eq!(parse(&["--engine", "metal"]).engine, EngineMode::Gpu);
    assert_eq!(parse(&["--renderer", "hb"]).renderer, RendererMode::HalfBlock);
    assert_eq!(parse(&["--renderer", "half-block"]).renderer, RendererMode::HalfBlock);
    assert_eq!(parse(&["--renderer", "kitty"]).renderer, RendererMode::Kitty);
    assert_eq!(parse(&["--renderer", "ascii"]).renderer, RendererMode::Ascii);
}

#[test]
fn cli_bool_flags_take_values() {
    let cfg = parse(&["--sync-updates", "false", "--auto-probe", "false"]);
    assert!(!cfg.sync_updates);
    assert!(!cfg.auto_probe);
}

#[test]
fn cli_control_values_parse() {
    let cfg = parse(&["--palette", "3", "--speed", "0.4"]);
    assert_eq!(cfg.palette, Some(3));
    assert_eq!(cfg.speed, Some(0.4));
}

#[test]
fn cli_rejects_unknown_engine() {
    assert!(Config::try_parse_from(["moire_tui", "--engine", "vulkan"]).is_err());
}

#[test]
fn renderer_cell_geometry() {
    assert_eq!(RendererMode::Ascii.cell_pixels(), (1, 1));
    assert_eq!(RendererMode::HalfBlock.cell_pixels(), (1, 2));
    assert_eq!(RendererMode::Kitty.cell_pixels(), (8, 16));
}

// ── Prefs ───────────────────────────────────────────────────────────────────

#[test]
fn prefs_parse_known_keys_and_skip_comments() {
    let text = "# saved\nresolution = 0.5\n\nfrequency=0.7\nunknown=1\npalette=3\n";
    let p = ControlPrefs::parse(text).unwrap();
    assert_eq!(p.resolution, Some(0.5));
    assert_eq!(p.frequency, Some(0.7));
    assert_eq!(p.speed, None);
    assert_eq!(p.palette, Some(3));
}

#[test]
fn prefs_parse_errors_carry_line_numbers() {
    let err = ControlPrefs::parse("resolution=0.5\nspeed=fast\n").unwrap_err();
    assert!(matches!(err, PrefsError::Parse { line: 2, .. }), "{err}");

    let err = ControlPrefs::parse("\n\njunk\n").unwrap_err();
    assert!(matches!(err, PrefsError::Parse { line: 3, .. }), "{err}");

    let err = ControlPrefs::parse("frequency=inf").unwrap_err();
    assert!(err.to_string().contains("finite"));

    assert!(ControlPrefs::parse("palette=-1").is_err());
}

#[test]
fn prefs_apply_through_clamping_setters() {
    let p = ControlPrefs {
        resolution: Some(4.0),
        palette: Some(99),
        ..ControlPrefs::default()
    };
    let c = p.apply_to(ControlState::new(0.3, 0.3, 0.3, 2));
    assert_eq!(c.resolution, 1.0);
    assert_eq!(c.palette, 0);
    assert_eq!(c.frequency, 0.3);
}

#[test]
fn prefs_save_then_load() {
    let dir = std::env::temp_dir().join(format!("moire_prefs_test_{}", std::process::id()));
    let path = dir.join("nested").join("prefs.txt");
    let saved = ControlPrefs::from_controls(&ControlState::new(0.25, 0.5, 0.75, 4));
    saved.save(Some(&path)).unwrap();
    let loaded = ControlPrefs::load(Some(&path)).unwrap();
    assert_eq!(loaded, saved);
    assert!(!path.with_extension("tmp").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_prefs_file_is_empty() {
    let path = std::env::temp_dir().join("moire_prefs_definitely_missing.txt");
    let p = ControlPrefs::load(Some(&path)).unwrap();
    assert!(p.is_empty());
    assert!(ControlPrefs::load(None).unwrap().is_empty());
}

#[test]
fn cli_values_override_stored_prefs() {
    let cfg = parse(&["--frequency", "0.9"]);
    let stored = ControlPrefs {
        frequency: Some(0.2),
        speed: Some(0.6),
        ..ControlPrefs::default()
    };
    let merged = initial_prefs(&cfg, stored);
    assert_eq!(merged.frequency, Some(0.9));
    assert_eq!(merged.speed, Some(0.6));
}

#[test]
fn cli_values_alone_pin_controls() {
    assert!(initial_prefs(&parse(&[]), ControlPrefs::default()).is_empty());
    let merged = initial_prefs(&parse(&["--speed", "0.4"]), ControlPrefs::default());
    assert!(!merged.is_empty());
    assert_eq!(merged.speed, Some(0.4));
}

// ── Keys ────────────────────────────────────────────────────────────────────

#[test]
fn quit_keys() {
    assert_eq!(key_action(KeyCode::Char('q'), KeyModifiers::NONE), KeyAction::Quit);
    assert_eq!(key_action(KeyCode::Esc, KeyModifiers::NONE), KeyAction::Quit);
    assert_eq!(key_action(KeyCode::Char('c'), KeyModifiers::CONTROL), KeyAction::Quit);
}

#[test]
fn arrow_keys_drive_frequency_and_resolution() {
    assert!(matches!(
        key_action(KeyCode::Right, KeyModifiers::NONE),
        KeyAction::Control(ControlMsg::NudgeFrequency(d)) if d > 0.0
    ));
    assert!(matches!(
        key_action(KeyCode::Left, KeyModifiers::NONE),
        KeyAction::Control(ControlMsg::NudgeFrequency(d)) if d < 0.0
    ));
    assert!(matches!(
        key_action(KeyCode::Up, KeyModifiers::NONE),
        KeyAction::Control(ControlMsg::NudgeResolution(d)) if d > 0.0
    ));
}

#[test]
fn number_keys_pick_palettes() {
    assert_eq!(
        key_action(KeyCode::Char('1'), KeyModifiers::NONE),
        KeyAction::Control(ControlMsg::SetPalette(0))
    );
    assert_eq!(
        key_action(KeyCode::Char('7'), KeyModifiers::NONE),
        KeyAction::Control(ControlMsg::SetPalette(6))
    );
    assert_eq!(key_action(KeyCode::Char('8'), KeyModifiers::NONE), KeyAction::None);
}

#[test]
fn toggles() {
    assert_eq!(key_action(KeyCode::Char(' '), KeyModifiers::NONE), KeyAction::TogglePause);
    assert_eq!(key_action(KeyCode::Char('i'), KeyModifiers::NONE), KeyAction::ToggleHud);
    assert_eq!(key_action(KeyCode::Char('?'), KeyModifiers::NONE), KeyAction::ToggleHelp);
}
