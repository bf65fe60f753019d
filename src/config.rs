use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "moire", version, about = "Animated radial moire pattern for the terminal")]
pub struct Config {
    #[arg(long, value_enum, default_value_t = EngineMode::Auto)]
    pub engine: EngineMode,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Grid pixel count above which the cpu engine renders downsampled.
    #[arg(long, default_value_t = 1_000_000)]
    pub pixel_budget: usize,

    #[arg(long)]
    pub palette: Option<usize>,

    #[arg(long)]
    pub resolution: Option<f32>,

    #[arg(long)]
    pub frequency: Option<f32>,

    #[arg(long)]
    pub speed: Option<f32>,

    #[arg(long)]
    pub prefs: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub save_prefs: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_probe: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    Kitty,
}

impl RendererMode {
    /// Surface pixels per terminal cell for the text presenters.
    pub fn cell_pixels(self) -> (usize, usize) {
        match self {
            Self::Ascii => (1, 1),
            Self::HalfBlock => (1, 2),
            // Replaced by the terminal's real cell size when it reports one.
            Self::Kitty => (8, 16),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineMode {
    Auto,
    Cpu,
    #[value(alias = "metal")]
    Gpu,
}
