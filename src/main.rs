use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = moire_tui::config::Config::parse();
    moire_tui::app::run(cfg)
}
