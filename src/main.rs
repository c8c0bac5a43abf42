//! Rigidtris: falling-block puzzle in the terminal where every piece is a rigid body.

mod app;
mod bag;
mod blocks;
mod entity;
mod highscores;
mod input;
mod physics;
mod piece;
mod player;
mod rapier_world;
mod scenery;
mod shapes;
mod sim;
mod sketch;
mod stamp;
mod supervisor;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use env_logger::{Env, Target};
use std::path::PathBuf;

/// Options derived from CLI that affect how rounds are run and shown.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub frame_rate: f32,
    pub seed: Option<u64>,
    pub show_title: bool,
    pub effects: bool,
    pub records: Option<PathBuf>,
}

impl From<&Args> for GameConfig {
    fn from(args: &Args) -> Self {
        Self {
            frame_rate: args.frame_rate.clamp(1.0, 240.0),
            seed: args.seed,
            show_title: !args.no_title,
            effects: !args.no_effects,
            records: args.records.clone(),
        }
    }
}

fn init_logging(log_file: Option<&std::path::Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            env_logger::Builder::from_env(Env::default().default_filter_or("info"))
                .target(Target::Pipe(Box::new(file)))
                .init();
        }
        // stderr is the alternate screen; only log there when asked to
        None => env_logger::Builder::from_env(Env::default().default_filter_or("off")).init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        log::warn!("theme not loaded: {err}");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = GameConfig::from(&args);
    log::info!("rigidtris {} at {} fps", env!("CARGO_PKG_VERSION"), config.frame_rate);
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Physics-based falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "rigidtris",
    version,
    about = "Falling-block puzzle where pieces are rigid bodies. Fill a row band to cut it out of whatever lies there.",
    long_about = "Rigidtris is a terminal falling-block puzzle with real physics.\n\n\
        Push and spin the falling piece; it tumbles, slides and stacks like a solid object. \
        When the blocks inside a row band cover it, that row is cut out of every piece it crosses \
        and the pieces fall apart into their remaining parts. Blocks that fall off the ground \
        are lost and the well grows shallower.\n\n\
        CONTROLS:\n  Left/Right or A/D  Push     Down or S  Push down\n  Z or ,             Spin CCW X or .     Spin CW\n  P                  Pause    Enter      Start / replay\n  Q / Esc            Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Simulation frames per second; also the physics step rate.
    #[arg(long, default_value = "30", value_name = "RATE")]
    pub frame_rate: f32,

    /// Path to theme file (btop-style theme[key]=\"value\").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for the piece sequence; each replay uses the next seed.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Skip the title screen and start a round immediately.
    #[arg(long)]
    pub no_title: bool,

    /// Disable flash/fade effects and the terminal bell.
    #[arg(long)]
    pub no_effects: bool,

    /// Write logs to this file (RUST_LOG sets the level, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Where the best line count is kept. Defaults to the config directory.
    #[arg(long, value_name = "FILE")]
    pub records: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_fold_into_config() {
        let args = Args::parse_from(["rigidtris", "--seed", "9", "--no-title", "--palette", "contrast"]);
        assert_eq!(args.palette, Palette::HighContrast);
        let config = GameConfig::from(&args);
        assert_eq!(config.seed, Some(9));
        assert!(!config.show_title);
        assert!(config.effects);
        assert!((config.frame_rate - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_frame_rate_is_clamped() {
        let args = Args::parse_from(["rigidtris", "--frame-rate", "0"]);
        assert!((GameConfig::from(&args).frame_rate - 1.0).abs() < f32::EPSILON);
    }
}
