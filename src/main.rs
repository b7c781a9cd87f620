//! # Gameframe
//!
//! Runs one application fullscreen on a dedicated Wayland session and exits
//! with its exit status.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use log::{error, info};

use gameframe::config::{MultiOutputMode, ScalingMethod, UpscaleMethod};
use gameframe::{logging, GameframeConfig};

#[derive(Parser, Debug)]
#[command(name = "gameframe")]
#[command(about = "Run a single application fullscreen on its own Wayland session")]
#[command(version, disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Print help and exit
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Print version and exit
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prefer server-side decorations
    #[arg(short = 'd')]
    server_side_decorations: bool,

    /// Enable debug logging
    #[arg(short = 'D', long)]
    debug: bool,

    /// Multi-output mode
    #[arg(short = 'm', value_enum)]
    output_mode: Option<MultiOutputMode>,

    /// Allow VT switching
    #[arg(short = 's')]
    allow_vt_switch: bool,

    /// Nested window width
    #[arg(short = 'W')]
    nested_width: Option<i32>,

    /// Nested window height
    #[arg(short = 'H')]
    nested_height: Option<i32>,

    /// Game width
    #[arg(short = 'w')]
    game_width: Option<i32>,

    /// Game height
    #[arg(short = 'h')]
    game_height: Option<i32>,

    /// Frame rate cap while the game is focused (0 = unlimited)
    #[arg(short = 'r')]
    fps_focused: Option<u32>,

    /// Frame rate cap while the game is not focused (0 = unlimited)
    #[arg(short = 'o')]
    fps_unfocused: Option<u32>,

    /// Upscaling method
    #[arg(short = 'F', value_enum)]
    upscale_method: Option<UpscaleMethod>,

    /// Scaling method
    #[arg(short = 'S', value_enum)]
    scaling_method: Option<ScalingMethod>,

    /// Borderless nested window
    #[arg(short = 'b')]
    borderless: bool,

    /// Fullscreen nested window
    #[arg(short = 'f')]
    fullscreen: bool,

    /// Reshade effect file
    #[arg(long)]
    reshade_effect: Option<PathBuf>,

    /// Reshade technique index
    #[arg(long)]
    reshade_technique_idx: Option<u32>,

    /// Application to run and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "APPLICATION")]
    application: Vec<String>,
}

impl Cli {
    /// The configuration file (or defaults) with command line overrides.
    fn config(&self) -> Result<GameframeConfig> {
        let mut config = match &self.config {
            Some(path) => GameframeConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => GameframeConfig::default(),
        };
        self.apply(&mut config);
        config.validate().context("Invalid command line")?;
        Ok(config)
    }

    fn apply(&self, config: &mut GameframeConfig) {
        config.general.debug |= self.debug;
        config.general.server_side_decorations |= self.server_side_decorations;
        config.general.allow_vt_switch |= self.allow_vt_switch;
        if let Some(mode) = self.output_mode {
            config.general.output_mode = mode;
        }

        if let Some(width) = self.nested_width {
            config.nested.width = width;
        }
        if let Some(height) = self.nested_height {
            config.nested.height = height;
        }
        config.nested.borderless |= self.borderless;
        config.nested.fullscreen |= self.fullscreen;

        if let Some(width) = self.game_width {
            config.game.width = width;
        }
        if let Some(height) = self.game_height {
            config.game.height = height;
        }
        if let Some(fps) = self.fps_focused {
            config.game.fps_focused = fps;
        }
        if let Some(fps) = self.fps_unfocused {
            config.game.fps_unfocused = fps;
        }
        if self.upscale_method.is_some() {
            config.game.upscale_method = self.upscale_method;
        }
        if self.scaling_method.is_some() {
            config.game.scaling_method = self.scaling_method;
        }
        if self.reshade_effect.is_some() {
            config.game.reshade_effect = self.reshade_effect.clone();
        }
        if self.reshade_technique_idx.is_some() {
            config.game.reshade_technique_idx = self.reshade_technique_idx;
        }
    }
}

fn log_unsupported(config: &GameframeConfig) {
    if let Some(method) = config.game.upscale_method {
        info!("Upscaling method {:?} parsed, using basic scaling", method);
    }
    if let Some(method) = config.game.scaling_method {
        info!("Scaling method {:?} parsed", method);
    }
    if config.game.reshade_effect.is_some() || config.game.reshade_technique_idx.is_some() {
        info!("Reshade options parsed but not implemented");
    }
}

/// Statuses outside 0..=255 cannot be passed on; report them as failure.
fn exit_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let config = cli.config();
    let debug = cli.debug || config.as_ref().map_or(false, |c| c.general.debug);
    logging::init(debug);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(1);
        }
    };

    info!(
        "Starting Gameframe {} ({}, built {})",
        gameframe::VERSION,
        gameframe::GIT_COMMIT,
        gameframe::BUILD_DATE
    );
    log_unsupported(&config);

    match gameframe::run(config, cli.application) {
        Ok(status) => ExitCode::from(exit_byte(status)),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}
