//! Configuration management for Gameframe
//!
//! Every setting has a command-line flag. An optional TOML file can supply
//! the same settings; flags given on the command line win over the file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::Size;

/// Main configuration struct containing all Gameframe settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GameframeConfig {
    /// Seat and output policy
    #[serde(default)]
    pub general: GeneralConfig,

    /// Nested window settings, used when running inside another compositor
    #[serde(default)]
    pub nested: NestedConfig,

    /// Settings for the game itself
    #[serde(default)]
    pub game: GameConfig,

    /// Outputs created by the headless backend
    #[serde(default)]
    pub headless: HeadlessConfig,
}

/// What to do with the older outputs when another one is plugged in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MultiOutputMode {
    /// Span the layout across every output
    #[default]
    Extend,
    /// Only the most recently connected output is active
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UpscaleMethod {
    Fsr,
    Nis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMethod {
    Integer,
    Stretch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,

    /// Ask clients to leave window decorations to the server
    pub server_side_decorations: bool,

    pub output_mode: MultiOutputMode,

    /// Allow Alt+F1..F12 to switch virtual terminals
    pub allow_vt_switch: bool,
}

/// Size and presentation of the nested window. Zero means "use the
/// backend's preferred mode".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NestedConfig {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in Hz
    pub refresh: i32,
    pub borderless: bool,
    pub fullscreen: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Resolution requested from the game; zero follows the layout
    pub width: i32,
    pub height: i32,

    /// Frame rate cap while the game has focus (0 = unlimited)
    pub fps_focused: u32,

    /// Frame rate cap while something else has focus (0 = unlimited)
    pub fps_unfocused: u32,

    pub upscale_method: Option<UpscaleMethod>,
    pub scaling_method: Option<ScalingMethod>,
    pub reshade_effect: Option<PathBuf>,
    pub reshade_technique_idx: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Number of virtual outputs
    pub outputs: u32,
    pub width: i32,
    pub height: i32,
    /// Refresh rate in mHz
    pub refresh_mhz: i32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            server_side_decorations: false,
            output_mode: MultiOutputMode::Extend,
            allow_vt_switch: false,
        }
    }
}

impl Default for NestedConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            refresh: 0,
            borderless: false,
            fullscreen: false,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            fps_focused: 0,
            fps_unfocused: 0,
            upscale_method: None,
            scaling_method: None,
            reshade_effect: None,
            reshade_technique_idx: None,
        }
    }
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            outputs: 1,
            width: 1280,
            height: 720,
            refresh_mhz: 60_000,
        }
    }
}

impl NestedConfig {
    /// Custom mode tried on every new output, when both dimensions are set.
    pub fn size(&self) -> Option<Size> {
        let size = Size::new(self.width, self.height);
        (!size.is_empty()).then_some(size)
    }

    pub fn refresh_mhz(&self) -> i32 {
        self.refresh.max(0).saturating_mul(1000)
    }
}

impl GameConfig {
    /// Size the game is asked to render at, when both dimensions are set.
    pub fn size(&self) -> Option<Size> {
        let size = Size::new(self.width, self.height);
        (!size.is_empty()).then_some(size)
    }
}

impl GameframeConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: GameframeConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nested = &self.nested;
        if nested.width < 0 || nested.height < 0 || nested.refresh < 0 {
            return Err(ConfigError::Invalid(
                "nested width, height and refresh must not be negative".into(),
            ));
        }
        if (nested.width == 0) != (nested.height == 0) {
            return Err(ConfigError::Invalid(
                "nested width and height must be given together".into(),
            ));
        }

        if self.game.width < 0 || self.game.height < 0 {
            return Err(ConfigError::Invalid(
                "game width and height must not be negative".into(),
            ));
        }

        let headless = &self.headless;
        if headless.width <= 0 || headless.height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "headless output size {}x{} is not usable",
                headless.width, headless.height
            )));
        }

        Ok(())
    }

    /// Frame rate cap for the current focus state (0 = unlimited).
    pub fn fps_cap(&self, primary_focused: bool) -> u32 {
        if primary_focused {
            self.game.fps_focused
        } else {
            self.game.fps_unfocused
        }
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
mod property_tests;
