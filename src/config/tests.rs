//! Unit tests for configuration module
//!
//! Tests file loading, validation and the defaults the shell starts from.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = GameframeConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.general.output_mode, MultiOutputMode::Extend);
    assert!(!config.general.allow_vt_switch);
    assert!(!config.general.server_side_decorations);

    // Nothing is forced unless asked for
    assert_eq!(config.nested.size(), None);
    assert_eq!(config.game.size(), None);
    assert_eq!(config.fps_cap(true), 0);
    assert_eq!(config.headless.outputs, 1);
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("gameframe.toml");
    fs::write(
        &path,
        r#"
[general]
output_mode = "last"
allow_vt_switch = true

[nested]
width = 1920
height = 1080
refresh = 144
fullscreen = true

[game]
width = 1280
height = 720
fps_focused = 60
fps_unfocused = 10
upscale_method = "fsr"
scaling_method = "integer"
"#,
    )?;

    let config = GameframeConfig::load(&path)?;

    assert_eq!(config.general.output_mode, MultiOutputMode::Last);
    assert!(config.general.allow_vt_switch);
    assert_eq!(config.nested.size(), Some(Size::new(1920, 1080)));
    assert_eq!(config.nested.refresh_mhz(), 144_000);
    assert!(config.nested.fullscreen);
    assert_eq!(config.game.size(), Some(Size::new(1280, 720)));
    assert_eq!(config.fps_cap(true), 60);
    assert_eq!(config.fps_cap(false), 10);
    assert_eq!(config.game.upscale_method, Some(UpscaleMethod::Fsr));
    assert_eq!(config.game.scaling_method, Some(ScalingMethod::Integer));

    // Sections that were left out keep their defaults
    assert_eq!(config.headless, HeadlessConfig::default());

    Ok(())
}

#[test]
fn test_partial_section_uses_defaults() -> Result<()> {
    let config: GameframeConfig = toml::from_str("[general]\ndebug = true\n")?;

    assert!(config.general.debug);
    assert_eq!(config.general.output_mode, MultiOutputMode::Extend);
    assert_eq!(config.nested, NestedConfig::default());

    Ok(())
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = GameframeConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_malformed_file_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[general\noutput_mode = ")?;

    let err = GameframeConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));

    Ok(())
}

#[test]
fn test_unknown_output_mode_is_rejected() {
    let result: Result<GameframeConfig, _> = toml::from_str("[general]\noutput_mode = \"mirror\"\n");
    assert!(result.is_err());
}

#[test]
fn test_half_specified_nested_size_is_invalid() {
    let mut config = GameframeConfig::default();
    config.nested.width = 1920;

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_negative_game_size_is_invalid() {
    let mut config = GameframeConfig::default();
    config.game.height = -1;

    assert!(config.validate().is_err());
}

#[test]
fn test_game_size_requires_both_dimensions() {
    let mut config = GameframeConfig::default();
    config.game.width = 800;

    assert_eq!(config.game.size(), None);

    config.game.height = 600;
    assert_eq!(config.game.size(), Some(Size::new(800, 600)));
}
