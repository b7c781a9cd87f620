//! Property-based tests for configuration module
//!
//! These tests use proptest to generate random configurations and check
//! that validation and the TOML file format agree with each other.

use super::*;
use proptest::prelude::*;

fn output_mode() -> impl Strategy<Value = MultiOutputMode> {
    prop_oneof![Just(MultiOutputMode::Extend), Just(MultiOutputMode::Last)]
}

prop_compose! {
    fn valid_nested_config()(
        size in prop_oneof![Just((0, 0)), (1i32..7680, 1i32..4320)],
        refresh in 0i32..360,
        borderless in any::<bool>(),
        fullscreen in any::<bool>(),
    ) -> NestedConfig {
        NestedConfig {
            width: size.0,
            height: size.1,
            refresh,
            borderless,
            fullscreen,
        }
    }
}

prop_compose! {
    fn valid_game_config()(
        width in 0i32..7680,
        height in 0i32..4320,
        fps_focused in 0u32..500,
        fps_unfocused in 0u32..500,
    ) -> GameConfig {
        GameConfig {
            width,
            height,
            fps_focused,
            fps_unfocused,
            ..GameConfig::default()
        }
    }
}

prop_compose! {
    fn valid_config()(
        output_mode in output_mode(),
        allow_vt_switch in any::<bool>(),
        server_side_decorations in any::<bool>(),
        nested in valid_nested_config(),
        game in valid_game_config(),
    ) -> GameframeConfig {
        GameframeConfig {
            general: GeneralConfig {
                debug: false,
                server_side_decorations,
                output_mode,
                allow_vt_switch,
            },
            nested,
            game,
            headless: HeadlessConfig::default(),
        }
    }
}

proptest! {
    #[test]
    fn prop_generated_configs_validate(config in valid_config()) {
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn prop_config_file_preserves_settings(config in valid_config()) {
        let text = toml::to_string(&config).unwrap();
        let parsed: GameframeConfig = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed, config);
    }

    #[test]
    fn prop_fps_cap_follows_focus(config in valid_config()) {
        prop_assert_eq!(config.fps_cap(true), config.game.fps_focused);
        prop_assert_eq!(config.fps_cap(false), config.game.fps_unfocused);
    }

    #[test]
    fn prop_negative_nested_size_never_validates(
        width in i32::MIN..0,
        height in 1i32..4320,
    ) {
        let mut config = GameframeConfig::default();
        config.nested.width = width;
        config.nested.height = height;
        prop_assert!(config.validate().is_err());
    }
}
