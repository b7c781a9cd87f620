//! Output hotplug, mode selection, multi-output policy and output management.

mod common;

use common::{FakeToplevel, Harness};

use gameframe::backend::headless::HeadlessOutput;
use gameframe::backend::{Mode, ModeRequest, OutputId, OutputState};
use gameframe::config::MultiOutputMode;
use gameframe::event::{OutputConfigHead, OutputConfiguration};
use gameframe::geometry::{Rectangle, Size};
use gameframe::{Event, GameframeConfig};

fn last_mode() -> GameframeConfig {
    let mut config = GameframeConfig::default();
    config.general.output_mode = MultiOutputMode::Last;
    config
}

fn head(output: OutputId, enabled: bool) -> OutputConfigHead {
    OutputConfigHead {
        output,
        enabled,
        mode: None,
        position: None,
        scale: None,
    }
}

#[test]
fn test_extend_places_outputs_side_by_side() {
    let mut h = Harness::new();
    let (a, monitor_a) = h.plug_output(1920, 1080);
    let (b, monitor_b) = h.plug_output(1280, 720);

    assert!(monitor_a.is_enabled() && monitor_b.is_enabled());
    assert_eq!(h.server.layout.get_box(Some(a)), Rectangle::new(0, 0, 1920, 1080));
    assert_eq!(h.server.layout.get_box(Some(b)), Rectangle::new(1920, 0, 1280, 720));
    assert_eq!(h.server.layout.get_box(None), Rectangle::new(0, 0, 3200, 1080));

    let game = FakeToplevel::new(10, 800, 600);
    let id = h.map_toplevel(&game);
    assert_eq!(
        h.server.views.get(id).unwrap().geometry(),
        Rectangle::new(0, 0, 3200, 1080)
    );
}

#[test]
fn test_last_mode_keeps_only_the_newest_output() {
    let mut h = Harness::with_config(last_mode());
    let (_, monitor_a) = h.plug_output(1024, 768);
    let (b, monitor_b) = h.plug_output(1600, 900);
    let (c, monitor_c) = h.plug_output(1280, 720);

    assert!(!monitor_a.is_enabled());
    assert!(!monitor_b.is_enabled());
    assert!(monitor_c.is_enabled());
    assert_eq!(h.server.layout.get_box(None), Rectangle::new(0, 0, 1280, 720));

    let game = FakeToplevel::new(10, 800, 600);
    let id = h.map_toplevel(&game);
    assert_eq!(game.state().size, Some((1280, 720)));

    // The next most recent output takes over.
    h.unplug(c);
    assert!(monitor_b.is_enabled());
    assert!(!monitor_a.is_enabled());
    assert!(h.server.layout.contains(b));
    assert_eq!(
        h.server.views.get(id).unwrap().geometry(),
        Rectangle::new(0, 0, 1600, 900)
    );
    assert_eq!(game.state().size, Some((1600, 900)));
    assert!(!h.server.is_terminated());
}

#[test]
fn test_losing_the_only_nested_output_terminates() {
    let mut h = Harness::new();
    let (id, _) = h.plug(HeadlessOutput::new("WL-1", 1280, 720, 60_000).nested());

    h.unplug(id);
    assert!(h.server.is_terminated());

    // Nothing is handled once termination was requested.
    h.plug_output(1920, 1080);
    assert!(h.server.outputs.is_empty());
}

#[test]
fn test_losing_the_only_physical_output_keeps_running() {
    let mut h = Harness::new();
    let (id, _) = h.plug_output(1920, 1080);

    h.unplug(id);
    assert!(!h.server.is_terminated());
    assert!(h.server.outputs.is_empty());
    assert!(h.server.layout.get_box(None).is_empty());

    // Late events for the removed output are dropped.
    h.dispatch(Event::OutputFrame(id));
    h.unplug(id);
    assert!(!h.server.is_terminated());
}

#[test]
fn test_nested_outputs_use_the_configured_window() {
    let mut config = GameframeConfig::default();
    config.nested.width = 1600;
    config.nested.height = 900;
    config.nested.refresh = 60;
    config.nested.fullscreen = true;
    let mut h = Harness::with_config(config);

    let (_, monitor) = h.plug(HeadlessOutput::new("WL-1", 1920, 1080, 60_000).nested());
    let state = monitor.state();
    assert_eq!(
        state.mode,
        Some(ModeRequest::Custom {
            width: 1600,
            height: 900,
            refresh_mhz: 60_000,
        })
    );
    assert!(state.fullscreen);

    let game = FakeToplevel::new(10, 800, 600).titled("Racer");
    h.map_toplevel(&game);
    assert_eq!(monitor.state().title, "Racer");
    assert_eq!(game.state().size, Some((1600, 900)));
}

#[test]
fn test_outputs_failing_render_init_are_skipped() {
    let mut h = Harness::new();
    let (_, monitor) = h.plug(HeadlessOutput::new("BROKEN", 1920, 1080, 60_000).failing_init());

    assert!(h.server.outputs.is_empty());
    assert!(!monitor.is_enabled());
    assert!(h.server.layout.get_box(None).is_empty());
}

#[test]
fn test_rejected_preferred_mode_falls_back() {
    let mut h = Harness::new();
    let output = HeadlessOutput::new("DP-1", 1920, 1080, 60_000)
        .with_modes(vec![
            Mode {
                width: 1920,
                height: 1080,
                refresh_mhz: 144_000,
                preferred: true,
            },
            Mode {
                width: 1280,
                height: 720,
                refresh_mhz: 60_000,
                preferred: false,
            },
        ])
        .rejecting(Size::new(1920, 1080));
    let (id, monitor) = h.plug(output);

    assert_eq!(
        monitor.state().mode.map(|mode| mode.size()),
        Some(Size::new(1280, 720))
    );
    assert_eq!(h.server.layout.get_box(Some(id)), Rectangle::new(0, 0, 1280, 720));
}

#[test]
fn test_configuration_is_published_on_change() {
    let mut h = Harness::new();
    let (a, _) = h.plug_output(1920, 1080);
    let (b, _) = h.plug_output(1280, 720);

    let log = h.recorders.output_config.log();
    assert!(log.publications >= 2);
    assert_eq!(log.heads.len(), 2);
    let second = log.heads.iter().find(|head| head.output == b).unwrap();
    assert!(second.enabled);
    assert_eq!((second.x, second.y), (1920, 0));
    assert_eq!(second.size, Some(Size::new(1280, 720)));
    assert!(log.heads.iter().any(|head| head.output == a));

    let before = log.publications;
    h.dispatch(Event::OutputCommitted {
        output: a,
        configuration_changed: true,
    });
    h.dispatch(Event::OutputCommitted {
        output: a,
        configuration_changed: false,
    });
    assert_eq!(h.recorders.output_config.log().publications, before + 1);
}

#[test]
fn test_configuration_naming_unknown_outputs_fails() {
    let mut h = Harness::new();
    h.plug_output(1920, 1080);

    h.dispatch(Event::OutputConfigApply(OutputConfiguration {
        serial: 1,
        heads: vec![head(OutputId(99), true)],
    }));
    assert_eq!(h.recorders.output_config.log().results, vec![(1, false)]);
}

#[test]
fn test_configuration_fails_without_swapchains() {
    let mut h = Harness::build(GameframeConfig::default(), true, false);
    let (a, monitor) = h.plug_output(1920, 1080);

    h.dispatch(Event::OutputConfigApply(OutputConfiguration {
        serial: 2,
        heads: vec![head(a, false)],
    }));
    assert_eq!(h.recorders.output_config.log().results, vec![(2, false)]);
    assert_eq!(h.backend.lock().swapchain_checks, 1);
    assert!(monitor.is_enabled());
}

#[test]
fn test_configuration_test_and_apply() {
    let mut h = Harness::new();
    let (a, monitor_a) = h.plug_output(1920, 1080);
    let (b, monitor_b) = h.plug_output(1280, 720);

    let configuration = |serial| OutputConfiguration {
        serial,
        heads: vec![
            head(b, false),
            OutputConfigHead {
                position: Some((0, 0)),
                ..head(a, true)
            },
        ],
    };

    h.dispatch(Event::OutputConfigTest(configuration(3)));
    assert!(monitor_b.is_enabled());

    h.dispatch(Event::OutputConfigApply(configuration(4)));
    assert!(monitor_a.is_enabled());
    assert!(!monitor_b.is_enabled());
    assert!(!h.server.layout.contains(b));
    assert_eq!(h.server.layout.get_box(None), Rectangle::new(0, 0, 1920, 1080));

    assert_eq!(
        h.recorders.output_config.log().results,
        vec![(3, true), (4, true)]
    );
}

#[test]
fn test_failed_apply_restores_every_output() {
    let mut h = Harness::new();
    let (a, monitor_a) = h.plug_output(1920, 1080);
    // Accepts its initial commit, then fails every commit while tests pass.
    let (b, monitor_b) =
        h.plug(HeadlessOutput::new("DP-2", 1280, 720, 60_000).failing_commits_after(1));
    let layout_before = h.server.layout.get_box(None);
    let heads_before = h.recorders.output_config.log().heads;
    let publications_before = h.recorders.output_config.log().publications;

    // `a` is disabled first and succeeds, then `b` fails to commit.
    h.dispatch(Event::OutputConfigApply(OutputConfiguration {
        serial: 5,
        heads: vec![
            OutputConfigHead {
                position: Some((0, 0)),
                ..head(b, true)
            },
            head(a, false),
        ],
    }));

    assert_eq!(h.recorders.output_config.log().results, vec![(5, false)]);
    assert!(monitor_a.is_enabled());
    assert!(monitor_b.is_enabled());
    assert!(h.server.layout.contains(a));
    assert_eq!(h.server.layout.get_box(Some(a)), Rectangle::new(0, 0, 1920, 1080));
    assert_eq!(h.server.layout.get_box(Some(b)), Rectangle::new(1920, 0, 1280, 720));
    assert_eq!(h.server.layout.get_box(None), layout_before);
    let log = h.recorders.output_config.log();
    assert_eq!(log.publications, publications_before);
    assert_eq!(log.heads, heads_before);
}

#[test]
fn test_failed_apply_restores_modes() {
    let mut h = Harness::new();
    let modes = vec![
        Mode {
            width: 1920,
            height: 1080,
            refresh_mhz: 60_000,
            preferred: true,
        },
        Mode {
            width: 1280,
            height: 720,
            refresh_mhz: 60_000,
            preferred: false,
        },
    ];
    let (a, monitor_a) =
        h.plug(HeadlessOutput::new("DP-1", 1920, 1080, 60_000).with_modes(modes.clone()));
    let (b, _) = h.plug(HeadlessOutput::new("DP-2", 1280, 720, 60_000).failing_commits_after(1));

    h.dispatch(Event::OutputConfigApply(OutputConfiguration {
        serial: 6,
        heads: vec![
            OutputConfigHead {
                mode: Some(ModeRequest::Mode(modes[1])),
                ..head(a, true)
            },
            OutputConfigHead {
                scale: Some(2.0),
                ..head(b, true)
            },
        ],
    }));

    assert_eq!(h.recorders.output_config.log().results, vec![(6, false)]);
    let state = monitor_a.state();
    assert_eq!(state.mode, Some(ModeRequest::Mode(modes[0])));
    assert_eq!(h.server.layout.get_box(Some(a)), Rectangle::new(0, 0, 1920, 1080));
}

#[test]
fn test_custom_mode_applies_to_hardware_outputs() {
    let mut config = GameframeConfig::default();
    config.nested.width = 1600;
    config.nested.height = 900;
    let mut h = Harness::with_config(config);

    let (id, monitor) = h.plug_output(1280, 720);
    assert_eq!(
        monitor.state().mode.map(|mode| mode.size()),
        Some(Size::new(1600, 900))
    );
    assert!(matches!(monitor.state().mode, Some(ModeRequest::Custom { .. })));
    assert_eq!(h.server.layout.get_box(Some(id)), Rectangle::new(0, 0, 1600, 900));
}

#[test]
fn test_refused_custom_mode_falls_back_to_preferred() {
    let mut config = GameframeConfig::default();
    config.nested.width = 1600;
    config.nested.height = 900;
    let mut h = Harness::with_config(config);

    let (id, monitor) =
        h.plug(HeadlessOutput::new("DP-1", 1280, 720, 60_000).rejecting(Size::new(1600, 900)));
    assert!(matches!(monitor.state().mode, Some(ModeRequest::Mode(_))));
    assert_eq!(h.server.layout.get_box(Some(id)), Rectangle::new(0, 0, 1280, 720));
}

#[test]
fn test_cursor_is_centred_once() {
    let mut h = Harness::new();
    assert_eq!(h.server.seat.cursor.position(), (0.0, 0.0));

    h.plug_output(1920, 1080);
    assert_eq!(h.server.seat.cursor.position(), (960.0, 540.0));

    // Hotplugging more outputs leaves the cursor where it is.
    h.plug_output(1280, 720);
    assert_eq!(h.server.seat.cursor.position(), (960.0, 540.0));
}

#[test]
fn test_frames_carry_the_focus_dependent_rate_cap() {
    let mut config = GameframeConfig::default();
    config.game.fps_focused = 60;
    config.game.fps_unfocused = 15;
    let mut h = Harness::with_config(config);
    let (id, monitor) = h.plug_output(1920, 1080);

    h.dispatch(Event::OutputFrame(id));
    assert_eq!(monitor.last_frame().unwrap().fps_cap, 15);
    assert!(monitor.last_frame().unwrap().elements.is_empty());

    let game = FakeToplevel::new(10, 800, 600);
    h.map_toplevel(&game);
    h.dispatch(Event::OutputFrame(id));
    let frame = monitor.last_frame().unwrap();
    assert_eq!(frame.fps_cap, 60);
    assert_eq!(frame.elements.len(), 1);
    assert_eq!(frame.elements[0].geometry, Rectangle::new(0, 0, 1920, 1080));
    assert_eq!(monitor.frame_count(), 2);
}

#[test]
fn test_nested_resize_requests_relayout_views() {
    let mut h = Harness::new();
    let (id, _) = h.plug(HeadlessOutput::new("WL-1", 1280, 720, 60_000).nested());
    let game = FakeToplevel::new(10, 800, 600);
    let view = h.map_toplevel(&game);

    h.dispatch(Event::OutputRequestState {
        output: id,
        state: OutputState::default().with_mode(ModeRequest::Custom {
            width: 1024,
            height: 600,
            refresh_mhz: 0,
        }),
    });

    assert_eq!(h.server.layout.get_box(Some(id)), Rectangle::new(0, 0, 1024, 600));
    assert_eq!(
        h.server.views.get(view).unwrap().geometry(),
        Rectangle::new(0, 0, 1024, 600)
    );
    assert_eq!(game.state().size, Some((1024, 600)));
}
