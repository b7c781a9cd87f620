//! End-to-end runs on the headless backend with real primary clients.

use serial_test::serial;
use tempfile::TempDir;

use gameframe::{run, GameframeConfig, SetupError};

fn command(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Point XDG_RUNTIME_DIR at a fresh directory for the display socket.
fn runtime_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("XDG_RUNTIME_DIR", dir.path());
    dir
}

#[test]
#[serial]
fn test_empty_command_is_refused() {
    let _dir = runtime_dir();
    let err = run(GameframeConfig::default(), Vec::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SetupError>(),
        Some(SetupError::NoApplication)
    ));
}

#[test]
#[serial]
fn test_missing_runtime_dir_is_refused() {
    let saved = std::env::var_os("XDG_RUNTIME_DIR");
    std::env::remove_var("XDG_RUNTIME_DIR");

    let err = run(GameframeConfig::default(), command("exit 0")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SetupError>(),
        Some(SetupError::MissingRuntimeDir)
    ));

    if let Some(saved) = saved {
        std::env::set_var("XDG_RUNTIME_DIR", saved);
    }
}

#[test]
#[serial]
fn test_exit_status_of_the_client_is_returned() {
    let _dir = runtime_dir();
    let status = run(GameframeConfig::default(), command("exit 7")).unwrap();
    assert_eq!(status, 7);
}

#[test]
#[serial]
fn test_client_killed_by_a_signal() {
    let _dir = runtime_dir();
    let status = run(GameframeConfig::default(), command("kill -9 $$")).unwrap();
    assert_eq!(status, 128 + 9);
}

#[test]
#[serial]
fn test_client_sees_the_display_socket() {
    let dir = runtime_dir();
    let status = run(
        GameframeConfig::default(),
        command("test -S \"$XDG_RUNTIME_DIR/$WAYLAND_DISPLAY\""),
    )
    .unwrap();
    assert_eq!(status, 0);
    assert!(std::env::var("WAYLAND_DISPLAY").unwrap().starts_with("wayland-"));
    drop(dir);
}

#[test]
#[serial]
fn test_unlaunchable_client_is_an_error() {
    let _dir = runtime_dir();
    let err = run(
        GameframeConfig::default(),
        vec!["/nonexistent/gameframe-test-binary".to_string()],
    )
    .unwrap_err();
    assert!(err.downcast_ref::<SetupError>().is_some());
}
