//! Startup and the main loop
//!
//! Brings the shell up in order (environment checks, event loop, signals,
//! backend, privilege drop, display socket, primary client), runs the loop
//! until termination and turns the outcome into the process exit status.

use std::time::Duration;

use anyhow::{Context, Result};
use calloop::channel::{self, Channel};
use calloop::signals::{Signal, Signals};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, LoopHandle};
use log::{debug, info};

use crate::backend::headless::HeadlessBackend;
use crate::backend::Backend;
use crate::config::GameframeConfig;
use crate::error::SetupError;
use crate::event::Event;
use crate::process::{insert_liveness_source, spawn_primary_client};
use crate::protocol::display::DisplaySocket;
use crate::protocol::Collaborators;
use crate::security::drop_permissions;
use crate::server::GameframeServer;

/// How often the scene is offered to the outputs.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Everything the core needs from outside to run.
pub struct Session {
    pub backend: Box<dyn Backend>,
    pub collaborators: Collaborators,
    /// Display name of the legacy (X11) compatibility server, if any
    pub legacy_display: Option<String>,
}

impl Session {
    /// Virtual outputs and in-process collaborators.
    pub fn headless(config: &GameframeConfig) -> Self {
        let (collaborators, _) = Collaborators::recording();
        Self {
            backend: Box::new(HeadlessBackend::new(&config.headless)),
            collaborators,
            legacy_display: None,
        }
    }
}

/// Run `command` as the primary client on a headless session.
pub fn run(config: GameframeConfig, command: Vec<String>) -> Result<i32> {
    let session = Session::headless(&config);
    run_session(config, command, session)
}

/// Run `command` as the primary client until it exits or the shell is told
/// to stop. Returns the client's translated exit status when the client
/// ended the session, 0 otherwise.
pub fn run_session(config: GameframeConfig, command: Vec<String>, session: Session) -> Result<i32> {
    if command.is_empty() {
        return Err(SetupError::NoApplication.into());
    }
    if std::env::var_os("XDG_RUNTIME_DIR").is_none() {
        return Err(SetupError::MissingRuntimeDir.into());
    }

    let mut event_loop: EventLoop<'static, GameframeServer> = EventLoop::try_new()
        .map_err(|e| SetupError::EventLoop(e.to_string()))
        .context("Failed to create the event loop")?;
    let handle = event_loop.handle();

    let mut server = GameframeServer::new(config, session.backend, session.collaborators);

    let (events, channel) = channel::channel();
    insert_event_channel(&handle, channel)?;
    insert_signal_source(&handle)?;

    server
        .start_backend(events)
        .map_err(SetupError::from)
        .context("Failed to start the backend")?;

    drop_permissions().context("Refusing to run with elevated privileges")?;

    let display = DisplaySocket::bind().context("Failed to open the display socket")?;
    std::env::set_var("WAYLAND_DISPLAY", display.socket_name());
    info!("Running on WAYLAND_DISPLAY={}", display.socket_name());
    if let Some(legacy) = &session.legacy_display {
        std::env::set_var("DISPLAY", legacy);
        info!("Legacy clients use DISPLAY={}", legacy);
    }
    display.insert_into(&handle)?;
    insert_frame_timer(&handle)?;

    let (client, pipe) = spawn_primary_client(&command)
        .map_err(SetupError::from)
        .context("Failed to launch the application")?;
    insert_liveness_source(&handle, pipe)?;
    debug!("Primary client pid {}", client.pid());

    server.set_loop_signal(event_loop.get_signal());
    event_loop
        .run(None, &mut server, |_| {})
        .map_err(|e| SetupError::EventLoop(e.to_string()))
        .context("Event loop failed")?;

    if server.return_app_code() {
        Ok(client.reap())
    } else {
        Ok(0)
    }
}

fn insert_event_channel(
    handle: &LoopHandle<'static, GameframeServer>,
    channel: Channel<Event>,
) -> Result<(), SetupError> {
    handle
        .insert_source(channel, |event, _, server| {
            if let channel::Event::Msg(event) = event {
                server.dispatch(event);
            }
        })
        .map_err(|e| SetupError::EventLoop(e.error.to_string()))?;
    Ok(())
}

fn insert_signal_source(handle: &LoopHandle<'static, GameframeServer>) -> Result<(), SetupError> {
    let signals = Signals::new(&[Signal::SIGINT, Signal::SIGTERM])
        .map_err(|e| SetupError::EventLoop(e.to_string()))?;
    handle
        .insert_source(signals, |event, _, server| {
            info!("Received {:?}", event.signal());
            server.terminate();
        })
        .map_err(|e| SetupError::EventLoop(e.error.to_string()))?;
    Ok(())
}

fn insert_frame_timer(handle: &LoopHandle<'static, GameframeServer>) -> Result<(), SetupError> {
    handle
        .insert_source(Timer::from_duration(FRAME_INTERVAL), |_, _, server| {
            let enabled: Vec<_> = server
                .outputs
                .iter()
                .filter(|output| output.is_enabled())
                .map(|output| output.id)
                .collect();
            for id in enabled {
                server.dispatch(Event::OutputFrame(id));
            }
            TimeoutAction::ToDuration(FRAME_INTERVAL)
        })
        .map_err(|e| SetupError::EventLoop(e.error.to_string()))?;
    Ok(())
}
