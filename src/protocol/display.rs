//! The Wayland display socket clients connect to.

use std::sync::Arc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use log::{debug, error, info};
use wayland_server::backend::{ClientData, ClientId, DisconnectReason};
use wayland_server::{Display, ListeningSocket};

use crate::error::SetupError;
use crate::server::GameframeServer;

/// How often pending client requests are dispatched.
const DISPATCH_INTERVAL: Duration = Duration::from_millis(4);

/// Display plus its listening socket.
pub struct DisplaySocket {
    display: Display<GameframeServer>,
    listener: ListeningSocket,
    socket_name: String,
}

impl DisplaySocket {
    /// Create the display and bind the first free `wayland-N` socket in
    /// `XDG_RUNTIME_DIR`.
    pub fn bind() -> Result<Self, SetupError> {
        let display = Display::<GameframeServer>::new()
            .map_err(|e| SetupError::Display(e.to_string()))?;
        let listener = ListeningSocket::bind_auto("wayland", 1..32)
            .map_err(|e| SetupError::Socket(e.to_string()))?;
        let socket_name = listener
            .socket_name()
            .ok_or_else(|| SetupError::Socket("socket has no name".into()))?
            .to_string_lossy()
            .into_owned();

        info!("Listening on Wayland socket {}", socket_name);
        Ok(Self {
            display,
            listener,
            socket_name,
        })
    }

    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    /// Accept pending connections, dispatch requests and flush replies.
    pub fn dispatch(&mut self, server: &mut GameframeServer) {
        loop {
            match self.listener.accept() {
                Ok(Some(stream)) => {
                    if let Err(e) = self
                        .display
                        .handle()
                        .insert_client(stream, Arc::new(ClientState))
                    {
                        error!("Failed to add client: {}", e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to accept client connection: {}", e);
                    break;
                }
            }
        }

        if let Err(e) = self.display.dispatch_clients(server) {
            error!("Failed to dispatch client requests: {}", e);
        }
        if let Err(e) = self.display.flush_clients() {
            debug!("Failed to flush clients: {}", e);
        }
    }

    /// Drive the display from the event loop.
    pub fn insert_into(
        mut self,
        handle: &LoopHandle<'static, GameframeServer>,
    ) -> Result<RegistrationToken, SetupError> {
        handle
            .insert_source(
                Timer::from_duration(DISPATCH_INTERVAL),
                move |_deadline, _, server| {
                    self.dispatch(server);
                    TimeoutAction::ToDuration(DISPATCH_INTERVAL)
                },
            )
            .map_err(|e| SetupError::EventLoop(e.error.to_string()))
    }
}

struct ClientState;

impl ClientData for ClientState {
    fn initialized(&self, client_id: ClientId) {
        debug!("Client {:?} connected", client_id);
    }

    fn disconnected(&self, client_id: ClientId, reason: DisconnectReason) {
        debug!("Client {:?} disconnected: {:?}", client_id, reason);
    }
}
