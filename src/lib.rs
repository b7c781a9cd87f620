//! # Gameframe
//!
//! A single-application Wayland shell. Gameframe launches one primary
//! client, keeps its windows maximized across the active outputs, routes
//! all input to it and exits with the client's own exit status.
//!
//! ## Architecture
//!
//! - `server`: the context object every event handler runs against
//! - `view`: managed windows (native and legacy) and the focus policy
//! - `output`: hotplug, mode selection, multi-output policy and layout
//! - `seat`: keyboards, pointers, touch, cursor, keybindings, drag icons
//! - `idle`: idle inhibition bookkeeping
//! - `process`: the primary client and its liveness pipe
//! - `backend`, `protocol`: the collaborator boundaries (hardware and clients)
//! - `startup`: bring-up order and the main loop
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gameframe::{run, GameframeConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let status = run(GameframeConfig::default(), vec!["weston-terminal".into()])?;
//!     std::process::exit(status);
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod idle;
pub mod logging;
pub mod output;
pub mod process;
pub mod protocol;
pub mod scene;
pub mod seat;
pub mod security;
pub mod server;
pub mod startup;
pub mod view;

pub use config::GameframeConfig;
pub use error::{BackendError, ConfigError, SetupError, SpawnError};
pub use event::Event;
pub use server::GameframeServer;
pub use startup::{run, run_session, Session};

pub use anyhow::{Context, Error, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
