//! Error types for the shell.
//!
//! Library code returns these typed errors; the binary wraps them with
//! `anyhow::Context` at the top level.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort startup. Every variant maps to exit status 1.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no application specified")]
    NoApplication,

    #[error("XDG_RUNTIME_DIR is not set in the environment")]
    MissingRuntimeDir,

    #[error("unable to create the display: {0}")]
    Display(String),

    #[error("unable to open the display socket: {0}")]
    Socket(String),

    #[error("unable to set up the event loop: {0}")]
    EventLoop(String),

    #[error("unable to drop root privileges: {0}")]
    Privileges(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// Errors surfaced by a display/session backend or one of its outputs.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unable to start the backend: {0}")]
    Start(String),

    #[error("unable to initialize rendering on output {0}")]
    RenderInit(String),

    #[error("backend event channel is closed")]
    Disconnected,
}

/// Errors while launching the primary client.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("unable to create the liveness pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("unable to spawn {program}: {source}")]
    Exec {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Errors while loading the optional configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
