//! Supervision of the primary client
//!
//! The primary client is spawned with the write end of a pipe inherited
//! across exec. Nobody ever writes to it: when the client exits the last
//! write end closes, the read end hangs up, and the event loop learns the
//! client is gone without having to handle SIGCHLD.

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus};

use calloop::generic::Generic;
use calloop::{Interest, LoopHandle, Mode, PostAction, RegistrationToken};
use log::{debug, error, info};

use crate::error::{SetupError, SpawnError};
use crate::server::GameframeServer;

/// What the liveness pipe reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The client exited (every write end is closed)
    Hangup,
    /// The pipe reported an error
    Error,
}

/// The running primary client.
#[derive(Debug)]
pub struct ClientProcess {
    child: Child,
}

impl ClientProcess {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Wait for the client and translate its status into our exit status.
    pub fn reap(mut self) -> i32 {
        match self.child.wait() {
            Ok(status) => {
                let code = exit_code(status);
                info!("Primary client {} exited with status {}", self.child.id(), code);
                code
            }
            Err(e) => {
                error!("Failed to wait for the primary client: {}", e);
                0
            }
        }
    }
}

/// Normal exit keeps the client's code; death by signal N becomes 128 + N.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        code
    } else if let Some(signal) = status.signal() {
        128 + signal
    } else {
        0
    }
}

fn pipe_cloexec() -> Result<(OwnedFd, OwnedFd), SpawnError> {
    let mut fds = [0; 2];
    // SAFETY: `fds` is a valid two-element array for pipe2 to fill.
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } == -1 {
        return Err(SpawnError::Pipe(io::Error::last_os_error()));
    }
    // SAFETY: pipe2 succeeded, so both descriptors are open and owned by us.
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

/// Launch the primary client. Returns the process and the read end of its
/// liveness pipe.
pub fn spawn_primary_client(argv: &[String]) -> Result<(ClientProcess, File), SpawnError> {
    let (program, args) = argv.split_first().ok_or(SpawnError::EmptyCommand)?;
    let (read_end, write_end) = pipe_cloexec()?;
    let write_fd = write_end.as_raw_fd();

    let mut command = Command::new(program);
    command.args(args);
    // SAFETY: the hook only calls async-signal-safe functions.
    unsafe {
        command.pre_exec(move || {
            // Signals blocked for the event loop must not leak into the client.
            let mut set: libc::sigset_t = std::mem::zeroed();
            libc::sigemptyset(&mut set);
            libc::sigprocmask(libc::SIG_SETMASK, &set, std::ptr::null_mut());

            // The write end has to survive exec; the read end does not.
            let flags = libc::fcntl(write_fd, libc::F_GETFD);
            if flags == -1
                || libc::fcntl(write_fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) == -1
            {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = command.spawn().map_err(|source| SpawnError::Exec {
        program: program.clone(),
        source,
    })?;
    drop(write_end);

    info!("Spawned primary client {} (pid {})", program, child.id());
    Ok((ClientProcess { child }, File::from(read_end)))
}

/// Watch the liveness pipe from the event loop. The source removes itself
/// (closing the pipe) after the first report.
pub fn insert_liveness_source(
    handle: &LoopHandle<'static, GameframeServer>,
    pipe: File,
) -> Result<RegistrationToken, SetupError> {
    let source = Generic::new(pipe, Interest::READ, Mode::Level);
    handle
        .insert_source(source, |readiness, _pipe, server| {
            let liveness = if readiness.error {
                Liveness::Error
            } else {
                Liveness::Hangup
            };
            debug!("Liveness pipe reported {:?}", liveness);
            server.handle_client_liveness(liveness);
            Ok(PostAction::Remove)
        })
        .map_err(|e| SetupError::EventLoop(e.error.to_string()))
}
