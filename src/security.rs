//! Privilege handling
//!
//! When started setuid root (needed by some session backends to open
//! devices) the shell gives up root as soon as the backend is running and
//! before any client is spawned.

use std::io;

use log::{info, warn};

use crate::error::SetupError;

/// Real and effective user and group ids of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub uid: libc::uid_t,
    pub euid: libc::uid_t,
    pub gid: libc::gid_t,
    pub egid: libc::gid_t,
}

impl Credentials {
    pub fn current() -> Self {
        // SAFETY: these calls cannot fail and have no preconditions.
        unsafe {
            Self {
                uid: libc::getuid(),
                euid: libc::geteuid(),
                gid: libc::getgid(),
                egid: libc::getegid(),
            }
        }
    }

    pub fn is_root(&self) -> bool {
        self.uid == 0 && self.euid == 0
    }

    /// Elevated through setuid/setgid rather than started by root.
    pub fn is_elevated(&self) -> bool {
        self.uid != self.euid || self.gid != self.egid
    }
}

/// Drop setuid/setgid privileges and make sure they cannot be regained.
pub fn drop_permissions() -> Result<(), SetupError> {
    let credentials = Credentials::current();

    if credentials.is_root() {
        warn!("Running as the root user, this is dangerous");
        return Ok(());
    }
    if !credentials.is_elevated() {
        return Ok(());
    }

    info!("Dropping elevated privileges");
    // SAFETY: plain syscalls on our own credentials.
    unsafe {
        if libc::setgid(credentials.gid) != 0 {
            return Err(SetupError::Privileges(format!(
                "setgid failed: {}",
                io::Error::last_os_error()
            )));
        }
        if libc::setuid(credentials.uid) != 0 {
            return Err(SetupError::Privileges(format!(
                "setuid failed: {}",
                io::Error::last_os_error()
            )));
        }
    }

    // SAFETY: as above; success here means root came back.
    let regained = unsafe { libc::setgid(0) == 0 || libc::setuid(0) == 0 };
    if regained {
        return Err(SetupError::Privileges(
            "root privileges can be regained after dropping them".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprivileged_processes_need_no_drop() {
        let credentials = Credentials {
            uid: 1000,
            euid: 1000,
            gid: 1000,
            egid: 1000,
        };
        assert!(!credentials.is_root());
        assert!(!credentials.is_elevated());
    }

    #[test]
    fn setuid_binaries_are_elevated() {
        let credentials = Credentials {
            uid: 1000,
            euid: 0,
            gid: 1000,
            egid: 1000,
        };
        assert!(credentials.is_elevated());
        assert!(!credentials.is_root());
    }

    #[test]
    fn dropping_without_elevation_is_a_no_op() {
        let credentials = Credentials::current();
        if !credentials.is_elevated() {
            assert!(drop_permissions().is_ok());
            assert_eq!(Credentials::current(), credentials);
        }
    }
}
