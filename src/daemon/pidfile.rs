//! Pid file helpers for the daemon binary's start/stop commands.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// `<socket>.pid`, next to the socket.
pub fn pid_file_for(socket_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.pid", socket_path.display()))
}

pub fn read_pid(pid_file: &Path) -> Result<i32> {
    let pid_str = std::fs::read_to_string(pid_file)
        .with_context(|| format!("No pid file at {:?}; is the daemon running?", pid_file))?;
    pid_str
        .trim()
        .parse()
        .with_context(|| format!("Corrupt pid file at {:?}", pid_file))
}

/// Whether `pid` names a live process (signal 0).
pub fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs permission and existence checks only
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Poll until `pid` exits. Returns false if it is still alive after `timeout`.
pub fn wait_for_exit(pid: i32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while process_alive(pid) {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_file_for_socket() {
        assert_eq!(
            pid_file_for(Path::new("/tmp/blitz/daemon.sock")),
            PathBuf::from("/tmp/blitz/daemon.sock.pid")
        );
    }

    #[test]
    fn test_read_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock.pid");
        std::fs::write(&path, "4242\n").unwrap();
        assert_eq!(read_pid(&path).unwrap(), 4242);

        std::fs::write(&path, "nope").unwrap();
        assert!(read_pid(&path).is_err());
        assert!(read_pid(&dir.path().join("missing.pid")).is_err());
    }

    #[test]
    fn test_own_process_is_alive() {
        let pid = std::process::id() as i32;
        assert!(process_alive(pid));
        assert!(!wait_for_exit(pid, Duration::from_millis(200)));
    }

    #[test]
    fn test_reaped_child_is_gone() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id() as i32;
        child.wait().unwrap();

        assert!(!process_alive(pid));
        assert!(wait_for_exit(pid, Duration::from_secs(1)));
    }
}
