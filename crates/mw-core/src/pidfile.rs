//! Daemon PID file
//!
//! Only one daemon may own the registry and the managed processes at a time.
//! `serve` refuses to start when the PID file names a live process, and
//! removes a stale file left behind by a crash.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config;

const PID_FILE_NAME: &str = "daemon.pid";

/// Default PID file location, next to the config file
pub fn default_pid_path() -> PathBuf {
    config::default_config_dir().join(PID_FILE_NAME)
}

/// Read the PID recorded in `path`
///
/// `Ok(None)` when the file is absent; `InvalidData` when it holds garbage.
pub fn read_pid_file(path: &Path) -> io::Result<Option<u32>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    contents
        .trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// PID of a live daemon recorded in `path`, if any
///
/// A file naming a dead process is treated as absent.
pub fn running_daemon(path: &Path) -> io::Result<Option<u32>> {
    Ok(read_pid_file(path)?.filter(|pid| is_process_alive(*pid)))
}

/// Check whether a process id refers to a live process
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    // Signal 0 performs the permission and existence checks only.
    // EPERM still means the process exists.
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    result == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Check whether a process id refers to a live process
#[cfg(windows)]
pub fn is_process_alive(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle == 0 {
            return false;
        }
        CloseHandle(handle);
        true
    }
}

/// Holds the PID file for the lifetime of the daemon
pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    /// Record `pid` in `path`, creating parent directories
    pub fn acquire(path: PathBuf, pid: u32) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, format!("{}\n", pid))?;
        Ok(Self { path })
    }

    /// Path of the guarded file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), "Failed to remove PID file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_absent_file_reads_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_pid_file(&dir.path().join("daemon.pid")).unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_invalid_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");
        fs::write(&path, "not a pid").unwrap();
        let err = read_pid_file(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_guard_writes_and_removes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("daemon.pid");

        {
            let guard = PidFileGuard::acquire(path.clone(), std::process::id()).unwrap();
            assert_eq!(guard.path(), path.as_path());
            assert_eq!(read_pid_file(&path).unwrap(), Some(std::process::id()));
            assert_eq!(running_daemon(&path).unwrap(), Some(std::process::id()));
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_stale_pid_is_not_running() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daemon.pid");
        fs::write(&path, "999999999\n").unwrap();
        assert!(running_daemon(&path).unwrap().is_none());
    }
}
