//! Writer lock on the data directory.
//!
//! Only one process may replace `search_index.bin` at a time. The daemon takes
//! the lock for its whole lifetime, `projfind index` for one rebuild. Commands
//! that only read (`search`, `list`, `status`) take it just long enough to
//! save an index they had to build, and build in memory only when another
//! process holds it. Snapshots are replaced by rename, so readers never need
//! the lock to see a whole file.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Lock file name placed in the data directory
const LOCK_FILE_NAME: &str = "projfind.lock";

/// An exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct FileLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Take the writer lock of the data directory at `base_path` without
    /// waiting. Fails with `ErrorKind::WouldBlock` when another writer has it.
    pub fn try_acquire(base_path: &Path) -> io::Result<Self> {
        let path = base_path.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if let Err(err) = Self::try_lock_exclusive(&file) {
            if err.kind() == io::ErrorKind::WouldBlock {
                return Err(io::Error::new(
                    io::ErrorKind::WouldBlock,
                    format!(
                        "{} is held by another projfind writer (daemon or `projfind index`)",
                        path.display()
                    ),
                ));
            }
            return Err(err);
        }

        log::debug!("holding writer lock {}", path.display());
        Ok(FileLock { file, path })
    }

    /// The lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn try_lock_exclusive(file: &File) -> io::Result<()> {
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EWOULDBLOCK || code == libc::EAGAIN => {
                Err(io::ErrorKind::WouldBlock.into())
            }
            _ => Err(err),
        }
    }

    #[cfg(not(unix))]
    fn try_lock_exclusive(_file: &File) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for FileLock {
    fn drop(&mut self) {
        unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        log::debug!("released writer lock {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_second_writer_is_refused() {
        let dir = tempfile::tempdir().unwrap();

        let first = FileLock::try_acquire(dir.path()).unwrap();
        assert_eq!(first.path(), dir.path().join(LOCK_FILE_NAME));

        let err = FileLock::try_acquire(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(err.to_string().contains("projfind.lock"));

        drop(first);

        assert!(FileLock::try_acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileLock::try_acquire(&dir.path().join("nope"));
        assert!(result.is_err());
    }
}
