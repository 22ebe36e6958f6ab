use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const LOCK_FILE: &str = ".lock";

/// Exclusive writer lock on a `.scopes/` directory, held for one
/// load/mutate/save cycle. The lock file carries the holder's pid so a
/// waiting process can say who it is waiting for.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("workspace is locked{}", holder_suffix(.holder))]
    Timeout {
        path: PathBuf,
        holder: Option<u32>,
    },
}

fn holder_suffix(holder: &Option<u32>) -> String {
    match holder {
        Some(pid) => format!(" by scopes process {}", pid),
        None => " by another scopes process".to_string(),
    }
}

impl FileLock {
    /// Lock `data_dir`, polling until `timeout` runs out.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::CreateError {
                path: path.clone(),
                source,
            })?;

        let start = Instant::now();
        while try_lock(&file).is_err() {
            if start.elapsed() >= timeout {
                let holder = read_holder(&path);
                tracing::warn!(path = %path.display(), ?holder, "gave up waiting for lock");
                return Err(LockError::Timeout { path, holder });
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        // Holder pid is informational; a failed write still leaves us locked
        if let Err(e) = file
            .set_len(0)
            .and_then(|()| write!(file, "{}", std::process::id()))
        {
            tracing::debug!(error = %e, "could not record lock holder");
        }
        tracing::trace!(path = %path.display(), waited_ms = start.elapsed().as_millis() as u64, "lock acquired");
        Ok(FileLock { _file: file, path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // flock goes with the handle; the file itself is just tidied away
        let _ = fs::remove_file(&self.path);
    }
}

fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Non-blocking exclusive flock
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_millis(50);

    #[test]
    fn lock_file_names_holder_and_goes_away_on_drop() {
        let tmp = TempDir::new().unwrap();
        let lock = FileLock::acquire(tmp.path(), WAIT).unwrap();
        let path = tmp.path().join(LOCK_FILE);
        assert_eq!(read_holder(&path), Some(std::process::id()));
        drop(lock);
        assert!(!path.exists());
        assert!(FileLock::acquire(tmp.path(), WAIT).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn second_writer_times_out_and_reports_holder() {
        let tmp = TempDir::new().unwrap();
        let _held = FileLock::acquire(tmp.path(), WAIT).unwrap();
        let err = FileLock::acquire(tmp.path(), WAIT).unwrap_err();
        let pid = std::process::id();
        assert!(matches!(err, LockError::Timeout { holder: Some(p), .. } if p == pid));
        assert_eq!(
            err.to_string(),
            format!("workspace is locked by scopes process {}", pid)
        );
    }

    #[test]
    fn unreadable_holder_is_unknown() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCK_FILE);
        fs::write(&path, "not a pid").unwrap();
        assert_eq!(read_holder(&path), None);
        assert_eq!(holder_suffix(&None), " by another scopes process");
    }
}
