use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MasterfileError;

/// Exclusive claim on an output file for the duration of one append or sync.
///
/// Held as `<file>.lock` next to the target, created with `create_new` and removed on drop.
/// A second claimant fails fast with `WorkbookBusy`.
#[derive(Debug)]
pub struct WorkbookLock {
    lock_path: PathBuf,
}

impl WorkbookLock {
    pub fn acquire(target: &Path) -> Result<Self, MasterfileError> {
        let lock_path = lock_path_for(target);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                // Owner pid for whoever finds a stale lock.
                if let Err(e) = writeln!(file, "{}", std::process::id()) {
                    debug!(lock = %lock_path.display(), error = %e, "could not record owner pid");
                }
                debug!(lock = %lock_path.display(), "lock acquired");
                Ok(WorkbookLock { lock_path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(MasterfileError::WorkbookBusy(target.to_path_buf()))
            }
            Err(e) => Err(MasterfileError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for WorkbookLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            warn!(lock = %self.lock_path.display(), error = %e, "failed to release lock");
        }
    }
}

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
