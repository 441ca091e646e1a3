use crate::utils::error::{PagesError, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Exclusive lock file held for the duration of one workflow run.
///
/// Runs that share a lock path never overlap, so two triggers cannot push to
/// the publish branch at the same time. The file is removed on drop, but only
/// if it still carries this holder's token.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    token: String,
}

impl RunLock {
    pub fn acquire(path: impl AsRef<Path>, stale_after: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let token = format!(
            "pid={} acquired_at={}",
            std::process::id(),
            Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
        );

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(token.as_bytes())?;
                    tracing::debug!("Acquired run lock {}", path.display());
                    return Ok(Self { path, token });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let seen = match fs::read_to_string(&path) {
                        Ok(contents) => contents,
                        Err(e) if e.kind() == ErrorKind::NotFound => continue,
                        Err(e) => return Err(e.into()),
                    };
                    if !is_stale(&path, stale_after) {
                        break;
                    }
                    tracing::warn!("Removing stale run lock {}", path.display());
                    if !take_over_stale(&path, &seen)? {
                        break;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PagesError::RunInProgress {
            lock_path: path.display().to_string(),
        })
    }

}

/// Moves the lock at `path` aside if it still holds `seen`, the stale holder's
/// contents. Returns false when another process replaced it in the meantime;
/// their lock is put back untouched.
fn take_over_stale(path: &Path, seen: &str) -> Result<bool> {
    let mut aside = path.as_os_str().to_owned();
    aside.push(format!(
        ".stale-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let aside = PathBuf::from(aside);

    match fs::rename(path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    }

    let moved = fs::read_to_string(&aside).unwrap_or_default();
    if moved == seen {
        match fs::remove_file(&aside) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(true);
    }

    // hard_link never overwrites, so a lock created since the rename wins.
    if let Err(e) = fs::hard_link(&aside, path) {
        tracing::warn!("Could not restore run lock {}: {}", path.display(), e);
    }
    let _ = fs::remove_file(&aside);
    Ok(false)
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|modified| {
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default()
                >= stale_after
        })
        .unwrap_or(false)
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents == self.token => {
                if let Err(e) = fs::remove_file(&self.path) {
                    tracing::warn!("Could not remove run lock {}: {}", self.path.display(), e);
                }
            }
            Ok(_) => tracing::debug!("Run lock {} was taken over, leaving it", self.path.display()),
            Err(_) => {}
        }
    }
}
