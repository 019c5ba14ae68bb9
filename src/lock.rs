// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Cooperative, cross-process locks implemented with `.lock` files.
//!
//! A lock is one file per named resource per album
//! (`<album>/.iPhoto/locks/<name>.lock`), created with an exclusive
//! create-only open. Lock files older than the expiry are presumed abandoned
//! by a crashed holder and are removed, favouring liveness over strict mutual
//! exclusion.
//!
//! Within one process, callers additionally serialize on an in-memory claim
//! keyed by the lock path, so threads of the same process wait on a condition
//! variable rather than polling the filesystem.

use std::{
  collections::HashSet,
  fs::{self, OpenOptions},
  io::{ErrorKind, Write},
  path::{Path, PathBuf},
  sync::{Condvar, LazyLock, Mutex, PoisonError},
  thread,
  time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use serde_json::{Value, json};
use sysinfo::System;

use crate::{
  config::{LOCKS_DIR_NAME, LockConfig, WORK_DIR_NAME},
  error::{Error, Result},
};

static LOCAL_CLAIMS: LazyLock<LocalClaims> = LazyLock::new(LocalClaims::default);

/// A named lock scoped to one album directory.
#[derive(Debug, Clone)]
pub struct FileLock {
  path:   PathBuf,
  config: LockConfig,
}

impl FileLock {
  /// Lock `name` (e.g. "index", "links") for the album at `album_root`.
  pub fn new(album_root: impl AsRef<Path>, name: &str) -> Self {
    Self::with_config(album_root, name, LockConfig::default())
  }

  pub fn with_config(album_root: impl AsRef<Path>, name: &str, config: LockConfig) -> Self {
    let path = album_root
      .as_ref()
      .join(WORK_DIR_NAME)
      .join(LOCKS_DIR_NAME)
      .join(format!("{name}.lock"));

    Self { path, config }
  }

  /// Blocks until the lock is held, or fails with `LockTimeout` once `timeout`
  /// has elapsed. The lock is released when the returned guard is dropped.
  pub fn acquire(&self, timeout: Duration) -> Result<LockGuard> {
    let start = Instant::now();
    let deadline = start + timeout;

    if !LOCAL_CLAIMS.claim(&self.path, deadline) {
      return Err(Error::LockTimeout {
        path:   self.path.clone(),
        waited: start.elapsed(),
      });
    }

    match self.acquire_file(start, deadline) {
      Ok(()) => {
        log::trace!("{}: Acquired.", self.path.display());
        Ok(LockGuard {
          path: self.path.clone(),
        })
      }
      Err(e) => {
        LOCAL_CLAIMS.release(&self.path);
        Err(e)
      }
    }
  }

  /// Acquires with the configured default timeout.
  pub fn lock(&self) -> Result<LockGuard> {
    self.acquire(self.config.timeout)
  }

  /// Removes the lock file, whoever holds it. Succeeds if it was never
  /// acquired or has already been released.
  pub fn release(&self) -> Result<()> {
    remove_lock_file(&self.path)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn acquire_file(&self, start: Instant, deadline: Instant) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }

    let payload = lock_payload();

    loop {
      match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&self.path)
      {
        Ok(mut file) => {
          // Diagnostic only; the lock is the file's existence.
          if let Err(e) = file.write_all(payload.as_bytes()) {
            log::warn!("{}: Failed to write lock record ({e}).", self.path.display());
          }
          return Ok(());
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
        Err(e) => return Err(Error::io(&self.path, e)),
      }

      match lock_age(&self.path)? {
        // Released between the open and the check.
        None => continue,
        Some(age) if age > self.config.expiry => {
          log::warn!(
            "{}: Reclaiming lock abandoned {}s ago.",
            self.path.display(),
            age.as_secs()
          );
          remove_lock_file(&self.path)?;
          continue;
        }
        Some(_) => {}
      }

      let now = Instant::now();
      if now >= deadline {
        return Err(Error::LockTimeout {
          path:   self.path.clone(),
          waited: start.elapsed(),
        });
      }
      thread::sleep(self.config.poll.min(deadline - now));
    }
  }
}

/// Holds a `FileLock` until dropped.
///
/// If the guard outlives the expiry, another process may reclaim the lock and
/// write its own record. Dropping the guard then leaves that process's lock
/// file in place.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
  path: PathBuf,
}

impl LockGuard {
  /// Releases the lock now rather than at the end of scope.
  pub fn release(self) {
    drop(self);
  }
}

impl Drop for LockGuard {
  fn drop(&mut self) {
    if let Some(pid) = foreign_holder(&self.path) {
      log::warn!(
        "{}: Lock was reclaimed by process {pid}; leaving it.",
        self.path.display()
      );
    } else if let Err(e) = remove_lock_file(&self.path) {
      log::warn!("Failed to release lock: {e}");
    }
    LOCAL_CLAIMS.release(&self.path);
    log::trace!("{}: Released.", self.path.display());
  }
}

/// Lock paths currently held by this process.
#[derive(Default)]
struct LocalClaims {
  held:     Mutex<HashSet<PathBuf>>,
  released: Condvar,
}

impl LocalClaims {
  /// Waits until `path` is not held by another thread of this process, then
  /// claims it. Returns `false` if `deadline` passes first.
  fn claim(&self, path: &Path, deadline: Instant) -> bool {
    let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);

    loop {
      if held.insert(path.to_path_buf()) {
        return true;
      }

      let now = Instant::now();
      if now >= deadline {
        return false;
      }

      held = self
        .released
        .wait_timeout(held, deadline - now)
        .unwrap_or_else(PoisonError::into_inner)
        .0;
    }
  }

  fn release(&self, path: &Path) {
    let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
    held.remove(path);
    self.released.notify_all();
  }
}

/// Time since the lock file was last modified, or `None` if it is gone.
fn lock_age(path: &Path) -> Result<Option<Duration>> {
  let modified = match fs::metadata(path).and_then(|m| m.modified()) {
    Ok(modified) => modified,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
    Err(e) => return Err(Error::io(path, e)),
  };

  // A timestamp in the future counts as fresh.
  Ok(Some(
    SystemTime::now()
      .duration_since(modified)
      .unwrap_or_default(),
  ))
}

/// Pid recorded in the lock file, if it is not this process. A missing or
/// unreadable record is treated as ours.
fn foreign_holder(path: &Path) -> Option<u64> {
  let text = fs::read_to_string(path).ok()?;
  let pid = serde_json::from_str::<Value>(&text).ok()?.get("pid")?.as_u64()?;
  (pid != u64::from(std::process::id())).then_some(pid)
}

fn remove_lock_file(path: &Path) -> Result<()> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
    Err(e) => Err(Error::io(path, e)),
  }
}

/// `{pid, time, host}` record identifying the holder.
fn lock_payload() -> String {
  let time = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs_f64())
    .unwrap_or_default();
  let host = System::host_name().unwrap_or_else(|| "unknown".to_string());

  json!({
    "pid": std::process::id(),
    "time": time,
    "host": host,
  })
  .to_string()
}
