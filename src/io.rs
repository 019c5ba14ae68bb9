// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Functions for durably reading and writing JSON documents.
//!
//! Writes go to a temporary sibling file which is flushed, synced and then
//! renamed over the target. The rename is the only step that touches the
//! target, so readers see either the old or the new contents, never a mix. A
//! crash before the rename leaves an orphaned `.tmp` file next to an intact
//! target; the next write replaces it.

use std::{
  ffi::OsString,
  fs::{self, File},
  io::{ErrorKind, Write},
  path::{Path, PathBuf},
};

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Backups are named by the UTC time the replaced document was backed up.
const BACKUP_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A fully written and synced temporary file, waiting to replace `target`.
#[derive(Debug)]
pub struct StagedFile {
  target: PathBuf,
  tmp:    PathBuf,
}

impl StagedFile {
  /// Writes `data` to a temporary file next to `target` and syncs it to disk.
  /// `target` is not modified.
  pub fn stage(target: impl AsRef<Path>, data: impl AsRef<[u8]>) -> Result<Self> {
    let target = target.as_ref().to_path_buf();
    let tmp = tmp_path(&target);

    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let mut file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
    file.write_all(data.as_ref()).map_err(|e| Error::io(&tmp, e))?;
    file.flush().map_err(|e| Error::io(&tmp, e))?;
    file.sync_all().map_err(|e| Error::io(&tmp, e))?;

    Ok(Self { target, tmp })
  }

  /// Replaces the target with the staged contents.
  pub fn commit(self) -> Result<()> {
    rename_over(&self.tmp, &self.target)?;
    log::trace!("{}: Replaced.", self.target.display());
    Ok(())
  }

  pub fn tmp_path(&self) -> &Path {
    &self.tmp
  }
}

/// Atomically replaces the contents of `path` with `data`.
pub fn atomic_write_text(path: impl AsRef<Path>, data: &str) -> Result<()> {
  StagedFile::stage(path, data)?.commit()
}

/// Serializes `document` with sorted keys and writes it atomically to `path`.
/// If `backup_dir` is given and `path` already exists, its current bytes are
/// first copied into `backup_dir` under a timestamped name.
pub fn write_json<T: Serialize>(
  path: impl AsRef<Path>,
  document: &T,
  backup_dir: Option<&Path>,
) -> Result<()> {
  let path = path.as_ref();
  let payload = to_sorted_json_pretty(document)?;

  if let Some(backup_dir) = backup_dir {
    write_backup(path, backup_dir)?;
  }

  atomic_write_text(path, &payload)
}

/// Reads a JSON document from `path`. A missing file or invalid JSON is
/// reported as an invalid document.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
  let path = path.as_ref();

  let bytes = match fs::read(path) {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == ErrorKind::NotFound => {
      return Err(Error::invalid(path, "JSON file not found"));
    }
    Err(e) => return Err(Error::io(path, e)),
  };

  serde_json::from_slice(&bytes).map_err(|e| Error::invalid(path, format!("invalid JSON data: {e}")))
}

/// Serializes to a single line with keys sorted, so equal documents give
/// byte-identical output.
pub fn to_sorted_json<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(&serde_json::to_value(value)?)?)
}

/// Like `to_sorted_json`, but indented and with a trailing newline.
pub fn to_sorted_json_pretty<T: Serialize>(value: &T) -> Result<String> {
  let mut payload = serde_json::to_string_pretty(&serde_json::to_value(value)?)?;
  payload.push('\n');
  Ok(payload)
}

/// Copies `path` into `backup_dir`, if it exists. Returns the backup path.
fn write_backup(path: &Path, backup_dir: &Path) -> Result<Option<PathBuf>> {
  let bytes = match fs::read(path) {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
    Err(e) => return Err(Error::io(path, e)),
  };

  fs::create_dir_all(backup_dir).map_err(|e| Error::io(backup_dir, e))?;

  let timestamp = Utc::now().format(BACKUP_TIME_FORMAT).to_string();
  let suffix = path
    .extension()
    .map(|e| format!(".{}", e.to_string_lossy()))
    .unwrap_or_default();

  let mut backup_path = backup_dir.join(format!("{timestamp}{suffix}"));
  let mut counter = 1;
  while backup_path.exists() {
    backup_path = backup_dir.join(format!("{timestamp}_{counter}{suffix}"));
    counter += 1;
  }

  fs::write(&backup_path, bytes).map_err(|e| Error::io(&backup_path, e))?;
  log::debug!("{}: Backed up to {}.", path.display(), backup_path.display());

  Ok(Some(backup_path))
}

/// `path` with `.tmp` appended to its file name (e.g. `links.json.tmp`).
fn tmp_path(path: &Path) -> PathBuf {
  let mut name = path
    .file_name()
    .map_or_else(OsString::new, ToOwned::to_owned);
  name.push(".tmp");
  path.with_file_name(name)
}

/// Renames `from` over `to`. Atomic on POSIX. Windows can refuse to replace an
/// existing file in some sharing modes, in which case the target is removed
/// first.
fn rename_over(from: &Path, to: &Path) -> Result<()> {
  match fs::rename(from, to) {
    Ok(()) => Ok(()),
    #[cfg(windows)]
    Err(e) if e.kind() == ErrorKind::PermissionDenied && to.exists() => {
      fs::remove_file(to).map_err(|e| Error::io(to, e))?;
      fs::rename(from, to).map_err(|e| Error::io(to, e))
    }
    Err(e) => Err(Error::io(to, e)),
  }
}
