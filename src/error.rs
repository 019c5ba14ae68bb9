// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Error types for album cache operations.
//!
//! I/O and parse failures are never swallowed by the store, lock or links
//! primitives. They are returned to the caller, which decides whether to
//! retry, report or fall back. Pairing itself never fails.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// The album directory does not exist or is not a directory.
  #[error("{}: Album not found.", path.display())]
  AlbumNotFound { path: PathBuf },

  /// A filesystem operation failed (permissions, disk full, ...).
  #[error("{}: {source}", path.display())]
  Io {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  /// `index.jsonl` exists but contains a line that is not JSON. Never
  /// auto-repaired.
  #[error("{}: Corrupted index (line {line}): {source}", path.display())]
  IndexCorrupted {
    path:   PathBuf,
    line:   usize,
    #[source]
    source: serde_json::Error,
  },

  /// A named lock could not be claimed before the timeout elapsed.
  #[error("{}: Timed out acquiring lock after {waited:?}.", path.display())]
  LockTimeout { path: PathBuf, waited: Duration },

  /// A JSON document is well-formed (or missing) but has the wrong shape.
  #[error("{}: Invalid document ({reason}).", path.display())]
  ManifestInvalid { path: PathBuf, reason: String },

  #[error("Failed to serialize JSON ({0}).")]
  Serialize(#[from] serde_json::Error),
}

impl Error {
  /// Wraps an `io::Error` with the path it happened on.
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
    Self::ManifestInvalid {
      path:   path.into(),
      reason: reason.into(),
    }
  }
}
