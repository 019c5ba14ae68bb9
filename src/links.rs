// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! The album's links document (`links.json`), holding the current Live Photo
//! pairing so readers don't have to re-pair the index.

use std::{
  collections::HashSet,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  config::{BACKUP_DIR_NAME, LINKS_FILE_NAME, LINKS_SCHEMA, LOCK_LINKS, LockConfig, WORK_DIR_NAME},
  error::{Error, Result},
  io::{read_json, write_json},
  lock::FileLock,
  pairing::pair_live,
  prim::{IndexRow, LiveGroup},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinksDocument {
  pub schema:      String,
  #[serde(default)]
  pub live_groups: Vec<LiveGroup>,
  /// Reserved. Carried through unchanged.
  #[serde(default)]
  pub clips:       Vec<Value>,
}

impl LinksDocument {
  pub fn from_groups(live_groups: Vec<LiveGroup>) -> Self {
    Self {
      schema: LINKS_SCHEMA.to_string(),
      live_groups,
      clips: Vec::new(),
    }
  }
}

/// Pairs `rows` and wraps the result as a links document.
pub fn compute_links(rows: &[IndexRow]) -> LinksDocument {
  LinksDocument::from_groups(pair_live(rows))
}

/// Checks links documents before they are written or after they are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinksValidator {
  schema: String,
}

impl LinksValidator {
  /// Accepts documents tagged with `schema`.
  pub fn new(schema: impl Into<String>) -> Self {
    Self {
      schema: schema.into(),
    }
  }

  /// `path` is only used for error reporting.
  pub fn validate(&self, document: &LinksDocument, path: &Path) -> Result<()> {
    if document.schema != self.schema {
      return Err(Error::invalid(
        path,
        format!("expected schema `{}`, found `{}`", self.schema, document.schema),
      ));
    }

    let mut stills = HashSet::new();
    let mut motions = HashSet::new();

    for group in &document.live_groups {
      if group.id.is_empty() || group.still.is_empty() || group.motion.is_empty() {
        return Err(Error::invalid(path, format!("incomplete live group `{}`", group.id)));
      }
      if group.confidence().is_none() {
        return Err(Error::invalid(
          path,
          format!("live group `{}` has unknown confidence {}", group.id, group.confidence),
        ));
      }
      if !stills.insert(group.still.as_str()) {
        return Err(Error::invalid(path, format!("`{}` paired twice", group.still)));
      }
      if !motions.insert(group.motion.as_str()) {
        return Err(Error::invalid(path, format!("`{}` paired twice", group.motion)));
      }
    }

    Ok(())
  }
}

impl Default for LinksValidator {
  fn default() -> Self {
    Self::new(LINKS_SCHEMA)
  }
}

/// Reads and writes an album's `links.json`. Writes are validated, take the
/// "links" lock, and back up the previous document into `manifest.bak/`.
#[derive(Debug, Clone)]
pub struct LinksStore {
  path:       PathBuf,
  backup_dir: PathBuf,
  lock:       FileLock,
  validator:  LinksValidator,
}

impl LinksStore {
  pub fn new(album_root: impl AsRef<Path>) -> Self {
    Self::with_config(album_root, LockConfig::default(), LinksValidator::default())
  }

  pub fn with_config(
    album_root: impl AsRef<Path>,
    lock_config: LockConfig,
    validator: LinksValidator,
  ) -> Self {
    let album_root = album_root.as_ref();
    let work_dir = album_root.join(WORK_DIR_NAME);

    Self {
      path: work_dir.join(LINKS_FILE_NAME),
      backup_dir: work_dir.join(BACKUP_DIR_NAME),
      lock: FileLock::with_config(album_root, LOCK_LINKS, lock_config),
      validator,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn backup_dir(&self) -> &Path {
    &self.backup_dir
  }

  pub fn read(&self) -> Result<LinksDocument> {
    let document = read_json::<LinksDocument>(&self.path)?;
    self.validator.validate(&document, &self.path)?;
    Ok(document)
  }

  pub fn write(&self, document: &LinksDocument) -> Result<()> {
    self.validator.validate(document, &self.path)?;

    let _guard = self.lock.lock()?;
    write_json(&self.path, document, Some(&self.backup_dir))?;
    log::info!(
      "{}: Wrote {} live groups.",
      self.path.display(),
      document.live_groups.len()
    );

    Ok(())
  }

  /// Re-pairs `rows` and writes the result, unless the document on disk
  /// already matches. An unreadable or invalid existing document is replaced.
  /// Returns whether anything was written.
  pub fn ensure(&self, rows: &[IndexRow]) -> Result<bool> {
    let document = compute_links(rows);

    match self.read() {
      Ok(existing) if existing == document => {
        log::debug!("{}: Up to date.", self.path.display());
        return Ok(false);
      }
      Ok(_) => {}
      Err(e @ Error::ManifestInvalid { .. }) => log::debug!("Replacing links: {e}"),
      Err(e) => return Err(e),
    }

    self.write(&document)?;
    Ok(true)
  }
}
