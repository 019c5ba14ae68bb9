// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! The album manifest (`.iphoto.album.json`), holding user-facing album
//! metadata: title, cover and featured assets.
//!
//! An album without a manifest behaves as if it had the default one, titled
//! after the album directory. Nothing is written until `ManifestStore::save`.

use std::{
  collections::{BTreeMap, HashSet},
  path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  config::{ALBUM_MANIFEST_NAMES, ALBUM_SCHEMA, BACKUP_DIR_NAME, LOCK_MANIFEST, LockConfig, WORK_DIR_NAME},
  error::{Error, Result},
  io::{read_json, write_json},
  lock::FileLock,
  prim::{normalize_rel, parse_date_time},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumManifest {
  pub schema:   String,
  pub title:    String,
  #[serde(default)]
  pub filters:  Map<String, Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cover:    Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub featured: Vec<String>,
  /// UTC, RFC 3339. Set on first save.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created:  Option<String>,
  /// UTC, RFC 3339. Set on every save.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub modified: Option<String>,
  /// Fields written by other tools. Carried through unchanged.
  #[serde(flatten)]
  pub extra:    BTreeMap<String, Value>,
}

impl AlbumManifest {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      schema:   ALBUM_SCHEMA.to_string(),
      title:    title.into(),
      filters:  Map::new(),
      cover:    None,
      featured: Vec::new(),
      created:  None,
      modified: None,
      extra:    BTreeMap::new(),
    }
  }

  pub fn set_cover(&mut self, rel: &str) {
    self.cover = Some(normalize_rel(rel));
  }

  /// Appends `reference` unless already featured. Returns whether it was added.
  pub fn add_featured(&mut self, reference: &str) -> bool {
    if self.featured.iter().any(|f| f == reference) {
      return false;
    }
    self.featured.push(reference.to_string());
    true
  }

  /// Returns whether `reference` was featured.
  pub fn remove_featured(&mut self, reference: &str) -> bool {
    let before = self.featured.len();
    self.featured.retain(|f| f != reference);
    self.featured.len() != before
  }

  fn stamp(&mut self) {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    self.created.get_or_insert_with(|| now.clone());
    self.modified = Some(now);
  }
}

/// Checks manifests before they are written or after they are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestValidator {
  schema: String,
}

impl ManifestValidator {
  /// Accepts manifests tagged with `schema`.
  pub fn new(schema: impl Into<String>) -> Self {
    Self {
      schema: schema.into(),
    }
  }

  /// `path` is only used for error reporting.
  pub fn validate(&self, manifest: &AlbumManifest, path: &Path) -> Result<()> {
    if manifest.schema != self.schema {
      return Err(Error::invalid(
        path,
        format!("expected schema `{}`, found `{}`", self.schema, manifest.schema),
      ));
    }

    if manifest.cover.as_deref() == Some("") {
      return Err(Error::invalid(path, "empty cover"));
    }

    let mut featured = HashSet::new();
    for reference in &manifest.featured {
      if reference.is_empty() {
        return Err(Error::invalid(path, "empty featured reference"));
      }
      if !featured.insert(reference.as_str()) {
        return Err(Error::invalid(path, format!("`{reference}` featured twice")));
      }
    }

    for (field, value) in [("created", &manifest.created), ("modified", &manifest.modified)] {
      if let Some(value) = value {
        parse_date_time(value).map_err(|e| Error::invalid(path, format!("{field}: {e}")))?;
      }
    }

    Ok(())
  }
}

impl Default for ManifestValidator {
  fn default() -> Self {
    Self::new(ALBUM_SCHEMA)
  }
}

/// Loads and saves an album's manifest. Saves are validated, take the
/// "manifest" lock, and back up the previous manifest into `manifest.bak/`.
#[derive(Debug, Clone)]
pub struct ManifestStore {
  root:       PathBuf,
  backup_dir: PathBuf,
  lock:       FileLock,
  validator:  ManifestValidator,
}

impl ManifestStore {
  pub fn new(album_root: impl AsRef<Path>) -> Self {
    Self::with_config(album_root, LockConfig::default(), ManifestValidator::default())
  }

  pub fn with_config(
    album_root: impl AsRef<Path>,
    lock_config: LockConfig,
    validator: ManifestValidator,
  ) -> Self {
    let root = album_root.as_ref();

    Self {
      root: root.to_path_buf(),
      backup_dir: root.join(WORK_DIR_NAME).join(BACKUP_DIR_NAME),
      lock: FileLock::with_config(root, LOCK_MANIFEST, lock_config),
      validator,
    }
  }

  /// The first manifest location that exists, or where a new manifest will be
  /// written.
  pub fn path(&self) -> PathBuf {
    let candidates = ALBUM_MANIFEST_NAMES.map(|name| self.root.join(name));
    candidates
      .iter()
      .find(|p| p.is_file())
      .unwrap_or(&candidates[0])
      .clone()
  }

  pub fn backup_dir(&self) -> &Path {
    &self.backup_dir
  }

  /// Reads the manifest, or returns the default one if the album has none.
  pub fn load(&self) -> Result<AlbumManifest> {
    let path = self.path();

    let manifest = if path.is_file() {
      read_json::<AlbumManifest>(&path)?
    } else {
      log::debug!("{}: No manifest, using defaults.", self.root.display());
      AlbumManifest::new(self.default_title())
    };

    self.validator.validate(&manifest, &path)?;
    Ok(manifest)
  }

  /// Stamps `manifest` with the current time and writes it. Returns where it
  /// was written.
  pub fn save(&self, manifest: &mut AlbumManifest) -> Result<PathBuf> {
    let path = self.path();

    let mut stamped = manifest.clone();
    stamped.stamp();
    self.validator.validate(&stamped, &path)?;

    let _guard = self.lock.lock()?;
    write_json(&path, &stamped, Some(&self.backup_dir))?;
    log::info!("{}: Saved \"{}\".", path.display(), stamped.title);

    *manifest = stamped;
    Ok(path)
  }

  fn default_title(&self) -> String {
    self
      .root
      .file_name()
      .map_or_else(|| self.root.display().to_string(), |n| n.to_string_lossy().into_owned())
  }
}
