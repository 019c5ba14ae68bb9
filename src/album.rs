// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! An album directory and its `.iPhoto` work directory.

use std::{
  fmt::{self, Display, Formatter},
  fs,
  path::{Path, PathBuf},
};

use crate::{
  config::WORK_DIR_NAME,
  error::{Error, Result},
  index::IndexStore,
  links::{LinksDocument, LinksStore},
  manifest::ManifestStore,
  pairing::pair_live,
  prim::{AssetKind, IndexRow, LiveGroup},
};

#[derive(Debug, Clone)]
pub struct Album {
  root:     PathBuf,
  index:    IndexStore,
  links:    LinksStore,
  manifest: ManifestStore,
}

/// Counts for `Album::report`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
  pub assets:      usize,
  pub images:      usize,
  pub videos:      usize,
  pub live_groups: usize,
}

impl Album {
  /// Opens the album at `root`, creating its work directory if needed.
  pub fn open(root: impl AsRef<Path>) -> Result<Self> {
    let root = root.as_ref();
    if !root.is_dir() {
      return Err(Error::AlbumNotFound {
        path: root.to_path_buf(),
      });
    }

    let work_dir = root.join(WORK_DIR_NAME);
    fs::create_dir_all(&work_dir).map_err(|e| Error::io(&work_dir, e))?;

    Ok(Self {
      root:     root.to_path_buf(),
      index:    IndexStore::new(root),
      links:    LinksStore::new(root),
      manifest: ManifestStore::new(root),
    })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn work_dir(&self) -> PathBuf {
    self.root.join(WORK_DIR_NAME)
  }

  pub fn index(&self) -> &IndexStore {
    &self.index
  }

  pub fn links(&self) -> &LinksStore {
    &self.links
  }

  pub fn manifest(&self) -> &ManifestStore {
    &self.manifest
  }

  /// Re-pairs the whole index and rewrites `links.json`.
  pub fn pair(&self) -> Result<Vec<LiveGroup>> {
    let rows = self.index.read_rows()?;
    let groups = pair_live(&rows);
    self.links.write(&LinksDocument::from_groups(groups.clone()))?;

    log::info!("{}: {} live groups.", self.root.display(), groups.len());
    Ok(groups)
  }

  /// Merges `rows` (e.g. scanner output) into the index and refreshes the
  /// links. Returns whether the index changed.
  pub fn ingest(&self, rows: Vec<IndexRow>) -> Result<bool> {
    let count = rows.len();
    let changed = self.index.append_rows(rows)?;
    self.links.ensure(&self.index.read_rows()?)?;

    log::info!(
      "{}: Ingested {count} rows{}.",
      self.root.display(),
      if changed { "" } else { " (no changes)" }
    );
    Ok(changed)
  }

  /// Drops `rels` from the index and refreshes the links. Returns how many rows
  /// were removed.
  pub fn remove<S: AsRef<str>>(&self, rels: &[S]) -> Result<usize> {
    let removed = self.index.remove_rows(rels)?;
    if removed > 0 {
      self.links.ensure(&self.index.read_rows()?)?;
    }

    log::info!("{}: Removed {removed} rows.", self.root.display());
    Ok(removed)
  }

  /// Counts assets in the index and Live Photo groups in `links.json`. If the
  /// links are missing or invalid, the index is paired without writing.
  pub fn report(&self) -> Result<Report> {
    let rows = self.index.read_rows()?;

    let live_groups = match self.links.read() {
      Ok(links) => links.live_groups.len(),
      Err(Error::ManifestInvalid { .. }) => pair_live(&rows).len(),
      Err(e) => return Err(e),
    };

    let mut report = Report {
      assets: rows.len(),
      live_groups,
      ..Default::default()
    };
    for row in &rows {
      match row.kind() {
        AssetKind::Image => report.images += 1,
        AssetKind::Video => report.videos += 1,
        AssetKind::Other => {}
      }
    }

    Ok(report)
  }
}

impl Display for Report {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} assets ({} images, {} videos), {} live photos",
      self.assets, self.images, self.videos, self.live_groups
    )
  }
}
