// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Program subcommands for maintaining an album's Live Photo cache.

use std::path::Path;

use livepair::{Album, Result, index::Rows};

/// Re-pairs the album's whole index and rewrites `links.json`.
pub fn pair(album: &Album) -> Result<()> {
  log::info!("Pairing {}.", album.root().display());

  for group in album.pair()? {
    log::debug!(
      "{}\t{} <-> {} ({:.1})",
      group.id,
      group.still,
      group.motion,
      group.confidence
    );
  }

  Ok(())
}

/// Merges the rows in the JSONL file `rows` into the album's index.
pub fn ingest(album: &Album, rows: &Path) -> Result<()> {
  log::info!("Ingesting {} into {}.", rows.display(), album.root().display());

  let rows = Rows::open(rows)?.collect::<Result<Vec<_>>>()?;
  album.ingest(rows)?;

  Ok(())
}

pub fn remove(album: &Album, rels: &[String]) -> Result<()> {
  album.remove(rels)?;
  Ok(())
}

pub fn report(album: &Album) -> Result<()> {
  log::info!("{}: {}.", album.root().display(), album.report()?);
  Ok(())
}

/// Saves the manifest, writing the default one if the album has none.
pub fn init(album: &Album) -> Result<()> {
  let mut manifest = album.manifest().load()?;
  album.manifest().save(&mut manifest)?;
  Ok(())
}

pub fn set_cover(album: &Album, rel: &str) -> Result<()> {
  let mut manifest = album.manifest().load()?;
  manifest.set_cover(rel);
  album.manifest().save(&mut manifest)?;
  Ok(())
}

/// Adds `reference` to the featured list, or removes it if `add` is false.
pub fn feature(album: &Album, reference: &str, add: bool) -> Result<()> {
  let mut manifest = album.manifest().load()?;

  let changed = if add {
    manifest.add_featured(reference)
  } else {
    manifest.remove_featured(reference)
  };
  if !changed {
    log::warn!("{reference}: Already {}.", if add { "featured" } else { "not featured" });
  }

  album.manifest().save(&mut manifest)?;
  Ok(())
}
