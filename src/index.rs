// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! `IndexStore`, the album's persisted set of asset rows (`index.jsonl`).
//!
//! One JSON object per line, keyed by `rel`. Reads are lock-free and see whole
//! files, since every write replaces the file atomically. Mutations take the
//! "index" lock for the whole read-modify-write.

use std::{
  collections::HashMap,
  fs::File,
  io::{self, BufRead, BufReader, ErrorKind},
  path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
  config::{INDEX_FILE_NAME, LOCK_INDEX, LockConfig, WORK_DIR_NAME},
  error::{Error, Result},
  io::{atomic_write_text, to_sorted_json},
  lock::FileLock,
  prim::{IndexRow, normalize_rel},
};

#[derive(Debug, Clone)]
pub struct IndexStore {
  path: PathBuf,
  lock: FileLock,
}

impl IndexStore {
  pub fn new(album_root: impl AsRef<Path>) -> Self {
    Self::with_lock_config(album_root, LockConfig::default())
  }

  pub fn with_lock_config(album_root: impl AsRef<Path>, config: LockConfig) -> Self {
    let album_root = album_root.as_ref();

    Self {
      path: album_root.join(WORK_DIR_NAME).join(INDEX_FILE_NAME),
      lock: FileLock::with_config(album_root, LOCK_INDEX, config),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Lazily iterates the rows on disk. A missing index yields nothing. Each
  /// call starts again from the top of the file.
  pub fn read_all(&self) -> Result<Rows> {
    match Rows::open(&self.path) {
      Err(Error::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(Rows {
        path:  self.path.clone(),
        lines: None,
        line:  0,
      }),
      res => res,
    }
  }

  /// Reads every row, failing on the first bad line.
  pub fn read_rows(&self) -> Result<Vec<IndexRow>> {
    self.read_all()?.collect()
  }

  /// Replaces the index with `rows`, in order.
  pub fn write_rows(&self, rows: &[IndexRow]) -> Result<()> {
    let _guard = self.lock.lock()?;
    self.write_unlocked(rows)
  }

  /// Inserts or replaces the row for `rel`.
  pub fn upsert_row(&self, rel: &str, mut row: IndexRow) -> Result<()> {
    row.rel = rel.to_string();

    let _guard = self.lock.lock()?;
    let rows = merge(self.read_rows()?, [row], &self.path)?;
    self.write_unlocked(&rows)
  }

  /// Removes the rows for `rels`, returning how many were removed. Nothing is
  /// locked or written if none of `rels` are present.
  pub fn remove_rows<S: AsRef<str>>(&self, rels: &[S]) -> Result<usize> {
    let targets = rels
      .iter()
      .map(|r| normalize_rel(r.as_ref()))
      .collect::<Vec<_>>();

    if !self.contains_any(&targets)? {
      return Ok(0);
    }

    let _guard = self.lock.lock()?;
    let rows = self.read_rows()?;
    let before = rows.len();
    let kept = rows
      .into_iter()
      .filter(|r| !targets.contains(&r.rel))
      .collect::<Vec<_>>();

    let removed = before - kept.len();
    if removed > 0 {
      self.write_unlocked(&kept)?;
      log::debug!("{}: Removed {removed} rows.", self.path.display());
    }

    Ok(removed)
  }

  /// Merges `rows` into the index by `rel`. Existing rows keep their position,
  /// new ones are appended. Returns `false`, without writing, when the merge
  /// changes nothing.
  pub fn append_rows(&self, rows: impl IntoIterator<Item = IndexRow>) -> Result<bool> {
    let _guard = self.lock.lock()?;
    let existing = self.read_rows()?;
    let merged = merge(existing.clone(), rows, &self.path)?;

    if merged == existing {
      log::debug!("{}: Unchanged.", self.path.display());
      return Ok(false);
    }

    self.write_unlocked(&merged)?;
    log::debug!(
      "{}: {} rows ({} before).",
      self.path.display(),
      merged.len(),
      existing.len()
    );

    Ok(true)
  }

  fn contains_any(&self, rels: &[String]) -> Result<bool> {
    if rels.is_empty() {
      return Ok(false);
    }

    for row in self.read_all()? {
      if rels.contains(&row?.rel) {
        return Ok(true);
      }
    }

    Ok(false)
  }

  /// Caller must hold the index lock.
  fn write_unlocked(&self, rows: &[IndexRow]) -> Result<()> {
    let mut payload = String::new();
    for row in rows {
      payload.push_str(&to_sorted_json(row)?);
      payload.push('\n');
    }

    atomic_write_text(&self.path, &payload)
  }
}

/// Iterator over the rows of a JSONL file. See `IndexStore::read_all`.
#[derive(Debug)]
pub struct Rows {
  path:  PathBuf,
  lines: Option<io::Split<BufReader<File>>>,
  /// 1-based number of the last line read.
  line:  usize,
}

impl Rows {
  /// Reads rows from any JSONL file, such as scanner output.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;

    Ok(Self {
      path:  path.to_path_buf(),
      lines: Some(BufReader::new(file).split(b'\n')),
      line:  0,
    })
  }

  /// Parses one raw line. Bytes that are not UTF-8 count as corruption.
  fn parse(&self, bytes: &[u8]) -> Result<IndexRow> {
    let value = serde_json::from_slice::<Value>(bytes).map_err(|source| Error::IndexCorrupted {
      path: self.path.clone(),
      line: self.line,
      source,
    })?;

    let mut row = serde_json::from_value::<IndexRow>(value)
      .map_err(|e| Error::invalid(&self.path, format!("line {}: {e}", self.line)))?;

    row.rel = normalize_rel(&row.rel);
    if row.rel.is_empty() {
      return Err(Error::invalid(&self.path, format!("line {}: empty `rel`", self.line)));
    }

    Ok(row)
  }
}

impl Iterator for Rows {
  type Item = Result<IndexRow>;

  fn next(&mut self) -> Option<Self::Item> {
    let lines = self.lines.as_mut()?;

    loop {
      let bytes = match lines.next()? {
        Ok(bytes) => bytes,
        Err(e) => return Some(Err(Error::io(&self.path, e))),
      };
      self.line += 1;

      if !bytes.trim_ascii().is_empty() {
        return Some(self.parse(&bytes));
      }
    }
  }
}

/// Applies `updates` over `rows` by `rel`, last update winning.
fn merge(
  rows: Vec<IndexRow>,
  updates: impl IntoIterator<Item = IndexRow>,
  path: &Path,
) -> Result<Vec<IndexRow>> {
  let mut merged = Vec::<IndexRow>::with_capacity(rows.len());
  let mut positions = HashMap::<String, usize>::new();

  for mut row in rows.into_iter().chain(updates) {
    row.rel = normalize_rel(&row.rel);
    if row.rel.is_empty() {
      return Err(Error::invalid(path, "row with empty `rel`"));
    }

    if let Some(&i) = positions.get(&row.rel) {
      merged[i] = row;
    } else {
      positions.insert(row.rel.clone(), merged.len());
      merged.push(row);
    }
  }

  Ok(merged)
}
