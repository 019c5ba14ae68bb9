// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! One asset's persisted metadata snapshot within an album's index.

use core::fmt;
use std::{
  collections::BTreeMap,
  fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::conv;

/// Whether an asset can take part in a Live Photo, and as which half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
  Image,
  Video,
  Other,
}

/// A row of `index.jsonl`.
///
/// Only the fields the pairing engine reads are typed. Everything else the
/// scanner produced (`w`, `h`, `codec`, `bytes`, `gps`, ...) is carried in
/// `extra` so rows survive a read / write cycle unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
  /// Album-relative POSIX path. Unique key.
  pub rel: String,

  /// Content hash of the file.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mime: Option<String>,

  /// Capture (or modification) time, ISO-8601.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dt: Option<String>,

  // For Live Photos.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_id:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dur:              Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub still_image_time: Option<f64>,

  #[serde(flatten)]
  pub extra: BTreeMap<String, Value>,
}

impl IndexRow {
  /// Creates an otherwise empty row for `rel`.
  pub fn new(rel: impl AsRef<str>) -> Self {
    Self {
      rel: conv::normalize_rel(rel.as_ref()),
      ..Default::default()
    }
  }

  /// Classifies the row by its MIME type.
  pub fn kind(&self) -> AssetKind {
    let Some(mime) = &self.mime else {
      return AssetKind::Other;
    };

    let mime = mime.to_ascii_lowercase();
    if mime.starts_with("image/") {
      AssetKind::Image
    } else if mime.starts_with("video/") {
      AssetKind::Video
    } else {
      AssetKind::Other
    }
  }

  /// The content id, treating an empty string as absent.
  pub fn content_id(&self) -> Option<&str> {
    self.content_id.as_deref().filter(|c| !c.is_empty())
  }

  /// Returns the row's timestamp in seconds since the epoch, if present and
  /// parseable.
  pub fn timestamp(&self) -> Option<f64> {
    let dt = conv::parse_date_time(self.dt.as_deref()?).ok()?;
    #[allow(clippy::cast_precision_loss)]
    Some(dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9)
  }

  /// File name without the extension. The directory is not included.
  pub fn stem(&self) -> &str {
    conv::rel_stem(&self.rel)
  }

  /// Directory containing the asset.
  pub fn parent(&self) -> &str {
    conv::rel_parent(&self.rel)
  }
}

impl Display for IndexRow {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.rel)
  }
}
