// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Types for Live Photos, which pair a still image with a motion clip.

use serde::{Deserialize, Serialize};

/// Number of hash bytes kept in a `LiveGroup` id (48 bits).
const GROUP_ID_BYTES: usize = 6;

/// How a still and its motion clip were matched. Each tier carries a fixed
/// confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confidence {
  /// Shared `content_id`.
  ContentId,
  /// Same path stem, timestamps within the threshold.
  StemTime,
  /// Same directory, timestamps within the threshold.
  DirectoryTime,
}

impl Confidence {
  pub const ALL: [Confidence; 3] = [
    Confidence::ContentId,
    Confidence::StemTime,
    Confidence::DirectoryTime,
  ];

  pub fn score(self) -> f64 {
    match self {
      Confidence::ContentId => 1.0,
      Confidence::StemTime => 0.7,
      Confidence::DirectoryTime => 0.5,
    }
  }

  /// Maps a stored score back to its tier.
  pub fn from_score(score: f64) -> Option<Self> {
    Self::ALL
      .into_iter()
      .find(|c| (c.score() - score).abs() < 1e-9)
  }
}

/// One paired Live Photo. Derived data: recomputed on every pairing run and
/// never edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGroup {
  pub id:               String,
  pub still:            String,
  pub motion:           String,
  pub content_id:       Option<String>,
  pub still_image_time: Option<f64>,
  pub confidence:       f64,
}

impl LiveGroup {
  pub fn new(
    still: &str,
    motion: &str,
    content_id: Option<&str>,
    still_image_time: Option<f64>,
    confidence: Confidence,
  ) -> Self {
    Self {
      id: group_id(still, motion),
      still: still.to_string(),
      motion: motion.to_string(),
      content_id: content_id.map(ToString::to_string),
      still_image_time,
      confidence: confidence.score(),
    }
  }

  pub fn confidence(&self) -> Option<Confidence> {
    Confidence::from_score(self.confidence)
  }
}

/// Derives a stable id from the (still, motion) pair. Truncated, so distinct
/// pairs may collide with probability ~n²/2^49.
pub fn group_id(still: &str, motion: &str) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(still.as_bytes());
  hasher.update(&[0]);
  hasher.update(motion.as_bytes());

  let hash = hasher.finalize();
  let hex = hash.to_hex();
  format!("live_{}", &hex.as_str()[..GROUP_ID_BYTES * 2])
}
