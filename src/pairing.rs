// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Pairs Live Photo stills with their motion clips.
//!
//! Matching runs in three tiers, strongest first. A still or clip matched in
//! one tier is unavailable to the tiers after it, so each asset appears in at
//! most one group:
//!
//! 1. Shared `content_id` (confidence 1.0).
//! 2. Same file name up to the extension, in any directory, with timestamps
//!    within `time_delta` (0.7).
//! 3. Same directory with timestamps within `time_delta` (0.5).
//!
//! Assets are visited in `rel` order, so the result depends only on the set of
//! rows given, not on their order.

use std::collections::{BTreeMap, HashSet};

use crate::{
  config::PairingConfig,
  prim::{AssetKind, Confidence, IndexRow, LiveGroup},
};

/// Pairs `rows` using the default thresholds.
pub fn pair_live(rows: &[IndexRow]) -> Vec<LiveGroup> {
  pair_live_with(rows, &PairingConfig::default())
}

/// Pairs `rows` using the thresholds in `config`. Never fails: rows with
/// missing or unparseable data are simply not matched.
pub fn pair_live_with(rows: &[IndexRow], config: &PairingConfig) -> Vec<LiveGroup> {
  let mut photos = BTreeMap::<&str, &IndexRow>::new();
  let mut videos = BTreeMap::<&str, &IndexRow>::new();

  for row in rows {
    let rel = row.rel.as_str();
    // Last row for a `rel` wins, even if its kind changed.
    photos.remove(rel);
    videos.remove(rel);

    match row.kind() {
      AssetKind::Image => {
        photos.insert(rel, row);
      }
      AssetKind::Video => {
        videos.insert(rel, row);
      }
      AssetKind::Other => {}
    }
  }

  let mut groups = Vec::new();
  let mut paired = HashSet::<&str>::new();
  let mut consumed = HashSet::<&str>::new();

  for (&rel, photo) in &photos {
    let Some(content_id) = photo.content_id() else {
      continue;
    };

    let best = videos
      .values()
      .filter(|v| v.content_id() == Some(content_id) && !consumed.contains(v.rel.as_str()))
      .copied()
      .reduce(|best, candidate| {
        if is_better_motion(candidate, best, config) {
          candidate
        } else {
          best
        }
      });

    if let Some(video) = best {
      groups.push(make_group(photo, video, Confidence::ContentId));
      paired.insert(rel);
      consumed.insert(video.rel.as_str());
    }
  }

  let time_tiers: [(Confidence, fn(&IndexRow) -> &str); 2] = [
    (Confidence::StemTime, IndexRow::stem),
    (Confidence::DirectoryTime, IndexRow::parent),
  ];

  for (tier, same_place) in time_tiers {
    for (&rel, photo) in &photos {
      if paired.contains(rel) {
        continue;
      }

      let place = same_place(photo);
      let candidates = videos
        .values()
        .copied()
        .filter(|v| same_place(v) == place && !consumed.contains(v.rel.as_str()));

      if let Some(video) = match_by_time(photo, candidates, config.time_delta) {
        groups.push(make_group(photo, video, tier));
        paired.insert(rel);
        consumed.insert(video.rel.as_str());
      }
    }
  }

  log::debug!(
    "Paired {} Live Photos from {} stills and {} clips.",
    groups.len(),
    photos.len(),
    videos.len()
  );

  groups
}

/// Scores how typical a clip duration is for a Live Photo. Higher is better.
/// Inside the preferred window, durations closer to its midpoint score higher.
/// Any duration inside the window beats any duration outside it.
pub fn duration_score(dur: f64, (min, max): (f64, f64)) -> f64 {
  if dur < min {
    dur - min
  } else if dur > max {
    -dur
  } else {
    let mid = (min + max) / 2.0;
    max - (mid - dur).abs()
  }
}

/// Whether `candidate` should replace `best` among clips sharing a still's
/// `content_id`. A better duration score wins outright. On a tie, or when
/// either duration is unknown, the earlier still image time wins.
fn is_better_motion(candidate: &IndexRow, best: &IndexRow, config: &PairingConfig) -> bool {
  if let (Some(candidate_dur), Some(best_dur)) = (candidate.dur, best.dur) {
    let candidate_score = duration_score(candidate_dur, config.duration_preferred);
    let best_score = duration_score(best_dur, config.duration_preferred);

    if candidate_score > best_score {
      return true;
    }
    if candidate_score < best_score {
      return false;
    }
  }

  matches!(
    (candidate.still_image_time, best.still_image_time),
    (Some(c), Some(b)) if c < b
  )
}

/// Returns the candidate nearest in time to `photo`, if within `max_delta`
/// seconds. The first candidate wins ties. Rows without a usable timestamp are
/// never matched.
fn match_by_time<'a>(
  photo: &IndexRow,
  candidates: impl IntoIterator<Item = &'a IndexRow>,
  max_delta: f64,
) -> Option<&'a IndexRow> {
  let photo_time = photo.timestamp()?;
  let mut best: Option<(f64, &IndexRow)> = None;

  for candidate in candidates {
    let Some(time) = candidate.timestamp() else {
      continue;
    };

    let delta = (time - photo_time).abs();
    if delta > max_delta {
      continue;
    }

    if best.is_none_or(|(best_delta, _)| delta < best_delta) {
      best = Some((delta, candidate));
    }
  }

  best.map(|(_, candidate)| candidate)
}

fn make_group(photo: &IndexRow, video: &IndexRow, confidence: Confidence) -> LiveGroup {
  log::trace!("{photo} <-> {video} ({:.1}).", confidence.score());

  LiveGroup::new(
    &photo.rel,
    &video.rel,
    video.content_id().or(photo.content_id()),
    video.still_image_time,
    confidence,
  )
}

#[cfg(test)]
mod test_pair_live {
  use super::*;
  use crate::testing::*;

  const T0: &str = "2024-05-01T10:00:00Z";

  #[test]
  fn pairs_by_content_id() {
    let rows = [
      row!("rel": "A.HEIC", "mime": "image/heic", "content_id": "X", "dt": T0),
      row!("rel": "A.MOV", "mime": "video/quicktime", "content_id": "X", "dur": 2.0, "still_image_time": 0.3),
    ];

    let groups = pair_live(&rows);

    assert_groups!(groups, [("A.HEIC", "A.MOV", Confidence::ContentId)]);
    assert_eq!(groups[0].content_id.as_deref(), Some("X"));
    assert_eq!(groups[0].still_image_time, Some(0.3));
    assert_eq!(groups[0].id, crate::prim::group_id("A.HEIC", "A.MOV"));
  }

  #[test]
  fn pairs_by_stem_and_time() {
    let rows = [
      row!("rel": "B.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "B.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 1000))),
    ];

    let groups = pair_live(&rows);

    assert_groups!(groups, [("B.JPG", "B.MOV", Confidence::StemTime)]);
    assert_eq!(groups[0].content_id, None);
  }

  #[test]
  fn pairs_by_directory_and_time() {
    let rows = [
      row!("rel": "trip/C.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "trip/D.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 2900))),
    ];

    assert_groups!(pair_live(&rows), [("trip/C.JPG", "trip/D.MOV", Confidence::DirectoryTime)]);
  }

  #[test]
  fn rejects_time_difference_over_threshold() {
    let rows = [
      row!("rel": "C.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "C.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 3100))),
      row!("rel": "D.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, -3100))),
    ];

    assert_groups!(pair_live(&rows), []);
  }

  #[test]
  fn accepts_time_difference_at_threshold() {
    let rows = [
      row!("rel": "C.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "C.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, -3000))),
    ];

    assert_groups!(pair_live(&rows), [("C.JPG", "C.MOV", Confidence::StemTime)]);
  }

  #[test]
  fn respects_configured_threshold() {
    let rows = [
      row!("rel": "C.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "C.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 5000))),
    ];
    let config = PairingConfig {
      time_delta: 10.0,
      ..Default::default()
    };

    assert_groups!(pair_live_with(&rows, &config), [("C.JPG", "C.MOV", Confidence::StemTime)]);
  }

  #[test]
  fn pairs_stem_across_directories() {
    let rows = [
      row!("rel": "a/X.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "b/X.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 500))),
    ];

    assert_groups!(pair_live(&rows), [("a/X.JPG", "b/X.MOV", Confidence::StemTime)]);
  }

  #[test]
  fn prefers_nearest_stem_across_directories() {
    let rows = [
      row!("rel": "a/X.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "a/X.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 2500))),
      row!("rel": "b/X.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 400))),
    ];

    assert_groups!(pair_live(&rows), [("a/X.JPG", "b/X.MOV", Confidence::StemTime)]);
  }

  #[test]
  fn prefers_stronger_tiers() {
    let rows = [
      row!("rel": "E.HEIC", "mime": "image/heic", "content_id": "Y", "dt": T0),
      row!("rel": "E.MOV", "mime": "video/quicktime", "dt": T0),
      row!("rel": "F.MOV", "mime": "video/quicktime", "content_id": "Y", "dt": (iso_offset(T0, 60_000))),
      row!("rel": "G.JPG", "mime": "image/jpeg", "dt": (iso_offset(T0, 1000))),
    ];

    assert_groups!(
      pair_live(&rows),
      [
        ("E.HEIC", "F.MOV", Confidence::ContentId),
        ("G.JPG", "E.MOV", Confidence::DirectoryTime),
      ]
    );
  }

  #[test]
  fn uses_each_asset_once() {
    let rows = [
      row!("rel": "P1.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "P2.JPG", "mime": "image/jpeg", "dt": (iso_offset(T0, 500))),
      row!("rel": "V.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 1000))),
    ];

    assert_groups!(pair_live(&rows), [("P1.JPG", "V.MOV", Confidence::DirectoryTime)]);
  }

  #[test]
  fn uses_each_clip_once_for_shared_content_id() {
    let rows = [
      row!("rel": "A.HEIC", "mime": "image/heic", "content_id": "X"),
      row!("rel": "B.HEIC", "mime": "image/heic", "content_id": "X"),
      row!("rel": "A.MOV", "mime": "video/quicktime", "content_id": "X", "dur": 2.0),
    ];

    assert_groups!(pair_live(&rows), [("A.HEIC", "A.MOV", Confidence::ContentId)]);
  }

  #[test]
  fn nearest_clip_wins() {
    let rows = [
      row!("rel": "H.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "H1.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 2000))),
      row!("rel": "H2.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, -800))),
    ];

    assert_groups!(pair_live(&rows), [("H.JPG", "H2.MOV", Confidence::DirectoryTime)]);
  }

  #[test]
  fn prefers_typical_duration_for_content_id() {
    let rows = [
      row!("rel": "A.HEIC", "mime": "image/heic", "content_id": "X"),
      row!("rel": "A1.MOV", "mime": "video/quicktime", "content_id": "X", "dur": 8.0, "still_image_time": 0.1),
      row!("rel": "A2.MOV", "mime": "video/quicktime", "content_id": "X", "dur": 2.2, "still_image_time": 1.5),
    ];

    assert_groups!(pair_live(&rows), [("A.HEIC", "A2.MOV", Confidence::ContentId)]);
  }

  #[test]
  fn breaks_duration_ties_by_still_image_time() {
    let rows = [
      row!("rel": "A.HEIC", "mime": "image/heic", "content_id": "X"),
      row!("rel": "A1.MOV", "mime": "video/quicktime", "content_id": "X", "dur": 2.0, "still_image_time": 0.5),
      row!("rel": "A2.MOV", "mime": "video/quicktime", "content_id": "X", "dur": 2.0, "still_image_time": 0.2),
    ];

    assert_groups!(pair_live(&rows), [("A.HEIC", "A2.MOV", Confidence::ContentId)]);
  }

  #[test]
  fn uses_still_image_time_without_duration() {
    let rows = [
      row!("rel": "A.HEIC", "mime": "image/heic", "content_id": "X"),
      row!("rel": "A1.MOV", "mime": "video/quicktime", "content_id": "X", "dur": 2.0, "still_image_time": 0.9),
      row!("rel": "A2.MOV", "mime": "video/quicktime", "content_id": "X", "still_image_time": 0.4),
    ];

    assert_groups!(pair_live(&rows), [("A.HEIC", "A2.MOV", Confidence::ContentId)]);
  }

  #[test]
  fn is_independent_of_input_order() {
    let mut rows = vec![
      row!("rel": "A.HEIC", "mime": "image/heic", "content_id": "X"),
      row!("rel": "A.MOV", "mime": "video/quicktime", "content_id": "X"),
      row!("rel": "B.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "C.JPG", "mime": "image/jpeg", "dt": (iso_offset(T0, 100))),
      row!("rel": "B.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 200))),
      row!("rel": "D.MOV", "mime": "video/quicktime", "dt": (iso_offset(T0, 300))),
    ];

    let forward = pair_live(&rows);
    rows.reverse();
    let reverse = pair_live(&rows);

    assert_eq!(forward, reverse);
    assert_groups!(
      forward,
      [
        ("A.HEIC", "A.MOV", Confidence::ContentId),
        ("B.JPG", "B.MOV", Confidence::StemTime),
        ("C.JPG", "D.MOV", Confidence::DirectoryTime),
      ]
    );
  }

  #[test]
  fn ignores_bad_timestamps() {
    let rows = [
      row!("rel": "I.JPG", "mime": "image/jpeg", "dt": "yesterday"),
      row!("rel": "I.MOV", "mime": "video/quicktime", "dt": T0),
      row!("rel": "J.JPG", "mime": "image/jpeg", "dt": T0),
      row!("rel": "J.MOV", "mime": "video/quicktime"),
    ];

    assert_groups!(pair_live(&rows), [("J.JPG", "I.MOV", Confidence::DirectoryTime)]);
  }

  #[test]
  fn ignores_other_kinds() {
    let rows = [
      row!("rel": "K.JPG", "dt": T0),
      row!("rel": "K.MOV", "mime": "video/quicktime", "dt": T0),
      row!("rel": "K.XMP", "mime": "application/rdf+xml", "dt": T0),
      row!("rel": "L.HEIC", "mime": "image/heic", "content_id": ""),
      row!("rel": "L.MOV", "mime": "video/quicktime", "content_id": ""),
    ];

    assert_groups!(pair_live(&rows), []);
  }

  #[test]
  fn keeps_last_duplicate_row() {
    let rows = [
      row!("rel": "M.HEIC", "mime": "image/heic", "content_id": "old"),
      row!("rel": "M.MOV", "mime": "video/quicktime", "content_id": "new"),
      row!("rel": "M.HEIC", "mime": "image/heic", "content_id": "new"),
    ];

    let groups = pair_live(&rows);

    assert_groups!(groups, [("M.HEIC", "M.MOV", Confidence::ContentId)]);
  }

  #[test]
  fn returns_nothing_for_no_rows() {
    assert!(pair_live(&[]).is_empty());
  }
}
