// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Constants for the album work directory layout and pairing thresholds.

/// Name of the per-album directory holding derived caches.
pub const WORK_DIR_NAME: &str = ".iPhoto";

pub const INDEX_FILE_NAME: &str = "index.jsonl";
pub const LINKS_FILE_NAME: &str = "links.json";
pub const LOCKS_DIR_NAME: &str = "locks";
pub const BACKUP_DIR_NAME: &str = "manifest.bak";

/// Album manifest locations, relative to the album root, in lookup order. New
/// manifests are written to the first.
pub const ALBUM_MANIFEST_NAMES: [&str; 2] = [".iphoto.album.json", ".iPhoto/manifest.json"];

/// Schema tag written into (and expected from) `links.json`.
pub const LINKS_SCHEMA: &str = "iPhoto/links@1";
pub const ALBUM_SCHEMA: &str = "iPhoto/album@1";

// Named resources guarded by file locks.
pub const LOCK_INDEX: &str = "index";
pub const LOCK_LINKS: &str = "links";
pub const LOCK_MANIFEST: &str = "manifest";

/// Maximum difference between still and motion timestamps for the stem and
/// directory tiers, in seconds.
pub const PAIR_TIME_DELTA_SEC: f64 = 3.0;

/// Preferred Live Photo clip duration window (min, max), in seconds.
pub const LIVE_DURATION_PREFERRED: (f64, f64) = (1.0, 3.5);

/// Lock files older than this are presumed abandoned, in seconds.
pub const LOCK_EXPIRE_SEC: u64 = 30;

/// Delay between lock acquisition attempts, in milliseconds.
pub const LOCK_POLL_MS: u64 = 100;

/// Name of the file under `$XDG_CONFIG_HOME` storing the default album.
pub const XDG_CONFIG_NAME: &str = "livepair";
