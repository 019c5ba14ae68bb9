// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Live Photo pairing and the crash-safe album cache behind it.
//!
//! An album keeps its derived data under `.iPhoto/`: the asset index
//! (`index.jsonl`), the current pairing (`links.json`), lock files and backups
//! of replaced links documents.

pub mod album;
pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod links;
pub mod lock;
pub mod manifest;
pub mod pairing;
pub mod prim;

pub use album::{Album, Report};
pub use error::{Error, Result};
pub use pairing::{pair_live, pair_live_with};

#[cfg(test)]
mod testing;
