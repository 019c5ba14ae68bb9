// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Program setup functions.

use std::{fs, io::Write, path::PathBuf};

use env_logger::Builder;
use livepair::config::XDG_CONFIG_NAME;
use log::LevelFilter;

/// Sets up `env_logger` with the format "LEVEL\tmessage" (e.g. "WARN\tsomething
/// went wrong").
///
/// Log levels:
/// Error: Program errors.
/// Warn: Reclaimed locks and other recoverable problems.
/// Info: General program flow and files written.
/// Debug: Detailed index / links operations.
/// Trace: Individual pairs and lock operations.
pub fn configure_logging(verbosity: u8) {
  let level = match verbosity {
    0 => LevelFilter::Info,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };

  Builder::new()
    .filter_level(level)
    .format(|buf, record| {
      let style = buf.default_level_style(record.level());
      writeln!(buf, "{style}{}{style:#}\t{}", record.level(), record.args())
    })
    .init();
}

/// Get album root from provided arg, if present, and write it to
/// `XDG_CONFIG_HOME/livepair`. Else, read album root from there.
pub fn get_or_update_album(path: Option<PathBuf>) -> Result<PathBuf, &'static str> {
  let xdg_dirs = xdg::BaseDirectories::new();

  match path {
    Some(path) => {
      if !path.is_dir() {
        return Err("Album path is not a directory.");
      }
      let config_path = xdg_dirs
        .place_config_file(XDG_CONFIG_NAME)
        .map_err(|_| "Failed to create config directory.")?;
      fs::write(config_path, path.to_str().ok_or("Invalid album path.")?)
        .map_err(|_| "Failed to write album path.")?;
      Ok(path)
    }
    None => {
      let config_path = xdg_dirs
        .get_config_file(XDG_CONFIG_NAME)
        .ok_or("Failed to get XDG directories.")?;
      let album = fs::read_to_string(config_path).map_err(|_| "No album given and no default set.")?;
      Ok(PathBuf::from(album.trim_end()))
    }
  }
}
