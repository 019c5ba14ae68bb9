// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Pairs Live Photo stills with their motion clips and maintains the album
//! cache (`.iPhoto/`) holding the results.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use livepair::Album;

mod commands;
mod setup;

#[derive(Parser)]
struct Args {
  /// Album directory. Updates default in XDG_CONFIG_HOME.
  #[arg(short, global = true)]
  album: Option<PathBuf>,

  /// Verbosity level. Max: 2.
  #[arg(short, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Rebuild Live Photo pairings from the index.
  Pair,
  /// Merge scanner output rows (JSONL) into the index and refresh links.
  Ingest { rows: PathBuf },
  /// Remove rows from the index and refresh links.
  Rm {
    #[arg(required = true)]
    rels: Vec<String>,
  },
  /// Print asset and Live Photo counts.
  Report,
  /// Write the album manifest, creating it with defaults if missing.
  Init,
  /// Set the album cover.
  Cover { rel: String },
  /// Add or remove featured assets.
  Feature {
    #[command(subcommand)]
    action: FeatureAction,
  },
}

#[derive(Subcommand)]
enum FeatureAction {
  Add { reference: String },
  Rm { reference: String },
}

fn main() {
  let args = Args::parse();
  setup::configure_logging(args.verbose);

  let root = match setup::get_or_update_album(args.album) {
    Ok(path) => path,
    Err(e) => {
      log::error!("{e}");
      std::process::exit(1);
    }
  };

  let res = Album::open(&root).and_then(|album| match &args.command {
    Commands::Pair => commands::pair(&album),
    Commands::Ingest { rows } => commands::ingest(&album, rows),
    Commands::Rm { rels } => commands::remove(&album, rels),
    Commands::Report => commands::report(&album),
    Commands::Init => commands::init(&album),
    Commands::Cover { rel } => commands::set_cover(&album, rel),
    Commands::Feature {
      action: FeatureAction::Add { reference },
    } => commands::feature(&album, reference, true),
    Commands::Feature {
      action: FeatureAction::Rm { reference },
    } => commands::feature(&album, reference, false),
  });

  if let Err(e) = res {
    log::error!("{e}");
    std::process::exit(1);
  }
}
