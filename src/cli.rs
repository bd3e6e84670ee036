//! Command-line interface definitions for Feed Syndicator.
//!
//! Flags override the matching values in the YAML config file.

use crate::models::Mode;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one publishing run.
///
/// # Examples
///
/// ```sh
/// # Publish the newest feed entry
/// feed_syndicator -c config.yaml
///
/// # Pick a random entry and generate a batch of posts, without posting
/// feed_syndicator --mode daily --num-posts 4 --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, env = "SYNDICATOR_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Generate and log posts without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Which article to publish and how to write it
    #[arg(short, long, value_enum, default_value_t = Mode::Latest)]
    pub mode: Mode,

    /// History file path (overrides `history.path`)
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Posts per daily batch (overrides `generator.num_posts`)
    #[arg(long)]
    pub num_posts: Option<usize>,
}
