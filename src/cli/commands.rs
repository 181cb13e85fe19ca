use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Fetch, scrape and page through feed sources")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one crawl cycle for a source descriptor (JSON file)
    Crawl {
        /// Path to the descriptor file
        descriptor: PathBuf,

        /// Print the new candidates without storing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch a page and show what an item selector matches
    Preview {
        /// Page URL
        url: String,

        /// CSS selector for list items
        #[arg(long)]
        item: String,

        /// Selector for elements to remove before matching (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Fetch through the rendering backend
        #[arg(long)]
        render: bool,

        /// Rendering backend name (browserless or playwright)
        #[arg(long)]
        backend: Option<String>,
    },

    /// List stored items of a feed, one page at a time
    List {
        /// Feed id
        feed_id: i64,

        /// Page size
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,

        /// Page direction relative to the cursor: before or after
        #[arg(long, default_value = "before")]
        direction: String,

        /// Ordering field: published_at or id
        #[arg(long, default_value = "published_at")]
        order_by: String,
    },

    /// Drop every cached HTML page
    ClearCache,
}
