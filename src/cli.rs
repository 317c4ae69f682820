use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Data directory holding config.yaml, documents and the index.
    /// Defaults to $PROJFIND_BASE_PATH or ~/.local/share/projfind
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[clap(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed a JSON array of documents and save the index.
    Index {
        /// Documents file (defaults to documents_file in config.yaml)
        #[clap(long)]
        from: Option<PathBuf>,
    },
    /// Search indexed documents.
    Search {
        /// Free text query
        query: String,

        /// Maximum number of results (defaults to default_top_k in config.yaml)
        #[clap(short = 'n', long)]
        top_k: Option<usize>,

        /// Output results as JSON
        #[clap(long, default_value = "false")]
        json: bool,
    },
    /// Show index status.
    Status {},
    /// List every indexed document.
    List {
        /// Output documents as JSON
        #[clap(long, default_value = "false")]
        json: bool,
    },
    /// Write a small set of sample projects to try things out.
    Sample {
        /// Output file (defaults to documents_file in config.yaml)
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Start the search daemon.
    Daemon {},
}
