use clap::{Parser, Subcommand};

use crate::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "journal-server")]
#[command(version, about = "Journal entry backend with SQLite or JSON-file storage")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServerConfig),

    /// Print stored entries, newest first
    List {
        #[command(flatten)]
        config: ServerConfig,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
