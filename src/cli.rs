use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "filecast")]
#[command(author, version, about = "Upload, catalog and range-streaming server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Upload a file to a running server
    Upload {
        /// File to upload
        #[arg(required = true)]
        path: PathBuf,

        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,

        /// Bearer token for the server
        #[arg(long, env = "FILECAST_TOKEN")]
        token: Option<String>,

        /// Display title for the file
        #[arg(long)]
        title: Option<String>,

        /// Allow range-request streaming of the file
        #[arg(long)]
        streamable: bool,

        /// Content type to declare for the file part
        #[arg(long)]
        mime_type: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
