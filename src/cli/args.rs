//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Content-hash asset versioning CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, global = true, default_value = "hashmark.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Version every configured asset
    #[command(visible_alias = "b")]
    Build {
        /// Write versioned files into this directory (enables file caching)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output: Option<PathBuf>,

        /// Write the path -> key manifest to this file
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        manifest: Option<PathBuf>,
    },

    /// Build, then serve versioned files with far-future cache headers
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Static directory for requests that are not versioned keys
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        fallback: Option<PathBuf>,
    },

    /// Print versioned URLs for logical paths
    #[command(visible_alias = "u")]
    Url {
        /// Asset class (image, script, style)
        class: String,

        /// Logical paths, e.g. dir1/abc.jpg
        #[arg(required = true)]
        paths: Vec<String>,

        /// Resolve from a manifest instead of building
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        manifest: Option<PathBuf>,
    },
}
