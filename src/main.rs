//! hashmark - content-hash asset versioning.

mod cli;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, serve::ServeOverrides};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    hashmark::logger::set_verbose(cli.verbose);

    let (config, serve) = cli::load_config(&cli)?;

    match cli.command {
        Commands::Build { output, manifest } => {
            cli::build::build_assets(config, output.as_deref(), manifest.as_deref(), cli.verbose)
        }
        Commands::Serve {
            interface,
            port,
            fallback,
        } => cli::serve::serve_assets(
            config,
            serve,
            ServeOverrides {
                interface,
                port,
                fallback,
            },
            cli.verbose,
        ),
        Commands::Url {
            class,
            paths,
            manifest,
        } => cli::url::print_urls(config, &class, &paths, manifest.as_deref(), cli.verbose),
    }
}
