// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Portrait - generates profile-picture variations and rotates them.
//!
//! This is the binary entry point.

mod generate;
mod serve;
mod show_config;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use portrait_config::PortraitConfig;

/// Portrait - generates profile-picture variations and rotates them.
#[derive(Parser, Debug)]
#[command(name = "portrait", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server, tab bridge and rotation scheduler.
    Serve,
    /// Generate one batch of variations and exit.
    Generate {
        /// Number of variations (1-50).
        #[arg(long, default_value_t = 10)]
        count: u32,
        /// Use local filters only, even if a provider key is configured.
        #[arg(long)]
        local: bool,
        /// Base photo to use instead of the one in the base folder.
        #[arg(long)]
        base: Option<PathBuf>,
    },
    /// Show whether a server is running and how many images it has.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Print the resolved configuration.
    Config,
}

fn load_config(path: Option<&std::path::Path>) -> PortraitConfig {
    let loaded = match path {
        Some(path) => portrait_config::load_and_validate_path(path),
        None => portrait_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            portrait_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portrait={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.server.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Generate { count, local, base }) => {
            generate::run_generate(&config, count, local, base.as_deref())
                .await
                .map(|outcome| generate::print_outcome(&outcome, &config.storage.image_dir))
        }
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Config) => {
            show_config::render_config(&config).map(|text| print!("{text}"))
        }
        None => {
            println!("portrait: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("portrait: {e}");
        std::process::exit(1);
    }
}
