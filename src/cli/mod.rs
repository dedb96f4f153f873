pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::storage::ResultLayout;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every internal page reachable from the seed URLs
    Crawl {
        /// Seed URLs, crawled one after another
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Site profile to use instead of the default configuration
        #[arg(short, long)]
        profile: Option<String>,

        /// Checkpoint file to write results to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the scroll-and-settle wait for dynamic content
        #[arg(long)]
        no_dynamic_wait: bool,

        /// Browser to render with (auto, chrome, firefox, static)
        #[arg(short, long)]
        browser: Option<String>,

        /// Checkpoint layout (array, map)
        #[arg(long, value_parser = parse_layout)]
        layout: Option<ResultLayout>,

        /// WebDriver server URL
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Disable the randomized delay between pages
        #[arg(long)]
        no_politeness: bool,
    },

    /// Manage configuration profiles
    Config {
        /// Profile name to manage
        #[arg(required = false)]
        profile: Option<String>,

        /// List all available profiles
        #[arg(short, long)]
        list: bool,
    },
}

fn parse_layout(value: &str) -> std::result::Result<ResultLayout, String> {
    match value.to_lowercase().as_str() {
        "array" => Ok(ResultLayout::Array),
        "map" => Ok(ResultLayout::Map),
        other => Err(format!("unknown layout '{}', expected 'array' or 'map'", other)),
    }
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Crawl {
            seeds,
            profile,
            output,
            no_dynamic_wait,
            browser,
            layout,
            webdriver_url,
            no_politeness,
        } => {
            info!("Starting crawl of {} seed(s)", seeds.len());
            commands::crawl(commands::CrawlOptions {
                seeds,
                profile,
                output,
                dynamic_wait: !no_dynamic_wait,
                browser,
                layout,
                webdriver_url,
                politeness: !no_politeness,
            })
            .await
        },
        Commands::Config { profile, list } => {
            if list {
                info!("Listing all configuration profiles");
                commands::list_profiles().await
            } else if let Some(profile_name) = profile {
                info!("Managing configuration profile: {}", profile_name);
                commands::manage_profile(profile_name).await
            } else {
                info!("Showing current configuration");
                commands::show_config().await
            }
        },
    }
}
