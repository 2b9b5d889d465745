// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rekindle - a multi-channel lead re-engagement engine.
//!
//! This is the binary entry point for the Rekindle daemon.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod console;
mod serve;
mod status;

use clap::{Parser, Subcommand};

/// Rekindle - a multi-channel lead re-engagement engine.
#[derive(Parser, Debug)]
#[command(name = "rekindle", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Rekindle scheduler daemon.
    Serve,
    /// Show pipeline volume and adapter health.
    Status {
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective merged configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match rekindle_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            rekindle_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        Some(Commands::Config) => show_config(&config),
        None => {
            println!("rekindle: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Runs the `rekindle config` command: dump the merged configuration.
fn show_config(config: &rekindle_config::RekindleConfig) -> Result<(), rekindle_core::RekindleError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| rekindle_core::RekindleError::Config(format!("cannot render config: {e}")))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config = rekindle_config::load_and_validate()
            .expect("default config should be valid");
        assert_eq!(config.engine.name, "rekindle");
    }

    #[test]
    fn config_renders_as_toml() {
        let config = rekindle_config::RekindleConfig::default();
        super::show_config(&config).unwrap();
    }
}
