use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use name_search::api_client::AutocompleteClient;
use name_search::config::config::Config;
use name_search::core::{SearchController, SearchState};
use name_search::search_tui::run_search_tui;
use name_search::utils::{dual_logging, logging};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "name-search",
    version,
    about = "Search box for a remote name-autocomplete service"
)]
struct Cli {
    /// Autocomplete endpoint, overrides the config file
    #[arg(long, env = "NAME_SEARCH_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Read settings from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive search box (default)
    Tui,

    /// Run a single search and print the suggestions
    Query {
        /// Text to search for, sent exactly as given
        text: String,

        /// Print the resulting state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a commented default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print where the config file is read from
    ConfigPath,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::InitConfig { force }) => {
            init_config(&cli, *force)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Command::ConfigPath) => {
            println!("{}", config_path(&cli)?.display());
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let interactive = matches!(cli.command, None | Some(Command::Tui));
    let mirror_stderr = !interactive && std::env::var("NAME_SEARCH_DEBUG").is_ok();
    let log_buffer = logging::init_tracing(mirror_stderr);

    if !interactive {
        if let Some(dual_logger) = dual_logging::get_dual_logger() {
            if mirror_stderr {
                eprintln!("Debug logs will be written to:");
                eprintln!("   {}", dual_logger.log_path().display());
            }
        }
    }

    let config = load_config(&cli)?.with_overrides(cli.endpoint.clone(), cli.timeout);
    let client = AutocompleteClient::new(&config.endpoint)?;
    tracing::info!(target: "main", "Using endpoint {}", client.endpoint());
    let controller = SearchController::new(Arc::new(client), config.messages.clone());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    match cli.command {
        Some(Command::Query { text, json }) => {
            let mut controller = controller;
            let state = runtime.block_on(controller.submit_search(&text)).clone();
            print_state(&state, json, &config)
        }
        _ => {
            run_search_tui(
                controller,
                runtime.handle().clone(),
                config.display.clone(),
                Some(log_buffer),
            )?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Config::get_config_path(),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn init_config(cli: &Cli, force: bool) -> Result<()> {
    let path = config_path(cli)?;
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Config::create_default_with_comments())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Configuration saved to: {}", path.display());
    Ok(())
}

/// Print the final state of a one-shot query; a failed search exits non-zero
fn print_state(state: &SearchState, json: bool, config: &Config) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else {
        match state {
            SearchState::Success(names) => {
                let icons = &config.display.icons;
                if config.display.show_count {
                    println!(
                        "{} {}",
                        icons.success,
                        format!("Найдено совпадений: {}", names.len()).green()
                    );
                }
                for name in names {
                    println!("  {}", name);
                }
            }
            SearchState::Failed(message) => {
                eprintln!("{} {}", config.display.icons.error, message.as_str().red());
            }
            SearchState::Idle | SearchState::Loading => {}
        }
    }

    Ok(ExitCode::from(exit_status(state)))
}

fn exit_status(state: &SearchState) -> u8 {
    match state {
        SearchState::Failed(_) => 1,
        _ => 0,
    }
}
