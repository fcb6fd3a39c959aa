//! Binary entrypoint for the Xiuxian CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `play --player <id> [--name <name>]` - interactive session on stdin
//! - `exec --player <id> <command...>` - run a single game command
//! - `ranking [--limit <n>]` - print the power leaderboard
//! - `export-catalog [--output <file>]` - dump the active content catalog as JSON
//!
//! See the library crate docs for module-level details: `xiuxian::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use xiuxian::config::Config;
use xiuxian::game::commands::{format_ranking, handle_command};
use xiuxian::game::{Catalog, Game, XiuxianStore};

#[derive(Parser)]
#[command(name = "xiuxian")]
#[command(about = "Rule engine for a chat-driven cultivation role-playing game")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Play interactively, one command per line
    Play {
        /// Player identity (e.g. qq:10001)
        #[arg(short, long)]
        player: String,
        /// Display name used on first contact
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Run a single command for a player and print the reply
    Exec {
        #[arg(short, long)]
        player: String,
        #[arg(short, long)]
        name: Option<String>,
        /// Command text, e.g. `alchemy foundation pill`
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Print the power leaderboard
    Ranking {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Write the active content catalog as JSON
    ExportCatalog {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            if std::path::Path::new(&cli.config).exists() {
                return Err(anyhow!("{} already exists; not overwriting", cli.config));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Play { player, name } => {
            let config = require_config(pre_config, &cli.config)?;
            let game = open_game(&config)?;
            let name = name.unwrap_or_else(|| player.clone());
            info!("Interactive session for {}", player);

            let mut stdout = tokio::io::stdout();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            while let Some(line) = lines.next_line().await? {
                let line = line.trim();
                if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                    break;
                }
                if !line.is_empty() {
                    let reply = handle_command(&game, &player, &name, line);
                    stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
                }
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
            }
        }
        Commands::Exec {
            player,
            name,
            command,
        } => {
            let config = require_config(pre_config, &cli.config)?;
            let game = open_game(&config)?;
            let name = name.unwrap_or_else(|| player.clone());
            println!("{}", handle_command(&game, &player, &name, &command.join(" ")));
        }
        Commands::Ranking { limit } => {
            let config = require_config(pre_config, &cli.config)?;
            let game = open_game(&config)?;
            let ranked = game.leaderboard(limit)?;
            println!("{}", format_ranking(&game, &ranked));
        }
        Commands::ExportCatalog { output } => {
            let catalog = match &pre_config {
                Some(config) => load_catalog(config)?,
                None => {
                    warn!("No configuration at {}; exporting built-in catalog", cli.config);
                    Catalog::builtin()
                }
            };
            let json = catalog.to_json_pretty()?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    info!("Catalog written to {}", path);
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

fn require_config(config: Option<Config>, path: &str) -> Result<Config> {
    config.ok_or_else(|| anyhow!("Failed to load {}; run `xiuxian init` first", path))
}

fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = match &config.content.catalog_path {
        Some(path) => {
            info!("Loading content catalog from {}", path);
            Catalog::load_json(path)?
        }
        None => Catalog::builtin(),
    };
    catalog.validate()?;
    Ok(catalog)
}

fn open_game(config: &Config) -> Result<Game> {
    let catalog = load_catalog(config)?;
    let store = XiuxianStore::open(config.storage.database_path())?;
    Ok(Game::new(store, catalog, config.rules.clone()))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.clone())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Interactive runs also see log lines on the console
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
