use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use coin_islands::config::{load_config, Config, DEFAULT_CONFIG_FILE};
use coin_islands::ledger::{format_coins, LedgerStore};
use coin_islands::logfile::{export_log, import_log};
use coin_islands::logging;
use coin_islands::storage::FileStore;
use coin_islands::tiles::layout;
use coin_islands::transfer::{TransactionProcessor, TransferRequest};

//==================== CLI ====================//

#[derive(Parser)]
#[command(
    name = "islands",
    version,
    about = "Shared coin ledger: players, password-gated transfers, transaction log"
)]
struct Cli {
    /// TOML config file; ignored when missing.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Storage file, overrides `store_path` from the config.
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every player with balance and island size.
    Players,
    /// Add a player with the starting balance.
    AddPlayer {
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Move coins between two players (indices as shown by `players`).
    Transfer {
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
        /// Multiple of 1000.
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
        /// Sender's password.
        #[arg(long)]
        password: String,
    },
    /// Print the transaction log, oldest first.
    Log,
    /// Write the log as plain text, one entry per line.
    ExportLog {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the log with the lines of a `.txt` file.
    ImportLog { path: PathBuf },
    /// Toggle the dark theme preference.
    Theme {
        /// Only print the current preference.
        #[arg(long)]
        show: bool,
    },
}

//==================== commands ====================//

fn players_cmd(store: &LedgerStore<FileStore>) {
    println!("{:<3} {:<20} {:>12}  {:>8}  {}", "#", "player", "coins", "island", "color");
    for (idx, tile) in layout(store.players()).iter().enumerate() {
        println!(
            "{:<3} {:<20} {:>12}  {:>6.0}px  {}",
            idx,
            tile.name,
            format_coins(u128::from(tile.balance)),
            tile.size_px,
            tile.color
        );
    }
    println!("total: {} coins", format_coins(store.total_balance()));
}

fn transfer_cmd(
    store: &mut LedgerStore<FileStore>,
    cfg: &Config,
    request: TransferRequest,
) -> Result<()> {
    if store.players().len() < 2 {
        return Err(anyhow!("Not enough players to make a transaction."));
    }
    let processor = TransactionProcessor::new(cfg.timestamp_format.clone());
    let entry = processor.execute(store, &request)?;
    println!("{entry}");
    Ok(())
}

fn log_cmd(store: &LedgerStore<FileStore>) {
    if store.log().is_empty() {
        println!("No transactions yet.");
        return;
    }
    for entry in store.log() {
        println!("{entry}");
    }
}

fn theme_cmd(store: &mut LedgerStore<FileStore>, show: bool) -> Result<()> {
    let dark = if show {
        store.is_dark_theme()
    } else {
        store.toggle_theme()?
    };
    println!("theme: {}", if dark { "dark" } else { "light" });
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut cfg = load_config(&cli.config)?;
    if let Some(path) = cli.store {
        cfg.store_path = path;
    }
    let backend = FileStore::open(&cfg.store_path)
        .with_context(|| format!("open store {}", cfg.store_path.display()))?;
    let mut store = LedgerStore::open(backend)?;

    match cli.command {
        Command::Players => players_cmd(&store),
        Command::AddPlayer { name, password } => {
            let player = store.add_player(&name, &password)?;
            println!("Player {} added successfully.", player.name);
        }
        Command::Transfer {
            from,
            to,
            amount,
            password,
        } => transfer_cmd(
            &mut store,
            &cfg,
            TransferRequest {
                sender: from,
                receiver: to,
                amount,
                credential: password,
            },
        )?,
        Command::Log => log_cmd(&store),
        Command::ExportLog { out } => {
            let path = out.unwrap_or_else(|| cfg.export_path.clone());
            let count = export_log(&store, &path)?;
            println!("{count} entries written to {}", path.display());
        }
        Command::ImportLog { path } => {
            let count = import_log(&mut store, &path)?;
            println!("Log file uploaded successfully ({count} entries).");
        }
        Command::Theme { show } => theme_cmd(&mut store, show)?,
    }
    Ok(())
}

//==================== main ====================//

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}
