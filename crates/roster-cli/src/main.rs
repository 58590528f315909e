#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use roster_core::config;
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "roster: org-structure and position-assignment engine",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Path to the SQLite store (overrides config and ROSTER_STORE).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Path to the config file (default: ./roster.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Initialize config and store",
        after_help = "EXAMPLES:\n    rst init\n    rst init --force --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        about = "Manage the unit tree",
        after_help = "EXAMPLES:\n    rst unit add \"Head Office\" --scope hq\n    rst unit add \"West Region\" --scope region --parent 1\n    rst unit move 3 --parent 2\n    rst unit tree"
    )]
    Unit {
        #[command(subcommand)]
        command: cmd::unit::UnitCommand,
    },

    #[command(
        about = "Manage positions",
        after_help = "EXAMPLES:\n    rst pos add 1 \"Director\" --type executive --level top\n    rst pos update 2 --reports-to 1\n    rst pos chain 2\n    rst pos show 2"
    )]
    Pos {
        #[command(subcommand)]
        command: cmd::position::PositionCommand,
    },

    #[command(
        about = "Assign a user to a position",
        after_help = "EXAMPLES:\n    rst assign 1 --user 7\n    rst assign 1 --user 7 --type acting --note \"covering for leave\""
    )]
    Assign(cmd::assign::AssignArgs),

    #[command(
        about = "End an active assignment",
        after_help = "EXAMPLES:\n    rst end 3 --reason resigned\n    rst end 3 --reason leave --note \"parental leave\"\n    rst end 3 --reason completed --date 1735689600000000"
    )]
    End(cmd::assign::EndArgs),

    #[command(
        about = "Move an assignment to another position atomically",
        after_help = "EXAMPLES:\n    rst transfer 3 --to 2"
    )]
    Transfer(cmd::assign::TransferArgs),

    #[command(
        about = "Show a user's assignment history",
        after_help = "EXAMPLES:\n    rst history 7\n    rst history 7 --json"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        about = "Organization statistics",
        after_help = "EXAMPLES:\n    rst stats\n    rst stats --json"
    )]
    Stats(cmd::stats::StatsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ROSTER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "roster=debug,info"
        } else {
            "roster=info,warn"
        })
    });

    let format = env::var("ROSTER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = std::env::current_dir()?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| project_root.join(config::CONFIG_FILE));
    let cfg = config::load_config(&config_path)?;

    let store = config::resolve_store_path(cli.store.as_deref(), &cfg);
    let output = OutputMode::from_name(&config::resolve_output(cli.json, &cfg)?);

    match cli.command {
        Commands::Init(ref args) => {
            cmd::init::run_init(args, output, &project_root, &store)
        }
        Commands::Unit { ref command } => match command {
            cmd::unit::UnitCommand::Add(args) => cmd::unit::run_add(args, output, &store),
            cmd::unit::UnitCommand::Move(args) => cmd::unit::run_move(args, output, &store),
            cmd::unit::UnitCommand::Rm(args) => cmd::unit::run_rm(args, output, &store),
            cmd::unit::UnitCommand::Tree(args) => cmd::unit::run_tree(args, output, &store),
        },
        Commands::Pos { ref command } => match command {
            cmd::position::PositionCommand::Add(args) => {
                cmd::position::run_add(args, output, &store)
            }
            cmd::position::PositionCommand::Update(args) => {
                cmd::position::run_update(args, output, &store)
            }
            cmd::position::PositionCommand::Rm(args) => {
                cmd::position::run_rm(args, output, &store)
            }
            cmd::position::PositionCommand::Show(args) => {
                cmd::position::run_show(args, output, &store)
            }
            cmd::position::PositionCommand::Chain(args) => {
                cmd::position::run_chain(args, output, &store)
            }
            cmd::position::PositionCommand::List(args) => {
                cmd::position::run_list(args, output, &store)
            }
        },
        Commands::Assign(ref args) => cmd::assign::run_assign(args, output, &store),
        Commands::End(ref args) => cmd::assign::run_end(args, output, &store),
        Commands::Transfer(ref args) => cmd::assign::run_transfer(args, output, &store),
        Commands::History(ref args) => cmd::history::run_history(args, output, &store),
        Commands::Stats(ref args) => cmd::stats::run_stats(args, output, &store),
    }
}
