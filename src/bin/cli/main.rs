mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wordloop", about = "Spaced-repetition vocabulary reminders over Telegram", version)]
struct Cli {
    /// Config file (default: <config dir>/wordloop/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Telegram bot and fire reminders until interrupted
    Run,

    /// Save a word and schedule its reminders
    Add {
        /// Owner id (the Telegram chat id)
        #[arg(long)]
        owner: String,
        word: String,
        definition: String,
    },

    /// List an owner's saved words
    List {
        /// Owner id (the Telegram chat id)
        #[arg(long)]
        owner: String,
    },

    /// Show pending reminder jobs, earliest first
    Jobs {
        /// Only jobs for this owner
        #[arg(long)]
        owner: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();

    let exclusive = matches!(cli.command, Command::Run | Command::Add { .. });
    let app = app::App::new(cli.config.as_deref(), cli.data_dir.as_deref(), exclusive)?;

    match cli.command {
        Command::Run => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::run::run(&app))?;
        }
        Command::Add { owner, word, definition } => {
            commands::add::run(&app, &owner, &word, &definition, &cli.format, use_color)?;
        }
        Command::List { owner } => {
            commands::list::run(&app, &owner, &cli.format, use_color)?;
        }
        Command::Jobs { owner } => {
            commands::jobs::run(&app, owner.as_deref(), &cli.format, use_color)?;
        }
    }

    Ok(())
}
