mod commands;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::edit::EventArgs;

#[derive(Parser)]
#[command(name = "daycal")]
#[command(about = "Create, edit and view your calendar events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as an owner; only their events are shown and edited
    Login { owner: String },
    Logout,
    /// Show who is signed in
    Whoami,
    /// Create an event
    New {
        title: String,

        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        #[command(flatten)]
        args: EventArgs,
    },
    /// Change fields of an existing event; unspecified fields are kept
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Drop the clock times and make the event all-day
        #[arg(long, conflicts_with_all = ["start_time", "end_time"])]
        all_day: bool,

        #[command(flatten)]
        args: EventArgs,
    },
    Delete { id: String },
    /// Events grouped under every day they occupy
    List {
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long)]
        from: Option<String>,

        /// Last day (YYYY-MM-DD), defaults to a week after the first
        #[arg(long)]
        to: Option<String>,
    },
    /// Events on one day
    Day {
        /// YYYY-MM-DD, defaults to today
        date: Option<String>,
    },
    /// Month grid with event markers
    Month {
        /// YYYY-MM, defaults to the current month
        month: Option<String>,

        /// Highlighted day (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        select: Option<String>,
    },
    /// Events listed under their start dates
    Agenda {
        /// Day that is always shown (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        select: Option<String>,
    },
    /// Find events by title, description or tag
    Search { query: String },
    /// Show paths and settings, or change a setting
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Change a setting, e.g. `daycal config set show_week_numbers true`
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daycal=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = commands::App::open().await?;

    match cli.command {
        Commands::Login { owner } => commands::session::login(&app, owner).await,
        Commands::Logout => commands::session::logout(&app).await,
        Commands::Whoami => commands::session::whoami(&app),
        Commands::New { title, date, args } => commands::edit::create(&app, title, date, args).await,
        Commands::Update {
            id,
            title,
            date,
            all_day,
            args,
        } => commands::edit::update(&app, id, title, date, all_day, args).await,
        Commands::Delete { id } => commands::edit::delete(&app, id).await,
        Commands::List { from, to } => commands::views::list(&app, from, to).await,
        Commands::Day { date } => commands::views::day(&app, date).await,
        Commands::Month { month, select } => commands::views::month(&app, month, select).await,
        Commands::Agenda { select } => commands::views::agenda(&app, select).await,
        Commands::Search { query } => commands::views::search(&app, &query).await,
        Commands::Config { action: None } => commands::config::show(&app),
        Commands::Config {
            action: Some(ConfigAction::Set { key, value }),
        } => commands::config::set(&app, &key, &value),
    }
}
