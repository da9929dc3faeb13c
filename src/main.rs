mod cli;
mod server;
mod tools;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flowfriend::config::FlowFriendConfig;
use flowfriend::tracking::types::parse_observation_time;
use flowfriend::tracking::{Flow, Mood, NewEntry, Pain, Sleep};

use cli::screens::Tracker;
use cli::AppContext;

#[derive(Parser)]
#[command(name = "flowfriend", version, about = "Cycle tracker with a device feed and model-backed advice")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct TrackerArgs {
    /// Number of recent entries to show (defaults to [tracking].default_limit)
    #[arg(long)]
    limit: Option<usize>,
    /// Keep the screen open and redraw on new entries
    #[arg(long)]
    follow: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Home screen
    Home,
    /// Flow tracker
    Flow(TrackerArgs),
    /// Pain tracker
    Pain(TrackerArgs),
    /// Sleep tracker
    Sleep(TrackerArgs),
    /// Mood tracker
    Mood(TrackerArgs),
    /// Predict the next period and show wellness insights
    Predict,
    /// Health chat
    Chat,
    /// Log a manual entry
    Log {
        #[arg(long)]
        flow: Option<Flow>,
        #[arg(long)]
        mood: Option<Mood>,
        #[arg(long)]
        pain: Option<Pain>,
        #[arg(long)]
        sleep: Option<Sleep>,
        /// Day the entry applies to (YYYY-MM-DD or RFC 3339); defaults to now
        #[arg(long)]
        date: Option<String>,
    },
    /// Show or update the profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        /// Typical cycle length in days
        #[arg(long)]
        cycle_length: Option<u32>,
    },
    /// Write a demo month of entries
    Seed {
        /// Seed the signed-in user instead of the demo identity
        #[arg(long)]
        current_user: bool,
    },
    /// Serve the device endpoint and MCP over HTTP, mirroring the feed
    Serve,
    /// Run the MCP server on stdio
    Mcp,
    /// Check database health
    Doctor,
}

async fn run_tracker(config: FlowFriendConfig, tracker: Tracker, args: TrackerArgs) -> Result<()> {
    let limit = args.limit.unwrap_or(config.tracking.default_limit).max(1);
    let ctx = AppContext::open(config)?;
    cli::screens::tracker(&ctx, tracker, limit, args.follow).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = FlowFriendConfig::load()?;

    // Log to stderr so stdout stays clean for screens and MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Home => {
            let ctx = AppContext::open(config)?;
            cli::screens::home(&ctx).await?;
        }
        Command::Flow(args) => run_tracker(config, Tracker::Flow, args).await?,
        Command::Pain(args) => run_tracker(config, Tracker::Pain, args).await?,
        Command::Sleep(args) => run_tracker(config, Tracker::Sleep, args).await?,
        Command::Mood(args) => run_tracker(config, Tracker::Mood, args).await?,
        Command::Predict => {
            let ctx = AppContext::open(config)?;
            cli::predict::predict(&ctx).await?;
        }
        Command::Chat => {
            let ctx = AppContext::open(config)?;
            cli::chat::chat(&ctx).await?;
        }
        Command::Log {
            flow,
            mood,
            pain,
            sleep,
            date,
        } => {
            let recorded_at = date
                .as_deref()
                .map(|raw| {
                    parse_observation_time(raw).ok_or_else(|| anyhow!("invalid date: {raw}"))
                })
                .transpose()?;
            let entry = NewEntry {
                flow: flow.unwrap_or_default(),
                mood: mood.unwrap_or_default(),
                pain: pain.unwrap_or_default(),
                sleep: sleep.unwrap_or_default(),
                recorded_at,
                ..NewEntry::manual()
            };
            let ctx = AppContext::open(config)?;
            cli::log::log(&ctx, entry).await?;
        }
        Command::Profile { name, cycle_length } => {
            let ctx = AppContext::open(config)?;
            cli::profile::profile(&ctx, name, cycle_length).await?;
        }
        Command::Seed { current_user } => {
            let ctx = AppContext::open(config)?;
            cli::seed::seed(&ctx, current_user).await?;
        }
        Command::Serve => server::serve_http(config).await?,
        Command::Mcp => server::serve_stdio(config).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
