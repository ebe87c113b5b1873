use crate::demo::{run_demo, run_score, run_tier, DemoArgs, ScoreArgs, TierArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use triangular::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Triangular Marketplace",
    about = "Run and explore the Triangular marketplace core from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Look up the tier, progress and graduation status for a reputation total
    Tier(TierArgs),
    /// Score a provider against quote requirements read from a JSON file
    Score(ScoreArgs),
    /// Walk through ledger, eligibility gate, quote matching and stats on in-memory stores
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON array of users to load into the in-memory store before serving
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Tier(args) => run_tier(args),
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
