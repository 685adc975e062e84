use crate::demo::{run_demo, run_valuation, DemoArgs, ValuateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use cost_matrix::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Cost Matrix Valuation",
    about = "Serve and exercise the building cost valuation engine from the command line",
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
    /// Value a single improvement against the configured rate table
    Valuate(ValuateArgs),
    /// Value the sample parcel roll and print a scenario sweep
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
    /// Load rate tables from this CSV export instead of the bundled sample
    #[arg(long)]
    pub(crate) rate_table_csv: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Valuate(args) => run_valuation(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
