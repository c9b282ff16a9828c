use crate::demo::{run_catalog_listing, run_demo, run_price_quote, CatalogListArgs, DemoArgs, PriceArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use workshop_enrollment::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Workshop Enrollment",
    about = "Browse workshops, run the guided enrollment service, or walk through a demo enrollment",
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
    /// Inspect the workshop catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Run a scripted enrollment from slot choice to submission
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List offerings matching the given filters
    List(CatalogListArgs),
    /// Quote an offering's price for a household index
    Price(PriceArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog {
            command: CatalogCommand::List(args),
        } => run_catalog_listing(args),
        Command::Catalog {
            command: CatalogCommand::Price(args),
        } => run_price_quote(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
