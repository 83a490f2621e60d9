//! Decanter CLI binary entry point.

use decanter::cli::{Cli, Commands};
use decanter::config::DecanterConfig;
use decanter::session::Session;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("decanter=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = DecanterConfig::load()?;

    match cli.command {
        Commands::Setup(args) => decanter::cli::auth::handle_setup(&config, args.force).await,
        Commands::Status => decanter::cli::auth::handle_status(&config).await,
        Commands::Logout => decanter::cli::auth::handle_logout(&config).await,
        Commands::Submit(args) => {
            let session = Session::connect(config, cli.verbose)?;
            decanter::cli::commands::handle_submit(&session, &args).await
        }
        Commands::List(args) => {
            let session = Session::connect(config, cli.verbose)?;
            decanter::cli::commands::handle_list(&session, &args).await
        }
    }
}
