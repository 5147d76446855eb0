use clap::Parser;
use securevault::cli::{commands, output, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "securevault=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Register => commands::register::execute(&cli).await,
        Commands::Add {
            ref website,
            ref username,
        } => commands::add::execute(&cli, website, username).await,
        Commands::List { ref reveal } => commands::list::execute(&cli, reveal).await,
        Commands::Show { id } => commands::show::execute(&cli, id).await,
        Commands::Delete { id, force } => commands::delete::execute(&cli, id, force).await,
        Commands::Reset { force } => commands::reset::execute(&cli, force).await,
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
