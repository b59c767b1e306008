//! Binary entry point: parse the CLI, load configuration, initialize
//! tracing, and dispatch to the requested subcommand. `serve` is the
//! default when no subcommand is given, mirroring `main.py`'s
//! `if __name__ == "__main__": asyncio.run(main())`.

use clap::Parser;

use sa_gateway::cli::{config_cmd, doctor, load_config, run, serve, Cli, Command, ConfigAction};

fn init_tracing(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Registry};

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_tracing(&config.logging.level);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve::run(config).await,
        Command::Run { task } => run::run(config, task).await,
        Command::Doctor => doctor::run(config).await,
        Command::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(&config),
            ConfigAction::Validate => config_cmd::validate(&config),
        },
    }
}
