use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gtd_review::app::{self, AppContext, Cli, ContextOptions};
use gtd_review::domain::ReviewClock;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = ContextOptions {
        home: cli.home.clone(),
        config: cli.config.clone(),
        user: cli.user.clone(),
    };

    let config = AppContext::load(&options)?;

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ctx = AppContext::build(&options, config, ReviewClock::system())?;
    tracing::debug!(user = %ctx.user, root = %ctx.paths.root().display(), "context ready");

    let report = app::run(&ctx, cli.command).await?;
    let output = report.render(cli.json)?;
    print!("{}", output);
    if cli.json {
        println!();
    }
    Ok(())
}
