use anyhow::Result;
use clap::Parser;

use mdrun_bridge::cli::Cli;
use mdrun_bridge::{app, config, util};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings(cli.config.as_deref())?;

    util::init_tracing(settings.debug_logging);
    util::install_panic_hook();

    app::execute(cli.command, settings).await
}
