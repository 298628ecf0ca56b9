use clap::Parser;
use evalcal::{handle_runtime_commands, init_logging, load_config, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(command = ?cli.command, "dispatching");

    handle_runtime_commands(&cli, &config)
}
