#![forbid(unsafe_code)]

mod cli;
mod commands;
mod console;
mod shutdown;
mod startup;

use anyhow::Result;

use cli::Command;
use startup::Runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();
    let output = cli.output;

    match cli.command.unwrap_or(Command::Console) {
        Command::Version => {
            commands::cmd_version();
            Ok(())
        }

        Command::Check => {
            let config = startup::load_config(&cli)?;
            startup::setup_logging(&cli, &config)?;
            commands::cmd_check(&config, output)
        }

        Command::Console => {
            let config = startup::load_config(&cli)?;
            startup::setup_logging(&cli, &config)?;
            let rt = Runtime::start(&config)?;
            let shutdown = shutdown::create_shutdown_token();
            console::run(rt, output, shutdown).await
        }
    }
}
