use clap::Parser;
use fsak::commands;
use fsak::config::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run(cli.command, cli.verbose)
        .map_err(|error| anyhow::anyhow!(commands::describe_error(&error)))
}
