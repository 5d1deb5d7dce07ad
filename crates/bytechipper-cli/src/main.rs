mod commands;
mod input_output;
mod logging;
mod merges;

use clap::Parser;
use commands::Commands;

/// bytechipper
#[derive(clap::Parser, Debug)]
#[command(version = bytechipper::version())]
pub struct Args {
    /// Subcommand to run.
    #[clap(subcommand)]
    pub command: Commands,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    args.command.run()
}
