use crate::commands::{decode::DecodeArgs, tokenize::TokenizeArgs};

pub mod decode;
pub mod tokenize;

/// Subcommands for bytechipper
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Tokenize a file into a token stream.
    Tokenize(TokenizeArgs),

    /// Expand a token stream back into bytes.
    Decode(DecodeArgs),
}

impl Commands {
    /// Run the subcommand.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::Tokenize(cmd) => cmd.run(),
            Commands::Decode(cmd) => cmd.run(),
        }
    }

    /// Run the subcommand without installing a logger.
    #[cfg(test)]
    pub(crate) fn execute(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::Tokenize(cmd) => cmd.execute(),
            Commands::Decode(cmd) => cmd.execute(),
        }
    }
}
