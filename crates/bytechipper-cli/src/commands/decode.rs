use std::{io::Write, str::FromStr};

use bytechipper::stream::{TokenWidth, read_token_stream};

use crate::{
    input_output::{InputArgs, OutputArgs},
    logging::LogArgs,
    merges::MergesArgs,
};

/// Args for the decode command.
#[derive(clap::Args, Debug)]
pub struct DecodeArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    merges: MergesArgs,

    /// Symbol width, ``u16`` or ``u32``; derived from the merges when absent.
    #[clap(long, default_value = None, value_parser = TokenWidth::from_str)]
    width: Option<TokenWidth>,

    #[command(flatten)]
    logging: LogArgs,
}

impl DecodeArgs {
    /// Run the decode command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging(2)?;
        self.execute()
    }

    pub(crate) fn execute(&self) -> Result<(), Box<dyn std::error::Error>> {
        let table = self.merges.load_table()?;
        let width = self.width.unwrap_or_else(|| TokenWidth::for_table(&table));

        let stream = read_token_stream(self.input.read_all()?.as_slice(), width)?;
        log::info!(
            "read {} {width:?} symbols (content type {:?})",
            stream.tokens.len(),
            stream.content_type,
        );

        let bytes = table.try_expand(&stream.tokens)?;

        let mut writer = self.output.open_writer()?;
        writer.write_all(&bytes)?;
        writer.flush()?;

        Ok(())
    }
}
