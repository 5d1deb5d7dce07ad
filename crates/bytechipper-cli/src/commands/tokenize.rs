use std::io::Write;

use bytechipper::{ByteTokenizer, CancelToken, TokenizerOptions};

use crate::{
    input_output::{InputArgs, OutputArgs},
    logging::LogArgs,
    merges::MergesArgs,
};

/// Args for the tokenize command.
#[derive(clap::Args, Debug)]
pub struct TokenizeArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    merges: MergesArgs,

    /// Content type marker to prefix the stream with: ``text`` or ``bin``.
    #[clap(long = "type", default_value = None)]
    content_type: Option<String>,

    /// Worker thread count; defaults to the available parallelism.
    #[clap(long, default_value = None)]
    threads: Option<usize>,

    /// Chunk size, e.g. ``4MB``, ``512KB``, or ``auto``.
    #[clap(long, default_value = "auto")]
    chunk_size: String,

    /// Percentage of total memory the in-flight chunks may use.
    #[clap(long, default_value = None)]
    memcap: Option<u32>,

    #[command(flatten)]
    logging: LogArgs,
}

impl TokenizeArgs {
    fn options(&self) -> Result<TokenizerOptions, Box<dyn std::error::Error>> {
        let mut options = TokenizerOptions::default()
            .with_rules(self.merges.load_rules()?)
            .with_chunk_size(self.chunk_size.as_str());
        options.content_type = self.content_type.clone();
        options.thread_count = self.threads;
        options.memory_cap = self.memcap;
        Ok(options)
    }

    /// Run the tokenize command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.logging.setup_logging(2)?;
        self.execute()
    }

    pub(crate) fn execute(&self) -> Result<(), Box<dyn std::error::Error>> {
        let tokenizer = ByteTokenizer::new(&self.options()?)?;
        log::info!("{tokenizer}");

        let summary = match (self.input.path(), self.output.path()) {
            (Some(input), Some(output)) => tokenizer.tokenize_file(input, output)?,
            _ => {
                let input = self.input.read_all()?;
                let mut writer = self.output.open_writer()?;
                let summary = tokenizer.tokenize_to_writer(&input, &mut writer, &CancelToken::new())?;
                writer.flush()?;
                summary
            }
        };
        log::info!("{summary}");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::Args;

    #[test]
    fn test_tokenize_file_to_file() {
        let dir = tempdir::TempDir::new("tokenize_cmd").unwrap();
        let merges = dir.path().join("merges.txt");
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.bin");
        std::fs::write(&merges, "97 98\n").unwrap();
        std::fs::write(&input, b"abc").unwrap();

        let args = Args::try_parse_from([
            "bytechipper",
            "tokenize",
            "--input",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--merges",
            merges.to_str().unwrap(),
            "--type",
            "text",
            "--threads",
            "2",
            "--chunk-size",
            "1KB",
            "--memcap",
            "50",
            "-q",
        ])
        .unwrap();
        args.command.execute().unwrap();

        assert_eq!(
            std::fs::read(&output).unwrap(),
            vec![0xFF, 0x01, 0x01, 0x00, 0x00, 0x63]
        );
    }

    #[test]
    fn test_rejects_bad_memcap() {
        let args = Args::try_parse_from([
            "bytechipper",
            "tokenize",
            "--input",
            "in.txt",
            "--output",
            "out.bin",
            "--memcap",
            "101",
            "-q",
        ])
        .unwrap();
        assert!(args.command.execute().is_err());
    }
}
