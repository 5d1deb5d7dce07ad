use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

fn squash_standard_io(path: &Option<String>) -> Option<&str> {
    match path.as_deref() {
        Some("-") | None => None,
        Some(p) => Some(p),
    }
}

/// Input argument group.
#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// Input file; "-" or absent reads stdin.
    #[clap(long, default_value = None)]
    pub input: Option<String>,
}

impl InputArgs {
    /// The input file path; `None` for stdin.
    pub fn path(&self) -> Option<&Path> {
        squash_standard_io(&self.input).map(Path::new)
    }

    /// Read the whole input.
    pub fn read_all(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut buf = Vec::new();
        match self.path() {
            None => std::io::stdin().lock().read_to_end(&mut buf)?,
            Some(p) => File::open(p)?.read_to_end(&mut buf)?,
        };
        Ok(buf)
    }
}

/// Output argument group.
#[derive(clap::Args, Debug)]
pub struct OutputArgs {
    /// Output file; "-" or absent writes stdout.
    #[clap(long, default_value = None)]
    pub output: Option<String>,
}

impl OutputArgs {
    /// The output file path; `None` for stdout.
    pub fn path(&self) -> Option<&Path> {
        squash_standard_io(&self.output).map(Path::new)
    }

    /// Open a writer for the output.
    pub fn open_writer(&self) -> Result<Box<dyn Write>, Box<dyn std::error::Error>> {
        Ok(match self.path() {
            Some(p) => Box::new(BufWriter::new(File::create(p)?)),
            None => Box::new(BufWriter::new(std::io::stdout().lock())),
        })
    }
}
