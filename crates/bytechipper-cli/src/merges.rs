use std::path::PathBuf;

use bytechipper::{
    MergeRule,
    MergeTable,
    table::{MergeIdScheme, load_merge_rules_path},
};

fn parse_scheme(s: &str) -> Result<MergeIdScheme, String> {
    s.replace(['-', '_'], "")
        .parse::<MergeIdScheme>()
        .map_err(|_| format!("unknown merge id scheme {s:?}; expected sequential or explicit-column"))
}

/// Merges file arg group.
#[derive(clap::Args, Debug)]
pub struct MergesArgs {
    /// Merges file; one ``left right`` pair per line, in rank order.
    ///
    /// Absent means no merges; every byte is its own symbol.
    #[clap(long, default_value = None)]
    pub merges: Option<PathBuf>,

    /// How merged ids are assigned: ``sequential`` or ``explicit-column``.
    #[clap(long, default_value = "sequential", value_parser = parse_scheme)]
    pub scheme: MergeIdScheme,
}

impl MergesArgs {
    /// Load the merge rules, in rank order.
    pub fn load_rules(&self) -> Result<Vec<MergeRule>, Box<dyn std::error::Error>> {
        Ok(match &self.merges {
            Some(path) => {
                let rules = load_merge_rules_path(path, self.scheme)?;
                log::info!("loaded {} merges from {}", rules.len(), path.display());
                rules
            }
            None => Vec::new(),
        })
    }

    /// Load and validate the merge table.
    pub fn load_table(&self) -> Result<MergeTable, Box<dyn std::error::Error>> {
        Ok(MergeTable::build_rules(self.load_rules()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scheme() {
        assert_eq!(parse_scheme("sequential").unwrap(), MergeIdScheme::Sequential);
        assert_eq!(parse_scheme("explicit-column").unwrap(), MergeIdScheme::ExplicitColumn);
        assert_eq!(parse_scheme("Explicit_Column").unwrap(), MergeIdScheme::ExplicitColumn);
        assert!(parse_scheme("ranked").is_err());
    }

    #[test]
    fn test_load_table() {
        let dir = tempdir::TempDir::new("merges_args").unwrap();
        let path = dir.path().join("merges.txt");
        std::fs::write(&path, "97 98\n256 99\n").unwrap();

        let args = MergesArgs {
            merges: Some(path),
            scheme: MergeIdScheme::Sequential,
        };
        let table = args.load_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.try_expand(&[257]).unwrap(), b"abc");

        let none = MergesArgs {
            merges: None,
            scheme: MergeIdScheme::Sequential,
        };
        assert!(none.load_table().unwrap().is_empty());
    }
}
