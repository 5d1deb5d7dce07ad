//! # Merges File IO

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use crate::{
    errors::{BCResult, BytechipperError},
    table::{MergeRule, MergeTable},
    types::{BYTE_SYMBOL_COUNT, SymbolId},
};

/// How merged ids are assigned when reading a merges file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum MergeIdScheme {
    /// ``left right`` lines; merged id = ``256 + rank``.
    #[default]
    Sequential,

    /// ``left right merged`` lines; merged id is the third column.
    ExplicitColumn,
}

impl MergeIdScheme {
    /// The number of columns per rule line.
    pub fn columns(&self) -> usize {
        match self {
            MergeIdScheme::Sequential => 2,
            MergeIdScheme::ExplicitColumn => 3,
        }
    }
}

fn parse_symbol(
    line: usize,
    field: &str,
) -> BCResult<SymbolId> {
    field.parse::<SymbolId>().map_err(|e| BytechipperError::Parse {
        line,
        message: format!("invalid symbol id {field:?}: {e}"),
    })
}

/// Read merge rules from a merges line reader.
///
/// Lines are:
/// ```terminaloutput
/// {LEFT} {RIGHT}            # Sequential
/// {LEFT} {RIGHT} {MERGED}   # ExplicitColumn
/// ```
///
/// Blank lines, and lines starting with ``#``, are skipped.
/// Rank is the order of the rule lines.
///
/// The rules are only parsed, not validated; see [`MergeTable::build_rules`].
///
/// ## Arguments
/// * `reader` - the line reader.
/// * `scheme` - the merged id scheme.
pub fn read_merge_rules<R: BufRead>(
    reader: R,
    scheme: MergeIdScheme,
) -> BCResult<Vec<MergeRule>> {
    let mut rules = Vec::new();

    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let s = std::str::from_utf8(&line)
            .map_err(|e| BytechipperError::Parse {
                line: line_no,
                message: format!("invalid UTF-8: {e}"),
            })?
            .trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }

        let fields = s.split_whitespace().collect::<Vec<&str>>();
        if fields.len() != scheme.columns() {
            return Err(BytechipperError::Parse {
                line: line_no,
                message: format!(
                    "expected {} columns, found {}",
                    scheme.columns(),
                    fields.len()
                ),
            });
        }

        let left = parse_symbol(line_no, fields[0])?;
        let right = parse_symbol(line_no, fields[1])?;
        let merged = match scheme {
            MergeIdScheme::Sequential => (BYTE_SYMBOL_COUNT + rules.len()) as SymbolId,
            MergeIdScheme::ExplicitColumn => parse_symbol(line_no, fields[2])?,
        };

        rules.push(MergeRule::new(left, right, merged));
    }

    Ok(rules)
}

/// Load merge rules from a merges file.
///
/// ## Arguments
/// * `path` - the path to the merges file.
/// * `scheme` - the merged id scheme.
pub fn load_merge_rules_path<P: AsRef<Path>>(
    path: P,
    scheme: MergeIdScheme,
) -> BCResult<Vec<MergeRule>> {
    let reader = BufReader::new(File::open(path)?);
    read_merge_rules(reader, scheme)
}

/// Write merge rules in the given scheme.
pub fn write_merge_rules<W: Write>(
    rules: &[MergeRule],
    scheme: MergeIdScheme,
    writer: &mut W,
) -> BCResult<()> {
    for rule in rules {
        match scheme {
            MergeIdScheme::Sequential => writeln!(writer, "{} {}", rule.left, rule.right)?,
            MergeIdScheme::ExplicitColumn => {
                writeln!(writer, "{} {} {}", rule.left, rule.right, rule.merged)?
            }
        }
    }
    Ok(())
}

impl MergeTable {
    /// Read and validate a table from a merges line reader.
    pub fn read_from_text<R: BufRead>(
        reader: R,
        scheme: MergeIdScheme,
    ) -> BCResult<Self> {
        Self::build_rules(read_merge_rules(reader, scheme)?)
    }

    /// Load and validate a table from a merges file.
    ///
    /// ## Errors
    /// * [`BytechipperError::Io`] if the file cannot be opened or read.
    /// * [`BytechipperError::Parse`] on a malformed line.
    /// * [`BytechipperError::MergeTable`] if the rules are invalid.
    pub fn load_from_text<P: AsRef<Path>>(
        path: P,
        scheme: MergeIdScheme,
    ) -> BCResult<Self> {
        Self::build_rules(load_merge_rules_path(path, scheme)?)
    }
}
