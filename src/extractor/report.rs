//! Decoding of the extractor's text report into tables.
//!
//! A report holds one table, or two when the tool also printed a combined
//! (pivoted) table. Each table is laid out as
//!
//! ```text
//! <header line>
//! <separator line>
//! <data line>...
//! Row count: <n>
//! ```
//!
//! and the two tables are separated by a `Combined Table` line.

use serde::{Deserialize, Serialize};

/// Line that separates the normal table from the combined table.
pub const COMBINED_MARKER: &str = "Combined Table";

/// Prefix of the summary footer that ends a table's data lines.
pub const ROW_COUNT_PREFIX: &str = "Row count";

/// Minimum number of lines in a table section: header, separator, terminator.
const MIN_SECTION_LINES: usize = 3;

/// How fields are separated on a report line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// Fields separated by single tab characters; empty cells are kept.
    #[default]
    Tab,
    /// Fields separated by runs of whitespace; empty cells collapse.
    Whitespace,
}

impl Delimiter {
    /// Split one line into trimmed fields.
    pub fn split_fields(&self, line: &str) -> Vec<String> {
        match self {
            Delimiter::Tab => line.split('\t').map(|f| f.trim().to_string()).collect(),
            Delimiter::Whitespace => line.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub normal: Table,
    pub combined: Table,
}

/// Split a report at the first combined-table marker.
///
/// The marker itself belongs to neither section, so
/// `normal + COMBINED_MARKER + combined` is the original text.
pub fn split_sections(stdout: &str) -> (&str, Option<&str>) {
    match stdout.split_once(COMBINED_MARKER) {
        Some((normal, combined)) => (normal, Some(combined)),
        None => (stdout, None),
    }
}

/// Split text into lines ending at `\r\n`, `\n` or a bare `\r`.
///
/// A final empty line after a trailing terminator is kept; callers trim first.
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
}

/// Parse one table section.
///
/// Never fails: a section too short to hold a table yields an empty table,
/// and rows are passed through even when their width differs from the header.
pub fn parse_table(section: &str, delimiter: Delimiter) -> Table {
    let lines: Vec<&str> = split_lines(section.trim()).collect();
    if lines.len() < MIN_SECTION_LINES {
        return Table::default();
    }

    let headers = delimiter.split_fields(lines[0]);

    // lines[1] is the separator
    let rows = lines[2..]
        .iter()
        .take_while(|line| !line.trim_start().starts_with(ROW_COUNT_PREFIX))
        .map(|line| delimiter.split_fields(line))
        .collect();

    Table { headers, rows }
}

pub fn parse_report(stdout: &str, delimiter: Delimiter) -> Report {
    let (normal, combined) = split_sections(stdout);

    Report {
        normal: parse_table(normal, delimiter),
        combined: combined
            .map(|section| parse_table(section, delimiter))
            .unwrap_or_default(),
    }
}
