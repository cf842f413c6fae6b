use crate::error::Result;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Read the header row of a CSV file: the first line, split on commas,
/// each field trimmed.
///
/// Quoting is not interpreted. An empty file yields a single empty header.
pub fn read_csv_headers(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let first_line = read_first_line(reader)?;

    Ok(split_header_line(&first_line))
}

/// Read up to the first `\r` or `\n`, whichever comes first.
fn read_first_line<R: BufRead>(mut reader: R) -> io::Result<String> {
    let mut line = Vec::new();

    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(end) => {
                line.extend_from_slice(&buf[..end]);
                break;
            }
            None => {
                let len = buf.len();
                line.extend_from_slice(buf);
                reader.consume(len);
            }
        }
    }

    String::from_utf8(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn split_header_line(line: &str) -> Vec<String> {
    line.trim_start_matches(UTF8_BOM)
        .trim()
        .split(',')
        .map(|field| field.trim().to_string())
        .collect()
}
