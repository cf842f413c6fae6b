pub mod invoker;
pub mod report;

pub use invoker::{CombineDirective, ExtractionRequest, Extractor, COMBINE_SENTINEL};
pub use report::{parse_report, parse_table, split_lines, split_sections, Delimiter, Report, Table};
