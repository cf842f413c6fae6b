pub mod headers;
pub mod store;

pub use headers::read_csv_headers;
pub use store::{sanitize_filename, StagedUpload, UploadStore};
