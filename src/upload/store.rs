use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest sanitized filename kept in a staged path, in bytes.
const MAX_FILENAME_LEN: usize = 200;

/// Directory where uploads are staged while the extractor reads them.
#[derive(Debug, Clone)]
pub struct UploadStore {
    directory: PathBuf,
}

impl UploadStore {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the upload directory if it does not exist yet.
    pub fn ensure_directory(&self) -> Result<()> {
        if !self.directory.exists() {
            fs::create_dir_all(&self.directory)?;
            debug!(directory = %self.directory.display(), "Created upload directory");
        }
        Ok(())
    }

    /// Write `content` to `<directory>/<uuid>_<sanitized name>`.
    ///
    /// The file is removed when the returned guard is dropped.
    pub fn stage(&self, original_name: &str, content: &[u8]) -> Result<StagedUpload> {
        let id = Uuid::new_v4();
        let prefix = format!("{}_", id);
        let name = sanitize_filename(original_name);

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&name)
            .rand_bytes(0)
            .tempfile_in(&self.directory)?;

        file.write_all(content)?;
        file.flush()?;

        let temp_path = file.into_temp_path();
        let path = temp_path.to_path_buf();
        debug!(
            filename = original_name,
            path = %path.display(),
            bytes = content.len(),
            "Staged upload"
        );

        Ok(StagedUpload {
            original_name: original_name.to_string(),
            path,
            guard: Some(temp_path),
        })
    }
}

/// An uploaded file on disk, deleted when dropped.
#[derive(Debug)]
pub struct StagedUpload {
    original_name: String,
    path: PathBuf,
    guard: Option<TempPath>,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            match guard.close() {
                Ok(()) => debug!(
                    filename = %self.original_name,
                    path = %self.path.display(),
                    "Removed staged upload"
                ),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    filename = %self.original_name,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove staged upload"
                ),
            }
        }
    }
}

/// Reduce a client-supplied filename to a single safe path component.
///
/// Directory parts are dropped, reserved and control characters become `_`,
/// and leading dots are removed so the result can never be `..` or hidden.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut sanitized = String::with_capacity(base.len());
    for ch in base.chars() {
        match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => sanitized.push('_'),
            c if c.is_control() => sanitized.push('_'),
            c => sanitized.push(c),
        }
    }

    let sanitized = sanitized
        .trim_start_matches(['.', ' '])
        .trim_end_matches(['.', ' '])
        .to_string();

    if sanitized.is_empty() {
        "unnamed_file".to_string()
    } else {
        truncate_preserving_extension(sanitized)
    }
}

fn truncate_preserving_extension(name: String) -> String {
    if name.len() <= MAX_FILENAME_LEN {
        return name;
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if name.len() - dot <= 16 => name.split_at(dot),
        _ => (name.as_str(), ""),
    };

    let mut cut = MAX_FILENAME_LEN - extension.len();
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}{}", &stem[..cut], extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn test_stage_writes_content_under_unique_name() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let staged = store.stage("report.csv", b"a,b\n1,2\n").unwrap();

        assert_eq!(staged.path().parent(), Some(dir.path()));
        assert_eq!(fs::read(staged.path()).unwrap(), b"a,b\n1,2\n");

        let file_name = staged.path().file_name().unwrap().to_string_lossy().into_owned();
        let (id, rest) = file_name.split_once('_').unwrap();
        assert!(Uuid::parse_str(id).is_ok(), "{}", file_name);
        assert_eq!(rest, "report.csv");
    }

    #[test]
    fn test_same_name_uploads_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let first = store.stage("data.csv", b"1").unwrap();
        let second = store.stage("data.csv", b"2").unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(entries(dir.path()).len(), 2);
    }

    #[test]
    fn test_drop_removes_staged_file() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let staged = store.stage("data.csv", b"x").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_drop_tolerates_already_removed_file() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let staged = store.stage("data.csv", b"x").unwrap();
        fs::remove_file(staged.path()).unwrap();
        drop(staged);
    }

    #[test]
    fn test_stage_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path().join("missing"));

        assert!(store.stage("data.csv", b"x").is_err());
    }

    #[test]
    fn test_ensure_directory() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));

        store.ensure_directory().unwrap();
        assert!(store.directory().is_dir());
        store.ensure_directory().unwrap();
    }

    #[test]
    fn test_traversal_names_stay_inside_directory() {
        let dir = TempDir::new().unwrap();
        let store = UploadStore::new(dir.path());

        let staged = store.stage("../../etc/passwd", b"x").unwrap();
        assert_eq!(staged.path().parent(), Some(dir.path()));
        assert!(staged.path().to_string_lossy().ends_with("_passwd"));
    }

    #[test]
    fn test_filename_sanitization() {
        assert_eq!(sanitize_filename("normal_file.csv"), "normal_file.csv");
        assert_eq!(sanitize_filename("file<>with|bad*chars.csv"), "file__with_bad_chars.csv");
        assert_eq!(sanitize_filename("dir/sub\\name.csv"), "name.csv");
        assert_eq!(sanitize_filename(".."), "unnamed_file");
        assert_eq!(sanitize_filename("../"), "unnamed_file");
        assert_eq!(sanitize_filename(".hidden.csv"), "hidden.csv");
        assert_eq!(sanitize_filename(""), "unnamed_file");
        assert_eq!(sanitize_filename("file..."), "file");
    }

    #[test]
    fn test_long_filename_keeps_extension() {
        let long = format!("{}.csv", "a".repeat(500));
        let sanitized = sanitize_filename(&long);

        assert_eq!(sanitized.len(), MAX_FILENAME_LEN);
        assert!(sanitized.ends_with(".csv"));
    }
}
