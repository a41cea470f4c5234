//! Request capture to the output directory.
//!
//! # Responsibilities
//! - Record GET requests as `GET_<ts>_<n>.txt`
//! - Record POST requests as `POST_<ts>_<n>/request.txt`
//! - Write multipart file parts to `POST_<ts>_<n>/attachments/`
//!
//! # Design Decisions
//! - Capture ids are `<VERB>_<local timestamp>_<0..90>`; a collision draws a new suffix
//! - Folders are created with `create_dir` so an existing one is detected, not reused
//! - Attachment names are reduced to their final path component
//! - Attachments are opened with `create_new`; a taken name gets a `_<n>` suffix

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use crate::http::multipart::unnamed_filename;

/// Attempts at drawing an unused capture id before giving up.
const MAX_ID_ATTEMPTS: usize = 32;

pub const REQUEST_FILE: &str = "request.txt";
pub const ATTACHMENTS_DIR: &str = "attachments";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no unused capture id after {0} attempts")]
    IdsExhausted(usize),

    #[error("no free name for attachment {name:?} in {}", dir.display())]
    NamesExhausted { dir: PathBuf, name: String },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file part to persist alongside a captured request.
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    pub filename: &'a str,
    pub content: &'a [u8],
}

/// Where a capture ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    pub id: String,
    pub folder: PathBuf,
    pub attachments: Vec<PathBuf>,
}

/// Persistence for captured requests.
pub trait RequestStore: Send + Sync {
    /// Save a raw request as a single text file.
    fn save_text(&self, verb: &str, raw: &[u8]) -> Result<PathBuf, StoreError>;

    /// Save a raw request into its own folder.
    ///
    /// With `attachments` present an `attachments/` folder is always created,
    /// even when there is nothing to put in it.
    fn save_capture(
        &self,
        verb: &str,
        raw: &[u8],
        attachments: Option<&[Attachment<'_>]>,
    ) -> Result<CaptureRecord, StoreError>;
}

/// Stores captures under a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsRequestStore {
    out_dir: PathBuf,
}

impl FsRequestStore {
    pub fn new<P: Into<PathBuf>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn ensure_out_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.out_dir).map_err(|e| StoreError::io(&self.out_dir, e))
    }

    /// Create a fresh folder under the output directory.
    fn create_folder(&self, verb: &str) -> Result<(String, PathBuf), StoreError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = capture_id(verb);
            let folder = self.out_dir.join(&id);
            match fs::create_dir(&folder) {
                Ok(()) => return Ok((id, folder)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StoreError::io(&folder, e)),
            }
        }
        Err(StoreError::IdsExhausted(MAX_ID_ATTEMPTS))
    }
}

impl RequestStore for FsRequestStore {
    fn save_text(&self, verb: &str, raw: &[u8]) -> Result<PathBuf, StoreError> {
        self.ensure_out_dir()?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let path = self.out_dir.join(format!("{}.txt", capture_id(verb)));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StoreError::io(&path, e)),
            };
            file.write_all(raw).map_err(|e| StoreError::io(&path, e))?;
            tracing::debug!(path = %path.display(), bytes = raw.len(), "Request saved");
            return Ok(path);
        }
        Err(StoreError::IdsExhausted(MAX_ID_ATTEMPTS))
    }

    fn save_capture(
        &self,
        verb: &str,
        raw: &[u8],
        attachments: Option<&[Attachment<'_>]>,
    ) -> Result<CaptureRecord, StoreError> {
        self.ensure_out_dir()?;
        let (id, folder) = self.create_folder(verb)?;

        let request_file = folder.join(REQUEST_FILE);
        fs::write(&request_file, raw).map_err(|e| StoreError::io(&request_file, e))?;
        tracing::info!(capture_id = %id, bytes = raw.len(), "Capture folder created");

        let mut saved = Vec::new();
        if let Some(attachments) = attachments {
            let dir = folder.join(ATTACHMENTS_DIR);
            fs::create_dir(&dir).map_err(|e| StoreError::io(&dir, e))?;

            let mut unnamed = 0;
            for attachment in attachments {
                let name = sanitize_filename(attachment.filename).unwrap_or_else(|| {
                    unnamed += 1;
                    unnamed_filename(unnamed)
                });
                let (path, mut file) = create_unique(&dir, &name, attachments.len() + 1)?;
                file.write_all(attachment.content)
                    .map_err(|e| StoreError::io(&path, e))?;
                tracing::info!(
                    capture_id = %id,
                    filename = %name,
                    path = %path.display(),
                    bytes = attachment.content.len(),
                    "Attachment saved"
                );
                saved.push(path);
            }

            if saved.is_empty() {
                tracing::info!(capture_id = %id, "No attachments found in request");
            }
        }

        Ok(CaptureRecord {
            id,
            folder,
            attachments: saved,
        })
    }
}

/// Create `name` under `dir`, or `<stem>_<n>.<ext>` when that is taken.
///
/// `candidates` bounds the attempts; with fewer existing files than
/// candidates one of them is always free.
fn create_unique(dir: &Path, name: &str, candidates: usize) -> Result<(PathBuf, File), StoreError> {
    for n in 1..=candidates.max(1) {
        let path = dir.join(numbered_name(name, n));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StoreError::io(&path, e)),
        }
    }
    Err(StoreError::NamesExhausted {
        dir: dir.to_path_buf(),
        name: name.to_string(),
    })
}

/// `a.txt` stays `a.txt` for `n == 1` and becomes `a_2.txt` for `n == 2`.
fn numbered_name(name: &str, n: usize) -> String {
    if n <= 1 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{name}_{n}"),
    }
}

/// `<VERB>_<local timestamp, ':' as '-'>_<0..90>`
pub fn capture_id(verb: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S%.3f");
    let suffix: u32 = rand::thread_rng().gen_range(0..90);
    format!("{verb}_{timestamp}_{suffix}")
}

/// Final path component of an uploaded filename, or `None` if nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .trim();
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        None
    } else {
        Some(base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_id_shape() {
        let id = capture_id("POST");
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "POST");
        assert!(!parts[1].contains(':'));
        assert!(parts[1].contains('T'));
        let n: u32 = parts[2].parse().unwrap();
        assert!(n < 90);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a.txt").as_deref(), Some("a.txt"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\x\\report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("dir/"), None);
    }

    #[test]
    fn test_save_text() {
        let out = tempfile::tempdir().unwrap();
        let store = FsRequestStore::new(out.path().join("nested"));
        let path = store.save_text("GET", b"GET / HTTP/1.1\r\n\r\n").unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("GET_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(fs::read(&path).unwrap(), b"GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn test_plain_capture() {
        let out = tempfile::tempdir().unwrap();
        let store = FsRequestStore::new(out.path());
        let record = store.save_capture("POST", b"POST / HTTP/1.1\r\n\r\na=1", None).unwrap();

        assert!(record.id.starts_with("POST_"));
        assert_eq!(
            fs::read(record.folder.join(REQUEST_FILE)).unwrap(),
            b"POST / HTTP/1.1\r\n\r\na=1"
        );
        assert!(!record.folder.join(ATTACHMENTS_DIR).exists());
    }

    #[test]
    fn test_multipart_capture() {
        let out = tempfile::tempdir().unwrap();
        let store = FsRequestStore::new(out.path());
        let attachments = [
            Attachment {
                filename: "a.txt",
                content: b"hello",
            },
            Attachment {
                filename: "../escape.txt",
                content: b"nope",
            },
        ];
        let record = store.save_capture("POST", b"raw", Some(&attachments)).unwrap();

        let dir = record.folder.join(ATTACHMENTS_DIR);
        assert_eq!(fs::read(dir.join("a.txt")).unwrap(), b"hello");
        assert_eq!(fs::read(dir.join("escape.txt")).unwrap(), b"nope");
        assert!(!out.path().join("escape.txt").exists());
        assert_eq!(record.attachments.len(), 2);
    }

    #[test]
    fn test_duplicate_attachment_names_are_kept_apart() {
        let out = tempfile::tempdir().unwrap();
        let store = FsRequestStore::new(out.path());
        let attachments = [
            Attachment {
                filename: "a.txt",
                content: b"first",
            },
            Attachment {
                filename: "uploads/a.txt",
                content: b"second",
            },
            Attachment {
                filename: "a.txt",
                content: b"third",
            },
        ];
        let record = store.save_capture("POST", b"raw", Some(&attachments)).unwrap();

        let dir = record.folder.join(ATTACHMENTS_DIR);
        assert_eq!(fs::read(dir.join("a.txt")).unwrap(), b"first");
        assert_eq!(fs::read(dir.join("a_2.txt")).unwrap(), b"second");
        assert_eq!(fs::read(dir.join("a_3.txt")).unwrap(), b"third");
        assert_eq!(record.attachments.len(), 3);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 3);
    }

    #[test]
    fn test_generated_name_clash_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("unnamed_file_1700000000000"), b"taken").unwrap();

        let (path, _) = create_unique(dir.path(), "unnamed_file_1700000000000", 2).unwrap();
        assert_eq!(path, dir.path().join("unnamed_file_1700000000000_2"));
        assert_eq!(
            fs::read(dir.path().join("unnamed_file_1700000000000")).unwrap(),
            b"taken"
        );
    }

    #[test]
    fn test_unusable_names_share_one_counter() {
        let out = tempfile::tempdir().unwrap();
        let store = FsRequestStore::new(out.path());
        let attachments = [
            Attachment {
                filename: "dir/",
                content: b"1",
            },
            Attachment {
                filename: "ok.bin",
                content: b"2",
            },
            Attachment {
                filename: "..",
                content: b"3",
            },
        ];
        let record = store.save_capture("POST", b"raw", Some(&attachments)).unwrap();

        let names: Vec<String> = record
            .attachments
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names[0].starts_with("unnamed_file_"));
        assert_eq!(names[1], "ok.bin");
        assert!(names[2].starts_with("unnamed_file_") && names[2].ends_with("_2"));
        assert_eq!(fs::read_dir(record.folder.join(ATTACHMENTS_DIR)).unwrap().count(), 3);
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("a.txt", 1), "a.txt");
        assert_eq!(numbered_name("a.txt", 2), "a_2.txt");
        assert_eq!(numbered_name("archive.tar.gz", 3), "archive.tar_3.gz");
        assert_eq!(numbered_name(".env", 2), ".env_2");
        assert_eq!(numbered_name("README", 2), "README_2");
    }

    #[test]
    fn test_empty_attachments_still_create_folder() {
        let out = tempfile::tempdir().unwrap();
        let store = FsRequestStore::new(out.path());
        let record = store.save_capture("POST", b"raw", Some(&[])).unwrap();
        assert!(record.folder.join(ATTACHMENTS_DIR).is_dir());
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn test_captures_get_distinct_folders() {
        let out = tempfile::tempdir().unwrap();
        let store = FsRequestStore::new(out.path());
        let a = store.save_capture("POST", b"1", None).unwrap();
        let b = store.save_capture("POST", b"2", None).unwrap();
        assert_ne!(a.folder, b.folder);
    }
}
