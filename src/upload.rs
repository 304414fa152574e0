//! Uploaded-file boundary.
//!
//! Models a multipart upload already buffered by an external HTTP layer: the
//! store only needs the client-declared filename and a move-to-destination
//! primitive, never any HTTP semantics.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A buffered upload that can be moved into the store.
///
/// The client-declared filename is validated as a leaf name by
/// [`Store::upload_file`](crate::Store::upload_file) before any filesystem
/// access; implementations do not need to sanitize it themselves.
pub trait UploadedFile {
    /// Filename declared by the client.
    fn client_filename(&self) -> &str;

    /// Move the buffered content to `dest`. Called at most once.
    fn persist_to(self, dest: &Path) -> io::Result<()>;
}

/// An upload buffered as a temporary file on local disk.
#[derive(Debug)]
pub struct BufferedUpload {
    client_filename: String,
    temp_path: PathBuf,
}

impl BufferedUpload {
    /// Wrap an already-buffered upload at `temp_path` with the filename the
    /// client declared for it.
    pub fn new<S: Into<String>, P: Into<PathBuf>>(client_filename: S, temp_path: P) -> Self {
        Self { client_filename: client_filename.into(), temp_path: temp_path.into() }
    }
}

impl UploadedFile for BufferedUpload {
    fn client_filename(&self) -> &str {
        &self.client_filename
    }

    fn persist_to(self, dest: &Path) -> io::Result<()> {
        // rename when the buffer is on the same filesystem, copy+remove otherwise
        match fs::rename(&self.temp_path, dest) {
            Ok(()) => Ok(()),
            Err(_) => {
                fs::copy(&self.temp_path, dest)?;
                fs::remove_file(&self.temp_path)
            }
        }
    }
}
