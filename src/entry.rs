//! A single file or directory confined beneath a store root.

use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};

use crate::error::StoreError;
use crate::mime;
use crate::store::Store;
use crate::validate::{ROOT_PATH, strip_marker, validate_relative};

/// What kind of object an entry wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

/// One file or directory inside a store.
///
/// Construction validates the caller-supplied relative path (cheap, input-only
/// checks first), then canonicalizes against the real filesystem and verifies
/// the result is still a descendant of the store root. A live entry therefore
/// always points inside the sandbox; mutating operations re-validate because
/// store contents can change out of band.
///
/// After [`Entry::delete`] the entry is in a terminal deleted state: both
/// paths are empty and only the string accessors remain meaningful.
#[derive(Debug, Clone)]
pub struct Entry {
    store: Store,
    relative_path: String,
    absolute_path: PathBuf,
}

impl Entry {
    pub(crate) fn resolve(store: Store, relative_path: &str) -> Result<Self, StoreError> {
        let relative_path = validate_relative(relative_path)?;
        let joined = store.root().join(strip_marker(&relative_path));
        let absolute_path = fs::canonicalize(&joined)
            .map_err(|_| StoreError::NotFound { path: relative_path.clone() })?;
        if !absolute_path.starts_with(store.root()) {
            warn!("rejected escaping path {relative_path}");
            return Err(StoreError::EscapesRoot { path: relative_path });
        }
        check_readable(&absolute_path, &relative_path)?;
        Ok(Self { store, relative_path, absolute_path })
    }

    /// The normalized path relative to the store root, `./`-prefixed.
    /// Empty once the entry has been deleted.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// The canonical, symlink-free absolute path.
    /// Empty once the entry has been deleted.
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// The store this entry belongs to.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// True once [`Entry::delete`] has removed the underlying object.
    pub fn is_deleted(&self) -> bool {
        self.relative_path.is_empty()
    }

    /// The final path segment; empty for the store root or a deleted entry.
    pub fn name(&self) -> String {
        self.absolute_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The relative path of the containing directory (`./` for children of
    /// the root and for the root itself).
    pub fn dir(&self) -> String {
        match Path::new(&self.relative_path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() && parent.as_os_str() != "." => {
                parent.to_string_lossy().into_owned()
            }
            _ => ROOT_PATH.to_string(),
        }
    }

    pub fn is_dir(&self) -> bool {
        !self.is_deleted() && self.absolute_path.is_dir()
    }

    pub fn is_file(&self) -> bool {
        !self.is_deleted() && self.absolute_path.is_file()
    }

    /// Whether the entry is a file or a directory. Fails on special files
    /// (sockets, fifos, device nodes).
    pub fn kind(&self) -> Result<EntryKind, StoreError> {
        let file_type = self.metadata()?.file_type();
        if file_type.is_dir() {
            Ok(EntryKind::Directory)
        } else if file_type.is_file() {
            Ok(EntryKind::File)
        } else {
            Err(StoreError::runtime(format!(
                "The path {} is neither a file nor a directory",
                self.relative_path
            )))
        }
    }

    /// Size in bytes (directory sizes are filesystem-dependent).
    pub fn size(&self) -> Result<u64, StoreError> {
        Ok(self.metadata()?.len())
    }

    pub fn created(&self) -> Result<SystemTime, StoreError> {
        let metadata = self.metadata()?;
        metadata.created().map_err(|err| self.metadata_error("creation time", err))
    }

    pub fn modified(&self) -> Result<SystemTime, StoreError> {
        let metadata = self.metadata()?;
        metadata.modified().map_err(|err| self.metadata_error("modification time", err))
    }

    pub fn accessed(&self) -> Result<SystemTime, StoreError> {
        let metadata = self.metadata()?;
        metadata.accessed().map_err(|err| self.metadata_error("access time", err))
    }

    /// Unix permission bits (the low nine bits of the mode).
    #[cfg(unix)]
    pub fn permissions(&self) -> Result<u32, StoreError> {
        use std::os::unix::fs::PermissionsExt;
        Ok(self.metadata()?.permissions().mode() & 0o777)
    }

    #[cfg(unix)]
    pub fn inode(&self) -> Result<u64, StoreError> {
        use std::os::unix::fs::MetadataExt;
        Ok(self.metadata()?.ino())
    }

    /// Owning user id.
    #[cfg(unix)]
    pub fn uid(&self) -> Result<u32, StoreError> {
        use std::os::unix::fs::MetadataExt;
        Ok(self.metadata()?.uid())
    }

    /// Owning group id.
    #[cfg(unix)]
    pub fn gid(&self) -> Result<u32, StoreError> {
        use std::os::unix::fs::MetadataExt;
        Ok(self.metadata()?.gid())
    }

    /// File extension, without the leading dot. Applicable only to files.
    pub fn extension(&self) -> Result<String, StoreError> {
        self.live()?;
        if self.is_dir() {
            return Err(StoreError::runtime(format!(
                "Can not obtain an extension on the directory {}",
                self.relative_path
            )));
        }
        Ok(self
            .absolute_path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default())
    }

    /// Mime type derived from the extension. Directories report the fixed
    /// [`mime::DIRECTORY`] sentinel.
    pub fn mime_type(&self) -> Result<&'static str, StoreError> {
        self.live()?;
        if self.is_dir() {
            return Ok(mime::DIRECTORY);
        }
        Ok(match self.absolute_path.extension() {
            Some(ext) => mime::from_extension(&ext.to_string_lossy()),
            None => mime::OCTET_STREAM,
        })
    }

    /// Byte content of the file. Applicable only to files.
    pub fn contents(&self) -> Result<Vec<u8>, StoreError> {
        self.live()?;
        if self.is_dir() {
            return Err(StoreError::runtime(format!(
                "Can not obtain the contents of the directory {}",
                self.relative_path
            )));
        }
        fs::read(&self.absolute_path).map_err(|err| self.io_error(err))
    }

    /// List the immediate children of a directory, sorted by name.
    ///
    /// The `.`/`..` pseudo-entries are not reported and symbolic links are
    /// skipped entirely: links are never wrapped as entries, so a listing can
    /// not re-introduce an escape through a link target. Each remaining child
    /// is resolved as a fresh [`Entry`] with full validation.
    pub fn entries(&self) -> Result<Vec<Entry>, StoreError> {
        self.live()?;
        if !self.is_dir() {
            return Err(StoreError::runtime(format!(
                "Can not list the non-directory {}",
                self.relative_path
            )));
        }
        let mut children = Vec::new();
        let read_dir = fs::read_dir(&self.absolute_path).map_err(|err| self.io_error(err))?;
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|err| self.io_error(err))?;
            let file_type = dir_entry.file_type().map_err(|err| self.io_error(err))?;
            if file_type.is_symlink() {
                continue;
            }
            let Some(name) = dir_entry.file_name().to_str().map(str::to_owned) else {
                warn!("skipping non-UTF-8 entry under {}", self.relative_path);
                continue;
            };
            let child_relative = format!("{}/{}", self.relative_path.trim_end_matches('/'), name);
            children.push(self.store.entry(&child_relative)?);
        }
        children.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(children)
    }

    /// Remove the underlying file or directory (directories recursively).
    ///
    /// Does not check write permission beforehand. Irreversible: on success
    /// the entry transitions to the deleted terminal state and every further
    /// operation on it, including a second `delete`, fails.
    pub fn delete(&mut self) -> Result<(), StoreError> {
        self.live()?;
        let removed = match self.kind()? {
            EntryKind::File => fs::remove_file(&self.absolute_path),
            EntryKind::Directory => fs::remove_dir_all(&self.absolute_path),
        };
        removed.map_err(|err| {
            StoreError::runtime(format!("Deleting {} failed: {err}", self.relative_path))
        })?;
        debug!("deleted {}", self.relative_path);
        self.relative_path.clear();
        self.absolute_path.clear();
        Ok(())
    }

    /// Rename the entry to a new path relative to the store root.
    ///
    /// The destination must not exist yet; its parent directory must exist and
    /// resolve inside the root. On success both stored paths are updated in
    /// place, the entry keeps its identity.
    pub fn rename_to(&mut self, to_relative_path: &str) -> Result<(), StoreError> {
        self.live()?;
        let to_relative = validate_relative(to_relative_path)?;
        if to_relative == ROOT_PATH {
            return Err(StoreError::invalid("Can not move an entry onto the store root"));
        }
        let joined = self.store.root().join(strip_marker(&to_relative));
        let Some(leaf) = joined.file_name().map(std::ffi::OsStr::to_owned) else {
            return Err(StoreError::invalid(format!(
                "The provided path {to_relative} has no file name"
            )));
        };
        let parent = joined.parent().unwrap_or_else(|| self.store.root());
        // the destination itself need not exist, but its parent must already
        // resolve inside the root
        let parent = fs::canonicalize(parent)
            .map_err(|_| StoreError::NotFound { path: to_relative.clone() })?;
        if !parent.starts_with(self.store.root()) {
            warn!("rejected escaping rename target {to_relative}");
            return Err(StoreError::EscapesRoot { path: to_relative });
        }
        let destination = parent.join(leaf);
        if destination.exists() {
            return Err(StoreError::runtime(format!(
                "Moving {} to {} failed: the destination already exists",
                self.relative_path, to_relative
            )));
        }
        fs::rename(&self.absolute_path, &destination).map_err(|err| {
            StoreError::runtime(format!(
                "Moving {} to {} failed: {err}",
                self.relative_path, to_relative
            ))
        })?;
        debug!("moved {} to {}", self.relative_path, to_relative);
        self.relative_path = to_relative;
        self.absolute_path = destination;
        Ok(())
    }

    fn live(&self) -> Result<(), StoreError> {
        if self.is_deleted() {
            Err(StoreError::runtime("The entry has been deleted"))
        } else {
            Ok(())
        }
    }

    fn metadata(&self) -> Result<Metadata, StoreError> {
        self.live()?;
        fs::metadata(&self.absolute_path).map_err(|err| self.io_error(err))
    }

    fn io_error(&self, err: io::Error) -> StoreError {
        match err.kind() {
            io::ErrorKind::NotFound => {
                StoreError::NotFound { path: self.relative_path.clone() }
            }
            io::ErrorKind::PermissionDenied => {
                StoreError::PermissionDenied { path: self.relative_path.clone() }
            }
            _ => StoreError::runtime(format!(
                "Accessing {} failed: {err}",
                self.relative_path
            )),
        }
    }

    fn metadata_error(&self, what: &str, err: io::Error) -> StoreError {
        StoreError::runtime(format!(
            "Can not obtain the {what} of {}: {err}",
            self.relative_path
        ))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Probe readability the way the entry will actually be read: directories via
/// `read_dir`, regular files by opening them. Other object kinds are not
/// probed (opening a fifo would block).
fn check_readable(absolute_path: &Path, relative_path: &str) -> Result<(), StoreError> {
    let file_type = fs::metadata(absolute_path)
        .map_err(|_| StoreError::NotFound { path: relative_path.to_string() })?
        .file_type();
    let probe = if file_type.is_dir() {
        fs::read_dir(absolute_path).map(|_| ())
    } else if file_type.is_file() {
        fs::File::open(absolute_path).map(|_| ())
    } else {
        return Ok(());
    };
    probe.map_err(|err| match err.kind() {
        io::ErrorKind::PermissionDenied => {
            StoreError::PermissionDenied { path: relative_path.to_string() }
        }
        io::ErrorKind::NotFound => StoreError::NotFound { path: relative_path.to_string() },
        _ => StoreError::runtime(format!("The file/dir {relative_path} is not accessible: {err}")),
    })
}
