//! Store context: the sandbox boundary and the factory operations.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use url::Url;

use crate::download::{self, DownloadConfig};
use crate::entry::Entry;
use crate::error::StoreError;
use crate::upload::UploadedFile;
use crate::validate::{ROOT_PATH, strip_marker, validate_name, validate_relative};

/// One store: an immutable context holding the canonical root directory
/// beneath which all entries must resolve.
///
/// A `Store` is cheap to clone; every [`Entry`] carries one, so independent
/// stores can coexist in the same process. Construct it once at startup and
/// pass it around, or use the [`registry`](crate::registry) when exactly one
/// process-wide store is wanted.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    download: DownloadConfig,
}

impl Store {
    /// Open a store rooted at `path`.
    ///
    /// The path must be absolute and name an existing directory; a trailing
    /// separator is stripped by canonicalization.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(StoreError::invalid(format!(
                "The provided store path {} is not absolute",
                path.display()
            )));
        }
        let root = fs::canonicalize(path)
            .map_err(|_| StoreError::NotFound { path: path.display().to_string() })?;
        if !root.is_dir() {
            return Err(StoreError::invalid(format!(
                "The provided store path {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root, download: DownloadConfig::default() })
    }

    /// Replace the download settings used by [`Store::download_file`].
    pub fn with_download_config(mut self, config: DownloadConfig) -> Self {
        self.download = config;
        self
    }

    /// The canonical store root, without a trailing separator.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wrap an existing file or directory given its path relative to the root.
    pub fn entry(&self, relative_path: &str) -> Result<Entry, StoreError> {
        Entry::resolve(self.clone(), relative_path)
    }

    /// Wrap an existing object given its absolute path, which must lie beneath
    /// the root. Round-trips through the same validation as [`Store::entry`].
    pub fn entry_by_absolute_path<P: AsRef<Path>>(
        &self,
        absolute_path: P,
    ) -> Result<Entry, StoreError> {
        let absolute_path = absolute_path.as_ref();
        let relative = absolute_path
            .strip_prefix(&self.root)
            .map_err(|_| StoreError::EscapesRoot { path: absolute_path.display().to_string() })?;
        if relative.as_os_str().is_empty() {
            return self.entry(ROOT_PATH);
        }
        let relative = relative.to_str().ok_or_else(|| {
            StoreError::invalid(format!(
                "The path {} is not valid UTF-8",
                absolute_path.display()
            ))
        })?;
        self.entry(relative)
    }

    /// Create a directory named `name` inside the directory `dir_relative`.
    pub fn create_dir(&self, dir_relative: &str, name: &str) -> Result<Entry, StoreError> {
        let target = self.prepare_create(dir_relative, name)?;
        fs::create_dir(&target).map_err(|err| self.creation_error("directory", &target, err))?;
        debug!("created directory {}", target.display());
        self.entry_by_absolute_path(&target)
    }

    /// Create a file named `name` with the given content inside the directory
    /// `dir_relative`.
    pub fn create_file(
        &self,
        dir_relative: &str,
        name: &str,
        contents: &[u8],
    ) -> Result<Entry, StoreError> {
        let target = self.prepare_create(dir_relative, name)?;
        self.write_new_file(&target, contents)?;
        debug!("created file {} ({} bytes)", target.display(), contents.len());
        self.entry_by_absolute_path(&target)
    }

    /// Move an uploaded file into the directory `dir_relative`, named after
    /// the client-declared filename.
    pub fn upload_file<U: UploadedFile>(
        &self,
        dir_relative: &str,
        upload: U,
    ) -> Result<Entry, StoreError> {
        let name = upload.client_filename().to_string();
        let target = self.prepare_create(dir_relative, &name)?;
        upload.persist_to(&target).map_err(|err| {
            StoreError::runtime(format!("Storing the uploaded file {name} failed: {err}"))
        })?;
        debug!("stored upload {}", target.display());
        self.entry_by_absolute_path(&target)
    }

    /// Fetch `url` and store its body inside the directory `dir_relative`,
    /// named after the final path segment of the URL.
    pub fn download_file(&self, dir_relative: &str, url: &str) -> Result<Entry, StoreError> {
        let url = Url::parse(url).map_err(|_| {
            StoreError::invalid(format!("The provided URL {url} has no scheme or is malformed"))
        })?;
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| {
                StoreError::invalid(format!("The provided URL {url} has no file name in its path"))
            })?
            .to_string();
        let target = self.prepare_create(dir_relative, &name)?;
        let body = download::fetch(&url, &self.download)?;
        self.write_new_file(&target, &body)?;
        debug!("downloaded {} to {}", url, target.display());
        self.entry_by_absolute_path(&target)
    }

    /// Shared preamble of the factory operations: validates the directory path
    /// and the leaf name, makes sure the target directory exists inside the
    /// root (creating intermediate directories as needed), and checks that the
    /// leaf is still free.
    ///
    /// The directory creation is not rolled back if a later step fails.
    fn prepare_create(&self, dir_relative: &str, name: &str) -> Result<PathBuf, StoreError> {
        let dir_relative = validate_relative(dir_relative)?;
        validate_name(name)?;

        let dir_path = self.root.join(strip_marker(&dir_relative));
        // the deepest existing ancestor must already resolve inside the root,
        // otherwise intermediate directories would materialize outside the
        // sandbox through a symlinked component before the final check runs
        let anchor = deepest_existing_ancestor(&dir_path, &self.root);
        let anchor = fs::canonicalize(anchor)
            .map_err(|_| StoreError::NotFound { path: dir_relative.clone() })?;
        if !anchor.starts_with(&self.root) {
            warn!("rejected escaping target directory {dir_relative}");
            return Err(StoreError::EscapesRoot { path: dir_relative });
        }
        fs::create_dir_all(&dir_path).map_err(|err| {
            StoreError::runtime(format!(
                "The creation of directory {dir_relative} failed: {err}"
            ))
        })?;
        // authoritative containment check, against the real filesystem
        let dir_path = fs::canonicalize(&dir_path)
            .map_err(|_| StoreError::NotFound { path: dir_relative.clone() })?;
        if !dir_path.starts_with(&self.root) {
            warn!("rejected escaping target directory {dir_relative}");
            return Err(StoreError::EscapesRoot { path: dir_relative });
        }

        let target = dir_path.join(name);
        if target.exists() {
            let what = if target.is_dir() { "directory" } else { "file" };
            return Err(StoreError::runtime(format!(
                "There is already a {what} {}",
                self.display_relative(&target)
            )));
        }
        Ok(target)
    }

    /// Create `target` exclusively and write `contents` to it. The exclusive
    /// create closes the race between the exists check and the write.
    fn write_new_file(&self, target: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(target)
            .map_err(|err| self.creation_error("file", target, err))?;
        file.write_all(contents).map_err(|err| {
            StoreError::runtime(format!(
                "Writing the file {} failed: {err}",
                self.display_relative(target)
            ))
        })
    }

    fn creation_error(&self, what: &str, target: &Path, err: io::Error) -> StoreError {
        let path = self.display_relative(target);
        match err.kind() {
            io::ErrorKind::AlreadyExists => {
                let existing = if target.is_dir() { "directory" } else { "file" };
                StoreError::runtime(format!("There is already a {existing} {path}"))
            }
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied { path },
            _ => StoreError::runtime(format!("The creation of {what} {path} failed: {err}")),
        }
    }

    /// Render an absolute path relative to the root for error messages.
    fn display_relative(&self, absolute: &Path) -> String {
        match absolute.strip_prefix(&self.root) {
            Ok(relative) => format!("./{}", relative.display()),
            Err(_) => absolute.display().to_string(),
        }
    }
}

/// Walk up from `path` to the deepest component that already exists on disk.
/// A symlink counts as existing even when dangling, so it is seen by the
/// caller's canonicalization instead of being silently skipped over.
fn deepest_existing_ancestor<'a>(path: &'a Path, root: &'a Path) -> &'a Path {
    let mut current = path;
    loop {
        if current.symlink_metadata().is_ok() {
            return current;
        }
        match current.parent() {
            Some(parent) => current = parent,
            // unreachable for paths joined onto an existing absolute root
            None => return root,
        }
    }
}
