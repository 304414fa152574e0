//! filestore: a sandboxed file store.
//!
//! One [`Store`] wraps a root directory; [`Entry`] values represent files and
//! directories strictly confined beneath it. Caller-supplied relative paths,
//! uploaded filenames, and remote URLs are validated and canonicalized before
//! any filesystem access, so traversal sequences and symlinks can not reach
//! outside the root.
//!
//! ```no_run
//! use filestore::Store;
//!
//! # fn main() -> Result<(), filestore::StoreError> {
//! let store = Store::open("/srv/store")?;
//! let dir = store.create_dir("./", "uploads")?;
//! let file = store.create_file("./uploads", "a.txt", b"hello")?;
//! assert_eq!(file.relative_path(), "./uploads/a.txt");
//! # Ok(()) }
//! ```

pub mod download;
pub mod entry;
pub mod error;
pub mod mime;
pub mod registry;
pub mod store;
pub mod upload;
pub mod validate;

pub use download::DownloadConfig;
pub use entry::{Entry, EntryKind};
pub use error::StoreError;
pub use store::Store;
pub use upload::{BufferedUpload, UploadedFile};
pub use validate::{validate_name, validate_relative};
