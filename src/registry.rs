//! Process-wide store root registry.
//!
//! Convenience for applications with exactly one store: set the root once at
//! startup, then obtain [`Store`] handles anywhere. The registry only guards
//! the root pointer itself; replacing the root while entity operations are in
//! flight is not synchronized. Applications needing several independent
//! stores should construct [`Store`] values directly instead.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use log::debug;

use crate::error::StoreError;
use crate::store::Store;

static STORE_ROOT: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Set the process-wide store root.
///
/// The path must be absolute; a trailing separator is stripped. Last write
/// wins. Existence is not checked here but when the store is opened through
/// [`get_root`].
pub fn set_root<P: AsRef<Path>>(path: P) -> Result<(), StoreError> {
    let path = path.as_ref();
    if !path.is_absolute() {
        return Err(StoreError::invalid(format!(
            "The provided path {} is not absolute",
            path.display()
        )));
    }
    // collecting components drops a trailing separator
    let normalized: PathBuf = path.components().collect();
    debug!("store root set to {}", normalized.display());
    *STORE_ROOT.write().unwrap_or_else(PoisonError::into_inner) = Some(normalized);
    Ok(())
}

/// Open a [`Store`] for the configured root.
///
/// Fails with [`StoreError::NotConfigured`] when no root has been set, and
/// with [`StoreError::NotFound`] when the configured root does not exist.
pub fn get_root() -> Result<Store, StoreError> {
    let root = STORE_ROOT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(StoreError::NotConfigured)?;
    Store::open(root)
}
