//! Shared testing utilities for store contract tests.

use std::fs;
use std::path::{Path, PathBuf};

use filestore::Store;
use tempfile::TempDir;

/// Testing harness providing an isolated store rooted in a temp directory,
/// plus a scratch area outside the store for escape exercises.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    store: Store,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a fresh store under a private temp directory.
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let store_dir = root.path().join("store");
        fs::create_dir_all(&store_dir).expect("Failed to create store directory");
        let store = Store::open(&store_dir).expect("Failed to open store");
        Self { root, store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Canonical root path of the store under test.
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// A directory next to (not inside) the store root.
    pub fn outside_dir(&self) -> PathBuf {
        let dir = self.root.path().join("outside");
        fs::create_dir_all(&dir).expect("Failed to create outside directory");
        fs::canonicalize(&dir).expect("Failed to canonicalize outside directory")
    }

    /// Create a file directly on disk, bypassing the store API.
    pub fn seed_file(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, contents).expect("Failed to seed file");
        path
    }

    /// Create a directory directly on disk, bypassing the store API.
    pub fn seed_dir(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        fs::create_dir_all(&path).expect("Failed to seed directory");
        path
    }
}
