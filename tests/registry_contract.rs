//! Contract of the process-wide root registry. The registry is global state,
//! so the whole contract runs as one serialized test with a controlled order.

mod common;

use common::TestContext;
use filestore::{StoreError, registry};
use serial_test::serial;

#[test]
#[serial]
fn registry_contract() {
    // unset at process start
    assert!(matches!(registry::get_root(), Err(StoreError::NotConfigured)));

    // only absolute roots are accepted
    assert!(matches!(
        registry::set_root("relative/store"),
        Err(StoreError::InvalidArgument(_))
    ));
    assert!(matches!(registry::get_root(), Err(StoreError::NotConfigured)));

    // a trailing separator is stripped
    let ctx = TestContext::new();
    let with_separator = format!("{}/", ctx.root().display());
    registry::set_root(&with_separator).unwrap();
    let store = registry::get_root().unwrap();
    assert_eq!(store.root(), ctx.root());
    assert!(!store.root().to_string_lossy().ends_with('/'));

    // last write wins
    let other = TestContext::new();
    registry::set_root(other.root()).unwrap();
    assert_eq!(registry::get_root().unwrap().root(), other.root());

    // existence is checked when the store is opened, not at set time
    registry::set_root("/nonexistent/filestore-root").unwrap();
    assert!(matches!(registry::get_root(), Err(StoreError::NotFound { .. })));

    // a registry-backed store performs the same sandboxed operations
    registry::set_root(ctx.root()).unwrap();
    let store = registry::get_root().unwrap();
    let entry = store.create_file("./", "from-registry.txt", b"via registry").unwrap();
    assert_eq!(entry.contents().unwrap(), b"via registry");
    assert!(matches!(
        store.entry("../escape"),
        Err(StoreError::InvalidArgument(_))
    ));
}
