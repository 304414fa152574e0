//! Escape-resistance contract: no caller-supplied input may yield an entry
//! whose absolute path lies outside the store root.

mod common;

use common::TestContext;
use filestore::{StoreError, validate_relative};

#[test]
fn traversal_sequences_are_rejected_before_any_syscall() {
    for input in ["../etc/passwd", "..", "a/../../b", "uploads/..", "./.."] {
        assert!(
            matches!(validate_relative(input), Err(StoreError::InvalidArgument(_))),
            "{input} must be rejected"
        );
    }
}

#[test]
fn absolute_inputs_are_rejected() {
    for input in ["/etc/passwd", "/", "//host/share"] {
        assert!(
            matches!(validate_relative(input), Err(StoreError::InvalidArgument(_))),
            "{input} must be rejected"
        );
    }
}

#[test]
fn entry_refuses_traversal_and_absolute_paths() {
    let ctx = TestContext::new();
    assert!(matches!(
        ctx.store().entry("../outside.txt"),
        Err(StoreError::InvalidArgument(_))
    ));
    assert!(matches!(
        ctx.store().entry("/etc/passwd"),
        Err(StoreError::InvalidArgument(_))
    ));
}

#[test]
fn absolute_lookup_outside_root_is_rejected() {
    let ctx = TestContext::new();
    let secret = ctx.outside_dir().join("secret.txt");
    std::fs::write(&secret, b"secret").unwrap();

    assert!(matches!(
        ctx.store().entry_by_absolute_path(&secret),
        Err(StoreError::EscapesRoot { .. })
    ));
}

#[cfg(unix)]
mod symlinks {
    use super::TestContext;
    use filestore::{Entry, StoreError};
    use std::os::unix::fs::symlink;

    fn assert_contained(result: Result<Entry, StoreError>, ctx: &TestContext) {
        match result {
            Ok(entry) => panic!(
                "escape must fail, but resolved to {} (root {})",
                entry.absolute_path().display(),
                ctx.root().display()
            ),
            Err(StoreError::EscapesRoot { .. }) | Err(StoreError::NotFound { .. }) => {}
            Err(other) => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn symlinked_file_pointing_outside_is_rejected() {
        let ctx = TestContext::new();
        let secret = ctx.outside_dir().join("secret.txt");
        std::fs::write(&secret, b"secret").unwrap();
        symlink(&secret, ctx.root().join("innocent.txt")).unwrap();

        assert_contained(ctx.store().entry("./innocent.txt"), &ctx);
    }

    #[test]
    fn symlinked_directory_pointing_outside_is_rejected() {
        let ctx = TestContext::new();
        let outside = ctx.outside_dir();
        std::fs::write(outside.join("secret.txt"), b"secret").unwrap();
        symlink(&outside, ctx.root().join("portal")).unwrap();

        assert_contained(ctx.store().entry("./portal"), &ctx);
        assert_contained(ctx.store().entry("./portal/secret.txt"), &ctx);
    }

    #[test]
    fn factory_operations_refuse_symlinked_target_directory() {
        let ctx = TestContext::new();
        symlink(ctx.outside_dir(), ctx.root().join("portal")).unwrap();

        let result = ctx.store().create_file("./portal", "dropped.txt", b"x");
        assert!(matches!(result, Err(StoreError::EscapesRoot { .. })), "{result:?}");
        assert!(!ctx.outside_dir().join("dropped.txt").exists());
    }

    #[test]
    fn factory_operations_do_not_materialize_directories_outside_the_root() {
        let ctx = TestContext::new();
        symlink(ctx.outside_dir(), ctx.root().join("portal")).unwrap();

        // the target directory goes through a symlinked component, so the
        // missing "sub" must never be created on the far side of the link
        let result = ctx.store().create_file("./portal/sub", "dropped.txt", b"x");
        assert!(matches!(result, Err(StoreError::EscapesRoot { .. })), "{result:?}");
        assert!(!ctx.outside_dir().join("sub").exists());

        let result = ctx.store().create_dir("./portal/sub/deeper", "leaf");
        assert!(matches!(result, Err(StoreError::EscapesRoot { .. })), "{result:?}");
        assert!(!ctx.outside_dir().join("sub").exists());
    }

    #[test]
    fn listing_skips_symbolic_links() {
        let ctx = TestContext::new();
        ctx.seed_file("mixed/regular.txt", b"x");
        ctx.seed_dir("mixed/subdir");
        let secret = ctx.outside_dir().join("secret.txt");
        std::fs::write(&secret, b"secret").unwrap();
        symlink(&secret, ctx.root().join("mixed/link.txt")).unwrap();

        let children = ctx.store().entry("./mixed").unwrap().entries().unwrap();
        let paths: Vec<_> = children.iter().map(|entry| entry.relative_path()).collect();
        assert_eq!(paths, ["./mixed/regular.txt", "./mixed/subdir"]);
    }

    #[test]
    fn internal_symlinks_resolve_to_their_canonical_target() {
        // a link staying inside the root is not an escape; the entry reports
        // the canonical target path
        let ctx = TestContext::new();
        ctx.seed_file("real/data.txt", b"x");
        symlink(ctx.root().join("real"), ctx.root().join("alias")).unwrap();

        let entry = ctx.store().entry("./alias/data.txt").unwrap();
        assert!(entry.absolute_path().starts_with(ctx.root()));
        assert_eq!(entry.absolute_path(), ctx.root().join("real/data.txt"));
    }
}

#[cfg(unix)]
#[test]
fn unreadable_target_is_permission_denied() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    // meaningless as root, which ignores permission bits
    if unsafe { libc::geteuid() } == 0 {
        return;
    }

    let ctx = TestContext::new();
    let path = ctx.seed_file("locked.txt", b"secret");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

    let result = ctx.store().entry("./locked.txt");
    assert!(matches!(result, Err(StoreError::PermissionDenied { .. })), "{result:?}");

    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
}
