//! Pure validation of caller-supplied paths and names.
//!
//! Both validators run before any filesystem access, so malformed input is
//! rejected without a syscall. Canonicalization against the real filesystem
//! happens later, during entry resolution.

use crate::error::StoreError;

/// Sentinel relative path denoting the store root itself.
pub const ROOT_PATH: &str = "./";

/// Validate and normalize a path relative to the store root.
///
/// Checks:
/// - Non-empty
/// - No parent-directory reference (`..`) anywhere
/// - Not absolute (no leading `/`)
/// - No trailing separator, except the root sentinel `./`
/// - No control characters
///
/// The returned path always starts with the `./` marker. Idempotent.
pub fn validate_relative(path: &str) -> Result<String, StoreError> {
    if path.is_empty() {
        return Err(StoreError::invalid("There is no path provided"));
    }
    if path.contains("..") {
        return Err(StoreError::invalid(format!(
            "The provided path {path} contains a parent-directory reference"
        )));
    }
    if path.starts_with('/') {
        return Err(StoreError::invalid(format!(
            "The provided path {path} is absolute. A path relative to the store root is expected"
        )));
    }
    if path.chars().any(char::is_control) {
        return Err(StoreError::invalid(
            "The provided path contains non-printable characters",
        ));
    }
    if path == "." || path == ROOT_PATH {
        return Ok(ROOT_PATH.to_string());
    }
    if path.ends_with('/') {
        return Err(StoreError::invalid(format!(
            "The provided path {path} ends with a separator"
        )));
    }
    if path.starts_with("./") {
        Ok(path.to_string())
    } else {
        Ok(format!("./{path}"))
    }
}

/// Validate a bare file or directory name used when creating a new object
/// inside an already-resolved directory.
///
/// Checks: non-empty, no separator (`/` or `\`), no parent-directory
/// reference, no control characters.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::invalid("There is no name provided"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(StoreError::invalid(format!(
            "The provided name {name} contains a path separator"
        )));
    }
    if name.contains("..") {
        return Err(StoreError::invalid(format!(
            "The provided name {name} contains a parent-directory reference"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(StoreError::invalid(
            "The provided name contains non-printable characters",
        ));
    }
    Ok(())
}

/// Strip the leading `./` marker, yielding a path suitable for joining onto
/// the store root. The root sentinel becomes the empty string.
pub(crate) fn strip_marker(relative_path: &str) -> &str {
    relative_path.strip_prefix("./").unwrap_or(relative_path)
}
