//! File name validation.
//!
//! Every file the store touches lives directly inside its root directory, and
//! names may originate from a remote URL. This module makes sure such a name
//! can't point anywhere else.

use std::path::{Component, Path};

use crate::error::{ErrorKind, Result};

/// Validates that `name` is a plain file name: exactly one normal path
/// component, no separators, no `.`/`..`, no null bytes.
///
/// # Examples
///
/// ```
/// use ipgeo_storage::validate_file_name;
/// assert!(validate_file_name("dbip-city-lite-2022-07.mmdb").is_ok());
/// assert!(validate_file_name("../dbip-city-lite-2022-07.mmdb").is_err());
/// assert!(validate_file_name("nested/dbip-city-lite-2022-07.mmdb").is_err());
/// assert!(validate_file_name("a\0b").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<&str> {
    let invalid = || ErrorKind::InvalidPath(Path::new(name).to_path_buf());
    // Null bytes pass through Path::components() on Unix but cause
    // truncation in C-based syscalls; reject them explicitly.
    if name.is_empty() || name.contains('\0') || name.contains(['/', '\\']) {
        exn::bail!(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => exn::bail!(invalid()),
    }
}
