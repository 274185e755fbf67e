//! Locating the `.cool/` settings directory.
//!
//! Settings live next to the checkout they apply to, so lookup walks from the
//! working directory towards the filesystem root and stops at the first
//! `.cool/` it meets. `COOL_DIR` names a directory outright and skips the walk.

use std::path::{Path, PathBuf};

const COOL_DIR_NAME: &str = ".cool";
const COOL_DIR_ENV: &str = "COOL_DIR";

/// The settings directory that applies to `start`, if any.
///
/// A `COOL_DIR` that does not name an existing directory is ignored.
pub fn find_cool_dir(start: &Path) -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(COOL_DIR_ENV).map(PathBuf::from) {
        if dir.is_dir() {
            return Some(dir);
        }
    }

    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(COOL_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}
