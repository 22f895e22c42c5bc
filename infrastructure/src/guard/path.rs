//! Filesystem path guard
//!
//! Paths are compared only after symlinks are resolved on both sides, so a
//! link inside an allowed directory that points outside it is rejected.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use warden_domain::{Capability, GuardPolicy};

use super::GuardError;

pub struct PathGuard;

impl PathGuard {
    /// Whether `target` lies inside one of the allow-listed directories.
    ///
    /// An empty allow-list allows everything. Otherwise the canonical form
    /// of `target` (or of its parent, if `target` does not exist yet) must
    /// equal or descend from the canonical form of some entry. Entries that
    /// do not resolve are ignored.
    pub fn is_allowed<P: AsRef<Path>>(target: &Path, allow_list: &[P]) -> bool {
        if allow_list.is_empty() {
            return true;
        }

        let Some(resolved) = canonical_target(target) else {
            debug!(path = %target.display(), "Path does not resolve");
            return false;
        };

        allow_list
            .iter()
            .filter_map(|entry| fs::canonicalize(entry.as_ref()).ok())
            .any(|root| resolved.starts_with(&root))
    }

    /// Apply a filesystem policy and return the path to operate on.
    ///
    /// The returned path is canonical whenever the target resolves, so the
    /// caller acts on exactly what was checked.
    pub fn check(target: &str, policy: &GuardPolicy) -> Result<PathBuf, GuardError> {
        if !policy.enabled {
            return Err(GuardError::Disabled(Capability::Filesystem));
        }

        let path = Path::new(target);
        if policy.allow_list.is_empty() {
            return Ok(canonical_target(path).unwrap_or_else(|| path.to_path_buf()));
        }

        if !Self::is_allowed(path, &policy.allow_list) {
            return Err(GuardError::PathNotAllowed(target.to_string()));
        }
        // is_allowed succeeded, so the target resolved
        canonical_target(path).ok_or_else(|| GuardError::PathNotAllowed(target.to_string()))
    }
}

/// Canonical form of `target`, or of its parent joined with the file name
/// when `target` itself does not exist.
fn canonical_target(target: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = fs::canonicalize(target) {
        return Some(resolved);
    }

    // A dangling symlink could be repointed after the check
    if fs::symlink_metadata(target).is_ok() {
        return None;
    }

    let name = target.file_name()?;
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|p| p.join(name))
}
