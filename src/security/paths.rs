//! Path containment for the served tree.
//!
//! Normalization is purely lexical: `.` is dropped and `..` pops the previous
//! component. Symlinks are not resolved, so a link inside the root that points
//! outside of it is still served.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path without touching the filesystem.
///
/// A `..` at the root (or at the start of a relative path) is kept for relative
/// paths and dropped for absolute ones, matching how the OS resolves them.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if popped {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Join a URL path onto `root` and return the result if it stays inside `root`.
///
/// Returns `None` when the normalized result escapes the normalized root.
pub fn resolve_within(root: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = url_path.trim_start_matches('/');
    let root = normalize(root);
    let resolved = normalize(&root.join(relative));

    // An empty normalized root (".") is a prefix of everything, so leading
    // ".." must be rejected explicitly.
    let escapes = matches!(resolved.components().next(), Some(Component::ParentDir));
    if !escapes && resolved.starts_with(&root) {
        Some(resolved)
    } else {
        None
    }
}
