// ─── Path Guard ───
// Lexical containment checks for anything written under an install root.

use std::path::{Component, Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// Resolve `.` and `..` without touching the filesystem. Relative paths are
/// anchored at the current working directory.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Fail with `PathOutsideRoot` unless `path` resolves inside `root`.
pub fn ensure_inside(root: &Path, path: &Path) -> LauncherResult<PathBuf> {
    let root = normalize(root);
    let resolved = normalize(path);
    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(LauncherError::PathOutsideRoot {
            path: resolved,
            root,
        })
    }
}
