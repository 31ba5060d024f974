//! Lexical path helpers.
//!
//! Everything that depends on how the platform splits a path into components lives here.
//! Nothing in this module touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Normalizes `path`: resolves `.` and `..` and removes trailing separators.
/// A `..` that would climb above the first component is dropped.
pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(parent) = result.parent() {
                    result = parent.to_path_buf();
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Cleans `path` the way a base path is stored.
///
/// Unlike [`normalize`], leading `..` of a relative path are kept, since they are
/// meaningful to the wrapped filesystem. An empty result becomes `.`.
pub fn clean<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut cleaned = PathBuf::new();
    let mut rooted = false;
    let mut parts: Vec<Component> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::Prefix(_) => cleaned.push(component),
            Component::RootDir => {
                cleaned.push(component);
                rooted = true;
            }
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }

    cleaned.extend(parts);
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

/// Cleans a virtual path against the virtual root and returns it relative to that root.
///
/// Drive prefixes and leading separators are dropped: every input is re-rooted at `/`.
/// Returns `None` when the path climbs above the root, e.g. `../x` or `a/../../x`.
/// An empty result means the root itself.
pub fn confine<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    let mut rooted = false;
    let mut parts: Vec<Component> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::Prefix(_) | Component::RootDir => rooted = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() && !rooted {
                    return None;
                }
            }
            Component::Normal(_) => parts.push(component),
        }
    }

    Some(parts.into_iter().collect())
}

/// Joins `base` with a path produced by [`confine`].
/// An empty remainder maps to `base` itself.
pub fn join_confined(base: &Path, confined: &Path) -> PathBuf {
    if confined.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(confined)
    }
}

/// Re-expresses `path` relative to `base` as a rooted virtual path.
/// Returns `None` if `path` is not at or below `base`.
pub fn strip_base(base: &Path, path: &Path) -> Option<PathBuf> {
    let rest = path.strip_prefix(base).ok()?;
    Some(virtual_root().join(rest))
}

/// Returns true if `path` names the root `/` (also `/.`, `//`, `/..`).
pub fn is_virtual_root<P: AsRef<Path>>(path: P) -> bool {
    let normalized = normalize(path);
    let mut components = normalized.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::RootDir), None)
    )
}

/// The root of every virtual namespace.
pub fn virtual_root() -> PathBuf {
    PathBuf::from(std::path::MAIN_SEPARATOR_STR)
}
