//! Path sandbox for remote directory browsing.
//!
//! The panel sends possibly-adversarial `/`-separated path strings. The
//! resolver joins them onto a fixed root and confines every result to that
//! root with a component-wise containment check: a prefix of path
//! *components*, never of characters, so `/srv/game-evil` can never pass
//! for `/srv/game` and `..` segments cannot climb out.

use std::path::{Component, MAIN_SEPARATOR_STR, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a `/`-separated payload path onto the root and normalize it.
    ///
    /// The result is a candidate only: it still has to pass
    /// [`is_contained`](Self::is_contained) before anything touches the
    /// filesystem. An absolute payload replaces the root outright during
    /// the join and is then caught by the containment check.
    pub fn resolve(&self, input: &str) -> PathBuf {
        let native = input.replace('/', MAIN_SEPARATOR_STR);
        normalize(&self.root.join(native))
    }

    /// Component-wise prefix check against the root.
    ///
    /// Every component of the root, at its index, must equal the
    /// corresponding component of `path`. The root itself is contained.
    pub fn is_contained(&self, path: &Path) -> bool {
        let path = normalize(path);
        let mut path_components = path.components();

        for root_component in self.root.components() {
            if path_components.next() != Some(root_component) {
                return false;
            }
        }

        true
    }

    /// The `/`-separated form of `path` relative to the root, for
    /// presenting listing entries back to the peer. `None` when the path
    /// is not inside the sandbox.
    pub fn to_relative(&self, path: &Path) -> Option<String> {
        let path = normalize(path);

        if !self.is_contained(&path) {
            return None;
        }

        let suffix: Vec<String> = path
            .components()
            .skip(self.root.components().count())
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();

        Some(suffix.join("/"))
    }
}

/// Logical normalization: `.` segments vanish, `..` folds onto its parent
/// and never climbs above the filesystem root. No filesystem access, so
/// paths that do not (yet) exist normalize the same way as ones that do.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping an empty or root-only path is a no-op: `..`
                // cannot escape past the top.
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    normalized
}
