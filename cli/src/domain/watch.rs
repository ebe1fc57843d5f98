//! Watch-handle bookkeeping and event routing for the fact directory watch.
//!
//! Handles are opaque (`inotify` watch descriptors in production, plain
//! integers in tests). The directory watch itself is never recorded here, so
//! an unknown handle means "an entry appeared in the fact directory".

use std::collections::HashMap;
use std::ffi::OsString;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use crate::domain::config::FactExtension;
use crate::domain::facts::certname_from_path;

/// Mapping from watch handle to the fact file it watches.
#[derive(Debug)]
pub struct WatchTable<H> {
    paths: HashMap<H, PathBuf>,
}

impl<H> Default for WatchTable<H> {
    fn default() -> Self {
        Self {
            paths: HashMap::new(),
        }
    }
}

impl<H: Eq + Hash> WatchTable<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` for `handle`, returning the path it replaces.
    pub fn insert(&mut self, handle: H, path: PathBuf) -> Option<PathBuf> {
        self.paths.insert(handle, path)
    }

    /// Forget `handle` once its watch is gone.
    pub fn remove(&mut self, handle: &H) -> Option<PathBuf> {
        self.paths.remove(handle)
    }

    #[must_use]
    pub fn lookup(&self, handle: &H) -> Option<&Path> {
        self.paths.get(handle).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A filesystem event as delivered by the watch backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent<H> {
    pub handle: H,
    /// Entry name for directory events.
    pub name: Option<OsString>,
    /// The watch that fired was one-shot and is gone now.
    pub oneshot: bool,
    /// The watch was removed by the kernel, e.g. because its file was
    /// replaced or deleted. Carries no change of its own.
    pub removed: bool,
}

/// What to do about a qualifying event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEvent {
    pub path: PathBuf,
    pub certname: String,
    /// A close-after-write watch must be (re-)registered for `path`.
    pub subscribe: bool,
}

/// Resolve an event to a fact file and the host it belongs to.
///
/// Returns `None` for watch removals, events that cannot be resolved, and
/// files with another extension.
#[must_use]
pub fn route<H: Eq + Hash>(
    table: &WatchTable<H>,
    fact_dir: &Path,
    extension: FactExtension,
    event: &WatchEvent<H>,
) -> Option<RoutedEvent> {
    if event.removed {
        return None;
    }
    let (path, discovered) = match table.lookup(&event.handle) {
        Some(path) => (path.to_path_buf(), false),
        None => (fact_dir.join(event.name.as_ref()?), true),
    };
    let certname = certname_from_path(&path, extension)?;
    Some(RoutedEvent {
        path,
        certname,
        subscribe: discovered || event.oneshot,
    })
}
