//! inotify-backed `WatchBackend` (Linux only).

/// Procfs tunable holding the per-user inotify watch limit.
pub const MAX_USER_WATCHES: &str = "/proc/sys/fs/inotify/max_user_watches";

/// Current per-user watch limit; `None` when it cannot be read.
#[must_use]
pub fn watch_limit() -> Option<usize> {
    std::fs::read_to_string(MAX_USER_WATCHES)
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(target_os = "linux")]
pub use linux::InotifyBackend;

#[cfg(target_os = "linux")]
mod linux {
    use std::path::Path;

    use nix::errno::Errno;
    use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};

    use crate::application::ports::WatchBackend;
    use crate::domain::error::WatchError;
    use crate::domain::watch::WatchEvent;

    /// Watches one fact directory plus individual fact files.
    pub struct InotifyBackend {
        inotify: Inotify,
    }

    impl InotifyBackend {
        /// Start watching `fact_dir` for files created or renamed into it.
        ///
        /// # Errors
        ///
        /// Returns an error if inotify cannot be initialised or the directory
        /// cannot be watched.
        pub fn new(fact_dir: &Path) -> Result<Self, WatchError> {
            let inotify = Inotify::init(InitFlags::IN_CLOEXEC).map_err(|e| backend("init", e))?;
            // Puppet renames a flushed temp file into place, so MOVED_TO is
            // the event that matters; CREATE covers plain writers.
            inotify
                .add_watch(fact_dir, AddWatchFlags::IN_CREATE | AddWatchFlags::IN_MOVED_TO)
                .map_err(|e| backend("add watch", e))?;
            Ok(Self { inotify })
        }
    }

    impl WatchBackend for InotifyBackend {
        type Handle = WatchDescriptor;

        fn watch_file(&mut self, path: &Path) -> Result<WatchDescriptor, WatchError> {
            self.inotify
                .add_watch(path, AddWatchFlags::IN_CLOSE_WRITE)
                .map_err(|e| backend("add watch", e))
        }

        fn next_events(&mut self) -> Result<Option<Vec<WatchEvent<WatchDescriptor>>>, WatchError> {
            loop {
                let raw = match self.inotify.read_events() {
                    Ok(raw) => raw,
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Err(backend("read", e)),
                };
                let events = raw
                    .into_iter()
                    .filter(|event| {
                        if event.mask.contains(AddWatchFlags::IN_Q_OVERFLOW) {
                            tracing::warn!("inotify queue overflow, some fact updates were missed");
                            return false;
                        }
                        true
                    })
                    .map(|event| WatchEvent {
                        handle: event.wd,
                        name: event.name,
                        oneshot: event.mask.contains(AddWatchFlags::IN_ONESHOT),
                        removed: event.mask.contains(AddWatchFlags::IN_IGNORED),
                    })
                    .collect();
                return Ok(Some(events));
            }
        }
    }

    fn backend(action: &'static str, errno: Errno) -> WatchError {
        WatchError::Backend {
            action,
            message: errno.desc().to_string(),
        }
    }
}

/// Lets callers probe support before spinning up workers.
#[must_use]
pub fn supported() -> bool {
    cfg!(target_os = "linux")
}
