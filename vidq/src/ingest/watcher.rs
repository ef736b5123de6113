//! File system watcher backed by `notify`.

use std::path::Path;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use super::{EventIngestor, FsEvent};

/// Watches the root folder recursively while alive.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
}

impl FsWatcher {
    /// Start watching `root`, forwarding events through `ingestor`.
    ///
    /// The callback runs on the watcher's own thread.
    pub fn start(root: &Path, ingestor: EventIngestor) -> Result<Self, notify::Error> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(e) = ingestor.ingest_blocking(classify(&event)) {
                    warn!(error = %e, "Dropping file event");
                }
            }
            Err(e) => warn!(error = %e, "File watcher error"),
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "Watching folder");

        Ok(Self { _watcher: watcher })
    }
}

/// Map a raw notification onto [`FsEvent`].
///
/// Only the destination side of a rename counts. FSEvents cannot tell the
/// sides apart, so an ambiguous rename counts when the path still exists.
pub fn classify(event: &Event) -> FsEvent {
    let target = match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.first(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.first().filter(|path| path.is_file())
        }
        _ => None,
    };

    match target.and_then(|path| Some((path.parent()?, path.file_name()?))) {
        Some((directory, file)) => FsEvent::finalized(directory, file),
        None => FsEvent::Other,
    }
}
