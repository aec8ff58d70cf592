// src/watch/event.rs

use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};

/// What happened to a path, reduced to what the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Changed,
    Removed,
}

/// A classified filesystem notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FsEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FsEventKind::Created)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FsEventKind::Changed)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FsEventKind::Removed)
    }
}

/// Turn a raw notify event into per-path events.
///
/// Access and metadata-only events are dropped. Renames become a removal of
/// the old name and a creation of the new one; when notify cannot tell which
/// side of a rename a path is on, `exists` decides.
pub fn classify(event: &notify::Event, exists: impl Fn(&Path) -> bool) -> Vec<FsEvent> {
    let by_existence = |path: &PathBuf| {
        if exists(path) {
            FsEvent::created(path.clone())
        } else {
            FsEvent::removed(path.clone())
        }
    };

    match event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(FsEvent::created).collect(),
        EventKind::Remove(_) => event.paths.iter().cloned().map(FsEvent::removed).collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().cloned().map(FsEvent::removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().cloned().map(FsEvent::created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
            FsEvent::removed(event.paths[0].clone()),
            FsEvent::created(event.paths[1].clone()),
        ],
        EventKind::Modify(ModifyKind::Name(_)) => event.paths.iter().map(by_existence).collect(),
        EventKind::Modify(_) => event.paths.iter().cloned().map(FsEvent::changed).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use notify::Event;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
    }

    #[test]
    fn create_modify_remove() {
        let never = |_: &Path| false;
        assert_eq!(
            classify(&event(EventKind::Create(CreateKind::File), &["/a"]), never),
            vec![FsEvent::created("/a")]
        );
        assert_eq!(
            classify(
                &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/a"]),
                never
            ),
            vec![FsEvent::changed("/a")]
        );
        assert_eq!(
            classify(&event(EventKind::Remove(RemoveKind::File), &["/a"]), never),
            vec![FsEvent::removed("/a")]
        );
    }

    #[test]
    fn metadata_and_access_are_dropped() {
        let never = |_: &Path| false;
        assert!(classify(
            &event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)), &["/a"]),
            never
        )
        .is_empty());
        assert!(classify(&event(EventKind::Any, &["/a"]), never).is_empty());
    }

    #[test]
    fn renames_split_into_remove_and_create() {
        let never = |_: &Path| false;
        assert_eq!(
            classify(
                &event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &["/old", "/new"]),
                never
            ),
            vec![FsEvent::removed("/old"), FsEvent::created("/new")]
        );

        let only_new = |p: &Path| p == Path::new("/new");
        assert_eq!(
            classify(
                &event(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &["/old", "/new"]),
                only_new
            ),
            vec![FsEvent::removed("/old"), FsEvent::created("/new")]
        );
    }
}
