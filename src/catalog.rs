// Folder enumeration and index-based selection.

use crate::error::Error;
use crate::model::RemoteObject;
use crate::session::Session;

/// Result of one enumeration. It is the only valid index space for the
/// selection that follows it; a later enumeration on the same session
/// makes it stale.
#[derive(Debug, Clone)]
pub struct Snapshot {
    epoch: u64,
    folder_id: String,
    objects: Vec<RemoteObject>,
}

/// A 1-based index resolved against a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    epoch: u64,
    index: usize,
    object: &'a RemoteObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("selection {index} is outside 1..={len}")]
pub struct OutOfRange {
    pub index: i64,
    pub len: usize,
}

impl Snapshot {
    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn objects(&self) -> &[RemoteObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Resolve a 1-based index. Anything outside `1..=len` is rejected.
    pub fn select(&self, index: i64) -> Result<Selection<'_>, OutOfRange> {
        let out_of_range = OutOfRange {
            index,
            len: self.len(),
        };
        let position = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .ok_or(out_of_range)?;
        let object = self.objects.get(position).ok_or(out_of_range)?;
        Ok(Selection {
            epoch: self.epoch,
            index: position + 1,
            object,
        })
    }
}

impl<'a> Selection<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn object(&self) -> &'a RemoteObject {
        self.object
    }

    pub fn object_id(&self) -> &'a str {
        &self.object.id
    }

    /// Fails with `StaleSelection` if the session enumerated again since
    /// this selection's snapshot was taken.
    pub fn ensure_current(&self, session: &Session) -> Result<(), Error> {
        if session.is_current(self.epoch) {
            Ok(())
        } else {
            Err(Error::StaleSelection)
        }
    }
}

pub struct FolderCatalog;

impl FolderCatalog {
    /// Enumerate the direct children of `folder_id`. Order is whatever
    /// the backend returns.
    pub fn list(session: &Session, folder_id: &str) -> Result<Snapshot, Error> {
        let objects = session
            .backend()
            .list_children(folder_id)
            .map_err(|source| {
                tracing::warn!(folder_id, error = %source, "folder enumeration failed");
                Error::Query {
                    folder_id: folder_id.to_string(),
                    source,
                }
            })?;
        tracing::debug!(folder_id, count = objects.len(), "folder enumerated");
        Ok(Snapshot {
            epoch: session.next_epoch(),
            folder_id: folder_id.to_string(),
            objects,
        })
    }
}
