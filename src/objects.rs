// Object mutation: delete by id.

use crate::catalog::Selection;
use crate::error::Error;
use crate::session::Session;

pub struct ObjectManager;

impl ObjectManager {
    /// Delete one object. An id the backend no longer knows is an error,
    /// not a silent success.
    pub fn delete(session: &Session, object_id: &str) -> Result<(), Error> {
        session
            .backend()
            .delete_object(object_id)
            .map_err(|source| {
                tracing::warn!(object_id, error = %source, "delete failed");
                Error::Delete {
                    object_id: object_id.to_string(),
                    source,
                }
            })?;
        tracing::info!(object_id, "object deleted");
        Ok(())
    }

    pub fn delete_selected(session: &Session, selection: &Selection<'_>) -> Result<(), Error> {
        selection.ensure_current(session)?;
        Self::delete(session, selection.object_id())
    }
}
