// Upload and download of object content.

use crate::catalog::Selection;
use crate::error::{BackendError, Error};
use crate::model::{Media, NewObject, RemoteObject};
use crate::session::Session;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

const COPY_BUFFER: usize = 64 * 1024;

/// Receives `(bytes_sent, total_bytes)` while an upload is in flight.
pub trait ProgressSink: Send {
    fn report(&mut self, sent: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: FnMut(u64, u64) + Send,
{
    fn report(&mut self, sent: u64, total: u64) {
        self(sent, total)
    }
}

/// Sink that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _sent: u64, _total: u64) {}
}

/// Reader that reports the running byte count after every read.
struct ProgressReader<R, P> {
    inner: R,
    sent: u64,
    total: u64,
    sink: P,
}

impl<R: Read, P: ProgressSink> Read for ProgressReader<R, P> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            self.sink.report(self.sent, self.total);
        }
        Ok(n)
    }
}

/// A local file opened and checked for upload. Dropping it closes the
/// file.
#[derive(Debug)]
pub struct LocalSource {
    file: File,
    name: String,
    len: u64,
    mime_type: String,
}

impl LocalSource {
    /// Base name the remote object will carry.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

pub struct TransferEngine;

impl TransferEngine {
    /// Open `local_path` and check it is a readable regular file with a
    /// UTF-8 base name. Touches no network.
    pub fn prepare(local_path: &Path) -> Result<LocalSource, Error> {
        let invalid = |msg: &str| {
            Error::io(
                local_path,
                io::Error::new(io::ErrorKind::InvalidInput, msg.to_string()),
            )
        };
        let file = File::open(local_path).map_err(|e| Error::io(local_path, e))?;
        let metadata = file.metadata().map_err(|e| Error::io(local_path, e))?;
        if !metadata.is_file() {
            return Err(invalid("not a regular file"));
        }
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| invalid("file name is not valid UTF-8"))?;
        let mime_type = mime_guess::from_path(local_path)
            .first_or_octet_stream()
            .to_string();
        Ok(LocalSource {
            file,
            name,
            len: metadata.len(),
            mime_type,
        })
    }

    /// Upload `local_path` into `parent_folder_id`, named after the
    /// file's base name. The local file is opened before any request is
    /// made and is closed on every exit path.
    pub fn upload<P>(
        session: &Session,
        local_path: &Path,
        parent_folder_id: &str,
        progress: P,
    ) -> Result<RemoteObject, Error>
    where
        P: ProgressSink + 'static,
    {
        let source = Self::prepare(local_path)?;
        Self::upload_source(session, source, parent_folder_id, progress)
    }

    /// Upload an already prepared file.
    pub fn upload_source<P>(
        session: &Session,
        source: LocalSource,
        parent_folder_id: &str,
        progress: P,
    ) -> Result<RemoteObject, Error>
    where
        P: ProgressSink + 'static,
    {
        let LocalSource {
            file,
            name,
            len: total,
            mime_type,
        } = source;
        tracing::info!(%name, total, %mime_type, parent = parent_folder_id, "uploading");

        let reader = ProgressReader {
            // Bound the stream to the announced length.
            inner: file.take(total),
            sent: 0,
            total,
            sink: progress,
        };
        let new_object = NewObject {
            name: name.clone(),
            parents: vec![parent_folder_id.to_string()],
            mime_type: None,
        };
        let media = Media {
            reader: Box::new(reader),
            len: total,
            mime_type,
        };

        let created = session
            .backend()
            .create_object(&new_object, media)
            .map_err(|source| {
                tracing::warn!(%name, error = %source, "upload failed");
                Error::Upload { name, source }
            })?;
        tracing::info!(id = %created.id, "upload complete");
        Ok(created)
    }

    /// Stream an object's content into `sink_path`. The local file is
    /// created before the remote stream is requested. On failure the
    /// partially written file is removed. Returns the byte count.
    pub fn download(session: &Session, object_id: &str, sink_path: &Path) -> Result<u64, Error> {
        let file = File::create(sink_path).map_err(|e| Error::io(sink_path, e))?;
        let result = stream_into(session, object_id, file, sink_path);
        if result.is_err() {
            if let Err(e) = fs::remove_file(sink_path) {
                tracing::warn!(path = %sink_path.display(), error = %e, "could not remove partial download");
            }
        }
        result
    }

    /// Download the object a selection points at. Fails if the session
    /// enumerated again after the selection's snapshot was taken.
    pub fn download_selected(
        session: &Session,
        selection: &Selection<'_>,
        sink_path: &Path,
    ) -> Result<u64, Error> {
        selection.ensure_current(session)?;
        Self::download(session, selection.object_id(), sink_path)
    }
}

fn stream_into(
    session: &Session,
    object_id: &str,
    file: File,
    sink_path: &Path,
) -> Result<u64, Error> {
    let download_error = |source: BackendError| {
        tracing::warn!(object_id, error = %source, "download failed");
        Error::Download {
            object_id: object_id.to_string(),
            source,
        }
    };

    let mut remote = session.backend().get_media(object_id).map_err(download_error)?;
    let mut local = BufWriter::new(file);
    let mut buf = vec![0u8; COPY_BUFFER];
    let mut written = 0u64;

    loop {
        let n = match remote.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(download_error(BackendError::Stream(e))),
        };
        local
            .write_all(&buf[..n])
            .map_err(|e| Error::io(sink_path, e))?;
        written += n as u64;
    }
    local.flush().map_err(|e| Error::io(sink_path, e))?;
    tracing::info!(object_id, written, path = %sink_path.display(), "download complete");
    Ok(written)
}
