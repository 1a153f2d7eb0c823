#![allow(dead_code)]

use drivefolder_cli::actions::{Notice, Prompter};
use drivefolder_cli::api::StorageBackend;
use drivefolder_cli::error::BackendError;
use drivefolder_cli::model::{Media, NewObject, RemoteObject};
use drivefolder_cli::Session;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

pub const FOLDER: &str = "folder-1";

struct Stored {
    object: RemoteObject,
    parent: String,
    content: Vec<u8>,
}

#[derive(Default)]
struct State {
    stored: Vec<Stored>,
    calls: Vec<String>,
    next_id: u64,
    fail_list: bool,
    fail_create: bool,
    broken_media: HashSet<String>,
}

/// Backend keeping objects in memory and recording every call.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<State>>,
}

fn not_found(id: &str) -> BackendError {
    BackendError::Status {
        status: 404,
        message: format!("File not found: {id}."),
    }
}

/// Yields nothing and then fails, like a connection reset mid-body.
struct ResetStream;

impl Read for ResetStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed objects `(id, name, content)` into `FOLDER`.
    pub fn with_objects(items: &[(&str, &str, &[u8])]) -> Self {
        let backend = Self::new();
        for (id, name, content) in items {
            backend.insert(id, name, FOLDER, content);
        }
        backend
    }

    pub fn insert(&self, id: &str, name: &str, parent: &str, content: &[u8]) {
        self.state.borrow_mut().stored.push(Stored {
            object: RemoteObject {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: "application/octet-stream".to_string(),
                size: Some(content.len() as u64),
            },
            parent: parent.to_string(),
            content: content.to_vec(),
        });
    }

    pub fn session(&self) -> Session {
        Session::from_backend(Box::new(self.clone()))
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .stored
            .iter()
            .map(|s| s.object.id.clone())
            .collect()
    }

    pub fn content(&self, id: &str) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .stored
            .iter()
            .find(|s| s.object.id == id)
            .map(|s| s.content.clone())
    }

    pub fn fail_list(&self) {
        self.state.borrow_mut().fail_list = true;
    }

    pub fn fail_create(&self) {
        self.state.borrow_mut().fail_create = true;
    }

    pub fn break_media(&self, id: &str) {
        self.state.borrow_mut().broken_media.insert(id.to_string());
    }
}

impl StorageBackend for MemoryBackend {
    fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteObject>, BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("list:{folder_id}"));
        if state.fail_list {
            return Err(BackendError::Status {
                status: 500,
                message: "backend unavailable".into(),
            });
        }
        Ok(state
            .stored
            .iter()
            .filter(|s| s.parent == folder_id)
            .map(|s| s.object.clone())
            .collect())
    }

    fn create_object(
        &self,
        metadata: &NewObject,
        mut media: Media,
    ) -> Result<RemoteObject, BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("create:{}", metadata.name));
        if state.fail_create {
            return Err(BackendError::Status {
                status: 403,
                message: "The user's Drive storage quota has been exceeded.".into(),
            });
        }

        let mut content = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = media.reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            content.extend_from_slice(&chunk[..n]);
        }
        // Dropping the reader here closes the local file.
        drop(media.reader);

        state.next_id += 1;
        let object = RemoteObject {
            id: format!("m{}", state.next_id),
            name: metadata.name.clone(),
            mime_type: media.mime_type.clone(),
            size: Some(content.len() as u64),
        };
        let parent = metadata.parents.first().cloned().unwrap_or_default();
        state.stored.push(Stored {
            object: object.clone(),
            parent,
            content,
        });
        Ok(object)
    }

    fn get_media(&self, object_id: &str) -> Result<Box<dyn Read + Send>, BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("media:{object_id}"));
        let stored = state
            .stored
            .iter()
            .find(|s| s.object.id == object_id)
            .ok_or_else(|| not_found(object_id))?;
        let content = Cursor::new(stored.content.clone());
        if state.broken_media.contains(object_id) {
            let half = stored.content.len() / 2;
            let partial = Cursor::new(stored.content[..half].to_vec());
            return Ok(Box::new(partial.chain(ResetStream)));
        }
        Ok(Box::new(content))
    }

    fn delete_object(&self, object_id: &str) -> Result<(), BackendError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("delete:{object_id}"));
        let position = state
            .stored
            .iter()
            .position(|s| s.object.id == object_id)
            .ok_or_else(|| not_found(object_id))?;
        state.stored.remove(position);
        Ok(())
    }
}

/// Prompter fed from queues; records every notice as a short string.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub menu: VecDeque<i64>,
    pub indices: VecDeque<i64>,
    pub uploads: VecDeque<Option<PathBuf>>,
    pub saves: VecDeque<Option<PathBuf>>,
    pub another_upload: VecDeque<bool>,
    pub events: Vec<String>,
    pub progress: Arc<Mutex<Vec<(u64, u64)>>>,
}

fn script_exhausted() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted")
}

impl ScriptedPrompter {
    pub fn with_menu(menu: &[i64]) -> Self {
        ScriptedPrompter {
            menu: menu.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn indices(mut self, indices: &[i64]) -> Self {
        self.indices = indices.iter().copied().collect();
        self
    }

    pub fn uploads(mut self, paths: Vec<Option<PathBuf>>) -> Self {
        self.uploads = paths.into();
        self
    }

    pub fn saves(mut self, paths: Vec<Option<PathBuf>>) -> Self {
        self.saves = paths.into();
        self
    }

    pub fn another_upload(mut self, answers: &[bool]) -> Self {
        self.another_upload = answers.iter().copied().collect();
        self
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn has(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_menu_choice(&mut self) -> io::Result<i64> {
        self.menu.pop_front().ok_or_else(script_exhausted)
    }

    fn prompt_list_index(&mut self, _len: usize) -> io::Result<i64> {
        self.indices.pop_front().ok_or_else(script_exhausted)
    }

    fn choose_local_file_for_upload(&mut self) -> Option<PathBuf> {
        self.uploads.pop_front().flatten()
    }

    fn choose_save_path(&mut self, _suggested_name: &str) -> Option<PathBuf> {
        self.saves.pop_front().flatten()
    }

    fn confirm_another_upload(&mut self) -> io::Result<bool> {
        Ok(self.another_upload.pop_front().unwrap_or(false))
    }

    fn upload_progress(&mut self, _name: &str, _total: u64) -> Box<dyn FnMut(u64, u64) + Send> {
        let progress = self.progress.clone();
        Box::new(move |sent: u64, total: u64| progress.lock().unwrap().push((sent, total)))
    }

    fn notify(&mut self, notice: Notice<'_>) {
        let event = match notice {
            Notice::InvalidMenuChoice => "invalid-menu".to_string(),
            Notice::EmptyFolder(purpose) => format!("empty:{purpose:?}"),
            Notice::Listing { purpose, snapshot } => {
                let ids: Vec<&str> = snapshot.objects().iter().map(|o| o.id.as_str()).collect();
                format!("listing:{purpose:?}:{}", ids.join(","))
            }
            Notice::InvalidSelection { len } => format!("invalid-selection:{len}"),
            Notice::FileSelected(path) => format!(
                "selected:{}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
            Notice::Uploaded(object) => format!("uploaded:{}", object.name),
            Notice::Deleted(object) => format!("deleted:{}", object.id),
            Notice::Downloaded { object, bytes, .. } => {
                format!("downloaded:{}:{bytes}", object.id)
            }
            Notice::Cancelled => "cancelled".to_string(),
            Notice::Failed(err) => format!("failed:{err}"),
            Notice::Goodbye => "goodbye".to_string(),
        };
        self.events.push(event);
    }
}
