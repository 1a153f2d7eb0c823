// Action dispatch: one loop over the four operations. Each action opens
// its own session, re-enumerates the folder when it needs a selection
// and reports back through the `Prompter`. Recoverable errors return to
// the menu; fatal ones end the loop.

use crate::catalog::{FolderCatalog, Selection, Snapshot};
use crate::error::{Error, Severity};
use crate::model::RemoteObject;
use crate::objects::ObjectManager;
use crate::session::SessionOpener;
use crate::transfer::TransferEngine;
use std::io;
use std::path::{Path, PathBuf};

/// Entries of the main menu, numbered 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Upload,
    Delete,
    List,
    Download,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 5] = [
        MenuChoice::Upload,
        MenuChoice::Delete,
        MenuChoice::List,
        MenuChoice::Download,
        MenuChoice::Exit,
    ];

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(MenuChoice::Upload),
            2 => Some(MenuChoice::Delete),
            3 => Some(MenuChoice::List),
            4 => Some(MenuChoice::Download),
            5 => Some(MenuChoice::Exit),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuChoice::Upload => "Upload a file",
            MenuChoice::Delete => "Delete a file",
            MenuChoice::List => "List files",
            MenuChoice::Download => "Download a file",
            MenuChoice::Exit => "Exit",
        }
    }
}

/// Why a listing is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Delete,
    List,
    Download,
}

/// Everything the loop tells the user.
#[derive(Debug)]
pub enum Notice<'a> {
    InvalidMenuChoice,
    EmptyFolder(Purpose),
    Listing {
        purpose: Purpose,
        snapshot: &'a Snapshot,
    },
    InvalidSelection {
        len: usize,
    },
    FileSelected(&'a Path),
    Uploaded(&'a RemoteObject),
    Deleted(&'a RemoteObject),
    Downloaded {
        object: &'a RemoteObject,
        path: &'a Path,
        bytes: u64,
    },
    Cancelled,
    Failed(&'a Error),
    Goodbye,
}

/// Interactive collaborator: menu and index prompts, file dialogs,
/// progress display and message output.
pub trait Prompter {
    fn prompt_menu_choice(&mut self) -> io::Result<i64>;

    /// Ask for a 1-based index into a listing of `len` entries.
    fn prompt_list_index(&mut self, len: usize) -> io::Result<i64>;

    /// `None` when the user cancels.
    fn choose_local_file_for_upload(&mut self) -> Option<PathBuf>;

    /// `None` when the user cancels.
    fn choose_save_path(&mut self, suggested_name: &str) -> Option<PathBuf>;

    /// Asked after a successful upload.
    fn confirm_another_upload(&mut self) -> io::Result<bool>;

    /// Progress callback for an upload of `total` bytes.
    fn upload_progress(&mut self, name: &str, total: u64) -> Box<dyn FnMut(u64, u64) + Send>;

    fn notify(&mut self, notice: Notice<'_>);
}

/// Result of one action, as seen by the loop.
#[derive(Debug)]
pub enum Outcome {
    Success,
    Recoverable(Error),
    Fatal(Error),
}

impl From<Result<(), Error>> for Outcome {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(e) => match e.severity() {
                Severity::Recoverable => Outcome::Recoverable(e),
                Severity::Fatal => Outcome::Fatal(e),
            },
        }
    }
}

/// Whether the menu loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct ActionLoop<O, P> {
    opener: O,
    prompter: P,
    folder_id: String,
}

impl<O: SessionOpener, P: Prompter> ActionLoop<O, P> {
    pub fn new(opener: O, prompter: P, folder_id: impl Into<String>) -> Self {
        ActionLoop {
            opener,
            prompter,
            folder_id: folder_id.into(),
        }
    }

    pub fn into_prompter(self) -> P {
        self.prompter
    }

    /// Run the menu until the user exits or a fatal error occurs.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            let raw = self.prompter.prompt_menu_choice().map_err(Error::Prompt)?;
            let Some(choice) = MenuChoice::from_number(raw) else {
                self.prompter.notify(Notice::InvalidMenuChoice);
                continue;
            };
            if self.step(choice)? == Flow::Exit {
                self.prompter.notify(Notice::Goodbye);
                return Ok(());
            }
        }
    }

    /// Run one menu choice. Recoverable failures are reported and the
    /// loop continues; fatal ones are returned.
    pub fn step(&mut self, choice: MenuChoice) -> Result<Flow, Error> {
        tracing::debug!(?choice, "dispatching action");
        let result = match choice {
            MenuChoice::Upload => self.upload(),
            MenuChoice::Delete => self.delete(),
            MenuChoice::List => self.list(),
            MenuChoice::Download => self.download(),
            MenuChoice::Exit => return Ok(Flow::Exit),
        };
        match Outcome::from(result) {
            Outcome::Success => Ok(Flow::Continue),
            Outcome::Recoverable(e) => {
                tracing::warn!(?choice, error = %e, "action failed");
                self.prompter.notify(Notice::Failed(&e));
                Ok(Flow::Continue)
            }
            Outcome::Fatal(e) => {
                tracing::error!(?choice, error = %e, "action failed fatally");
                Err(e)
            }
        }
    }

    fn upload(&mut self) -> Result<(), Error> {
        loop {
            let Some(path) = self.prompter.choose_local_file_for_upload() else {
                self.prompter.notify(Notice::Cancelled);
                return Ok(());
            };
            // Checked before any session is opened.
            let source = TransferEngine::prepare(&path)?;
            self.prompter.notify(Notice::FileSelected(&path));

            let session = self.opener.open_session()?;
            let progress = self.prompter.upload_progress(source.name(), source.len());
            let object =
                TransferEngine::upload_source(&session, source, &self.folder_id, progress)?;
            self.prompter.notify(Notice::Uploaded(&object));

            if !self.prompter.confirm_another_upload().map_err(Error::Prompt)? {
                return Ok(());
            }
        }
    }

    fn delete(&mut self) -> Result<(), Error> {
        let session = self.opener.open_session()?;
        let snapshot = FolderCatalog::list(&session, &self.folder_id)?;
        if snapshot.is_empty() {
            self.prompter.notify(Notice::EmptyFolder(Purpose::Delete));
            return Ok(());
        }
        self.prompter.notify(Notice::Listing {
            purpose: Purpose::Delete,
            snapshot: &snapshot,
        });
        let selection = self.select(&snapshot)?;
        ObjectManager::delete_selected(&session, &selection)?;
        self.prompter.notify(Notice::Deleted(selection.object()));
        Ok(())
    }

    fn list(&mut self) -> Result<(), Error> {
        let session = self.opener.open_session()?;
        let snapshot = FolderCatalog::list(&session, &self.folder_id)?;
        if snapshot.is_empty() {
            self.prompter.notify(Notice::EmptyFolder(Purpose::List));
        } else {
            self.prompter.notify(Notice::Listing {
                purpose: Purpose::List,
                snapshot: &snapshot,
            });
        }
        Ok(())
    }

    fn download(&mut self) -> Result<(), Error> {
        let session = self.opener.open_session()?;
        let snapshot = FolderCatalog::list(&session, &self.folder_id)?;
        if snapshot.is_empty() {
            self.prompter.notify(Notice::EmptyFolder(Purpose::Download));
            return Ok(());
        }
        self.prompter.notify(Notice::Listing {
            purpose: Purpose::Download,
            snapshot: &snapshot,
        });
        let selection = self.select(&snapshot)?;
        let Some(path) = self.prompter.choose_save_path(&selection.object().name) else {
            self.prompter.notify(Notice::Cancelled);
            return Ok(());
        };
        let bytes = TransferEngine::download_selected(&session, &selection, &path)?;
        self.prompter.notify(Notice::Downloaded {
            object: selection.object(),
            path: &path,
            bytes,
        });
        Ok(())
    }

    /// Prompt until the index falls inside the snapshot.
    fn select<'s>(&mut self, snapshot: &'s Snapshot) -> Result<Selection<'s>, Error> {
        loop {
            let raw = self
                .prompter
                .prompt_list_index(snapshot.len())
                .map_err(Error::Prompt)?;
            match snapshot.select(raw) {
                Ok(selection) => return Ok(selection),
                Err(out_of_range) => {
                    tracing::debug!(%out_of_range, "rejected selection");
                    self.prompter.notify(Notice::InvalidSelection {
                        len: snapshot.len(),
                    });
                }
            }
        }
    }
}
