// Library root
// -----------
// This crate exposes the core of the CLI as a library. The binary
// (`main.rs`) loads configuration and hands a session opener and a
// console prompter to the action loop.
//
// Module responsibilities:
// - `config`: configuration layers (file, environment, flags).
// - `auth`: credential bundles and access-token exchange.
// - `api`: the `StorageBackend` seam and its Drive v3 HTTP client.
// - `session`: one authenticated backend handle per action.
// - `catalog`: folder enumeration, snapshots and index selection.
// - `transfer`: upload with progress and streamed download.
// - `objects`: delete by id.
// - `actions`: the menu-driven action loop.
// - `ui`: terminal prompts, file dialogs and progress bars.
//
// Everything below `actions` is usable without a terminal, which is how
// the tests drive it.
pub mod actions;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod objects;
pub mod session;
pub mod transfer;
pub mod ui;

pub use error::{Error, Severity};
pub use model::RemoteObject;
pub use session::Session;
