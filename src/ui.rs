// UI layer: the terminal implementation of `Prompter`. Numeric prompts
// use `dialoguer`, file selection uses native dialogs from `rfd` (or a
// typed path when dialogs are disabled) and uploads show an `indicatif`
// progress bar.

use crate::actions::{MenuChoice, Notice, Prompter, Purpose};
use crate::catalog::Snapshot;
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;

const SEPARATOR: &str = "--------------------------------------------";

/// Upload bar that is finished when the progress callback is dropped,
/// which also covers empty files that never report progress.
struct UploadBar(ProgressBar);

impl Drop for UploadBar {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            self.0.finish();
        }
    }
}

/// Console prompter. With `dialogs` off, paths are typed at the prompt,
/// which keeps the tool usable over SSH or without a desktop session.
pub struct ConsolePrompter {
    dialogs: bool,
}

impl ConsolePrompter {
    pub fn new(dialogs: bool) -> Self {
        ConsolePrompter { dialogs }
    }

    fn typed_path(&self, prompt: &str) -> Option<PathBuf> {
        let input: io::Result<String> = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
        match input {
            Ok(text) if text.trim().is_empty() => None,
            Ok(text) => Some(PathBuf::from(text.trim())),
            Err(e) => {
                tracing::warn!(error = %e, "path prompt failed");
                None
            }
        }
    }
}

impl Prompter for ConsolePrompter {
    fn prompt_menu_choice(&mut self) -> io::Result<i64> {
        println!("\nChoose an option:");
        for (i, choice) in MenuChoice::ALL.iter().enumerate() {
            println!("{}. {}", i + 1, choice.label());
        }
        Input::new()
            .with_prompt("Enter your choice (1-5)")
            .interact_text()
    }

    fn prompt_list_index(&mut self, len: usize) -> io::Result<i64> {
        Input::new()
            .with_prompt(format!("Number of the file (1-{len})"))
            .interact_text()
    }

    fn choose_local_file_for_upload(&mut self) -> Option<PathBuf> {
        if self.dialogs {
            rfd::FileDialog::new()
                .set_title("Choose the file to upload")
                .pick_file()
        } else {
            self.typed_path("Path of the file to upload (empty to cancel)")
        }
    }

    fn choose_save_path(&mut self, suggested_name: &str) -> Option<PathBuf> {
        if self.dialogs {
            rfd::FileDialog::new()
                .set_title("Choose where to save the file")
                .set_file_name(suggested_name)
                .save_file()
        } else {
            self.typed_path(&format!(
                "Save {suggested_name} to (empty to cancel)"
            ))
        }
    }

    fn confirm_another_upload(&mut self) -> io::Result<bool> {
        Confirm::new()
            .with_prompt("Upload another file?")
            .default(false)
            .interact()
    }

    fn upload_progress(&mut self, name: &str, total: u64) -> Box<dyn FnMut(u64, u64) + Send> {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(name.to_string());
        let bar = UploadBar(bar);
        Box::new(move |sent: u64, total: u64| {
            bar.0.set_position(sent);
            if sent >= total {
                bar.0.finish();
            }
        })
    }

    fn notify(&mut self, notice: Notice<'_>) {
        match notice {
            Notice::InvalidMenuChoice => {
                println!("{}", "Invalid option, choose a number from 1 to 5.".yellow())
            }
            Notice::EmptyFolder(purpose) => println!("\n{}", empty_message(purpose)),
            Notice::Listing { purpose, snapshot } => print_listing(purpose, snapshot),
            Notice::InvalidSelection { len } => println!(
                "{}",
                format!("Invalid option, choose a number between 1 and {len}").yellow()
            ),
            Notice::FileSelected(path) => println!("\nSelected file: {}", path.display()),
            Notice::Uploaded(object) => println!(
                "\n{} ID: {}",
                "Upload complete.".green(),
                object.id
            ),
            Notice::Deleted(object) => {
                println!("\n{} ({})", "File deleted.".green(), object.name)
            }
            Notice::Downloaded {
                object,
                path,
                bytes,
            } => println!(
                "\n{} {} ({bytes} bytes) -> {}",
                "Downloaded".green(),
                object.name,
                path.display()
            ),
            Notice::Cancelled => println!("\nNo file chosen, nothing to do."),
            Notice::Failed(err) => eprintln!("{} {err}", "Error:".red()),
            Notice::Goodbye => println!("\nExiting."),
        }
    }
}

fn empty_message(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::Delete => "There are no files in the folder to delete.",
        Purpose::List => "There are no files in the folder.",
        Purpose::Download => "There are no files in the folder to download.",
    }
}

fn print_listing(purpose: Purpose, snapshot: &Snapshot) {
    println!("\nFiles found in the folder:");
    for (i, object) in snapshot.objects().iter().enumerate() {
        let n = i + 1;
        match purpose {
            Purpose::List => {
                println!("\n{n}. Name: {}", object.name);
                println!("   MIME type: {}", object.mime_type);
                println!("   Extension: {}", object.extension());
                match object.size {
                    Some(size) => println!("   Size: {size} bytes"),
                    None => println!("   Size: not available"),
                }
                println!("{SEPARATOR}");
            }
            Purpose::Delete => {
                println!("{n}. Name: {}", object.name);
                println!("   ID: {}", object.id);
                println!("{SEPARATOR}");
            }
            Purpose::Download => println!("{n}. Name: {} (ID: {})", object.name, object.id),
        }
    }
}
