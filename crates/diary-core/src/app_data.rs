//! Where the diary app keeps its own state (recent diaries).
//!
//! Diary files live wherever the user puts them. Only app state goes here.

use std::path::PathBuf;

/// Returns the directory for app state, e.g. `~/.local/share/markdowndiary/` on Linux.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "MarkdownDiary", "MarkdownDiary")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
