//! Core of Markdown Diary: one plain-text file holding dated markdown notes.
//!
//! [DiaryStore] is the only thing that reads or writes the diary file; [codec] turns
//! its text into notes and renders new note headers. App state (recent diaries) lives
//! in its own app data directory (see [app_data]). No UI here.

pub mod app_data;
pub mod codec;
pub mod config;
pub mod dates;
pub mod store;
pub mod watcher;

pub use app_data::app_data_dir;
pub use codec::{
    header_for, new_note_id, parse_all, span_of, CodecError, NoteRecord, NoteSpan, NoteSummary,
};
pub use config::{
    add_recent_diary, config_path, load_config, recent_diaries, save_config, Config, ConfigError,
    MAX_RECENT_DIARIES,
};
pub use dates::{is_valid_date, today};
pub use store::{DiaryStore, StoreError};
pub use watcher::{watch_diary, DiaryWatcher, WatchError};
