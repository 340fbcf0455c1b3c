//! The diary file on disk. Loads it, answers queries, and rewrites it on every edit.
//!
//! [DiaryStore] keeps the file text, its CRC-32 and the parsed notes in memory.
//! Every edit builds a new text and goes through `commit`: if the file changed on
//! disk since we last read or wrote it, the edit is refused with
//! [StoreError::Conflict]. Otherwise the new text goes to a temp file next to the
//! diary, which is then renamed over it.
//! Not meant for concurrent use: callers serialize edits on one store.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::codec::{header_for, parse_all, CodecError, NoteRecord, NoteSpan, NoteSummary};
use crate::dates;

/// An open diary file.
#[derive(Debug)]
pub struct DiaryStore {
    path: PathBuf,
    raw_text: String,
    checksum: u32,
    notes: Vec<NoteRecord>,
}

impl DiaryStore {
    /// Reads and parses the diary at `path`. An empty file is a diary with no notes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path).map_err(|e| StoreError::Read(path.clone(), e))?;
        let checksum = crc32fast::hash(&bytes);
        let raw_text = String::from_utf8(bytes)
            .map_err(|e| StoreError::Read(path.clone(), io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let notes = parse_all(&raw_text)?;
        debug!("loaded {} note(s) from {}", notes.len(), path.display());
        Ok(Self {
            path,
            raw_text,
            checksum,
            notes,
        })
    }

    /// Creates a new, empty diary file. Fails if something already exists at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StoreError::Write(path.clone(), e))?;
        info!("created diary {}", path.display());
        Self::open(path)
    }

    /// Drops the in-memory state and reads the file again. The way out of a conflict.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        *self = Self::open(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The diary text as last loaded or written.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// CRC-32 of [Self::raw_text].
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// CRC-32 of what is on disk right now.
    pub fn disk_checksum(&self) -> Result<u32, StoreError> {
        checksum_file(&self.path)
    }

    /// Notes in file order.
    pub fn list_notes(&self) -> &[NoteRecord] {
        &self.notes
    }

    pub fn summaries(&self) -> Vec<NoteSummary> {
        self.notes.iter().map(NoteRecord::summary).collect()
    }

    /// The last note in the file, i.e. the most recently created one.
    pub fn latest_note(&self) -> Option<&NoteRecord> {
        self.notes.last()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }

    fn find(&self, id: &str) -> Result<&NoteRecord, StoreError> {
        self.notes
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| StoreError::NoteNotFound(id.to_string()))
    }

    pub fn get_body(&self, id: &str) -> Result<&str, StoreError> {
        Ok(&self.find(id)?.body)
    }

    pub fn get_metadata(&self, id: &str) -> Result<&BTreeMap<String, String>, StoreError> {
        Ok(&self.find(id)?.metadata)
    }

    /// Notes whose body contains `pattern`, ignoring case, in file order.
    pub fn search(&self, pattern: &str) -> Vec<&NoteRecord> {
        let needle = pattern.to_lowercase();
        self.notes
            .iter()
            .filter(|n| n.body.to_lowercase().contains(&needle))
            .collect()
    }

    /// Updates the note `id` if it exists, otherwise appends it as a new note.
    ///
    /// An update rewrites the date line and the body; other metadata lines and all
    /// other notes stay byte-identical. `date` is written as given.
    /// A new note's id must read back exactly as given, so ids with surrounding
    /// whitespace are refused with [StoreError::Malformed].
    pub fn save_note(&mut self, body: &str, id: &str, date: &str) -> Result<(), StoreError> {
        let new_text = match self.find(id) {
            Ok(note) => with_note_replaced(&self.raw_text, &note.span, date, body),
            Err(_) => format!("{}{}{}", self.raw_text, header_for(id, date), body),
        };
        let notes = parse_all(&new_text)?;
        if !notes.iter().any(|n| n.id == id) {
            return Err(StoreError::Malformed(format!(
                "note_id `{id}` would not be stored verbatim"
            )));
        }
        self.commit(new_text, notes)
    }

    /// Removes the whole block of note `id`. The following note keeps its separator.
    pub fn delete_note(&mut self, id: &str) -> Result<(), StoreError> {
        let span = self.find(id)?.span;
        let mut new_text = String::with_capacity(self.raw_text.len());
        new_text.push_str(&self.raw_text[..span.header_start]);
        new_text.push_str(&self.raw_text[span.body_end..]);
        let notes = parse_all(&new_text)?;
        self.commit(new_text, notes)
    }

    /// Re-dates note `id` in place, keeping its body and position.
    pub fn change_date(&mut self, id: &str, new_date: &str) -> Result<(), StoreError> {
        let body = self.get_body(id)?.to_string();
        self.save_note(&body, id, new_date)
    }

    /// Advisory check for callers before [Self::change_date] or [Self::save_note].
    pub fn is_valid_date(s: &str) -> bool {
        dates::is_valid_date(s)
    }

    /// Writes `new_text` if the file on disk is still what we last saw.
    /// `notes` is `new_text` already parsed: text we could not open again never reaches disk.
    fn commit(&mut self, new_text: String, notes: Vec<NoteRecord>) -> Result<(), StoreError> {
        let on_disk = self.disk_checksum()?;
        if on_disk != self.checksum {
            warn!(
                "refusing to save {}: changed on disk (crc {:08x}, expected {:08x})",
                self.path.display(),
                on_disk,
                self.checksum
            );
            return Err(StoreError::Conflict(self.path.clone()));
        }

        write_atomically(&self.path, new_text.as_bytes())?;
        self.checksum = crc32fast::hash(new_text.as_bytes());
        self.raw_text = new_text;
        self.notes = notes;
        info!("saved {} ({} note(s))", self.path.display(), self.notes.len());
        Ok(())
    }
}

/// `text` with the date line and body of the note at `span` replaced.
fn with_note_replaced(text: &str, span: &NoteSpan, date: &str, body: &str) -> String {
    let head = &text[..span.metadata_end];
    let mut out = String::with_capacity(text.len() + body.len() + date.len());
    out.push_str(head);
    if !head.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(date);
    out.push_str("\n\n");
    out.push_str(body);
    out.push_str(&text[span.body_end..]);
    out
}

pub(crate) fn checksum_file(path: &Path) -> Result<u32, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::Read(path.to_path_buf(), e))?;
    Ok(crc32fast::hash(&bytes))
}

/// Temp file in the same directory, fsync, rename over `path`.
/// On any error before the rename the temp file is removed and `path` is untouched.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let write_err = |e: io::Error| StoreError::Write(path.to_path_buf(), e);

    let mut tmp = tempfile::Builder::new()
        .prefix(".diary_")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).map_err(write_err)?;
    }
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    #[cfg(unix)]
    {
        if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
            warn!("could not sync directory {}: {}", dir.display(), e);
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("read error for {0}: {1}")]
    Read(PathBuf, io::Error),
    #[error("write error for {0}: {1}")]
    Write(PathBuf, io::Error),
    #[error("malformed diary: {0}")]
    Malformed(String),
    #[error("note not found: {0}")]
    NoteNotFound(String),
    #[error("{0} changed on disk since it was loaded; reload before saving")]
    Conflict(PathBuf),
}

impl StoreError {
    /// Plain I/O failure, as opposed to a conflict or a lookup miss.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Read(..) | Self::Write(..))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::NoteNotFound(id) => Self::NoteNotFound(id),
            malformed @ CodecError::Malformed { .. } => Self::Malformed(malformed.to_string()),
        }
    }
}
