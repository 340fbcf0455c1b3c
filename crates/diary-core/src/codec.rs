//! Splitting diary text into notes, and rendering new note headers.
//!
//! A diary is a single text file holding note blocks one after another:
//!
//! ```text
//! \n<!---\nmarkdown-diary note metadata\nnote_id = <id>\n--->\n<date>\n\n<body>
//! ```
//!
//! The leading newline belongs to the header: it separates the block from the
//! previous note's body. Nothing here does I/O or keeps state between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// First line of every note header.
pub const HEADER_OPEN: &str = "<!---";
/// Mandatory second line of every note header.
pub const HEADER_MAGIC: &str = "markdown-diary note metadata";
/// Line closing the metadata section.
pub const HEADER_CLOSE: &str = "--->";
/// Metadata key every header must carry.
pub const NOTE_ID_KEY: &str = "note_id";

/// Byte offsets of one note block inside the diary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSpan {
    /// Start of the block, including the separating newline before `<!---`.
    pub header_start: usize,
    /// Just past the `--->` line.
    pub metadata_end: usize,
    /// Start of the body (after the date line and its blank line).
    pub header_end: usize,
    /// Start of the next block, or end of text.
    pub body_end: usize,
}

/// One note as found in the diary text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: String,
    pub date: String,
    pub title: String,
    pub body: String,
    /// All `key = value` pairs of the header, plus `date` and `title`.
    pub metadata: BTreeMap<String, String>,
    pub span: NoteSpan,
}

impl NoteRecord {
    pub fn summary(&self) -> NoteSummary {
        NoteSummary {
            id: self.id.clone(),
            date: self.date.clone(),
            title: self.title.clone(),
        }
    }
}

/// What a note list shows: identity, date and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    pub date: String,
    pub title: String,
}

/// A physical line: byte range including its line break, and the text without it.
struct Line<'a> {
    start: usize,
    end: usize,
    content: &'a str,
}

impl Line<'_> {
    /// Offset where the line break begins (equals `end` for an unterminated last line).
    fn content_end(&self) -> usize {
        self.start + self.content.len()
    }

    fn is(&self, marker: &str) -> bool {
        self.content.trim_end() == marker
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    for raw in text.split_inclusive('\n') {
        let content = raw
            .strip_suffix('\n')
            .map(|s| s.strip_suffix('\r').unwrap_or(s))
            .unwrap_or(raw);
        lines.push(Line {
            start,
            end: start + raw.len(),
            content,
        });
        start += raw.len();
    }
    lines
}

/// Parses every note of `text`, in file order.
///
/// Two passes: first find the headers (a `<!---` line directly followed by the
/// `markdown-diary note metadata` line), then parse each one within the lines up
/// to the next. Any other `<!---` line is body text. A header missing its `--->`
/// terminator, its date line or its `note_id` makes the whole diary malformed,
/// as do duplicate ids and non-blank text before the first note.
pub fn parse_all(text: &str) -> Result<Vec<NoteRecord>, CodecError> {
    let lines = split_lines(text);
    let opens: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|&(i, line)| {
            line.is(HEADER_OPEN) && lines.get(i + 1).is_some_and(|next| next.is(HEADER_MAGIC))
        })
        .map(|(i, _)| i)
        .collect();

    let header_starts: Vec<usize> = opens
        .iter()
        .map(|&i| if i == 0 { 0 } else { lines[i - 1].content_end() })
        .collect();

    let preamble_end = header_starts.first().copied().unwrap_or(text.len());
    if let Some(pos) = text[..preamble_end].find(|c: char| !c.is_whitespace()) {
        return Err(CodecError::Malformed {
            line: line_number(&lines, pos),
            reason: "text before the first note".to_string(),
        });
    }

    let mut notes: Vec<NoteRecord> = Vec::with_capacity(opens.len());
    for (k, &open) in opens.iter().enumerate() {
        let bound = opens.get(k + 1).copied().unwrap_or(lines.len());
        let body_end = header_starts.get(k + 1).copied().unwrap_or(text.len());
        let note = parse_note(text, &lines[open..bound], open, header_starts[k], body_end)?;
        if notes.iter().any(|n| n.id == note.id) {
            return Err(CodecError::Malformed {
                line: open + 1,
                reason: format!("duplicate note_id `{}`", note.id),
            });
        }
        notes.push(note);
    }
    Ok(notes)
}

/// Parses one block. `block[0]` is the `<!---` line, found at line index `first`,
/// and `block[1]` the metadata marker.
fn parse_note(
    text: &str,
    block: &[Line<'_>],
    first: usize,
    header_start: usize,
    body_end: usize,
) -> Result<NoteRecord, CodecError> {
    let malformed = |offset: usize, reason: &str| CodecError::Malformed {
        line: first + offset + 1,
        reason: reason.to_string(),
    };

    let close = block
        .iter()
        .skip(2)
        .position(|l| l.is(HEADER_CLOSE))
        .map(|i| i + 2)
        .ok_or_else(|| malformed(0, "header is missing its `--->` terminator"))?;

    let mut metadata = BTreeMap::new();
    for (i, line) in block[2..close].iter().enumerate() {
        if line.content.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .content
            .split_once('=')
            .ok_or_else(|| malformed(i + 2, "metadata line is not `key = value`"))?;
        metadata.insert(key.trim().to_string(), value.trim().to_string());
    }
    let id = metadata
        .get(NOTE_ID_KEY)
        .cloned()
        .ok_or_else(|| malformed(0, "header has no note_id"))?;

    let date_line = block
        .get(close + 1)
        .ok_or_else(|| malformed(close, "header is not followed by a date line"))?;
    let date = date_line.content.trim().to_string();
    let mut header_end = date_line.end;
    if let Some(blank) = block.get(close + 2).filter(|l| l.content.trim().is_empty()) {
        header_end = blank.end;
    }
    // The last line break before the next note is that note's separator.
    let header_end = header_end.min(body_end);

    let metadata_end = block[close].end;
    let after_close = block[close].start + HEADER_CLOSE.len();
    let title = title_at(&text[after_close..body_end]);

    metadata.insert("date".to_string(), date.clone());
    metadata.insert("title".to_string(), title.clone());

    Ok(NoteRecord {
        id,
        date,
        title,
        body: text[header_end..body_end].to_string(),
        metadata,
        span: NoteSpan {
            header_start,
            metadata_end,
            header_end,
            body_end,
        },
    })
}

/// Title sits on a fixed line after `--->`: rest of terminator, date, blank, title.
/// Whatever that line holds is the title, minus surrounding `#` and spaces.
fn title_at(after_close: &str) -> String {
    after_close
        .lines()
        .nth(3)
        .map(|l| l.trim_matches(|c| c == '#' || c == ' ').to_string())
        .unwrap_or_default()
}

fn line_number(lines: &[Line<'_>], offset: usize) -> usize {
    lines
        .iter()
        .position(|l| offset < l.end)
        .map_or(lines.len(), |i| i + 1)
}

/// Header block for a new note, ready to be followed by its body.
pub fn header_for(id: &str, date: &str) -> String {
    format!("\n{HEADER_OPEN}\n{HEADER_MAGIC}\n{NOTE_ID_KEY} = {id}\n{HEADER_CLOSE}\n{date}\n\n")
}

/// Locates the note whose `note_id` is exactly `id`.
pub fn span_of(text: &str, id: &str) -> Result<NoteSpan, CodecError> {
    parse_all(text)?
        .into_iter()
        .find(|n| n.id == id)
        .map(|n| n.span)
        .ok_or_else(|| CodecError::NoteNotFound(id.to_string()))
}

/// Fresh identifier for a note about to be created.
pub fn new_note_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed diary at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("note not found: {0}")]
    NoteNotFound(String),
}
