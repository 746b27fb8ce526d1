//! Reading and writing post corpora as JSON files.
//!
//! Input files are decoded best-effort: invalid UTF-8 byte sequences are dropped and
//! lone UTF-16 surrogate escapes (`\ud83d` without its pair, common in scraped social
//! media text) are removed before parsing. Output is pretty-printed with four-space
//! indentation and non-ASCII characters written literally.

use std::borrow::Cow;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::Post;

/// Errors raised while loading or saving a corpus file.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write corpus: {0}")]
    Write(#[source] std::io::Error),

    #[error("Invalid corpus JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Corpus must be a JSON array of posts")]
    NotAnArray,

    #[error("Corpus entry {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("Failed to persist output file: {0}")]
    Persist(#[source] tempfile::PersistError),
}

/// Loads a corpus from a JSON file.
///
/// # Errors
///
/// Returns `CorpusError` if the file cannot be read, is not valid JSON after
/// cleanup, or is not an array of objects.
pub fn load_posts(path: &Path) -> Result<Vec<Post>, CorpusError> {
    let bytes = fs::read(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_best_effort(&bytes);
    parse_posts(&text)
}

/// Parses a corpus from JSON text, stripping lone surrogate escapes first.
///
/// # Errors
///
/// Returns `CorpusError` if the text is not a JSON array of objects.
pub fn parse_posts(text: &str) -> Result<Vec<Post>, CorpusError> {
    let cleaned = strip_lone_surrogate_escapes(text);
    let value: Value = serde_json::from_str(&cleaned).map_err(CorpusError::Json)?;

    let Value::Array(items) = value else {
        return Err(CorpusError::NotAnArray);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(Post::from_fields(fields)),
            _ => Err(CorpusError::NotAnObject { index }),
        })
        .collect()
}

/// Serializes posts as indented JSON with non-ASCII characters unescaped.
///
/// # Errors
///
/// Returns `CorpusError::Json` if serialization or the underlying write fails.
pub fn write_posts<W: Write>(writer: W, posts: &[Post]) -> Result<(), CorpusError> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    posts.serialize(&mut serializer).map_err(CorpusError::Json)
}

/// Writes posts to `path` atomically.
///
/// The JSON is written to a temporary file in the destination directory and renamed
/// over `path` only once fully flushed, so a failed write leaves no partial file.
/// An existing file keeps its permissions; a new one gets the same mode a plain
/// create would (`0o666` minus the umask on Unix).
///
/// # Errors
///
/// Returns `CorpusError` if the temporary file cannot be created, written or persisted.
pub fn save_posts(path: &Path, posts: &[Post]) -> Result<(), CorpusError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    apply_create_mode(&mut builder);
    let mut file = builder.tempfile_in(dir).map_err(CorpusError::Write)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        write_posts(&mut writer, posts)?;
        writer.flush().map_err(CorpusError::Write)?;
    }

    match fs::metadata(path) {
        Ok(existing) => file
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(CorpusError::Write)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(CorpusError::Write(e)),
    }

    file.persist(path).map_err(CorpusError::Persist)?;
    Ok(())
}

// Temp files default to 0o600; the requested mode is still masked by the umask.
#[cfg(unix)]
fn apply_create_mode(builder: &mut tempfile::Builder<'_, '_>) {
    use std::os::unix::fs::PermissionsExt;
    builder.permissions(fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn apply_create_mode(_builder: &mut tempfile::Builder<'_, '_>) {}

/// Decodes bytes as UTF-8, dropping invalid sequences and a leading byte-order mark.
pub fn decode_best_effort(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Removes `\uXXXX` escapes in the surrogate range that do not form a valid pair.
///
/// A high surrogate immediately followed by a low surrogate escape is kept, since
/// together they encode one character. Escaped backslashes (`\\u...`) are left alone.
///
/// ```
/// use posttag::corpus::strip_lone_surrogate_escapes;
///
/// assert_eq!(strip_lone_surrogate_escapes(r#""hi \ud83d!""#), r#""hi !""#);
/// assert_eq!(strip_lone_surrogate_escapes(r#""\ud83d\ude00""#), r#""\ud83d\ude00""#);
/// assert_eq!(strip_lone_surrogate_escapes(r#""C:\\ud800""#), r#""C:\\ud800""#);
/// ```
pub fn strip_lone_surrogate_escapes(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }

        let Some(unit) = escaped_code_unit(text, i) else {
            // Skip the escaped character so `\\` never starts a new escape
            i += 2;
            continue;
        };

        match unit {
            0xD800..=0xDBFF => {
                if matches!(escaped_code_unit(text, i + 6), Some(0xDC00..=0xDFFF)) {
                    i += 12;
                } else {
                    let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
                    buf.push_str(&text[copied_to..i]);
                    i += 6;
                    copied_to = i;
                }
            }
            0xDC00..=0xDFFF => {
                let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
                buf.push_str(&text[copied_to..i]);
                i += 6;
                copied_to = i;
            }
            _ => i += 6,
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&text[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(text),
    }
}

/// Reads the code unit of a `\uXXXX` escape starting at byte `at`.
fn escaped_code_unit(text: &str, at: usize) -> Option<u16> {
    let escape = text.get(at..at + 6)?;
    let hex = escape.strip_prefix("\\u")?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}
