use std::sync::OnceLock;

use log::debug;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::types::{FileRecord, ParsedResponse};

/// Opening tag of a fenced block that carries a generated file
pub const FENCE_TAG: &str = "filepath:";

/// Structured model output: `{"content": "...", "files": [{"name", "content"}]}`
#[derive(Deserialize)]
struct Envelope {
    content: String,
    #[serde(default)]
    files: Option<Vec<EnvelopeFile>>,
}

#[derive(Deserialize)]
struct EnvelopeFile {
    name: String,
    content: String,
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    // The body is matched lazily, so a ``` inside a file ends that file early.
    FENCE.get_or_init(|| {
        let pattern = format!(r"```{}([^\n]*)\n((?s:.*?))```", regex::escape(FENCE_TAG));
        Regex::new(&pattern).expect("fence pattern is valid")
    })
}

/// Split a raw model response into the user-facing message and generated files
///
/// The JSON envelope is tried first; anything that is not an envelope is
/// scanned for `filepath:` fences. Neither step can fail: unrecognized input
/// comes back verbatim as the message.
pub fn parse(raw: &str) -> ParsedResponse {
    match serde_json::from_str::<Envelope>(raw) {
        Ok(envelope) => from_envelope(envelope),
        Err(e) => {
            debug!("response is not a JSON envelope ({}), scanning for fences", e);
            from_fences(raw)
        }
    }
}

fn from_envelope(envelope: Envelope) -> ParsedResponse {
    let files = envelope
        .files
        .unwrap_or_default()
        .into_iter()
        .map(|f| FileRecord::new(f.name, f.content))
        .collect();

    ParsedResponse {
        message: envelope.content,
        files,
    }
}

fn from_fences(raw: &str) -> ParsedResponse {
    let mut files = Vec::new();

    let message = fence_regex().replace_all(raw, |caps: &Captures| {
        let path = caps[1].trim();
        if path.is_empty() {
            return caps[0].to_string();
        }
        files.push(FileRecord::new(path, trim_blank_lines(&caps[2])));
        placeholder(path)
    });

    ParsedResponse {
        message: message.into_owned(),
        files,
    }
}

/// Text left in the message where a fenced file used to be
pub fn placeholder(path: &str) -> String {
    format!("[generated code for `{}`]", path)
}

/// Drop whitespace-only lines at both ends and the final line break
///
/// Whitespace inside the remaining lines, including trailing spaces on the
/// last one, is kept.
fn trim_blank_lines(body: &str) -> &str {
    let mut start = 0;
    for line in body.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    let body = &body[start..];

    let mut end = body.len();
    for line in body.split_inclusive('\n').rev() {
        if !line.trim().is_empty() {
            break;
        }
        end -= line.len();
    }
    let body = &body[..end];

    match body.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => body,
    }
}
