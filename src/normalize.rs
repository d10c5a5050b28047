use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Auto,
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn resolve(self) -> &'static str {
        match self {
            LineEnding::Auto => system_default_line_ending(),
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

impl FromStr for LineEnding {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(LineEnding::Auto),
            "lf" => Ok(LineEnding::Lf),
            "crlf" => Ok(LineEnding::Crlf),
            other => Err(format!(
                "unknown line ending '{other}' (expected auto, lf or crlf)"
            )),
        }
    }
}

fn system_default_line_ending() -> &'static str {
    if cfg!(windows) { "\r\n" } else { "\n" }
}

/// Rebuilds the block structure: sequence line, timing line, caption text.
/// A blank-line separated chunk only opens a new block when one of its first
/// two lines is a timing line; any other chunk is caption text of the block
/// before it, so blank lines inside captions collapse away. Blocks are
/// rejoined with exactly one blank line.
pub fn reflow_blocks(text: &str) -> String {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_chunk(&mut blocks, &mut chunk);
        } else {
            chunk.push(line);
        }
    }
    flush_chunk(&mut blocks, &mut chunk);

    let mut out = blocks
        .iter()
        .map(|block| block.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n");
    if !out.is_empty() && text.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn flush_chunk<'a>(blocks: &mut Vec<Vec<&'a str>>, chunk: &mut Vec<&'a str>) {
    if chunk.is_empty() {
        return;
    }
    let opens_block = chunk.iter().take(2).any(|line| is_timing_line(line));
    if !opens_block {
        if let Some(previous) = blocks.last_mut() {
            previous.append(chunk);
            return;
        }
    }
    blocks.push(std::mem::take(chunk));
}

fn is_timing_line(line: &str) -> bool {
    line.contains("-->")
}

pub fn normalize_to_lf(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    let mut normalized = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                normalized.push('\n');
            }
            _ => normalized.push(ch),
        }
    }
    Cow::Owned(normalized)
}

pub fn normalize_line_endings(text: &str, choice: LineEnding) -> String {
    let normalized = normalize_to_lf(text);
    match choice.resolve() {
        "\n" => normalized.into_owned(),
        eol => normalized.replace('\n', eol),
    }
}

pub fn encode_output(text: &str, bom: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + UTF8_BOM.len());
    if bom {
        bytes.extend_from_slice(UTF8_BOM);
    }
    bytes.extend_from_slice(text.as_bytes());
    bytes
}
