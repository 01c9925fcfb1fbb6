//! Cursor context for ticket-reference completion.
//!
//! Completion is offered only while the cursor sits inside an unterminated
//! `[ch` token on the current line. When that token is the first thing on a
//! `-` or `*` bullet line, the surrounding run of bullet lines is scanned for
//! ticket ids that are already referenced.

use std::collections::BTreeSet;

pub const TRIGGER: &str = "[ch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
    /// Digits typed after the trigger; empty matches every ticket.
    pub prefix: String,
    /// `"]"` when the inserted text must close the token itself.
    pub next_char: &'static str,
    pub list: Option<ListContext>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListContext {
    /// Text of the current line before the trigger, e.g. `"  - "`.
    pub list_head: String,
    pub sibling_ids: BTreeSet<u64>,
    /// First line of the contiguous bullet run; epic headings go here.
    pub insertion_line: usize,
    /// Text of the first bullet line up to its first `[`.
    pub first_line_indent: String,
}

impl CompletionContext {
    pub fn in_list(&self) -> bool {
        self.list.is_some()
    }
}

/// Inspect `lines[line_idx]` at character `column`.
///
/// Returns `None` when no open trigger precedes the cursor.
pub fn parse_context<L: AsRef<str>>(
    lines: &[L],
    line_idx: usize,
    column: usize,
) -> Option<CompletionContext> {
    let line = lines.get(line_idx)?.as_ref();
    let cursor = char_to_byte(line, column);
    let before = &line[..cursor];

    let trigger_at = before.rfind(TRIGGER)?;
    let typed = &before[trigger_at + TRIGGER.len()..];
    if typed.contains(']') {
        return None;
    }

    let next_char = if line[cursor..].starts_with(']') {
        ""
    } else {
        "]"
    };

    let list_head = &before[..trigger_at];
    let list = list_bullet(list_head)
        .map(|bullet| scan_list(lines, line_idx, bullet, list_head));

    let prefix = if !typed.is_empty() && typed.bytes().all(|b| b.is_ascii_digit()) {
        typed.to_string()
    } else {
        String::new()
    };

    Some(CompletionContext {
        prefix,
        next_char,
        list,
    })
}

fn char_to_byte(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map(|(byte, _)| byte)
        .unwrap_or(line.len())
}

fn strip_spaces(text: &str) -> String {
    text.replace(' ', "")
}

fn list_bullet(list_head: &str) -> Option<char> {
    match strip_spaces(list_head).as_str() {
        "-" => Some('-'),
        "*" => Some('*'),
        _ => None,
    }
}

fn scan_list<L: AsRef<str>>(
    lines: &[L],
    line_idx: usize,
    bullet: char,
    list_head: &str,
) -> ListContext {
    let is_sibling = |text: &str| strip_spaces(text).starts_with(bullet);
    let mut sibling_ids = BTreeSet::new();

    let mut first = line_idx;
    while first > 0 && is_sibling(lines[first - 1].as_ref()) {
        first -= 1;
        sibling_ids.extend(extract_id(lines[first].as_ref()));
    }

    let mut last = line_idx;
    while last + 1 < lines.len() && is_sibling(lines[last + 1].as_ref()) {
        last += 1;
        sibling_ids.extend(extract_id(lines[last].as_ref()));
    }

    let first_text = lines[first].as_ref();
    let first_line_indent = match first_text.find('[') {
        Some(bracket) => first_text[..bracket].to_string(),
        None => list_head.to_string(),
    };

    ListContext {
        list_head: list_head.to_string(),
        sibling_ids,
        insertion_line: first,
        first_line_indent,
    }
}

/// Ticket id of a bullet line that opens with a reference, e.g. `- [ch12] x`.
fn extract_id(line: &str) -> Option<u64> {
    let stripped = strip_spaces(line);
    let mut chars = stripped.chars();
    chars.next()?;
    let rest = chars.as_str().strip_prefix(TRIGGER)?;
    let end = rest.find(']')?;
    rest[..end].parse().ok()
}
