use crate::{
    clubhouse::index::{TicketIndex, TicketIndexEntry},
    lsp::{
        ClubhouseLanguageServer,
        config::CompletionConfig,
        context::{CompletionContext, ListContext, TRIGGER, parse_context},
        markdown::MarkdownWriter,
        position::rope_lines,
        ranking::{RankedCandidate, position_width, rank},
    },
};
use std::panic::{self, AssertUnwindSafe};
use tower_lsp_server::{
    jsonrpc::Result,
    ls_types::{
        CompletionItem, CompletionItemKind, CompletionList, CompletionParams, CompletionResponse,
        Documentation, InsertTextFormat, MarkupContent, MarkupKind, Position, Range, TextEdit,
    },
};
use tracing::{debug, error};

const EPIC_PREFIX: &str = "Epic: ";
const ELLIPSIS: &str = "...";

pub fn completion(
    server: &ClubhouseLanguageServer,
    params: CompletionParams,
) -> Result<Option<CompletionResponse>> {
    let uri_key = params.text_document_position.text_document.uri.to_string();
    let position = params.text_document_position.position;

    let Some(rope) = server.document_map.get(&uri_key).map(|doc| doc.value().clone()) else {
        debug!(uri = %uri_key, "completion for unknown document");
        return Ok(Some(complete_list(Vec::new())));
    };
    let lines = rope_lines(&rope);
    let config = server.completion_config();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        completion_items(&server.index, &lines, position, &config)
    }));
    let items = match outcome {
        Ok(items) => items,
        Err(_) => {
            error!(uri = %uri_key, ?position, "completion panicked, returning no items");
            Vec::new()
        }
    };

    debug!(uri = %uri_key, ?position, items = items.len(), "completion");
    Ok(Some(complete_list(items)))
}

fn complete_list(items: Vec<CompletionItem>) -> CompletionResponse {
    CompletionResponse::List(CompletionList {
        is_incomplete: false,
        items,
    })
}

/// Completion items for the cursor at `position` in `lines`.
pub fn completion_items<L: AsRef<str>>(
    index: &TicketIndex,
    lines: &[L],
    position: Position,
    config: &CompletionConfig,
) -> Vec<CompletionItem> {
    if position.character < config.min_column {
        return Vec::new();
    }
    match parse_context(lines, position.line as usize, position.character as usize) {
        Some(context) => compose_items(index, &context, config),
        None => Vec::new(),
    }
}

/// Rank the tickets matching `context` and render them as completion items.
pub fn compose_items(
    index: &TicketIndex,
    context: &CompletionContext,
    config: &CompletionConfig,
) -> Vec<CompletionItem> {
    let width = position_width(index.max_position());
    rank(index.entries(), &context.prefix)
        .iter()
        .map(|candidate| build_item(index, candidate, context, config, width))
        .collect()
}

fn build_item(
    index: &TicketIndex,
    candidate: &RankedCandidate<'_>,
    context: &CompletionContext,
    config: &CompletionConfig,
    width: usize,
) -> CompletionItem {
    let entry = candidate.entry;
    let story = &entry.story;
    let tag = story.tag();

    let mut title = String::new();
    if entry.is_namesake {
        title.push_str(EPIC_PREFIX);
    }
    title.push_str(&story.name);

    let mut insert_text = format!("{tag}{}", context.next_char);
    let mut heading = None;
    if let Some(list) = &context.list {
        insert_text.push(' ');
        insert_text.push_str(&title);
        insert_text.push('\n');
        insert_text.push_str(&list.list_head);
        if config.epic_headings {
            heading = epic_heading_edit(index, entry, list);
        }
    }

    let kind = if entry.is_namesake {
        CompletionItemKind::ENUM
    } else {
        CompletionItemKind::ENUM_MEMBER
    };

    CompletionItem {
        label: truncate_label(&format!("{tag}: {title}"), config.label_limit),
        kind: Some(kind),
        documentation: item_documentation(index, entry, heading.as_ref()),
        sort_text: Some(candidate.key.sort_text(width)),
        filter_text: Some(tag),
        insert_text: Some(insert_text),
        insert_text_format: Some(InsertTextFormat::PLAIN_TEXT),
        additional_text_edits: heading.map(|edit| vec![edit]),
        ..Default::default()
    }
}

/// Heading line for the candidate's epic when the list does not reference it yet.
fn epic_heading_edit(
    index: &TicketIndex,
    entry: &TicketIndexEntry,
    list: &ListContext,
) -> Option<TextEdit> {
    if entry.is_namesake {
        return None;
    }
    let namesake = index.epic_namesake(&entry.story)?;
    if list.sibling_ids.contains(&namesake.id) {
        return None;
    }
    let line = u32::try_from(list.insertion_line).ok()?;
    let anchor = Position::new(line, 0);
    Some(TextEdit::new(
        Range::new(anchor, anchor),
        format!(
            "{}{TRIGGER}{}] {EPIC_PREFIX}{}\n",
            list.first_line_indent, namesake.id, namesake.name
        ),
    ))
}

fn truncate_label(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut label: String = text.chars().take(keep).collect();
    label.push_str(ELLIPSIS);
    label
}

fn item_documentation(
    index: &TicketIndex,
    entry: &TicketIndexEntry,
    heading: Option<&TextEdit>,
) -> Option<Documentation> {
    let story = &entry.story;
    let mut writer = MarkdownWriter::default();
    writer.push_heading(&story.name);
    writer.push_field("Workflow", &entry.workflow_name);
    writer.push_field("State", &entry.state_name);
    if let Some(story_type) = &story.story_type {
        writer.push_field("Type", story_type);
    }
    if let Some(epic) = story.epic_id.and_then(|id| index.epic(id)) {
        writer.push_field("Epic", &epic.epic.name);
    }
    if let Some(edit) = heading {
        writer.push_rule();
        writer.push_text(format!("Adds heading `{}`", edit.new_text.trim_end()));
    }
    writer.finish().map(|value| {
        Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        })
    })
}
