mod common;

use clubhouse_language_server::ClubhouseLanguageServer;
use serde_json::json;
use std::sync::Arc;
use tower_lsp_server::{LanguageServer, LspService, ls_types::*};

fn service() -> LspService<ClubhouseLanguageServer> {
    let index = Arc::new(common::load_index());
    let (service, _socket) =
        LspService::new(move |client| ClubhouseLanguageServer::new(client, index));
    service
}

fn notes_uri() -> Uri {
    "file:///tmp/notes.md".parse().expect("uri")
}

async fn open(server: &ClubhouseLanguageServer, text: &str) {
    server
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem::new(
                notes_uri(),
                "markdown".to_string(),
                1,
                text.to_string(),
            ),
        })
        .await;
}

async fn complete(server: &ClubhouseLanguageServer, line: u32, character: u32) -> CompletionList {
    let params = CompletionParams {
        text_document_position: TextDocumentPositionParams::new(
            TextDocumentIdentifier::new(notes_uri()),
            Position::new(line, character),
        ),
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: None,
    };
    let response = server
        .completion(params)
        .await
        .expect("completion never errors")
        .expect("completion always responds");
    let CompletionResponse::List(list) = response else {
        panic!("expected a completion list");
    };
    list
}

#[tokio::test]
async fn completes_open_document() {
    let service = service();
    let server = service.inner();
    open(server, "Sprint\n- [ch12").await;

    let list = complete(server, 1, 7).await;
    assert!(!list.is_incomplete);
    assert_eq!(list.items.len(), 4);
    assert_eq!(list.items[0].label, "ch12: Fix login redirect");
}

#[tokio::test]
async fn incremental_change_updates_prefix() {
    let service = service();
    let server = service.inner();
    open(server, "Sprint\n- [ch12").await;

    let at = Position::new(1, 7);
    server
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier::new(notes_uri(), 2),
            content_changes: vec![TextDocumentContentChangeEvent {
                range: Some(Range::new(at, at)),
                range_length: None,
                text: "3".to_string(),
            }],
        })
        .await;

    let list = complete(server, 1, 8).await;
    let labels: Vec<_> = list.items.iter().map(|item| item.label.as_str()).collect();
    assert_eq!(labels, ["ch123: Retry failed charges"]);
}

#[tokio::test]
async fn settings_raise_minimum_column() {
    let service = service();
    let server = service.inner();
    open(server, "Sprint\n- [ch12").await;

    server
        .did_change_configuration(DidChangeConfigurationParams {
            settings: json!({ "clubhouseLanguageServer": { "completion": { "minColumn": 10 } } }),
        })
        .await;

    let list = complete(server, 1, 7).await;
    assert!(list.items.is_empty());
    assert!(!list.is_incomplete);
}

#[tokio::test]
async fn closed_or_unknown_documents_yield_empty_lists() {
    let service = service();
    let server = service.inner();
    assert!(complete(server, 0, 5).await.items.is_empty());

    open(server, "- [ch").await;
    assert_eq!(complete(server, 0, 5).await.items.len(), 6);

    server
        .did_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier::new(notes_uri()),
        })
        .await;
    assert!(complete(server, 0, 5).await.items.is_empty());
}
