use crate::{
    clubhouse::index::TicketIndex,
    lsp::{
        config::{CompletionConfig, ServerConfig},
        position::position_to_offset,
    },
};
use dashmap::DashMap;
use rapidhash::fast::RandomState;
use ropey::Rope;
use std::sync::{Arc, PoisonError, RwLock};
use tower_lsp_server::{Client, LanguageServer, jsonrpc::Result, ls_types::*};
use tracing::debug;

pub mod completion;
pub mod config;
pub mod context;
pub mod markdown;
pub mod position;
pub mod ranking;

#[derive(Debug)]
pub struct ClubhouseLanguageServer {
    pub client: Client,
    pub index: Arc<TicketIndex>,
    pub document_map: DashMap<String, Rope, RandomState>,
    config: RwLock<ServerConfig>,
}

impl ClubhouseLanguageServer {
    pub fn new(client: Client, index: Arc<TicketIndex>) -> Self {
        Self {
            client,
            index,
            document_map: DashMap::with_hasher(RandomState::new()),
            config: RwLock::new(ServerConfig::default()),
        }
    }

    pub fn completion_config(&self) -> CompletionConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .completion()
    }

    fn apply_settings(&self, settings: serde_json::Value) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.apply_settings(settings);
        debug!(completion = ?config.completion(), "settings applied");
    }
}

impl LanguageServer for ClubhouseLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(options) = params.initialization_options {
            self.apply_settings(options);
        }

        let trigger_characters = std::iter::once("h".to_string())
            .chain(('0'..='9').map(String::from))
            .collect();

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(trigger_characters),
                    ..Default::default()
                }),
                ..ServerCapabilities::default()
            },
            #[cfg(feature = "proposed")]
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "initialized!")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        debug!("file opened");
        self.on_change(DocumentUpdate {
            uri: params.text_document.uri,
            text: &params.text_document.text,
        });
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let DidChangeTextDocumentParams {
            text_document,
            content_changes,
        } = params;

        let uri = text_document.uri;
        let uri_key = uri.to_string();
        let mut rope = self
            .document_map
            .get(&uri_key)
            .map(|doc| doc.value().clone())
            .unwrap_or_default();

        for change in content_changes {
            let Some(range) = change.range else {
                rope = Rope::from_str(&change.text);
                continue;
            };

            let mut start_offset =
                position_to_offset(range.start, &rope).unwrap_or_else(|| rope.len_chars());
            let mut end_offset = position_to_offset(range.end, &rope).unwrap_or(start_offset);

            let doc_len = rope.len_chars();
            start_offset = start_offset.min(doc_len);
            end_offset = end_offset.min(doc_len);

            if end_offset < start_offset {
                continue;
            }

            rope.remove(start_offset..end_offset);
            rope.insert(start_offset, &change.text);
        }

        self.document_map.insert(uri_key, rope);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(text) = params.text {
            self.on_change(DocumentUpdate {
                uri: params.text_document.uri,
                text: &text,
            });
        }
        debug!("file saved!");
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.document_map
            .remove(&params.text_document.uri.to_string());
        debug!("file closed!");
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.apply_settings(params.settings);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        completion::completion(self, params)
    }
}

struct DocumentUpdate<'a> {
    uri: Uri,
    text: &'a str,
}

impl ClubhouseLanguageServer {
    fn on_change(&self, update: DocumentUpdate<'_>) {
        let uri_key = update.uri.to_string();
        self.document_map
            .insert(uri_key, Rope::from_str(update.text));
    }
}
