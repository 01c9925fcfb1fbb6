pub mod clubhouse;
pub mod lsp;

pub use lsp::ClubhouseLanguageServer;
