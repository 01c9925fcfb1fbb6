pub mod api;
pub mod cache;
pub mod index;
pub mod loader;
pub mod model;

#[derive(thiserror::Error, Debug)]
pub enum ClubhouseError {
    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CLUBHOUSE_API_TOKEN is not set")]
    MissingToken,
    #[error("story {story_id} references unknown workflow state {state_id}")]
    UnknownWorkflowState { story_id: u64, state_id: i64 },
}

impl From<ureq::Error> for ClubhouseError {
    fn from(err: ureq::Error) -> Self {
        ClubhouseError::Http(Box::new(err))
    }
}

pub type Result<T, E = ClubhouseError> = std::result::Result<T, E>;
