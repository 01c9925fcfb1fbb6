use crate::clubhouse::{
    ClubhouseError, Result,
    model::{Epic, Member, Story, StoryType, Workflow},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.clubhouse.io";
pub const TOKEN_ENV: &str = "CLUBHOUSE_API_TOKEN";

/// Read side of the issue tracker consumed during ingest.
pub trait TrackerSource: Send + Sync {
    fn current_member(&self) -> Result<Member>;
    fn workflows(&self) -> Result<Vec<Workflow>>;
    fn epics(&self) -> Result<Vec<Epic>>;
    fn stories(&self, story_type: StoryType) -> Result<Vec<Story>>;
}

/// Blocking client for the Clubhouse v3 REST API.
#[derive(Debug, Clone)]
pub struct ClubhouseClient {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl ClubhouseClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.trim().is_empty()),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// Build a client with the token taken from `CLUBHOUSE_API_TOKEN`.
    ///
    /// A missing token is reported by the first request, not here.
    pub fn from_env(base_url: impl Into<String>) -> Self {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .map(|token| token.trim().to_string());
        Self::new(base_url, token)
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(ClubhouseError::MissingToken)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3/{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.token()?;
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self
            .agent
            .get(&url)
            .query("token", token)
            .set("Content-Type", "application/json")
            .call()
            .map_err(|err| status_error("GET", &url, err))?;
        Ok(response.into_json::<T>()?)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let token = self.token()?;
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .agent
            .post(&url)
            .query("token", token)
            .send_json(body)
            .map_err(|err| status_error("POST", &url, err))?;
        Ok(response.into_json::<T>()?)
    }
}

fn status_error(method: &'static str, url: &str, err: ureq::Error) -> ClubhouseError {
    match err {
        ureq::Error::Status(status, _) => ClubhouseError::Status {
            method,
            url: url.to_string(),
            status,
        },
        other => ClubhouseError::from(other),
    }
}

impl TrackerSource for ClubhouseClient {
    fn current_member(&self) -> Result<Member> {
        self.get("member")
    }

    fn workflows(&self) -> Result<Vec<Workflow>> {
        self.get("workflows")
    }

    fn epics(&self) -> Result<Vec<Epic>> {
        self.get("epics")
    }

    fn stories(&self, story_type: StoryType) -> Result<Vec<Story>> {
        self.post(
            "stories/search",
            json!({ "story_type": story_type.as_str() }),
        )
    }
}
