use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated member, as returned by `GET /api/v3/member`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mention_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub state_type: String,
}

impl WorkflowState {
    pub fn is_started(&self) -> bool {
        self.state_type.to_lowercase() == "started"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub states: Vec<WorkflowState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub story_type: Option<String>,
    pub workflow_state_id: i64,
    #[serde(default)]
    pub owner_ids: Vec<String>,
    #[serde(default)]
    pub epic_id: Option<i64>,
    #[serde(default)]
    pub position: u64,
}

impl Story {
    /// The bracket-free token used to reference this story, e.g. `ch123`.
    pub fn tag(&self) -> String {
        format!("ch{}", self.id)
    }
}

/// Story categories fetched separately from the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoryType {
    Feature,
    Bug,
    Chore,
}

impl StoryType {
    /// Fetch order used during ingest.
    pub const ALL: [StoryType; 3] = [StoryType::Feature, StoryType::Bug, StoryType::Chore];

    pub fn as_str(self) -> &'static str {
        match self {
            StoryType::Feature => "feature",
            StoryType::Bug => "bug",
            StoryType::Chore => "chore",
        }
    }

    pub fn cache_key(self) -> String {
        format!("story-{}", self.as_str())
    }
}

impl fmt::Display for StoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
