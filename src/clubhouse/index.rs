//! In-memory lookup structures built once from fetched tracker data.
//!
//! Construction is staged: workflows, then epics, then any number of story
//! batches. Each stage is its own type so a story can never be ingested
//! before the workflow and epic lookups it depends on exist.

use crate::clubhouse::{
    ClubhouseError, Result,
    model::{Epic, Member, Story, Workflow, WorkflowState},
};
use rapidhash::fast::RandomState;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const DEFAULT_MAIN_WORKFLOWS: [&str; 2] = ["engineering", "deployment"];

/// A workflow state together with the workflow that owns it.
#[derive(Debug, Clone)]
pub struct WorkflowStateEntry {
    pub workflow_name: String,
    pub state: WorkflowState,
}

#[derive(Debug, Clone)]
pub struct EpicEntry {
    pub epic: Epic,
    /// Last story ingested whose name matches the epic name.
    pub namesake: Option<Story>,
    /// Every story id that matched, in ingest order.
    pub namesake_candidates: Vec<u64>,
}

impl EpicEntry {
    fn new(epic: Epic) -> Self {
        Self {
            epic,
            namesake: None,
            namesake_candidates: Vec::new(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.namesake_candidates.len() > 1
    }
}

#[derive(Debug, Clone)]
pub struct TicketIndexEntry {
    pub story: Story,
    pub is_mine: bool,
    pub in_progress: bool,
    pub is_main_workflow: bool,
    pub is_namesake: bool,
    pub workflow_name: String,
    pub state_name: String,
}

#[derive(Debug, Default)]
pub struct TicketIndex {
    workflow_by_state_id: HashMap<i64, WorkflowStateEntry, RandomState>,
    epic_by_id: HashMap<i64, EpicEntry, RandomState>,
    entries: Vec<TicketIndexEntry>,
    max_position: u64,
}

impl TicketIndex {
    pub fn builder(member: Member) -> TicketIndexBuilder {
        TicketIndexBuilder::new(member, DEFAULT_MAIN_WORKFLOWS)
    }

    pub fn entries(&self) -> &[TicketIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_position(&self) -> u64 {
        self.max_position
    }

    pub fn epic(&self, epic_id: i64) -> Option<&EpicEntry> {
        self.epic_by_id.get(&epic_id)
    }

    pub fn workflow_for_state(&self, state_id: i64) -> Option<&WorkflowStateEntry> {
        self.workflow_by_state_id.get(&state_id)
    }

    /// Namesake story of the epic `story` belongs to, if any.
    pub fn epic_namesake(&self, story: &Story) -> Option<&Story> {
        story
            .epic_id
            .and_then(|epic_id| self.epic(epic_id))
            .and_then(|entry| entry.namesake.as_ref())
    }
}

#[derive(Debug)]
pub struct TicketIndexBuilder {
    member: Member,
    main_workflows: Vec<String>,
}

impl TicketIndexBuilder {
    pub fn new<I, S>(member: Member, main_workflows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            member,
            main_workflows: main_workflows
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn with_workflows(self, workflows: &[Workflow]) -> WorkflowStage {
        let mut workflow_by_state_id = HashMap::with_hasher(RandomState::new());
        for workflow in workflows {
            for state in &workflow.states {
                workflow_by_state_id.insert(
                    state.id,
                    WorkflowStateEntry {
                        workflow_name: workflow.name.clone(),
                        state: state.clone(),
                    },
                );
            }
        }
        debug!(states = workflow_by_state_id.len(), "indexed workflow states");
        WorkflowStage {
            builder: self,
            workflow_by_state_id,
        }
    }
}

#[derive(Debug)]
pub struct WorkflowStage {
    builder: TicketIndexBuilder,
    workflow_by_state_id: HashMap<i64, WorkflowStateEntry, RandomState>,
}

impl WorkflowStage {
    pub fn with_epics(self, epics: &[Epic]) -> StoryStage {
        let mut epic_by_id = HashMap::with_hasher(RandomState::new());
        for epic in epics {
            epic_by_id.insert(epic.id, EpicEntry::new(epic.clone()));
        }
        StoryStage {
            builder: self.builder,
            index: TicketIndex {
                workflow_by_state_id: self.workflow_by_state_id,
                epic_by_id,
                entries: Vec::new(),
                max_position: 0,
            },
        }
    }
}

#[derive(Debug)]
pub struct StoryStage {
    builder: TicketIndexBuilder,
    index: TicketIndex,
}

impl StoryStage {
    /// Append a batch of stories, deriving their ranking flags.
    pub fn ingest(&mut self, stories: &[Story]) -> Result<()> {
        for story in stories {
            self.ingest_story(story)?;
        }
        Ok(())
    }

    fn ingest_story(&mut self, story: &Story) -> Result<()> {
        let index = &mut self.index;
        let workflow = index
            .workflow_by_state_id
            .get(&story.workflow_state_id)
            .ok_or(ClubhouseError::UnknownWorkflowState {
                story_id: story.id,
                state_id: story.workflow_state_id,
            })?;

        index.max_position = index.max_position.max(story.position);

        let mut is_namesake = false;
        if let Some(epic_id) = story.epic_id {
            match index.epic_by_id.get_mut(&epic_id) {
                Some(entry) if entry.epic.name.to_lowercase() == story.name.to_lowercase() => {
                    if let Some(previous) = &entry.namesake {
                        warn!(
                            epic = epic_id,
                            previous = previous.id,
                            replacement = story.id,
                            "epic has several namesake stories, keeping the latest"
                        );
                    }
                    entry.namesake = Some(story.clone());
                    entry.namesake_candidates.push(story.id);
                    is_namesake = true;
                }
                Some(_) => {}
                None => debug!(story = story.id, epic = epic_id, "story references unknown epic"),
            }
        }

        let entry = TicketIndexEntry {
            story: story.clone(),
            is_mine: story.owner_ids.contains(&self.builder.member.id),
            in_progress: workflow.state.is_started(),
            is_main_workflow: self
                .builder
                .main_workflows
                .contains(&workflow.workflow_name.to_lowercase()),
            is_namesake,
            workflow_name: workflow.workflow_name.clone(),
            state_name: workflow.state.name.clone(),
        };
        index.entries.push(entry);
        Ok(())
    }

    pub fn finish(self) -> TicketIndex {
        debug!(
            stories = self.index.entries.len(),
            max_position = self.index.max_position,
            "ticket index built"
        );
        self.index
    }
}
