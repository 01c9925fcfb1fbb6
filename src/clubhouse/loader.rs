use crate::clubhouse::{
    Result,
    api::TrackerSource,
    cache::CacheStore,
    index::{DEFAULT_MAIN_WORKFLOWS, TicketIndex, TicketIndexBuilder},
    model::StoryType,
};
use std::{sync::Arc, time::Duration};
use tracing::info;

const HOUR: Duration = Duration::from_secs(60 * 60);

pub const MEMBER_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
pub const WORKFLOWS_MAX_AGE: Duration = HOUR;
pub const EPICS_MAX_AGE: Duration = HOUR;
pub const STORIES_MAX_AGE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub main_workflows: Vec<String>,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            main_workflows: DEFAULT_MAIN_WORKFLOWS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fetch everything through the cache and build the ticket index.
pub fn load_index<S>(source: Arc<S>, cache: &CacheStore, settings: &LoadSettings) -> Result<TicketIndex>
where
    S: TrackerSource + ?Sized + 'static,
{
    let member = {
        let source = Arc::clone(&source);
        cache.get("self", MEMBER_MAX_AGE, move || source.current_member())?
    };
    let workflows = {
        let source = Arc::clone(&source);
        cache.get("workflows", WORKFLOWS_MAX_AGE, move || source.workflows())?
    };
    let epics = {
        let source = Arc::clone(&source);
        cache.get("epics", EPICS_MAX_AGE, move || source.epics())?
    };

    let mut stage = TicketIndexBuilder::new(member, &settings.main_workflows)
        .with_workflows(&workflows)
        .with_epics(&epics);

    for story_type in StoryType::ALL {
        let source = Arc::clone(&source);
        let stories = cache.get(&story_type.cache_key(), STORIES_MAX_AGE, move || {
            source.stories(story_type)
        })?;
        stage.ingest(&stories)?;
    }

    let index = stage.finish();
    info!(
        stories = index.len(),
        workflows = workflows.len(),
        epics = epics.len(),
        "loaded ticket index"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clubhouse::{
        ClubhouseError,
        api::ClubhouseClient,
        model::{Epic, Member, Story, Workflow, WorkflowState},
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTracker {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeTracker {
        fn record(&self, call: &str) -> Result<()> {
            self.calls.lock().expect("calls").push(call.to_string());
            if self.fail {
                Err(ClubhouseError::MissingToken)
            } else {
                Ok(())
            }
        }
    }

    impl TrackerSource for FakeTracker {
        fn current_member(&self) -> Result<Member> {
            self.record("member")?;
            Ok(Member {
                id: "me".to_string(),
                name: Some("Me".to_string()),
                mention_name: None,
            })
        }

        fn workflows(&self) -> Result<Vec<Workflow>> {
            self.record("workflows")?;
            Ok(vec![Workflow {
                id: 1,
                name: "Engineering".to_string(),
                states: vec![WorkflowState {
                    id: 100,
                    name: "In Progress".to_string(),
                    state_type: "started".to_string(),
                }],
            }])
        }

        fn epics(&self) -> Result<Vec<Epic>> {
            self.record("epics")?;
            Ok(vec![Epic {
                id: 9,
                name: "Epic X".to_string(),
            }])
        }

        fn stories(&self, story_type: StoryType) -> Result<Vec<Story>> {
            self.record(story_type.as_str())?;
            let id = match story_type {
                StoryType::Feature => 1,
                StoryType::Bug => 2,
                StoryType::Chore => 3,
            };
            Ok(vec![Story {
                id,
                name: format!("{story_type} story"),
                story_type: Some(story_type.to_string()),
                workflow_state_id: 100,
                owner_ids: vec!["me".to_string()],
                epic_id: Some(9),
                position: id * 10,
            }])
        }
    }

    #[test]
    fn loads_in_dependency_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = CacheStore::open(dir.path()).expect("cache");
        let tracker = Arc::new(FakeTracker::default());

        let index = load_index(Arc::clone(&tracker), &cache, &LoadSettings::default())
            .expect("index");

        assert_eq!(index.len(), 3);
        assert_eq!(index.max_position(), 30);
        assert!(index.entries().iter().all(|e| e.is_mine && e.is_main_workflow));
        let calls = tracker.calls.lock().expect("calls").clone();
        assert_eq!(
            calls,
            ["member", "workflows", "epics", "feature", "bug", "chore"]
        );
        assert!(cache.path_for("story-chore").exists());
    }

    #[test]
    fn warm_cache_avoids_remote_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = CacheStore::open(dir.path()).expect("cache");
        load_index(Arc::new(FakeTracker::default()), &cache, &LoadSettings::default())
            .expect("cold load");

        let offline = Arc::new(FakeTracker {
            fail: true,
            ..FakeTracker::default()
        });
        let index = load_index(Arc::clone(&offline), &cache, &LoadSettings::default())
            .expect("warm load");

        assert_eq!(index.len(), 3);
        assert!(offline.calls.lock().expect("calls").is_empty());
    }

    #[test]
    fn warm_cache_loads_without_api_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = CacheStore::open(dir.path()).expect("cache");
        load_index(Arc::new(FakeTracker::default()), &cache, &LoadSettings::default())
            .expect("cold load");

        let tokenless = Arc::new(ClubhouseClient::new("http://127.0.0.1:9", None));
        assert!(!tokenless.has_token());
        let index = load_index(tokenless, &cache, &LoadSettings::default())
            .expect("warm load without token");

        assert_eq!(index.len(), 3);
        assert_eq!(index.max_position(), 30);
    }

    #[test]
    fn cold_cache_without_api_token_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = CacheStore::open(dir.path()).expect("cache");
        let tokenless = Arc::new(ClubhouseClient::new("http://127.0.0.1:9", None));

        let result = load_index(tokenless, &cache, &LoadSettings::default());
        assert!(matches!(result, Err(ClubhouseError::MissingToken)));
        assert!(!cache.path_for("self").exists());
    }

    #[test]
    fn cold_fetch_failure_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = CacheStore::open(dir.path()).expect("cache");
        let offline = Arc::new(FakeTracker {
            fail: true,
            ..FakeTracker::default()
        });

        let result = load_index(offline, &cache, &LoadSettings::default());
        assert!(matches!(result, Err(ClubhouseError::MissingToken)));
    }
}
