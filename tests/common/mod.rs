use clubhouse_language_server::clubhouse::{
    index::TicketIndex,
    model::{Epic, Member, Story, Workflow},
};

pub fn load_index() -> TicketIndex {
    let member: Member = serde_json::from_str(include_str!("../data/member.json")).expect("member");
    let workflows: Vec<Workflow> =
        serde_json::from_str(include_str!("../data/workflows.json")).expect("workflows");
    let epics: Vec<Epic> = serde_json::from_str(include_str!("../data/epics.json")).expect("epics");
    let stories: Vec<Story> =
        serde_json::from_str(include_str!("../data/stories.json")).expect("stories");

    let mut stage = TicketIndex::builder(member)
        .with_workflows(&workflows)
        .with_epics(&epics);
    stage.ingest(&stories).expect("ingest stories");
    stage.finish()
}
