use crate::clubhouse::index::TicketIndexEntry;
use std::{cmp::Reverse, fmt::Write};

/// Ordering key for a completion candidate.
///
/// Fields compare in declaration order: main-workflow tickets first, then
/// in-progress ones, then the member's own, then ascending position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RankKey {
    main_workflow: Reverse<bool>,
    in_progress: Reverse<bool>,
    mine: Reverse<bool>,
    position: u64,
}

impl RankKey {
    pub fn for_entry(entry: &TicketIndexEntry) -> Self {
        Self {
            main_workflow: Reverse(entry.is_main_workflow),
            in_progress: Reverse(entry.in_progress),
            mine: Reverse(entry.is_mine),
            position: entry.story.position,
        }
    }

    /// Serialise the key so that string order matches `Ord` for every
    /// position that fits in `width` digits.
    pub fn sort_text(&self, width: usize) -> String {
        let flag = |Reverse(set): Reverse<bool>| if set { '0' } else { '1' };
        let mut text = String::with_capacity(3 + width);
        text.push(flag(self.main_workflow));
        text.push(flag(self.in_progress));
        text.push(flag(self.mine));
        let _ = write!(text, "{:0width$}", self.position);
        text
    }
}

/// A ticket that survived prefix filtering, with its rank.
#[derive(Debug, Clone)]
pub struct RankedCandidate<'a> {
    pub entry: &'a TicketIndexEntry,
    pub key: RankKey,
}

/// Number of digits positions are padded to in `sort_text`.
///
/// Matches `ceil(log10(max_position))` except at exact powers of ten, where
/// the largest position needs one more digit than the logarithm gives.
pub fn position_width(max_position: u64) -> usize {
    max_position.max(1).ilog10() as usize + 1
}

pub fn matches_prefix(entry: &TicketIndexEntry, prefix: &str) -> bool {
    prefix.is_empty() || entry.story.id.to_string().starts_with(prefix)
}

/// Filter `entries` by id prefix and order them by `RankKey`.
///
/// The sort is stable, so equal keys keep their ingest order.
pub fn rank<'a>(entries: &'a [TicketIndexEntry], prefix: &str) -> Vec<RankedCandidate<'a>> {
    let mut ranked: Vec<_> = entries
        .iter()
        .filter(|entry| matches_prefix(entry, prefix))
        .map(|entry| RankedCandidate {
            entry,
            key: RankKey::for_entry(entry),
        })
        .collect();
    ranked.sort_by_key(|candidate| candidate.key);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clubhouse::model::Story;

    fn entry(id: u64, position: u64, main: bool, started: bool, mine: bool) -> TicketIndexEntry {
        TicketIndexEntry {
            story: Story {
                id,
                name: format!("story {id}"),
                story_type: None,
                workflow_state_id: 1,
                owner_ids: Vec::new(),
                epic_id: None,
                position,
            },
            is_mine: mine,
            in_progress: started,
            is_main_workflow: main,
            is_namesake: false,
            workflow_name: String::new(),
            state_name: String::new(),
        }
    }

    fn ids(ranked: &[RankedCandidate<'_>]) -> Vec<u64> {
        ranked.iter().map(|c| c.entry.story.id).collect()
    }

    #[test]
    fn prefix_filter_is_decimal_prefix() {
        let entries: Vec<_> = [12, 120, 123, 2123, 1]
            .into_iter()
            .map(|id| entry(id, id, false, false, false))
            .collect();
        assert_eq!(ids(&rank(&entries, "12")), vec![12, 120, 123]);
        assert_eq!(rank(&entries, "").len(), 5);
    }

    #[test]
    fn tiers_dominate_position() {
        let entries = vec![
            entry(1, 1, false, true, true),
            entry(2, 50, true, false, false),
            entry(3, 40, true, true, false),
            entry(4, 90, true, true, true),
            entry(5, 30, true, true, true),
            entry(6, 2, false, false, false),
        ];
        assert_eq!(ids(&rank(&entries, "")), vec![5, 4, 3, 2, 1, 6]);
    }

    #[test]
    fn equal_keys_keep_ingest_order() {
        let entries = vec![
            entry(7, 5, true, false, false),
            entry(3, 5, true, false, false),
            entry(9, 5, true, false, false),
        ];
        let first = ids(&rank(&entries, ""));
        assert_eq!(first, vec![7, 3, 9]);
        assert_eq!(ids(&rank(&entries, "")), first);
    }

    #[test]
    fn sort_text_follows_key_order() {
        let entries = vec![
            entry(1, 999, true, false, true),
            entry(2, 42, true, false, true),
            entry(3, 7, false, true, true),
            entry(4, 100, true, true, false),
        ];
        let width = position_width(999);
        let ranked = rank(&entries, "");
        let texts: Vec<_> = ranked.iter().map(|c| c.key.sort_text(width)).collect();
        let mut sorted = texts.clone();
        sorted.sort();
        assert_eq!(texts, sorted);
        assert_eq!(RankKey::for_entry(&entries[1]).sort_text(width), "010042");
    }

    #[test]
    fn width_from_max_position() {
        assert_eq!(position_width(999), 3);
        assert_eq!(position_width(42), 2);
        assert_eq!(position_width(1000), 4);
        assert_eq!(position_width(0), 1);
        assert_eq!(format!("{:0width$}", 42, width = position_width(999)), "042");
    }
}
