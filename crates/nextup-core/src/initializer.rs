//! Pilot-only gate for newly added series.
//!
//! Library managers usually add a series with whole seasons monitored. For
//! each such season we keep only the first episode monitored and cancel any
//! downloads that already started for the rest.

use crate::types::{Episode, EpisodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PILOT_EPISODE: u32 = 1;

/// What to do with one season of a newly added series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDirective {
    pub season_number: u32,
    /// `None` when the catalog has no episode 1 for the season.
    pub monitor_one: Option<EpisodeId>,
    pub unmonitor_rest: Vec<EpisodeId>,
    /// Queue items for this season with a later episode number are cancelled.
    pub cancel_after: u32,
}

/// One directive per regular season with at least one monitored episode,
/// in ascending season order. Specials are left alone.
pub fn plan_initialization(snapshot: &[Episode]) -> Vec<SeasonDirective> {
    let mut seasons: BTreeMap<u32, Vec<&Episode>> = BTreeMap::new();
    for ep in snapshot.iter().filter(|ep| ep.season_number != 0) {
        seasons.entry(ep.season_number).or_default().push(ep);
    }

    let mut directives = Vec::new();
    for (season_number, mut episodes) in seasons {
        if !episodes.iter().any(|ep| ep.monitored) {
            continue;
        }
        episodes.sort_by_key(|ep| ep.episode_number);

        let monitor_one = episodes
            .iter()
            .find(|ep| ep.episode_number == PILOT_EPISODE)
            .map(|ep| ep.id);
        if monitor_one.is_none() {
            tracing::warn!(season_number, "season has no episode 1; nothing to keep monitored");
        }

        let unmonitor_rest = episodes
            .iter()
            .filter(|ep| Some(ep.id) != monitor_one)
            .map(|ep| ep.id)
            .collect();

        directives.push(SeasonDirective {
            season_number,
            monitor_one,
            unmonitor_rest,
            cancel_after: PILOT_EPISODE,
        });
    }
    directives
}
