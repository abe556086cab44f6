use super::SonarrArgs;
use crate::output::{print_actions, print_json, print_report};
use anyhow::Context;
use clap::Args;
use nextup_core::missing::MissingLog;
use nextup_core::store::FileRulesStore;
use nextup_core::types::{SeriesId, WatchEvent};
use nextup_core::workflow::{Lifecycle, WatchPlan};
use std::path::Path;

/// Identifies the watched episode, by library id or by title.
#[derive(Args, Debug, Clone)]
pub struct EpisodeArgs {
    /// Library series id
    #[arg(long, conflicts_with = "title", required_unless_present = "title")]
    pub series: Option<SeriesId>,

    /// Series title as reported by the media server
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub season: u32,

    #[arg(long)]
    pub episode: u32,
}

impl EpisodeArgs {
    fn event(&self, lifecycle: &Lifecycle<'_>) -> anyhow::Result<WatchEvent> {
        let series_id = match (self.series, self.title.as_deref()) {
            (Some(id), _) => id,
            (None, Some(title)) => lifecycle
                .resolve_series_title(title)
                .with_context(|| format!("could not resolve series '{title}'"))?,
            (None, None) => anyhow::bail!("pass --series or --title"),
        };
        Ok(WatchEvent::new(series_id, self.season, self.episode))
    }
}

/// Show what a watch of the given episode would do, without changing anything.
pub fn plan(root: &Path, sonarr: &SonarrArgs, args: &EpisodeArgs, json: bool) -> anyhow::Result<()> {
    let client = sonarr.client(root)?;
    let store = FileRulesStore::new(root);
    let missing = MissingLog::new(root);
    let lifecycle = Lifecycle::new(&store, &client, &missing);

    let event = args.event(&lifecycle)?;
    let plan = lifecycle
        .plan_watch(&event)
        .with_context(|| format!("failed to plan {event}"))?;

    if json {
        return print_json(&plan);
    }
    print_plan(&plan);
    Ok(())
}

/// Handle a watch of the given episode as if a webhook had reported it.
pub fn process(
    root: &Path,
    sonarr: &SonarrArgs,
    args: &EpisodeArgs,
    json: bool,
) -> anyhow::Result<()> {
    let client = sonarr.client(root)?;
    let store = FileRulesStore::new(root);
    let missing = MissingLog::new(root);
    let lifecycle = Lifecycle::new(&store, &client, &missing);

    let event = args.event(&lifecycle)?;
    let outcome = lifecycle
        .process_watch(&event)
        .with_context(|| format!("failed to process {event}"))?;

    if json {
        return print_json(&outcome);
    }
    print_plan(&outcome.plan);
    print_report(&outcome.report);
    Ok(())
}

fn print_plan(plan: &WatchPlan) {
    let source = match plan.source {
        nextup_core::resolver::PolicySource::Assigned => "assigned",
        nextup_core::resolver::PolicySource::Default => "default",
    };
    println!("{} under rule '{}' ({source})", plan.event, plan.rule);
    print_actions(&plan.actions);
}
