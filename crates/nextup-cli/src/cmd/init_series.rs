use super::SonarrArgs;
use crate::output::{print_json, print_report};
use anyhow::Context;
use nextup_core::missing::MissingLog;
use nextup_core::store::FileRulesStore;
use nextup_core::types::SeriesId;
use nextup_core::workflow::Lifecycle;
use std::path::Path;

pub fn run(
    root: &Path,
    sonarr: &SonarrArgs,
    series_id: SeriesId,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let client = sonarr.client(root)?;
    let store = FileRulesStore::new(root);
    let missing = MissingLog::new(root);
    let lifecycle = Lifecycle::new(&store, &client, &missing);

    let outcome = lifecycle
        .initialize_series(series_id, dry_run)
        .with_context(|| format!("failed to initialize series {series_id}"))?;

    if json {
        return print_json(&outcome);
    }

    if outcome.directives.is_empty() {
        println!("Series {series_id}: no monitored seasons, nothing to do.");
        return Ok(());
    }

    for d in &outcome.directives {
        let pilot = match d.monitor_one {
            Some(id) => format!("keep episode {id}"),
            None => "no pilot in catalog".to_string(),
        };
        println!(
            "Season {}: {pilot}, unmonitor {}, cancel downloads after E{:02}",
            d.season_number,
            d.unmonitor_rest.len(),
            d.cancel_after
        );
    }

    match &outcome.report {
        Some(report) => print_report(report),
        None => println!("Dry run: nothing applied."),
    }
    Ok(())
}
