use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use nextup_core::config::{Policy, RulesDocument};
use nextup_core::store::{FileRulesStore, RulesStore};
use nextup_core::types::{ActionOption, EpisodeWindow, SeriesId};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum RuleSubcommand {
    /// List all rules
    List,

    /// Show one rule and its assigned series
    Show { name: String },

    /// Create a rule or change its options
    ///
    /// Options left out keep their current value, or the 1n1 defaults for a
    /// new rule.
    Set {
        name: String,
        /// Upcoming episodes to prepare: a count, "all" or "season"
        #[arg(long = "get")]
        get_option: Option<EpisodeWindow>,
        /// "monitor" or "search"
        #[arg(long = "action")]
        action_option: Option<ActionOption>,
        /// Watched episodes to keep on disk: a count, "all" or "season"
        #[arg(long = "keep")]
        keep_watched: Option<EpisodeWindow>,
        /// Leave the watched episode monitored
        #[arg(long)]
        monitor_watched: Option<bool>,
    },

    /// Delete a rule (its series fall back to the default rule)
    Delete { name: String },

    /// Assign series to a rule, removing them from any other rule
    Assign {
        name: String,
        #[arg(required = true, num_args = 1..)]
        series_ids: Vec<SeriesId>,
    },

    /// Remove series from a rule
    Unassign {
        name: String,
        #[arg(required = true, num_args = 1..)]
        series_ids: Vec<SeriesId>,
    },

    /// Make a rule the default for unassigned series
    Default { name: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: RuleSubcommand, json: bool) -> anyhow::Result<()> {
    let store = FileRulesStore::new(root);
    match subcmd {
        RuleSubcommand::List => list(&store, json),
        RuleSubcommand::Show { name } => show(&store, &name, json),
        RuleSubcommand::Set {
            name,
            get_option,
            action_option,
            keep_watched,
            monitor_watched,
        } => {
            let document = store
                .update(&mut |doc| {
                    let mut policy = doc
                        .rules
                        .get(&name)
                        .cloned()
                        .unwrap_or_else(Policy::one_next_one_kept);
                    if let Some(v) = get_option {
                        policy.get_option = v;
                    }
                    if let Some(v) = action_option {
                        policy.action_option = v;
                    }
                    if let Some(v) = keep_watched {
                        policy.keep_watched = v;
                    }
                    if let Some(v) = monitor_watched {
                        policy.monitor_watched = v;
                    }
                    doc.upsert_rule(&name, policy)
                })
                .with_context(|| format!("failed to save rule '{name}'"))?;
            report(&document, &name, "saved", json)
        }
        RuleSubcommand::Delete { name } => {
            store
                .update(&mut |doc| doc.delete_rule(&name).map(|_| ()))
                .with_context(|| format!("failed to delete rule '{name}'"))?;
            if json {
                print_json(&serde_json::json!({ "deleted": name }))
            } else {
                println!("Deleted rule '{name}'.");
                Ok(())
            }
        }
        RuleSubcommand::Assign { name, series_ids } => {
            let document = store
                .update(&mut |doc| doc.assign(&name, &series_ids))
                .with_context(|| format!("failed to assign series to '{name}'"))?;
            report(&document, &name, "updated", json)
        }
        RuleSubcommand::Unassign { name, series_ids } => {
            let document = store
                .update(&mut |doc| doc.unassign(&name, &series_ids))
                .with_context(|| format!("failed to unassign series from '{name}'"))?;
            report(&document, &name, "updated", json)
        }
        RuleSubcommand::Default { name } => {
            store
                .update(&mut |doc| doc.set_default(&name))
                .with_context(|| format!("failed to set default rule to '{name}'"))?;
            if json {
                print_json(&serde_json::json!({ "default_rule": name }))
            } else {
                println!("Default rule is now '{name}'.");
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

fn list(store: &dyn RulesStore, json: bool) -> anyhow::Result<()> {
    let document = store.load().context("failed to load rules")?;
    if json {
        return print_json(&document);
    }

    let rows: Vec<Vec<String>> = document
        .rules
        .iter()
        .map(|(name, p)| {
            let marker = if *name == document.default_rule { "*" } else { "" };
            vec![
                format!("{name}{marker}"),
                p.get_option.to_string(),
                p.action_option.to_string(),
                p.keep_watched.to_string(),
                p.monitor_watched.to_string(),
                p.series.len().to_string(),
            ]
        })
        .collect();
    print_table(
        &["RULE", "GET", "ACTION", "KEEP", "MONITOR WATCHED", "SERIES"],
        rows,
    );
    Ok(())
}

fn show(store: &dyn RulesStore, name: &str, json: bool) -> anyhow::Result<()> {
    let document = store.load().context("failed to load rules")?;
    let policy = document
        .rule(name)
        .with_context(|| format!("rule '{name}' not found"))?;

    if json {
        return print_json(&serde_json::json!({
            "name": name,
            "default": name == document.default_rule,
            "rule": policy,
        }));
    }

    println!("Rule: {name}{}", if name == document.default_rule { " (default)" } else { "" });
    println!("  get_option:      {}", policy.get_option);
    println!("  action_option:   {}", policy.action_option);
    println!("  keep_watched:    {}", policy.keep_watched);
    println!("  monitor_watched: {}", policy.monitor_watched);
    if policy.series.is_empty() {
        println!("  series:          (none)");
    } else {
        let ids: Vec<String> = policy.series.iter().map(|id| id.to_string()).collect();
        println!("  series:          {}", ids.join(", "));
    }
    Ok(())
}

fn report(document: &RulesDocument, name: &str, verb: &str, json: bool) -> anyhow::Result<()> {
    let policy = document.rule(name)?;
    if json {
        return print_json(&serde_json::json!({ "name": name, "rule": policy }));
    }
    println!(
        "Rule '{name}' {verb}: get {}, {}, keep {}, {} series",
        policy.get_option,
        policy.action_option,
        policy.keep_watched,
        policy.series.len()
    );
    Ok(())
}
