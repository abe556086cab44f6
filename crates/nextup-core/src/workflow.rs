//! End-to-end handling of a single event.
//!
//! Each entry point fetches what it needs from the repository, runs the pure
//! planners and hands the result to the [`ActionExecutor`]. Callers are
//! expected to hold the per-series lock for the duration of a call.

use crate::config::OPT_OUT_RULE;
use crate::engine::{self, ActionSet};
use crate::error::{NextupError, Result};
use crate::executor::{ActionExecutor, ApplyReport};
use crate::initializer::{self, SeasonDirective};
use crate::matcher;
use crate::missing::MissingLog;
use crate::repository::EpisodeRepository;
use crate::resolver::{PolicySource, RuleResolver};
use crate::store::RulesStore;
use crate::types::{SeriesId, WatchEvent};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WatchPlan {
    pub event: WatchEvent,
    pub rule: String,
    pub source: PolicySource,
    pub actions: ActionSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchOutcome {
    #[serde(flatten)]
    pub plan: WatchPlan,
    pub report: ApplyReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitOutcome {
    pub series_id: SeriesId,
    pub directives: Vec<SeasonDirective>,
    /// Absent on a dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ApplyReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SeriesAdded {
    OptedOut { series_id: SeriesId, rule: String },
    Initialized(InitOutcome),
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

pub struct Lifecycle<'a> {
    store: &'a dyn RulesStore,
    repo: &'a dyn EpisodeRepository,
    missing: &'a MissingLog,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        store: &'a dyn RulesStore,
        repo: &'a dyn EpisodeRepository,
        missing: &'a MissingLog,
    ) -> Self {
        Self {
            store,
            repo,
            missing,
        }
    }

    /// Map a media-server title to a library series id.
    pub fn resolve_series_title(&self, title: &str) -> Result<SeriesId> {
        let library = self.repo.series()?;
        match matcher::match_series(title, &library) {
            Some(series) => {
                tracing::debug!(title, series_id = series.id, matched = %series.title, "resolved series");
                Ok(series.id)
            }
            None => self.not_found(NextupError::SeriesNotFound(title.to_string())),
        }
    }

    /// Resolve the rule and compute the action set without applying it.
    pub fn plan_watch(&self, event: &WatchEvent) -> Result<WatchPlan> {
        let resolved = RuleResolver::load(self.store)?.resolve(event.series_id)?;
        let snapshot = self.repo.episodes(event.series_id)?;
        let actions = match engine::plan(event, &resolved.policy, &snapshot) {
            Ok(actions) => actions,
            Err(e) => return self.not_found(e),
        };
        Ok(WatchPlan {
            event: *event,
            rule: resolved.name,
            source: resolved.source,
            actions,
        })
    }

    pub fn process_watch(&self, event: &WatchEvent) -> Result<WatchOutcome> {
        let plan = self.plan_watch(event)?;
        tracing::info!(
            %event,
            rule = %plan.rule,
            monitor = plan.actions.monitor.len(),
            unmonitor = plan.actions.unmonitor.len(),
            search = plan.actions.search.len(),
            delete = plan.actions.delete_files.len(),
            "applying watch event"
        );
        let report = ActionExecutor::new(self.repo).apply(event.series_id, &plan.actions);
        Ok(WatchOutcome { plan, report })
    }

    /// Reduce every monitored season of a series to its pilot.
    pub fn initialize_series(&self, series_id: SeriesId, dry_run: bool) -> Result<InitOutcome> {
        let snapshot = self.repo.episodes(series_id)?;
        let directives = initializer::plan_initialization(&snapshot);
        if directives.is_empty() {
            tracing::info!(series_id, "no monitored seasons; nothing to initialize");
        }
        let report = if dry_run {
            None
        } else {
            Some(ActionExecutor::new(self.repo).apply_initialization(series_id, &directives))
        };
        Ok(InitOutcome {
            series_id,
            directives,
            report,
        })
    }

    /// A series was just added to the library: opt it out if it carries the
    /// opt-out tag, otherwise gate it to pilots.
    pub fn handle_series_added(&self, series_id: SeriesId) -> Result<SeriesAdded> {
        if self.carries_opt_out_tag(series_id)? {
            return self.opt_out(series_id);
        }
        Ok(SeriesAdded::Initialized(
            self.initialize_series(series_id, false)?,
        ))
    }

    /// Read-only; the rules document is not touched.
    pub fn carries_opt_out_tag(&self, series_id: SeriesId) -> Result<bool> {
        let settings = self.store.load()?.settings;
        self.has_tag(series_id, &settings.opt_out_tag)
    }

    /// Move the series to the opt-out rule. Writes the rules document.
    pub fn opt_out(&self, series_id: SeriesId) -> Result<SeriesAdded> {
        self.store.update(&mut |doc| doc.assign_opt_out(series_id))?;
        let rule = OPT_OUT_RULE.to_string();
        tracing::info!(series_id, %rule, "series opted out of automation");
        Ok(SeriesAdded::OptedOut { series_id, rule })
    }

    fn has_tag(&self, series_id: SeriesId, label: &str) -> Result<bool> {
        let Some(tag) = self
            .repo
            .tags()?
            .into_iter()
            .find(|t| t.label.eq_ignore_ascii_case(label))
        else {
            return Ok(false);
        };
        let series = self.repo.series()?;
        let Some(entry) = series.iter().find(|s| s.id == series_id) else {
            return self.not_found(NextupError::SeriesNotFound(series_id.to_string()));
        };
        Ok(entry.tags.contains(&tag.id))
    }

    /// Record not-found errors in the missing log, then hand them back.
    fn not_found<T>(&self, err: NextupError) -> Result<T> {
        if err.is_not_found() {
            if let Err(log_err) = self.missing.record(&err.to_string()) {
                tracing::error!(error = %log_err, "could not write missing-item log");
            }
        }
        Err(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Policy, RulesDocument};
    use crate::store::MemoryRulesStore;
    use crate::types::{Episode, EpisodeId, FileId, QueueId, QueueItem, SeriesSummary, Tag};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Library {
        series: Vec<SeriesSummary>,
        tags: Vec<Tag>,
        episodes: Vec<Episode>,
        monitor_calls: Mutex<Vec<(Vec<EpisodeId>, bool)>>,
        deleted: Mutex<Vec<FileId>>,
    }

    impl EpisodeRepository for Library {
        fn series(&self) -> Result<Vec<SeriesSummary>> {
            Ok(self.series.clone())
        }
        fn tags(&self) -> Result<Vec<Tag>> {
            Ok(self.tags.clone())
        }
        fn episodes(&self, series_id: SeriesId) -> Result<Vec<Episode>> {
            Ok(self
                .episodes
                .iter()
                .filter(|e| e.series_id == series_id)
                .cloned()
                .collect())
        }
        fn set_monitored(&self, ids: &[EpisodeId], monitored: bool) -> Result<()> {
            self.monitor_calls
                .lock()
                .unwrap()
                .push((ids.to_vec(), monitored));
            Ok(())
        }
        fn trigger_search(&self, _ids: &[EpisodeId]) -> Result<()> {
            Ok(())
        }
        fn delete_episode_file(&self, file_id: FileId) -> Result<()> {
            self.deleted.lock().unwrap().push(file_id);
            Ok(())
        }
        fn queue(&self) -> Result<Vec<QueueItem>> {
            Ok(Vec::new())
        }
        fn cancel_queue_item(&self, _queue_id: QueueId) -> Result<()> {
            Ok(())
        }
    }

    fn episode(series_id: SeriesId, season: u32, number: u32) -> Episode {
        let id = series_id * 1000 + (season * 100 + number) as i64;
        Episode {
            id,
            series_id,
            season_number: season,
            episode_number: number,
            monitored: true,
            has_file: true,
            file_id: Some(id + 50_000),
        }
    }

    fn library() -> Library {
        Library {
            series: vec![
                SeriesSummary {
                    id: 1,
                    title: "Severance".into(),
                    tags: vec![],
                },
                SeriesSummary {
                    id: 2,
                    title: "Slow Horses".into(),
                    tags: vec![7],
                },
            ],
            tags: vec![Tag {
                id: 7,
                label: "Episodes".into(),
            }],
            episodes: (1..=4)
                .map(|e| episode(1, 1, e))
                .chain((1..=3).map(|e| episode(2, 1, e)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn process_watch_applies_default_rule() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRulesStore::default();
        let repo = library();
        let missing = MissingLog::new(dir.path());
        let lifecycle = Lifecycle::new(&store, &repo, &missing);

        let outcome = lifecycle.process_watch(&WatchEvent::new(1, 1, 2)).unwrap();
        assert_eq!(outcome.plan.rule, "1n1");
        assert_eq!(outcome.plan.source, PolicySource::Default);
        assert_eq!(outcome.plan.actions.monitor, vec![1103]);
        assert_eq!(*repo.deleted.lock().unwrap(), vec![1101 + 50_000]);
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn plan_watch_does_not_touch_library() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRulesStore::default();
        let repo = library();
        let missing = MissingLog::new(dir.path());

        let plan = Lifecycle::new(&store, &repo, &missing)
            .plan_watch(&WatchEvent::new(1, 1, 1))
            .unwrap();
        assert_eq!(plan.actions.unmonitor, vec![1101]);
        assert!(repo.monitor_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_episode_goes_to_missing_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRulesStore::default();
        let repo = library();
        let missing = MissingLog::new(dir.path());

        let err = Lifecycle::new(&store, &repo, &missing)
            .process_watch(&WatchEvent::new(1, 3, 1))
            .unwrap_err();
        assert!(err.is_not_found());
        let lines = missing.read().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("episode S03E01 not found for series 1"));
    }

    #[test]
    fn unknown_title_goes_to_missing_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRulesStore::default();
        let repo = library();
        let missing = MissingLog::new(dir.path());
        let lifecycle = Lifecycle::new(&store, &repo, &missing);

        assert_eq!(lifecycle.resolve_series_title("severance (2022)").unwrap(), 1);
        let err = lifecycle.resolve_series_title("Andor").unwrap_err();
        assert!(matches!(err, NextupError::SeriesNotFound(_)));
        assert_eq!(missing.read().unwrap().len(), 1);
    }

    #[test]
    fn configuration_error_is_not_logged_as_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut doc = RulesDocument::builtin();
        doc.default_rule = "ghost".into();
        let store = MemoryRulesStore::new(doc);
        let repo = library();
        let missing = MissingLog::new(dir.path());

        let err = Lifecycle::new(&store, &repo, &missing)
            .process_watch(&WatchEvent::new(1, 1, 1))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(missing.read().unwrap().is_empty());
    }

    #[test]
    fn tagged_series_is_opted_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut doc = RulesDocument::builtin();
        doc.assign("1n1", &[2]).unwrap();
        let store = MemoryRulesStore::new(doc);
        let repo = library();
        let missing = MissingLog::new(dir.path());

        let added = Lifecycle::new(&store, &repo, &missing)
            .handle_series_added(2)
            .unwrap();
        assert!(matches!(added, SeriesAdded::OptedOut { ref rule, .. } if rule == OPT_OUT_RULE));
        let doc = store.load().unwrap();
        assert_eq!(doc.rules_for_series(2), vec![OPT_OUT_RULE]);
        assert_eq!(doc.rule(OPT_OUT_RULE).unwrap(), &{
            let mut p = Policy::opt_out();
            p.series.insert(2);
            p
        });
        assert!(repo.monitor_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn opt_out_tag_check_leaves_rules_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRulesStore::default();
        let repo = library();
        let missing = MissingLog::new(dir.path());
        let lifecycle = Lifecycle::new(&store, &repo, &missing);

        assert!(lifecycle.carries_opt_out_tag(2).unwrap());
        assert!(!lifecycle.carries_opt_out_tag(1).unwrap());
        assert_eq!(store.load().unwrap(), RulesDocument::builtin());
    }

    #[test]
    fn untagged_series_is_gated_to_pilot() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRulesStore::default();
        let repo = library();
        let missing = MissingLog::new(dir.path());

        let added = Lifecycle::new(&store, &repo, &missing)
            .handle_series_added(1)
            .unwrap();
        let SeriesAdded::Initialized(outcome) = added else {
            panic!("expected initialization");
        };
        assert_eq!(outcome.directives.len(), 1);
        assert_eq!(outcome.directives[0].monitor_one, Some(1101));
        assert_eq!(
            *repo.monitor_calls.lock().unwrap(),
            vec![(vec![1101], true), (vec![1102, 1103, 1104], false)]
        );
    }

    #[test]
    fn dry_run_initialization_applies_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MemoryRulesStore::default();
        let repo = library();
        let missing = MissingLog::new(dir.path());

        let outcome = Lifecycle::new(&store, &repo, &missing)
            .initialize_series(2, true)
            .unwrap();
        assert!(outcome.report.is_none());
        assert_eq!(outcome.directives[0].unmonitor_rest, vec![2102, 2103]);
        assert!(repo.monitor_calls.lock().unwrap().is_empty());
    }
}
