use crate::error::{NextupError, Result};
use crate::paths;
use crate::types::{ActionOption, EpisodeWindow, SeriesId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const DEFAULT_RULE: &str = "1n1";
pub const OPT_OUT_RULE: &str = "none";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A named rule: what to prepare after a watch, and what to keep on disk.
///
/// The name is the key in [`RulesDocument::rules`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub get_option: EpisodeWindow,
    pub action_option: ActionOption,
    pub keep_watched: EpisodeWindow,
    #[serde(default)]
    pub monitor_watched: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub series: BTreeSet<SeriesId>,
}

impl Policy {
    /// Next episode monitored and searched, only the last watched kept.
    pub fn one_next_one_kept() -> Self {
        Self {
            get_option: EpisodeWindow::Count(1),
            action_option: ActionOption::MonitorAndSearch,
            keep_watched: EpisodeWindow::Count(1),
            monitor_watched: false,
            series: BTreeSet::new(),
        }
    }

    /// Rule for series that opted out of automation.
    pub fn opt_out() -> Self {
        Self {
            get_option: EpisodeWindow::Count(0),
            action_option: ActionOption::MonitorOnly,
            keep_watched: EpisodeWindow::All,
            monitor_watched: false,
            series: BTreeSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Playback progress range (percent) in which a Jellyfin progress event
/// counts as "watched".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressWindow {
    #[serde(default = "default_min_percent")]
    pub min_percent: f64,
    #[serde(default = "default_max_percent")]
    pub max_percent: f64,
}

fn default_min_percent() -> f64 {
    45.0
}

fn default_max_percent() -> f64 {
    55.0
}

impl Default for ProgressWindow {
    fn default() -> Self {
        Self {
            min_percent: default_min_percent(),
            max_percent: default_max_percent(),
        }
    }
}

impl ProgressWindow {
    pub fn contains(&self, percent: f64) -> bool {
        percent >= self.min_percent && percent <= self.max_percent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Series carrying this tag when added are assigned to the opt-out rule
    /// instead of being reduced to their pilots.
    #[serde(default = "default_opt_out_tag")]
    pub opt_out_tag: String,
    #[serde(default)]
    pub jellyfin_progress: ProgressWindow,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_opt_out_tag() -> String {
    "episodes".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opt_out_tag: default_opt_out_tag(),
            jellyfin_progress: ProgressWindow::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// RulesDocument (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_rule_name")]
    pub default_rule: String,
    #[serde(default)]
    pub rules: BTreeMap<String, Policy>,
    #[serde(default)]
    pub settings: Settings,
}

fn default_version() -> u32 {
    1
}

fn default_rule_name() -> String {
    DEFAULT_RULE.to_string()
}

impl Default for RulesDocument {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RulesDocument {
    /// The document used when no rules file exists yet.
    pub fn builtin() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(DEFAULT_RULE.to_string(), Policy::one_next_one_kept());
        Self {
            version: 1,
            default_rule: DEFAULT_RULE.to_string(),
            rules,
            settings: Settings::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::rules_path(root);
        if !path.exists() {
            return Ok(Self::builtin());
        }
        let data = std::fs::read_to_string(&path)?;
        Self::from_yaml(&data)
            .map_err(|e| NextupError::Configuration(format!("{}: {e}", path.display())))
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::rules_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn rule(&self, name: &str) -> Result<&Policy> {
        self.rules
            .get(name)
            .ok_or_else(|| NextupError::RuleNotFound(name.to_string()))
    }

    pub fn default_policy(&self) -> Result<&Policy> {
        self.rules
            .get(&self.default_rule)
            .ok_or_else(|| NextupError::MissingDefaultRule(self.default_rule.clone()))
    }

    /// Every rule a series is explicitly assigned to, in rule-name order.
    pub fn rules_for_series(&self, series_id: SeriesId) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|(_, p)| p.series.contains(&series_id))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a rule or replace the options of an existing one. An existing
    /// rule keeps its series assignments; those in `policy` are ignored.
    pub fn upsert_rule(&mut self, name: &str, mut policy: Policy) -> Result<()> {
        paths::validate_rule_name(name)?;
        policy.series = self
            .rules
            .get(name)
            .map(|existing| existing.series.clone())
            .unwrap_or_default();
        self.rules.insert(name.to_string(), policy);
        Ok(())
    }

    pub fn delete_rule(&mut self, name: &str) -> Result<Policy> {
        if name == self.default_rule {
            return Err(NextupError::DefaultRuleProtected(name.to_string()));
        }
        self.rules
            .remove(name)
            .ok_or_else(|| NextupError::RuleNotFound(name.to_string()))
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        self.rule(name)?;
        self.default_rule = name.to_string();
        Ok(())
    }

    /// Assign series to `name`, removing them from every other rule so the
    /// one-rule-per-series invariant holds afterwards.
    pub fn assign(&mut self, name: &str, series_ids: &[SeriesId]) -> Result<()> {
        self.rule(name)?;
        for (rule_name, policy) in self.rules.iter_mut() {
            if rule_name == name {
                policy.series.extend(series_ids.iter().copied());
            } else {
                for id in series_ids {
                    policy.series.remove(id);
                }
            }
        }
        Ok(())
    }

    /// Drop series from `name`; they fall back to the default rule.
    pub fn unassign(&mut self, name: &str, series_ids: &[SeriesId]) -> Result<()> {
        let policy = self
            .rules
            .get_mut(name)
            .ok_or_else(|| NextupError::RuleNotFound(name.to_string()))?;
        for id in series_ids {
            policy.series.remove(id);
        }
        Ok(())
    }

    /// Move a series to the opt-out rule, creating that rule if needed.
    pub fn assign_opt_out(&mut self, series_id: SeriesId) -> Result<()> {
        self.rules
            .entry(OPT_OUT_RULE.to_string())
            .or_insert_with(Policy::opt_out);
        self.assign(OPT_OUT_RULE, &[series_id])
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !self.rules.contains_key(&self.default_rule) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("default rule '{}' is not defined", self.default_rule),
            });
        }

        for name in self.rules.keys() {
            if paths::validate_rule_name(name).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("rule name '{name}' is not valid"),
                });
            }
        }

        let mut owners: BTreeMap<SeriesId, Vec<&str>> = BTreeMap::new();
        for (name, policy) in &self.rules {
            for id in &policy.series {
                owners.entry(*id).or_default().push(name);
            }
        }
        for (id, names) in owners.iter().filter(|(_, names)| names.len() > 1) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "series {id} is assigned to several rules ({}); '{}' wins",
                    names.join(", "),
                    names[0]
                ),
            });
        }

        for (name, policy) in &self.rules {
            if policy.get_option == EpisodeWindow::Count(0)
                && policy.action_option == ActionOption::MonitorAndSearch
            {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "rule '{name}' searches but get_option is 0, so nothing is ever searched"
                    ),
                });
            }
        }

        let progress = &self.settings.jellyfin_progress;
        if progress.min_percent > progress.max_percent {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "jellyfin_progress min_percent {} is above max_percent {}",
                    progress.min_percent, progress.max_percent
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
