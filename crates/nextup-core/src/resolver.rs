use crate::config::{Policy, RulesDocument};
use crate::error::Result;
use crate::store::RulesStore;
use crate::types::SeriesId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    Assigned,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPolicy {
    pub name: String,
    pub policy: Policy,
    pub source: PolicySource,
}

/// Maps a series to the rule that governs it.
pub struct RuleResolver {
    document: RulesDocument,
}

impl RuleResolver {
    pub fn new(document: RulesDocument) -> Self {
        Self { document }
    }

    pub fn load(store: &dyn RulesStore) -> Result<Self> {
        Ok(Self::new(store.load()?))
    }

    pub fn document(&self) -> &RulesDocument {
        &self.document
    }

    /// Explicit assignment first, default rule otherwise. A series listed
    /// under several rules resolves to the first in rule-name order.
    pub fn resolve(&self, series_id: SeriesId) -> Result<ResolvedPolicy> {
        let mut matches = self
            .document
            .rules
            .iter()
            .filter(|(_, policy)| policy.series.contains(&series_id));

        if let Some((name, policy)) = matches.next() {
            let others: Vec<&str> = matches.map(|(n, _)| n.as_str()).collect();
            if !others.is_empty() {
                tracing::warn!(
                    series_id,
                    chosen = %name,
                    ignored = ?others,
                    "series is assigned to more than one rule; using the first"
                );
            }
            return Ok(ResolvedPolicy {
                name: name.clone(),
                policy: policy.clone(),
                source: PolicySource::Assigned,
            });
        }

        let policy = self.document.default_policy()?;
        Ok(ResolvedPolicy {
            name: self.document.default_rule.clone(),
            policy: policy.clone(),
            source: PolicySource::Default,
        })
    }
}
