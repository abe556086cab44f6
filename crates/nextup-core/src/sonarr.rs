//! Blocking client for the Sonarr v3 API.
//!
//! Only the handful of endpoints the lifecycle needs are wrapped. Calls block
//! the current thread; async callers go through `spawn_blocking`.

use crate::error::{NextupError, Result};
use crate::repository::EpisodeRepository;
use crate::types::{Episode, EpisodeId, FileId, QueueId, QueueItem, SeriesId, SeriesSummary, Tag};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;

const API_KEY_HEADER: &str = "X-Api-Key";
const QUEUE_PAGE_SIZE: u32 = 1000;

pub struct SonarrClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuePage {
    #[serde(default)]
    total_records: usize,
    #[serde(default)]
    records: Vec<QueueItem>,
}

impl SonarrClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key).map_err(|_| {
            NextupError::Configuration("sonarr api key contains invalid characters".into())
        })?;
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3/{}", self.base_url, path)
    }

    // ---- private helpers ----

    /// Map a non-2xx response to [`NextupError::Sonarr`] carrying the body.
    fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|e| format!("<failed to read body: {e}>"));
            return Err(NextupError::Sonarr {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send()?;
        Ok(Self::ensure_success(response)?.json()?)
    }
}

impl EpisodeRepository for SonarrClient {
    fn series(&self) -> Result<Vec<SeriesSummary>> {
        self.get_json("series")
    }

    fn tags(&self) -> Result<Vec<Tag>> {
        self.get_json("tag")
    }

    fn episodes(&self, series_id: SeriesId) -> Result<Vec<Episode>> {
        self.get_json(&format!("episode?seriesId={series_id}"))
    }

    fn set_monitored(&self, episode_ids: &[EpisodeId], monitored: bool) -> Result<()> {
        if episode_ids.is_empty() {
            return Ok(());
        }
        let body = serde_json::json!({
            "episodeIds": episode_ids,
            "monitored": monitored,
        });
        let response = self
            .client
            .put(self.url("episode/monitor"))
            .json(&body)
            .send()?;
        Self::ensure_success(response)?;
        tracing::debug!(count = episode_ids.len(), monitored, "updated monitor flags");
        Ok(())
    }

    fn trigger_search(&self, episode_ids: &[EpisodeId]) -> Result<()> {
        if episode_ids.is_empty() {
            return Ok(());
        }
        let body = serde_json::json!({
            "name": "EpisodeSearch",
            "episodeIds": episode_ids,
        });
        let response = self.client.post(self.url("command")).json(&body).send()?;
        Self::ensure_success(response)?;
        Ok(())
    }

    fn delete_episode_file(&self, file_id: FileId) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("episodeFile/{file_id}")))
            .send()?;
        Self::ensure_success(response)?;
        Ok(())
    }

    fn queue(&self) -> Result<Vec<QueueItem>> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let batch: QueuePage = self.get_json(&format!(
                "queue?includeEpisode=true&page={page}&pageSize={QUEUE_PAGE_SIZE}"
            ))?;
            let fetched = batch.records.len();
            items.extend(batch.records);
            if fetched == 0 || items.len() >= batch.total_records {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    fn cancel_queue_item(&self, queue_id: QueueId) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("queue/{queue_id}")))
            .query(&[("removeFromClient", "true")])
            .send()?;
        Self::ensure_success(response)?;
        Ok(())
    }
}
