pub mod config;
pub mod init_series;
pub mod missing;
pub mod plan;
pub mod rule;
pub mod serve;

use anyhow::Context;
use clap::Args;
use nextup_core::config::RulesDocument;
use nextup_core::sonarr::SonarrClient;
use std::path::Path;
use std::time::Duration;

/// Connection settings for the library manager, shared by every command
/// that talks to it.
#[derive(Args, Debug, Clone)]
pub struct SonarrArgs {
    /// Sonarr base URL, e.g. http://sonarr:8989
    #[arg(long, global = true, env = "SONARR_URL")]
    pub sonarr_url: Option<String>,

    /// Sonarr API key
    #[arg(long, global = true, env = "SONARR_API_KEY", hide_env_values = true)]
    pub sonarr_api_key: Option<String>,
}

impl SonarrArgs {
    /// Build a client using the request timeout from the rules document.
    pub fn client(&self, root: &Path) -> anyhow::Result<SonarrClient> {
        let url = self
            .sonarr_url
            .as_deref()
            .context("no Sonarr URL configured; pass --sonarr-url or set SONARR_URL")?;
        let key = self
            .sonarr_api_key
            .as_deref()
            .context("no Sonarr API key configured; pass --sonarr-api-key or set SONARR_API_KEY")?;
        let settings = RulesDocument::load(root)
            .context("failed to load rules")?
            .settings;
        let client = SonarrClient::new(url, key, Duration::from_secs(settings.request_timeout_secs))
            .context("failed to build Sonarr client")?;
        Ok(client)
    }
}
