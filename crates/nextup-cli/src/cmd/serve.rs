use super::SonarrArgs;
use anyhow::Context;
use nextup_server::AppState;
use std::path::Path;
use std::sync::Arc;

pub fn run(root: &Path, sonarr: &SonarrArgs, port: u16) -> anyhow::Result<()> {
    // The blocking client owns its own runtime and must be built outside ours.
    let client = sonarr.client(root)?;
    tracing::info!(sonarr = client.base_url(), root = %root.display(), "starting nextup");

    let state = AppState::new(root.to_path_buf(), Arc::new(client));
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    rt.block_on(nextup_server::serve(state, port))
}
