use crate::output::print_json;
use anyhow::Context;
use nextup_core::missing::MissingLog;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let log = MissingLog::new(root);
    let entries = log
        .read()
        .with_context(|| format!("failed to read {}", log.path().display()))?;

    if json {
        return print_json(&serde_json::json!({
            "count": entries.len(),
            "entries": entries,
        }));
    }

    if entries.is_empty() {
        println!("No missing lookups recorded.");
    }
    for line in &entries {
        println!("{line}");
    }
    Ok(())
}
