use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use nextup_core::config::{RulesDocument, WarnLevel};
use nextup_core::paths;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the rules file for common mistakes
    Validate,

    /// Print the path of the rules file
    Path,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(root, json),
        ConfigSubcommand::Path => {
            let path = paths::rules_path(root);
            if json {
                print_json(&serde_json::json!({
                    "path": path,
                    "exists": path.exists(),
                }))
            } else {
                println!("{}", path.display());
                Ok(())
            }
        }
    }
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let document = RulesDocument::load(root).context("failed to load rules")?;
    let warnings = document.validate();

    if json {
        print_json(&serde_json::json!({
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("Rules are valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("rules validation found errors");
    }

    Ok(())
}
