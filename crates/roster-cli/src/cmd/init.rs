//! `rst init` — create the config file and the store.

use anyhow::{Context as _, Result};
use clap::Args;
use std::io::Write as _;
use std::path::Path;

use roster_core::config::CONFIG_FILE;

use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "# output = \"pretty\"   # pretty | text | json\n\
    \n\
    [store]\n\
    path = \"roster.sqlite3\"\n";

#[derive(Debug, serde::Serialize)]
struct InitReport {
    config_path: String,
    store_path: String,
    schema_version: u32,
}

/// Execute `rst init`: write a default `roster.toml` and create the store
/// with the schema migrated to the latest version.
///
/// # Errors
///
/// Returns an error if the config already exists without `--force`, or if
/// any filesystem or database operation fails.
pub fn run_init(
    args: &InitArgs,
    output: OutputMode,
    project_root: &Path,
    store_path: &Path,
) -> Result<()> {
    let config_path = project_root.join(CONFIG_FILE);
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Use `rst init --force` to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let conn = roster_core::db::open_store(store_path)?;
    let schema_version = roster_core::db::migrations::current_schema_version(&conn)?;

    let report = InitReport {
        config_path: config_path.display().to_string(),
        store_path: store_path.display().to_string(),
        schema_version,
    };
    render(output, &report, |r, w| {
        pretty_kv(w, "config", &r.config_path)?;
        pretty_kv(w, "store", &r.store_path)?;
        writeln!(w, "Initialized (schema v{}).", r.schema_version)
    })
}
