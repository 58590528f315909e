//! `rst stats` — organization reporting dashboard.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::Path;

use roster_core::ledger;

use crate::cmd::{domain_fail, open_store};
use crate::output::{OutputMode, pretty_kv, pretty_rule, render};

#[derive(Args, Debug, Default)]
pub struct StatsArgs {}

/// Execute `rst stats`.
pub fn run_stats(_args: &StatsArgs, output: OutputMode, store: &Path) -> Result<()> {
    let conn = open_store(store, output)?;
    let stats = ledger::statistics(&conn).map_err(|err| domain_fail(output, err))?;

    render(output, &stats, |s, w| {
        writeln!(w, "Organization")?;
        pretty_rule(w)?;
        pretty_kv(w, "units", s.total_units.to_string())?;
        pretty_kv(w, "positions", s.total_positions.to_string())?;
        pretty_kv(w, "filled", s.filled_positions.to_string())?;
        pretty_kv(w, "vacant", s.vacant_positions.to_string())?;
        writeln!(w)?;
        writeln!(w, "Assignments by status")?;
        pretty_rule(w)?;
        pretty_kv(w, "active", s.active_assignments.to_string())?;
        pretty_kv(w, "completed", s.completed_assignments.to_string())?;
        pretty_kv(w, "terminated", s.terminated_assignments.to_string())?;
        pretty_kv(w, "on leave", s.on_leave_assignments.to_string())?;
        writeln!(w)?;
        writeln!(w, "Assignments by type")?;
        pretty_rule(w)?;
        pretty_kv(w, "permanent", s.permanent_assignments.to_string())?;
        pretty_kv(w, "acting", s.acting_assignments.to_string())?;
        pretty_kv(w, "temporary", s.temporary_assignments.to_string())?;
        pretty_kv(w, "concurrent", s.concurrent_assignments.to_string())
    })
}
