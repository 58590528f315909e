//! `rst history` — a user's assignment history, most recent first.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::Path;

use roster_core::ledger;

use crate::cmd::{domain_fail, open_store};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// User id.
    pub user: i64,
}

/// Execute `rst history`.
pub fn run_history(args: &HistoryArgs, output: OutputMode, store: &Path) -> Result<()> {
    let conn = open_store(store, output)?;
    let history =
        ledger::user_history(&conn, args.user).map_err(|err| domain_fail(output, err))?;

    render(output, &history, |assignments, w| {
        if assignments.is_empty() {
            return writeln!(w, "No assignments for user {}.", args.user);
        }
        for a in assignments {
            let span = match a.ended_at_us {
                Some(end) => format!("{} .. {}", a.started_at_us, end),
                None => format!("{} ..", a.started_at_us),
            };
            writeln!(
                w,
                "#{}  position {}  {}  {}  [{}]",
                a.id, a.position_id, a.assignment_type, a.status, span
            )?;
        }
        Ok(())
    })
}
