//! `rst assign` / `rst end` / `rst transfer` — the assignment ledger.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::Path;

use roster_core::directory::OpenDirectory;
use roster_core::events::NullSink;
use roster_core::ledger;
use roster_core::model::{Assignment, AssignmentType, CreateAssignment, EndReason};

use crate::cmd::{domain_fail, open_store};
use crate::output::{OutputMode, pretty_kv, render};

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Position id to fill.
    pub position: i64,

    /// User id of the new holder.
    #[arg(long)]
    pub user: i64,

    /// permanent|acting|temporary|concurrent (default permanent).
    #[arg(long = "type")]
    pub assignment_type: Option<String>,

    /// Free-text note stored on the assignment.
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Args, Debug)]
pub struct EndArgs {
    /// Assignment id to end.
    pub assignment: i64,

    /// completed|transferred|resigned|dismissed|expired|leave.
    #[arg(long)]
    pub reason: String,

    /// Replacement note.
    #[arg(long)]
    pub note: Option<String>,

    /// End timestamp in microseconds since epoch (default: now).
    #[arg(long)]
    pub date: Option<i64>,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Active assignment id to move.
    pub assignment: i64,

    /// Target position id.
    #[arg(long)]
    pub to: i64,

    /// Type of the new assignment (default permanent).
    #[arg(long = "type")]
    pub assignment_type: Option<String>,

    /// Note stored on the new assignment.
    #[arg(long)]
    pub note: Option<String>,
}

fn parse_type(
    raw: Option<&str>,
    output: OutputMode,
) -> Result<Option<AssignmentType>> {
    raw.map(|s| s.parse().map_err(|err| domain_fail(output, err)))
        .transpose()
}

pub(crate) fn render_assignment(output: OutputMode, a: &Assignment) -> Result<()> {
    render(output, a, |a, w| {
        pretty_kv(w, "id", a.id.to_string())?;
        pretty_kv(w, "position", a.position_id.to_string())?;
        pretty_kv(w, "user", a.user_id.to_string())?;
        pretty_kv(w, "type", a.assignment_type.to_string())?;
        pretty_kv(w, "status", a.status.to_string())?;
        if let Some(reason) = a.termination_reason {
            pretty_kv(w, "reason", reason.to_string())?;
        }
        if let Some(note) = &a.note {
            pretty_kv(w, "note", note)?;
        }
        Ok(())
    })
}

/// Execute `rst assign`.
pub fn run_assign(args: &AssignArgs, output: OutputMode, store: &Path) -> Result<()> {
    let assignment_type = parse_type(args.assignment_type.as_deref(), output)?;
    let mut conn = open_store(store, output)?;

    let input = CreateAssignment {
        assignment_type,
        note: args.note.clone(),
        ..CreateAssignment::default()
    };
    let assignment = ledger::assign(
        &mut conn,
        &OpenDirectory,
        &NullSink,
        args.position,
        args.user,
        &input,
    )
    .map_err(|err| domain_fail(output, err))?;
    render_assignment(output, &assignment)
}

/// Execute `rst end`.
pub fn run_end(args: &EndArgs, output: OutputMode, store: &Path) -> Result<()> {
    let reason: EndReason = args
        .reason
        .parse()
        .map_err(|err| domain_fail(output, err))?;

    let mut conn = open_store(store, output)?;
    let ended = ledger::end_assignment(
        &mut conn,
        &NullSink,
        args.assignment,
        reason,
        args.note.as_deref(),
        args.date,
    )
    .map_err(|err| domain_fail(output, err))?;
    render_assignment(output, &ended)
}

/// Execute `rst transfer`.
pub fn run_transfer(args: &TransferArgs, output: OutputMode, store: &Path) -> Result<()> {
    let assignment_type = parse_type(args.assignment_type.as_deref(), output)?;
    let mut conn = open_store(store, output)?;

    let input = CreateAssignment {
        assignment_type,
        note: args.note.clone(),
        ..CreateAssignment::default()
    };
    let outcome = ledger::transfer(
        &mut conn,
        &OpenDirectory,
        &NullSink,
        args.assignment,
        args.to,
        &input,
    )
    .map_err(|err| domain_fail(output, err))?;

    render(output, &outcome, |t, w| {
        writeln!(
            w,
            "Transferred user {} from position {} to position {}.",
            t.created.user_id, t.ended.position_id, t.created.position_id
        )?;
        writeln!(
            w,
            "Old assignment #{} is {}; new assignment is #{}.",
            t.ended.id, t.ended.status, t.created.id
        )
    })
}
