//! Assignment ledger: who holds which position, when, and why it ended.
//!
//! # Overview
//!
//! Every mutation runs its precondition reads and its write in one
//! transaction, so the occupancy and duplicate checks cannot be invalidated
//! between read and write. The partial unique index on
//! `(user_id, position_id) WHERE status = 'active'` backs the
//! at-most-one-active rule as a hard constraint underneath the precondition
//! read.
//!
//! # Design
//!
//! - Identity is external: `assign` and `transfer` consult a
//!   [`MemberDirectory`] and refuse unknown users.
//! - Events go out through an [`EventSink`] strictly after commit, best
//!   effort. A sink failure never affects the ledger.
//! - A transfer is one transaction ending the old assignment (reason
//!   `transferred`) and creating the new one, so no observer sees the user
//!   holding zero or two of the involved seats.

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde::Serialize;
use tracing::info;

use crate::directory::MemberDirectory;
use crate::error::{DomainError, DomainResult, Entity};
use crate::events::{DomainEvent, EventSink, publish_best_effort};
use crate::model::{
    Assignment, AssignmentStatus, AssignmentType, CreateAssignment, EndReason,
};
use crate::time::now_us;

const ASSIGNMENT_COLUMNS: &str = "id, position_id, user_id, assignment_type, status, \
     started_at_us, ended_at_us, expected_end_us, termination_reason, note, \
     created_at_us, updated_at_us";

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    fn parse<T: std::str::FromStr<Err = DomainError>>(
        idx: usize,
        text: &str,
    ) -> rusqlite::Result<T> {
        text.parse().map_err(|e: DomainError| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    }

    let type_text: String = row.get(3)?;
    let status_text: String = row.get(4)?;
    let reason_text: Option<String> = row.get(8)?;

    let assignment_type: AssignmentType = parse(3, &type_text)?;
    let status: AssignmentStatus = parse(4, &status_text)?;
    let termination_reason = match reason_text {
        Some(text) => Some(parse::<EndReason>(8, &text)?),
        None => None,
    };

    Ok(Assignment {
        id: row.get(0)?,
        position_id: row.get(1)?,
        user_id: row.get(2)?,
        assignment_type,
        status,
        started_at_us: row.get(5)?,
        ended_at_us: row.get(6)?,
        expected_end_us: row.get(7)?,
        termination_reason,
        note: row.get(9)?,
        created_at_us: row.get(10)?,
        updated_at_us: row.get(11)?,
    })
}

fn fetch_assignment(conn: &Connection, id: i64) -> DomainResult<Assignment> {
    conn.query_row(
        &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1"),
        params![id],
        assignment_from_row,
    )
    .optional()?
    .ok_or(DomainError::NotFound {
        entity: Entity::Assignment,
        id,
    })
}

/// Fetch one assignment by id.
///
/// # Errors
///
/// [`DomainError::NotFound`] or [`DomainError::Storage`].
pub fn get_assignment(conn: &Connection, id: i64) -> DomainResult<Assignment> {
    fetch_assignment(conn, id)
}

/// Whether `user_id` currently holds an active assignment on `position_id`.
///
/// # Errors
///
/// [`DomainError::Storage`] on database failure.
pub fn has_active_assignment(
    conn: &Connection,
    user_id: i64,
    position_id: i64,
) -> DomainResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM assignments
                       WHERE user_id = ?1 AND position_id = ?2 AND status = 'active')",
        params![user_id, position_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn check_member(directory: &dyn MemberDirectory, user_id: i64) -> DomainResult<()> {
    let known = directory
        .is_member(user_id)
        .map_err(|e| DomainError::Validation {
            message: format!("directory lookup for user {user_id} failed: {e}"),
        })?;
    if known {
        Ok(())
    } else {
        Err(DomainError::NotFound {
            entity: Entity::User,
            id: user_id,
        })
    }
}

/// Precondition block shared by `assign` and the create half of `transfer`.
/// Must run inside the writing transaction.
fn check_position_open_for(
    tx: &Transaction<'_>,
    position_id: i64,
    user_id: i64,
) -> DomainResult<()> {
    let capacity: Option<u32> = tx
        .query_row(
            "SELECT max_holders FROM positions WHERE id = ?1 AND is_active = 1",
            params![position_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(max_holders) = capacity else {
        return Err(DomainError::NotFound {
            entity: Entity::Position,
            id: position_id,
        });
    };

    let duplicate: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM assignments
                       WHERE user_id = ?1 AND position_id = ?2 AND status = 'active')",
        params![user_id, position_id],
        |row| row.get(0),
    )?;
    if duplicate {
        return Err(DomainError::DuplicateActiveAssignment {
            user_id,
            position_id,
        });
    }

    let occupied: u32 = tx.query_row(
        "SELECT COUNT(*) FROM assignments WHERE position_id = ?1 AND status = 'active'",
        params![position_id],
        |row| row.get(0),
    )?;
    if occupied >= max_holders {
        return Err(DomainError::CapacityExceeded {
            position_id,
            max_holders,
        });
    }

    Ok(())
}

fn insert_active(
    tx: &Transaction<'_>,
    position_id: i64,
    user_id: i64,
    input: &CreateAssignment,
    now: i64,
) -> DomainResult<i64> {
    let assignment_type = input.assignment_type.unwrap_or(AssignmentType::Permanent);
    let started_at = input.started_at_us.unwrap_or(now);

    tx.execute(
        "INSERT INTO assignments (position_id, user_id, assignment_type, started_at_us,
                                  expected_end_us, note, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            position_id,
            user_id,
            assignment_type.as_str(),
            started_at,
            input.expected_end_us,
            input.note,
            now,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Assign `user_id` to `position_id`, creating an active assignment.
///
/// Preconditions, all under one transaction: the position exists and is
/// active, the user is known to the directory, the pair has no active
/// assignment already, and the position has vacancy. On success an
/// `Assigned` event goes to the sink after commit.
///
/// # Errors
///
/// [`DomainError::NotFound`] (position or user),
/// [`DomainError::DuplicateActiveAssignment`],
/// [`DomainError::CapacityExceeded`], [`DomainError::Validation`], or
/// [`DomainError::Storage`].
pub fn assign(
    conn: &mut Connection,
    directory: &dyn MemberDirectory,
    sink: &dyn EventSink,
    position_id: i64,
    user_id: i64,
    input: &CreateAssignment,
) -> DomainResult<Assignment> {
    check_member(directory, user_id)?;

    let tx = conn.transaction()?;
    check_position_open_for(&tx, position_id, user_id)?;
    let id = insert_active(&tx, position_id, user_id, input, now_us())?;
    tx.commit()?;

    info!(assignment_id = id, position_id, user_id, "assigned");
    publish_best_effort(
        sink,
        &DomainEvent::Assigned {
            assignment_id: id,
            position_id,
            user_id,
        },
    );
    fetch_assignment(conn, id)
}

fn end_in_tx(
    tx: &Transaction<'_>,
    assignment_id: i64,
    reason: EndReason,
    note: Option<&str>,
    ended_at_us: Option<i64>,
    now: i64,
) -> DomainResult<Assignment> {
    let current = tx
        .query_row(
            &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1"),
            params![assignment_id],
            assignment_from_row,
        )
        .optional()?
        .ok_or(DomainError::NotFound {
            entity: Entity::Assignment,
            id: assignment_id,
        })?;

    let final_status = reason.final_status();
    if current.status.can_transition_to(final_status).is_err() {
        return Err(DomainError::NotActive {
            assignment_id,
            status: current.status,
        });
    }

    let ended_at = ended_at_us.unwrap_or(now);
    tx.execute(
        "UPDATE assignments
         SET status = ?1, ended_at_us = ?2, termination_reason = ?3,
             note = COALESCE(?4, note), updated_at_us = ?5
         WHERE id = ?6",
        params![
            final_status.as_str(),
            ended_at,
            reason.as_str(),
            note,
            now,
            assignment_id,
        ],
    )?;

    Ok(Assignment {
        status: final_status,
        ended_at_us: Some(ended_at),
        termination_reason: Some(reason),
        note: match note {
            Some(text) => Some(text.to_string()),
            None => current.note.clone(),
        },
        updated_at_us: now,
        ..current
    })
}

/// End an active assignment. The reason selects the final status.
///
/// An optional note replaces the stored note; `ended_at_us` backdates the
/// end (defaults to now, like `started_at_us` on create). On success an
/// `Ended` event goes to the sink after commit.
///
/// # Errors
///
/// [`DomainError::NotFound`], [`DomainError::NotActive`], or
/// [`DomainError::Storage`].
pub fn end_assignment(
    conn: &mut Connection,
    sink: &dyn EventSink,
    assignment_id: i64,
    reason: EndReason,
    note: Option<&str>,
    ended_at_us: Option<i64>,
) -> DomainResult<Assignment> {
    let tx = conn.transaction()?;
    let ended = end_in_tx(&tx, assignment_id, reason, note, ended_at_us, now_us())?;
    tx.commit()?;

    info!(assignment_id, reason = %reason, "assignment ended");
    publish_best_effort(
        sink,
        &DomainEvent::Ended {
            assignment_id: ended.id,
            position_id: ended.position_id,
            user_id: ended.user_id,
            reason: reason.to_string(),
        },
    );
    Ok(ended)
}

/// Result of a [`transfer`]: the ended and the newly created assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub ended: Assignment,
    pub created: Assignment,
}

/// Move the holder of `assignment_id` to `new_position_id` atomically.
///
/// The old assignment ends with reason `transferred` (final status
/// `completed`) and a new active assignment on the target position is
/// created, all in one transaction. The target position's preconditions
/// match [`assign`]. On success a single `Transferred` event goes to the
/// sink after commit.
///
/// # Errors
///
/// [`DomainError::NotFound`], [`DomainError::NotActive`],
/// [`DomainError::DuplicateActiveAssignment`],
/// [`DomainError::CapacityExceeded`], [`DomainError::Validation`], or
/// [`DomainError::Storage`].
pub fn transfer(
    conn: &mut Connection,
    directory: &dyn MemberDirectory,
    sink: &dyn EventSink,
    assignment_id: i64,
    new_position_id: i64,
    input: &CreateAssignment,
) -> DomainResult<Transfer> {
    // Directory lookup is external; keep it outside the transaction like
    // `assign` does. The pre-read only supplies the user id; the authoritative
    // status check happens again inside the transaction.
    let user_id = fetch_assignment(conn, assignment_id)?.user_id;
    check_member(directory, user_id)?;

    let tx = conn.transaction()?;

    let now = now_us();
    let ended = end_in_tx(&tx, assignment_id, EndReason::Transferred, None, None, now)?;
    check_position_open_for(&tx, new_position_id, ended.user_id)?;
    let new_id = insert_active(&tx, new_position_id, ended.user_id, input, now)?;
    tx.commit()?;

    info!(
        user_id = ended.user_id,
        old_assignment_id = assignment_id,
        new_assignment_id = new_id,
        old_position_id = ended.position_id,
        new_position_id,
        "transferred"
    );
    publish_best_effort(
        sink,
        &DomainEvent::Transferred {
            user_id: ended.user_id,
            old_assignment_id: assignment_id,
            new_assignment_id: new_id,
            old_position_id: ended.position_id,
            new_position_id,
        },
    );

    let created = fetch_assignment(conn, new_id)?;
    Ok(Transfer { ended, created })
}

/// Replace the free-text note on an assignment. This is the only field
/// that may change after an assignment leaves the active status.
///
/// # Errors
///
/// [`DomainError::NotFound`] or [`DomainError::Storage`].
pub fn amend_note(
    conn: &mut Connection,
    assignment_id: i64,
    note: Option<&str>,
) -> DomainResult<Assignment> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM assignments WHERE id = ?1)",
        params![assignment_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(DomainError::NotFound {
            entity: Entity::Assignment,
            id: assignment_id,
        });
    }

    tx.execute(
        "UPDATE assignments SET note = ?1, updated_at_us = ?2 WHERE id = ?3",
        params![note, now_us(), assignment_id],
    )?;
    tx.commit()?;

    fetch_assignment(conn, assignment_id)
}

/// Full assignment history of a user, most recent start first.
///
/// # Errors
///
/// [`DomainError::Storage`] on database failure.
pub fn user_history(conn: &Connection, user_id: i64) -> DomainResult<Vec<Assignment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments
         WHERE user_id = ?1
         ORDER BY started_at_us DESC, id DESC"
    ))?;
    let history = stmt
        .query_map(params![user_id], assignment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}

/// Ledger-wide counters for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub active_assignments: u64,
    pub completed_assignments: u64,
    pub terminated_assignments: u64,
    pub on_leave_assignments: u64,
    pub permanent_assignments: u64,
    pub acting_assignments: u64,
    pub temporary_assignments: u64,
    pub concurrent_assignments: u64,
    /// Active positions whose occupancy has reached capacity.
    pub filled_positions: u64,
    /// Active positions with at least one open seat.
    pub vacant_positions: u64,
    pub total_units: u64,
    pub total_positions: u64,
}

/// Compute ledger-wide statistics in a handful of grouped queries.
///
/// # Errors
///
/// [`DomainError::Storage`] on database failure.
pub fn statistics(conn: &Connection) -> DomainResult<Statistics> {
    let mut stats = Statistics::default();

    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM assignments GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
    })?;
    for row in rows {
        let (status, count) = row?;
        match status.as_str() {
            "active" => stats.active_assignments = count,
            "completed" => stats.completed_assignments = count,
            "terminated" => stats.terminated_assignments = count,
            "on_leave" => stats.on_leave_assignments = count,
            _ => {}
        }
    }

    let mut stmt = conn
        .prepare("SELECT assignment_type, COUNT(*) FROM assignments GROUP BY assignment_type")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
    })?;
    for row in rows {
        let (kind, count) = row?;
        match kind.as_str() {
            "permanent" => stats.permanent_assignments = count,
            "acting" => stats.acting_assignments = count,
            "temporary" => stats.temporary_assignments = count,
            "concurrent" => stats.concurrent_assignments = count,
            _ => {}
        }
    }

    let (filled, vacant): (u64, u64) = conn.query_row(
        "SELECT
             COALESCE(SUM(CASE WHEN occupied >= max_holders THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN occupied < max_holders THEN 1 ELSE 0 END), 0)
         FROM (
             SELECT p.max_holders,
                    (SELECT COUNT(*) FROM assignments a
                     WHERE a.position_id = p.id AND a.status = 'active') AS occupied
             FROM positions p
             WHERE p.is_active = 1
         )",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    stats.filled_positions = filled;
    stats.vacant_positions = vacant;

    stats.total_units = conn.query_row(
        "SELECT COUNT(*) FROM units WHERE is_active = 1",
        [],
        |row| row.get(0),
    )?;
    stats.total_positions = conn.query_row(
        "SELECT COUNT(*) FROM positions WHERE is_active = 1",
        [],
        |row| row.get(0),
    )?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::directory::{OpenDirectory, StaticDirectory};
    use crate::error::Entity;
    use crate::events::NullSink;
    use crate::model::{CreatePosition, CreateUnit, PositionLevel, PositionType, UnitScope};
    use crate::registry::{create_position, create_unit, get_position};
    use std::sync::Mutex;

    struct RecordingSink {
        events: Mutex<Vec<DomainEvent>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn take(&self) -> Vec<DomainEvent> {
            std::mem::take(&mut self.events.lock().expect("lock"))
        }
    }

    impl EventSink for RecordingSink {
        fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
            self.events.lock().expect("lock").push(event.clone());
            Ok(())
        }
    }

    fn test_conn() -> Connection {
        db::open_in_memory().expect("open in-memory store")
    }

    fn seed_position(conn: &mut Connection, slug: &str, max_holders: u32) -> i64 {
        let unit = create_unit(
            conn,
            &CreateUnit {
                name: slug.to_string(),
                slug: slug.to_string(),
                parent_id: None,
                scope: UnitScope::Department,
                display_order: None,
                period_start_us: None,
            },
        )
        .expect("create unit");
        create_position(
            conn,
            unit.id,
            &CreatePosition {
                title: format!("{slug} head"),
                position_type: PositionType::Functional,
                position_level: PositionLevel::Middle,
                reports_to: None,
                max_holders: Some(max_holders),
                display_order: None,
            },
        )
        .expect("create position")
        .id
    }

    #[test]
    fn assign_creates_active_assignment_and_publishes() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        let sink = RecordingSink::new();

        let assignment = assign(
            &mut conn,
            &OpenDirectory,
            &sink,
            pos,
            7,
            &CreateAssignment::default(),
        )
        .expect("assign");

        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(assignment.assignment_type, AssignmentType::Permanent);
        assert_eq!(assignment.ended_at_us, None);
        assert!(has_active_assignment(&conn, 7, pos).expect("check"));

        let events = sink.take();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            DomainEvent::Assigned { user_id: 7, .. }
        ));
    }

    #[test]
    fn assign_unknown_user_fails_before_any_write() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        let directory = StaticDirectory::from_ids([1, 2]);
        let sink = RecordingSink::new();

        let err = assign(
            &mut conn,
            &directory,
            &sink,
            pos,
            99,
            &CreateAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound {
                entity: Entity::User,
                id: 99
            }
        ));
        assert!(sink.take().is_empty());
        assert_eq!(get_position(&conn, pos).unwrap().current_holders, 0);
    }

    #[test]
    fn assign_to_missing_position_fails() {
        let mut conn = test_conn();
        let err = assign(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            404,
            7,
            &CreateAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound {
                entity: Entity::Position,
                id: 404
            }
        ));
    }

    #[test]
    fn assign_at_capacity_fails() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        assign(&mut conn, &OpenDirectory, &NullSink, pos, 7, &CreateAssignment::default())
            .expect("first assign");

        let err = assign(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            pos,
            8,
            &CreateAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::CapacityExceeded {
                max_holders: 1,
                ..
            }
        ));
    }

    #[test]
    fn assign_same_pair_twice_fails() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 2);
        assign(&mut conn, &OpenDirectory, &NullSink, pos, 7, &CreateAssignment::default())
            .expect("first assign");

        let err = assign(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            pos,
            7,
            &CreateAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::DuplicateActiveAssignment {
                user_id: 7,
                ..
            }
        ));
    }

    #[test]
    fn ending_frees_the_seat_and_allows_reassignment() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        let sink = RecordingSink::new();
        let a = assign(&mut conn, &OpenDirectory, &sink, pos, 7, &CreateAssignment::default())
            .expect("assign");
        sink.take();

        let ended = end_assignment(&mut conn, &sink, a.id, EndReason::Resigned, None, None)
            .expect("end");
        assert_eq!(ended.status, AssignmentStatus::Terminated);
        assert_eq!(ended.termination_reason, Some(EndReason::Resigned));
        assert!(ended.ended_at_us.is_some());
        assert!(matches!(sink.take()[0], DomainEvent::Ended { .. }));

        // The same pair can be assigned again once the old row is ended.
        assign(&mut conn, &OpenDirectory, &NullSink, pos, 7, &CreateAssignment::default())
            .expect("re-assign after end");
    }

    #[test]
    fn ending_with_explicit_date_stores_it() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        let a = assign(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            pos,
            7,
            &CreateAssignment {
                started_at_us: Some(1_000),
                ..CreateAssignment::default()
            },
        )
        .expect("assign");

        let ended = end_assignment(
            &mut conn,
            &NullSink,
            a.id,
            EndReason::Completed,
            None,
            Some(5_000),
        )
        .expect("end with date");
        assert_eq!(ended.ended_at_us, Some(5_000));

        let reread = get_assignment(&conn, a.id).expect("get");
        assert_eq!(reread.ended_at_us, Some(5_000));
        // The audit timestamp is still the wall clock, not the backdate.
        assert_ne!(reread.updated_at_us, 5_000);
    }

    #[test]
    fn ending_twice_fails_with_not_active() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        let a = assign(&mut conn, &OpenDirectory, &NullSink, pos, 7, &CreateAssignment::default())
            .expect("assign");
        end_assignment(&mut conn, &NullSink, a.id, EndReason::Completed, None, None).expect("end");

        let err = end_assignment(&mut conn, &NullSink, a.id, EndReason::Resigned, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotActive {
                status: AssignmentStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn leave_does_not_hold_the_seat() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        let a = assign(&mut conn, &OpenDirectory, &NullSink, pos, 7, &CreateAssignment::default())
            .expect("assign");

        let on_leave = end_assignment(&mut conn, &NullSink, a.id, EndReason::Leave, None, None)
            .expect("go on leave");
        assert_eq!(on_leave.status, AssignmentStatus::OnLeave);

        // The seat is open again; the returning user gets a fresh assignment.
        assert!(get_position(&conn, pos).unwrap().is_vacant());
        assign(&mut conn, &OpenDirectory, &NullSink, pos, 7, &CreateAssignment::default())
            .expect("return from leave");
    }

    #[test]
    fn transfer_moves_the_user_atomically() {
        let mut conn = test_conn();
        let p1 = seed_position(&mut conn, "records", 1);
        let p2 = seed_position(&mut conn, "archive", 1);
        let sink = RecordingSink::new();
        let a = assign(&mut conn, &OpenDirectory, &sink, p1, 7, &CreateAssignment::default())
            .expect("assign");
        sink.take();

        let outcome = transfer(
            &mut conn,
            &OpenDirectory,
            &sink,
            a.id,
            p2,
            &CreateAssignment::default(),
        )
        .expect("transfer");

        assert_eq!(outcome.ended.status, AssignmentStatus::Completed);
        assert_eq!(
            outcome.ended.termination_reason,
            Some(EndReason::Transferred)
        );
        assert_eq!(outcome.created.status, AssignmentStatus::Active);
        assert_eq!(outcome.created.position_id, p2);
        assert_eq!(outcome.created.user_id, 7);

        // The old seat is free, the new one is held.
        assert!(get_position(&conn, p1).unwrap().is_vacant());
        assert!(!get_position(&conn, p2).unwrap().is_vacant());

        let events = sink.take();
        assert_eq!(events.len(), 1, "one event for the whole transfer");
        assert!(matches!(events[0], DomainEvent::Transferred { .. }));
    }

    #[test]
    fn transfer_to_full_position_rolls_back_the_end() {
        let mut conn = test_conn();
        let p1 = seed_position(&mut conn, "records", 1);
        let p2 = seed_position(&mut conn, "archive", 1);
        let a = assign(&mut conn, &OpenDirectory, &NullSink, p1, 7, &CreateAssignment::default())
            .expect("assign 7");
        assign(&mut conn, &OpenDirectory, &NullSink, p2, 8, &CreateAssignment::default())
            .expect("fill p2");

        let err = transfer(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            a.id,
            p2,
            &CreateAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded { .. }));

        // The failed transfer must leave the original assignment active.
        let reread = get_assignment(&conn, a.id).expect("get");
        assert_eq!(reread.status, AssignmentStatus::Active);
        assert!(!get_position(&conn, p1).unwrap().is_vacant());
    }

    #[test]
    fn transfer_for_unknown_user_fails_before_any_write() {
        let mut conn = test_conn();
        let p1 = seed_position(&mut conn, "records", 1);
        let p2 = seed_position(&mut conn, "archive", 1);
        let a = assign(&mut conn, &OpenDirectory, &NullSink, p1, 7, &CreateAssignment::default())
            .expect("assign");

        // User 7 has since left the directory.
        let directory = StaticDirectory::from_ids([1, 2]);
        let err = transfer(
            &mut conn,
            &directory,
            &NullSink,
            a.id,
            p2,
            &CreateAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DomainError::NotFound {
                entity: Entity::User,
                id: 7
            }
        ));

        let reread = get_assignment(&conn, a.id).expect("get");
        assert_eq!(reread.status, AssignmentStatus::Active);
        assert_eq!(reread.ended_at_us, None);
        assert!(get_position(&conn, p2).unwrap().is_vacant());
    }

    #[test]
    fn transfer_of_ended_assignment_fails() {
        let mut conn = test_conn();
        let p1 = seed_position(&mut conn, "records", 1);
        let p2 = seed_position(&mut conn, "archive", 1);
        let a = assign(&mut conn, &OpenDirectory, &NullSink, p1, 7, &CreateAssignment::default())
            .expect("assign");
        end_assignment(&mut conn, &NullSink, a.id, EndReason::Completed, None, None).expect("end");

        let err = transfer(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            a.id,
            p2,
            &CreateAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::NotActive { .. }));
    }

    #[test]
    fn amend_note_after_end() {
        let mut conn = test_conn();
        let pos = seed_position(&mut conn, "records", 1);
        let a = assign(&mut conn, &OpenDirectory, &NullSink, pos, 7, &CreateAssignment::default())
            .expect("assign");
        end_assignment(
            &mut conn,
            &NullSink,
            a.id,
            EndReason::Completed,
            Some("handover done"),
            None,
        )
            .expect("end");

        let amended = amend_note(&mut conn, a.id, Some("handover done; keys returned"))
            .expect("amend");
        assert_eq!(
            amended.note.as_deref(),
            Some("handover done; keys returned")
        );
        // Everything else stays frozen.
        assert_eq!(amended.status, AssignmentStatus::Completed);
        assert!(amended.ended_at_us.is_some());
    }

    #[test]
    fn user_history_is_most_recent_first() {
        let mut conn = test_conn();
        let p1 = seed_position(&mut conn, "records", 1);
        let p2 = seed_position(&mut conn, "archive", 1);

        let a1 = assign(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            p1,
            7,
            &CreateAssignment {
                started_at_us: Some(1_000),
                ..CreateAssignment::default()
            },
        )
        .expect("assign p1");
        end_assignment(&mut conn, &NullSink, a1.id, EndReason::Completed, None, None).expect("end");
        let a2 = assign(
            &mut conn,
            &OpenDirectory,
            &NullSink,
            p2,
            7,
            &CreateAssignment {
                started_at_us: Some(2_000),
                ..CreateAssignment::default()
            },
        )
        .expect("assign p2");

        let history = user_history(&conn, 7).expect("history");
        let ids: Vec<i64> = history.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![a2.id, a1.id]);
        assert!(user_history(&conn, 999).expect("empty history").is_empty());
    }

    #[test]
    fn statistics_counts_statuses_and_vacancies() {
        let mut conn = test_conn();
        let p1 = seed_position(&mut conn, "records", 1);
        let p2 = seed_position(&mut conn, "archive", 2);

        let a1 = assign(&mut conn, &OpenDirectory, &NullSink, p1, 7, &CreateAssignment::default())
            .expect("assign p1");
        assign(&mut conn, &OpenDirectory, &NullSink, p2, 8, &CreateAssignment::default())
            .expect("assign p2");
        end_assignment(&mut conn, &NullSink, a1.id, EndReason::Resigned, None, None).expect("end");

        let stats = statistics(&conn).expect("stats");
        assert_eq!(stats.active_assignments, 1);
        assert_eq!(stats.terminated_assignments, 1);
        assert_eq!(stats.total_units, 2);
        assert_eq!(stats.total_positions, 2);
        // p1 is open again, p2 still has a free seat.
        assert_eq!(stats.vacant_positions, 2);
        assert_eq!(stats.filled_positions, 0);
        assert_eq!(stats.permanent_assignments, 2);
    }
}
