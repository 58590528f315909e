//! Position registry: roles within units and their reporting chain.
//!
//! The reporting chain (`reports_to`) is a second hierarchy, validated with
//! the same cycle check as the unit tree but over position links. Holder
//! counts are always derived from the assignment ledger at read time, so a
//! position row can never disagree with the ledger about occupancy.

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use tracing::debug;

use crate::error::{DomainError, DomainResult, Entity};
use crate::graph::{ParentMap, ancestor_chain, would_create_cycle};
use crate::model::{CreatePosition, Position, PositionLevel, PositionType, UpdatePosition};
use crate::time::now_us;

const POSITION_COLUMNS: &str = "p.id, p.unit_id, p.title, p.position_type, p.position_level, \
     p.reports_to, p.max_holders, p.display_order, p.is_active, p.created_at_us, p.updated_at_us";

fn position_from_row(row: &Row<'_>) -> rusqlite::Result<Position> {
    let type_text: String = row.get(3)?;
    let level_text: String = row.get(4)?;
    let position_type: PositionType = type_text.parse().map_err(|e: DomainError| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let position_level: PositionLevel = level_text.parse().map_err(|e: DomainError| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Position {
        id: row.get(0)?,
        unit_id: row.get(1)?,
        title: row.get(2)?,
        position_type,
        position_level,
        reports_to: row.get(5)?,
        max_holders: row.get(6)?,
        current_holders: row.get(11)?,
        display_order: row.get(7)?,
        is_active: row.get(8)?,
        created_at_us: row.get(9)?,
        updated_at_us: row.get(10)?,
    })
}

/// SELECT with the derived holder count joined in as column 11.
fn position_select(where_clause: &str) -> String {
    format!(
        "SELECT {POSITION_COLUMNS},
                (SELECT COUNT(*) FROM assignments a
                 WHERE a.position_id = p.id AND a.status = 'active') AS current_holders
         FROM positions p {where_clause}"
    )
}

fn fetch_position(conn: &Connection, id: i64) -> DomainResult<Position> {
    conn.query_row(
        &position_select("WHERE p.id = ?1"),
        params![id],
        position_from_row,
    )
    .optional()?
    .ok_or(DomainError::NotFound {
        entity: Entity::Position,
        id,
    })
}

/// Fetch one position by id, holder count included.
///
/// # Errors
///
/// [`DomainError::NotFound`] if the position does not exist, or
/// [`DomainError::Storage`] on database failure.
pub fn get_position(conn: &Connection, id: i64) -> DomainResult<Position> {
    fetch_position(conn, id)
}

/// Active positions of one unit, ordered by `display_order`.
///
/// # Errors
///
/// [`DomainError::Storage`] on database failure.
pub fn list_positions(conn: &Connection, unit_id: i64) -> DomainResult<Vec<Position>> {
    let mut stmt = conn.prepare(&position_select(
        "WHERE p.unit_id = ?1 AND p.is_active = 1
         ORDER BY p.display_order ASC, p.id ASC",
    ))?;
    let positions = stmt
        .query_map(params![unit_id], position_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(positions)
}

/// Count of active assignments on a position.
///
/// # Errors
///
/// [`DomainError::Storage`] on database failure.
pub fn active_holder_count(conn: &Connection, position_id: i64) -> DomainResult<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM assignments WHERE position_id = ?1 AND status = 'active'",
        params![position_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn load_reporting_map(tx: &Transaction<'_>) -> DomainResult<ParentMap> {
    let mut stmt = tx.prepare("SELECT id, reports_to FROM positions WHERE is_active = 1")?;
    let pairs = stmt
        .query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParentMap::from_pairs(pairs))
}

fn next_display_order(tx: &Transaction<'_>, unit_id: i64) -> DomainResult<u32> {
    let max: Option<u32> = tx.query_row(
        "SELECT MAX(display_order) FROM positions WHERE unit_id = ?1",
        params![unit_id],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(0) + 1)
}

/// Create a position under `unit_id`.
///
/// The superior (`reports_to`) must already exist; it may live in any unit.
/// `max_holders` defaults to 1 and `display_order` is auto-assigned within
/// the unit when absent.
///
/// # Errors
///
/// [`DomainError::Validation`] for an empty title or zero capacity,
/// [`DomainError::NotFound`] when the unit or superior is missing, or
/// [`DomainError::Storage`] on database failure.
pub fn create_position(
    conn: &mut Connection,
    unit_id: i64,
    input: &CreatePosition,
) -> DomainResult<Position> {
    if input.title.trim().is_empty() {
        return Err(DomainError::Validation {
            message: "position title must not be empty".to_string(),
        });
    }
    let max_holders = input.max_holders.unwrap_or(1);
    if max_holders == 0 {
        return Err(DomainError::Validation {
            message: "max_holders must be at least 1".to_string(),
        });
    }

    let tx = conn.transaction()?;

    let unit_exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM units WHERE id = ?1 AND is_active = 1)",
        params![unit_id],
        |row| row.get(0),
    )?;
    if !unit_exists {
        return Err(DomainError::NotFound {
            entity: Entity::Unit,
            id: unit_id,
        });
    }

    if let Some(superior) = input.reports_to {
        let superior_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM positions WHERE id = ?1 AND is_active = 1)",
            params![superior],
            |row| row.get(0),
        )?;
        if !superior_exists {
            return Err(DomainError::NotFound {
                entity: Entity::Position,
                id: superior,
            });
        }
    }

    let display_order = match input.display_order {
        Some(order) => order,
        None => next_display_order(&tx, unit_id)?,
    };

    let now = now_us();
    tx.execute(
        "INSERT INTO positions (unit_id, title, position_type, position_level, reports_to,
                                max_holders, display_order, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            unit_id,
            input.title.trim(),
            input.position_type.as_str(),
            input.position_level.as_str(),
            input.reports_to,
            max_holders,
            display_order,
            now,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    debug!(position_id = id, unit_id, "created position");
    fetch_position(conn, id)
}

/// Update a position.
///
/// Changing `reports_to` re-validates acyclicity of the reporting chain
/// inside the transaction. Lowering `max_holders` below the current active
/// occupancy is refused, with the occupancy read under the same transaction
/// so a concurrent assignment cannot slip past the check.
///
/// # Errors
///
/// [`DomainError::NotFound`], [`DomainError::CycleDetected`],
/// [`DomainError::CapacityBelowOccupancy`], [`DomainError::Validation`],
/// or [`DomainError::Storage`].
pub fn update_position(
    conn: &mut Connection,
    id: i64,
    input: &UpdatePosition,
) -> DomainResult<Position> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM positions WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(DomainError::NotFound {
            entity: Entity::Position,
            id,
        });
    }

    if let Some(new_superior) = input.reports_to {
        if let Some(superior) = new_superior {
            let superior_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM positions WHERE id = ?1 AND is_active = 1)",
                params![superior],
                |row| row.get(0),
            )?;
            if !superior_exists {
                return Err(DomainError::NotFound {
                    entity: Entity::Position,
                    id: superior,
                });
            }
            let map = load_reporting_map(&tx)?;
            if would_create_cycle(&map, id, superior) {
                return Err(DomainError::CycleDetected {
                    node_id: id,
                    proposed_parent: superior,
                });
            }
        }
        tx.execute(
            "UPDATE positions SET reports_to = ?1 WHERE id = ?2",
            params![new_superior, id],
        )?;
    }

    if let Some(requested) = input.max_holders {
        if requested == 0 {
            return Err(DomainError::Validation {
                message: "max_holders must be at least 1".to_string(),
            });
        }
        let occupied: u32 = tx.query_row(
            "SELECT COUNT(*) FROM assignments WHERE position_id = ?1 AND status = 'active'",
            params![id],
            |row| row.get(0),
        )?;
        if requested < occupied {
            return Err(DomainError::CapacityBelowOccupancy {
                position_id: id,
                requested,
                occupied,
            });
        }
        tx.execute(
            "UPDATE positions SET max_holders = ?1 WHERE id = ?2",
            params![requested, id],
        )?;
    }

    if let Some(title) = &input.title {
        if title.trim().is_empty() {
            return Err(DomainError::Validation {
                message: "position title must not be empty".to_string(),
            });
        }
        tx.execute(
            "UPDATE positions SET title = ?1 WHERE id = ?2",
            params![title.trim(), id],
        )?;
    }
    if let Some(position_type) = input.position_type {
        tx.execute(
            "UPDATE positions SET position_type = ?1 WHERE id = ?2",
            params![position_type.as_str(), id],
        )?;
    }
    if let Some(position_level) = input.position_level {
        tx.execute(
            "UPDATE positions SET position_level = ?1 WHERE id = ?2",
            params![position_level.as_str(), id],
        )?;
    }
    if let Some(order) = input.display_order {
        tx.execute(
            "UPDATE positions SET display_order = ?1 WHERE id = ?2",
            params![order, id],
        )?;
    }

    tx.execute(
        "UPDATE positions SET updated_at_us = ?1 WHERE id = ?2",
        params![now_us(), id],
    )?;
    tx.commit()?;

    fetch_position(conn, id)
}

/// Soft-delete a position. Refused while active assignments remain.
///
/// # Errors
///
/// [`DomainError::NotFound`], [`DomainError::ActiveAssignmentsExist`], or
/// [`DomainError::Storage`].
pub fn delete_position(conn: &mut Connection, id: i64) -> DomainResult<()> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM positions WHERE id = ?1 AND is_active = 1)",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(DomainError::NotFound {
            entity: Entity::Position,
            id,
        });
    }

    let active_count: u32 = tx.query_row(
        "SELECT COUNT(*) FROM assignments WHERE position_id = ?1 AND status = 'active'",
        params![id],
        |row| row.get(0),
    )?;
    if active_count > 0 {
        return Err(DomainError::ActiveAssignmentsExist {
            position_id: id,
            active_count,
        });
    }

    // Subordinates lose their superior link rather than pointing at a
    // retired position.
    tx.execute(
        "UPDATE positions SET reports_to = NULL WHERE reports_to = ?1",
        params![id],
    )?;
    tx.execute(
        "UPDATE positions SET is_active = 0, updated_at_us = ?1 WHERE id = ?2",
        params![now_us(), id],
    )?;
    tx.commit()?;

    debug!(position_id = id, "retired position");
    Ok(())
}

/// The superior sequence of a position, nearest first.
///
/// # Errors
///
/// [`DomainError::NotFound`] if the position does not exist, or
/// [`DomainError::Storage`] on database failure.
pub fn reporting_chain(conn: &mut Connection, id: i64) -> DomainResult<Vec<Position>> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM positions WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(DomainError::NotFound {
            entity: Entity::Position,
            id,
        });
    }

    let map = load_reporting_map(&tx)?;
    let chain_ids = ancestor_chain(&map, id);

    let mut chain = Vec::with_capacity(chain_ids.len());
    for superior_id in chain_ids {
        let position = tx
            .query_row(
                &position_select("WHERE p.id = ?1"),
                params![superior_id],
                position_from_row,
            )
            .optional()?;
        if let Some(position) = position {
            chain.push(position);
        }
    }
    tx.commit()?;
    Ok(chain)
}
