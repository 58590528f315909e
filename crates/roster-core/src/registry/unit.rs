//! Unit registry: owns the organizational-unit tree.
//!
//! Structural edits (create, reparent, retire) run inside one transaction
//! each: the cycle check and dependent counts are re-read under the same
//! transaction that performs the write, so a rejected edit leaves the tree
//! untouched. Deletion is soft (`is_active = 0`) and only allowed for
//! leaf units without positions.
//!
//! Hierarchy reads load the whole (filtered) unit set in a single query and
//! assemble the forest in memory, with no per-node queries.

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde::Serialize;
use tracing::debug;

use crate::error::{DomainError, DomainResult, Entity};
use crate::graph::{ParentMap, would_create_cycle};
use crate::model::{CreateUnit, OrgUnit, UnitScope, UpdateUnit};
use crate::time::now_us;

const UNIT_COLUMNS: &str = "id, name, slug, parent_id, scope, level, display_order, \
     period_start_us, period_end_us, is_current, is_active, created_at_us, updated_at_us";

pub(crate) fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<OrgUnit> {
    let scope: String = row.get(4)?;
    let scope: UnitScope = scope.parse().map_err(|e: DomainError| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(OrgUnit {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        parent_id: row.get(3)?,
        scope,
        level: row.get(5)?,
        display_order: row.get(6)?,
        period_start_us: row.get(7)?,
        period_end_us: row.get(8)?,
        is_current: row.get(9)?,
        is_active: row.get(10)?,
        created_at_us: row.get(11)?,
        updated_at_us: row.get(12)?,
    })
}

fn fetch_unit(conn: &Connection, id: i64) -> DomainResult<OrgUnit> {
    conn.query_row(
        &format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = ?1"),
        params![id],
        unit_from_row,
    )
    .optional()?
    .ok_or(DomainError::NotFound {
        entity: Entity::Unit,
        id,
    })
}

/// Fetch one unit by id.
///
/// # Errors
///
/// [`DomainError::NotFound`] if the unit does not exist, or
/// [`DomainError::Storage`] on database failure.
pub fn get_unit(conn: &Connection, id: i64) -> DomainResult<OrgUnit> {
    fetch_unit(conn, id)
}

/// Parent-link snapshot of all active units, for cycle validation.
fn load_parent_map(tx: &Transaction<'_>) -> DomainResult<ParentMap> {
    let mut stmt = tx.prepare("SELECT id, parent_id FROM units WHERE is_active = 1")?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParentMap::from_pairs(pairs))
}

/// Next `display_order` within a sibling group (monotonically increasing).
fn next_display_order(tx: &Transaction<'_>, parent_id: Option<i64>) -> DomainResult<u32> {
    let max: Option<u32> = match parent_id {
        Some(pid) => tx.query_row(
            "SELECT MAX(display_order) FROM units WHERE parent_id = ?1",
            params![pid],
            |row| row.get(0),
        )?,
        None => tx.query_row(
            "SELECT MAX(display_order) FROM units WHERE parent_id IS NULL",
            [],
            |row| row.get(0),
        )?,
    };
    Ok(max.unwrap_or(0) + 1)
}

/// Create a unit, returning the stored row.
///
/// Validates the name and slug, resolves the parent (which must exist),
/// derives `level` from the parent's depth, and auto-assigns
/// `display_order` within the sibling group when absent.
///
/// # Errors
///
/// [`DomainError::Validation`] for empty name/slug,
/// [`DomainError::NotFound`] when the parent is missing, or
/// [`DomainError::Storage`] on database failure.
pub fn create_unit(conn: &mut Connection, input: &CreateUnit) -> DomainResult<OrgUnit> {
    if input.name.trim().is_empty() {
        return Err(DomainError::Validation {
            message: "unit name must not be empty".to_string(),
        });
    }
    if input.slug.trim().is_empty() {
        return Err(DomainError::Validation {
            message: "unit slug must not be empty".to_string(),
        });
    }

    let tx = conn.transaction()?;

    let level = match input.parent_id {
        Some(pid) => {
            let parent = tx
                .query_row(
                    "SELECT level FROM units WHERE id = ?1 AND is_active = 1",
                    params![pid],
                    |row| row.get::<_, u32>(0),
                )
                .optional()?
                .ok_or(DomainError::NotFound {
                    entity: Entity::Unit,
                    id: pid,
                })?;
            parent + 1
        }
        None => 1,
    };

    let display_order = match input.display_order {
        Some(order) => order,
        None => next_display_order(&tx, input.parent_id)?,
    };

    let now = now_us();
    let period_start = input.period_start_us.unwrap_or(now);

    tx.execute(
        "INSERT INTO units (name, slug, parent_id, scope, level, display_order,
                            period_start_us, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            input.name.trim(),
            input.slug.trim(),
            input.parent_id,
            input.scope.as_str(),
            level,
            display_order,
            period_start,
            now,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    debug!(unit_id = id, slug = %input.slug, "created unit");
    fetch_unit(conn, id)
}

/// Update a unit; reparenting re-validates acyclicity under the same
/// transaction and shifts the subtree's `level` values by the depth delta.
///
/// # Errors
///
/// [`DomainError::NotFound`] if the unit or new parent is missing,
/// [`DomainError::CycleDetected`] if the new parent is the unit itself or
/// one of its descendants, or [`DomainError::Storage`] on database failure.
pub fn update_unit(conn: &mut Connection, id: i64, input: &UpdateUnit) -> DomainResult<OrgUnit> {
    let tx = conn.transaction()?;

    let current = tx
        .query_row(
            &format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = ?1"),
            params![id],
            unit_from_row,
        )
        .optional()?
        .ok_or(DomainError::NotFound {
            entity: Entity::Unit,
            id,
        })?;

    if let Some(new_parent) = input.parent_id {
        if new_parent != current.parent_id {
            let new_level = match new_parent {
                Some(pid) => {
                    let parent_level = tx
                        .query_row(
                            "SELECT level FROM units WHERE id = ?1 AND is_active = 1",
                            params![pid],
                            |row| row.get::<_, u32>(0),
                        )
                        .optional()?
                        .ok_or(DomainError::NotFound {
                            entity: Entity::Unit,
                            id: pid,
                        })?;

                    let map = load_parent_map(&tx)?;
                    if would_create_cycle(&map, id, pid) {
                        return Err(DomainError::CycleDetected {
                            node_id: id,
                            proposed_parent: pid,
                        });
                    }
                    parent_level + 1
                }
                None => 1,
            };

            tx.execute(
                "UPDATE units SET parent_id = ?1 WHERE id = ?2",
                params![new_parent, id],
            )?;
            shift_subtree_levels(&tx, id, current.level, new_level)?;
        }
    }

    if let Some(name) = &input.name {
        if name.trim().is_empty() {
            return Err(DomainError::Validation {
                message: "unit name must not be empty".to_string(),
            });
        }
        tx.execute(
            "UPDATE units SET name = ?1 WHERE id = ?2",
            params![name.trim(), id],
        )?;
    }
    if let Some(slug) = &input.slug {
        tx.execute(
            "UPDATE units SET slug = ?1 WHERE id = ?2",
            params![slug.trim(), id],
        )?;
    }
    if let Some(scope) = input.scope {
        tx.execute(
            "UPDATE units SET scope = ?1 WHERE id = ?2",
            params![scope.as_str(), id],
        )?;
    }
    if let Some(order) = input.display_order {
        tx.execute(
            "UPDATE units SET display_order = ?1 WHERE id = ?2",
            params![order, id],
        )?;
    }
    if let Some(end) = input.period_end_us {
        tx.execute(
            "UPDATE units SET period_end_us = ?1 WHERE id = ?2",
            params![end, id],
        )?;
    }
    if let Some(is_current) = input.is_current {
        tx.execute(
            "UPDATE units SET is_current = ?1 WHERE id = ?2",
            params![is_current, id],
        )?;
    }

    tx.execute(
        "UPDATE units SET updated_at_us = ?1 WHERE id = ?2",
        params![now_us(), id],
    )?;
    tx.commit()?;

    fetch_unit(conn, id)
}

/// Rewrite `level` for the whole subtree of `root_id` after a reparent.
///
/// The delta is uniform: every node in the subtree moves by
/// `new_level - old_level`.
fn shift_subtree_levels(
    tx: &Transaction<'_>,
    root_id: i64,
    old_level: u32,
    new_level: u32,
) -> DomainResult<()> {
    if old_level == new_level {
        return Ok(());
    }
    let map = load_parent_map(tx)?;

    // BFS over the freshly loaded children adjacency; root included.
    let mut queue = vec![root_id];
    let mut subtree = Vec::new();
    while let Some(current) = queue.pop() {
        subtree.push(current);
        queue.extend_from_slice(map.children_of(current));
    }

    let delta = i64::from(new_level) - i64::from(old_level);
    for node in subtree {
        tx.execute(
            "UPDATE units SET level = level + ?1 WHERE id = ?2",
            params![delta, node],
        )?;
    }
    Ok(())
}

/// Soft-delete a unit. Only leaf units without positions may go.
///
/// # Errors
///
/// [`DomainError::NotFound`] if the unit does not exist,
/// [`DomainError::HasChildren`] / [`DomainError::HasPositions`] when
/// dependents remain, or [`DomainError::Storage`] on database failure.
pub fn delete_unit(conn: &mut Connection, id: i64) -> DomainResult<()> {
    let tx = conn.transaction()?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM units WHERE id = ?1 AND is_active = 1)",
        params![id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(DomainError::NotFound {
            entity: Entity::Unit,
            id,
        });
    }

    let child_count: u32 = tx.query_row(
        "SELECT COUNT(*) FROM units WHERE parent_id = ?1 AND is_active = 1",
        params![id],
        |row| row.get(0),
    )?;
    if child_count > 0 {
        return Err(DomainError::HasChildren {
            unit_id: id,
            child_count,
        });
    }

    let position_count: u32 = tx.query_row(
        "SELECT COUNT(*) FROM positions WHERE unit_id = ?1 AND is_active = 1",
        params![id],
        |row| row.get(0),
    )?;
    if position_count > 0 {
        return Err(DomainError::HasPositions {
            unit_id: id,
            position_count,
        });
    }

    tx.execute(
        "UPDATE units SET is_active = 0, updated_at_us = ?1 WHERE id = ?2",
        params![now_us(), id],
    )?;
    tx.commit()?;

    debug!(unit_id = id, "retired unit");
    Ok(())
}

/// Filters for [`get_hierarchy`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HierarchyFilter {
    pub scope: Option<UnitScope>,
    /// `Some(true)` is the common case: only active units.
    pub is_active: Option<bool>,
    pub is_current: Option<bool>,
}

/// One node of the unit forest: the unit plus its direct children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitNode {
    #[serde(flatten)]
    pub unit: OrgUnit,
    pub children: Vec<UnitNode>,
}

/// Load the unit forest in one query and assemble it in memory.
///
/// Children are ordered by `display_order`, then id. A unit whose parent is
/// excluded by the filter appears as a root of its own subtree.
///
/// # Errors
///
/// [`DomainError::Storage`] on database failure.
pub fn get_hierarchy(conn: &Connection, filter: &HierarchyFilter) -> DomainResult<Vec<UnitNode>> {
    let mut sql = format!("SELECT {UNIT_COLUMNS} FROM units WHERE 1=1");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(scope) = filter.scope {
        sql.push_str(" AND scope = ?");
        args.push(Box::new(scope.as_str()));
    }
    if let Some(active) = filter.is_active {
        sql.push_str(" AND is_active = ?");
        args.push(Box::new(active));
    }
    if let Some(current) = filter.is_current {
        sql.push_str(" AND is_current = ?");
        args.push(Box::new(current));
    }
    sql.push_str(" ORDER BY level ASC, display_order ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let units = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), unit_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(build_forest(units))
}

/// Assemble a forest from a flat, level-ordered unit list.
fn build_forest(units: Vec<OrgUnit>) -> Vec<UnitNode> {
    use std::collections::HashMap;

    let present: std::collections::HashSet<i64> = units.iter().map(|u| u.id).collect();
    let mut children_of: HashMap<i64, Vec<OrgUnit>> = HashMap::new();
    let mut roots: Vec<OrgUnit> = Vec::new();

    for unit in units {
        match unit.parent_id {
            Some(pid) if present.contains(&pid) => {
                children_of.entry(pid).or_default().push(unit);
            }
            _ => roots.push(unit),
        }
    }

    fn attach(
        unit: OrgUnit,
        children_of: &mut std::collections::HashMap<i64, Vec<OrgUnit>>,
    ) -> UnitNode {
        let kids = children_of.remove(&unit.id).unwrap_or_default();
        UnitNode {
            unit,
            children: kids
                .into_iter()
                .map(|child| attach(child, children_of))
                .collect(),
        }
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut children_of))
        .collect()
}
