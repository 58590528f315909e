//! Canonical SQLite schema for the org store.
//!
//! The schema is normalized around the three owned entities:
//! - `units` is the containment tree (self-referencing `parent_id`)
//! - `positions` belong to a unit and form a second hierarchy via
//!   `reports_to`
//! - `assignments` is the temporal ledger linking users to positions
//!
//! The partial unique index `idx_assignments_one_active` makes the
//! at-most-one-active invariant a hard constraint: even if two writers
//! race past the precondition read, the second insert fails.

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS units (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    slug TEXT NOT NULL UNIQUE CHECK (length(trim(slug)) > 0),
    parent_id INTEGER REFERENCES units(id),
    scope TEXT NOT NULL CHECK (
        scope IN ('headquarters', 'region', 'campus', 'department', 'division', 'section')
    ),
    level INTEGER NOT NULL CHECK (level >= 1),
    display_order INTEGER NOT NULL DEFAULT 1,
    period_start_us INTEGER NOT NULL,
    period_end_us INTEGER,
    is_current INTEGER NOT NULL DEFAULT 1 CHECK (is_current IN (0, 1)),
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE TABLE IF NOT EXISTS positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    unit_id INTEGER NOT NULL REFERENCES units(id),
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    position_type TEXT NOT NULL CHECK (
        position_type IN ('executive', 'structural', 'functional', 'coordinator', 'staff')
    ),
    position_level TEXT NOT NULL CHECK (position_level IN ('top', 'middle', 'lower')),
    reports_to INTEGER REFERENCES positions(id),
    max_holders INTEGER NOT NULL DEFAULT 1 CHECK (max_holders >= 1),
    display_order INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (reports_to IS NULL OR reports_to <> id)
);

CREATE TABLE IF NOT EXISTS assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    position_id INTEGER NOT NULL REFERENCES positions(id),
    user_id INTEGER NOT NULL,
    assignment_type TEXT NOT NULL DEFAULT 'permanent' CHECK (
        assignment_type IN ('permanent', 'acting', 'temporary', 'concurrent')
    ),
    status TEXT NOT NULL DEFAULT 'active' CHECK (
        status IN ('active', 'completed', 'terminated', 'on_leave')
    ),
    started_at_us INTEGER NOT NULL,
    ended_at_us INTEGER,
    expected_end_us INTEGER,
    termination_reason TEXT CHECK (
        termination_reason IS NULL OR termination_reason IN
        ('completed', 'transferred', 'resigned', 'dismissed', 'expired', 'leave')
    ),
    note TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (status = 'active' OR ended_at_us IS NOT NULL),
    CHECK (status <> 'active' OR ended_at_us IS NULL)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
"#;

/// Migration v2: read-path indexes and the one-active-per-pair constraint.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_assignments_one_active
    ON assignments(user_id, position_id)
    WHERE status = 'active';

CREATE INDEX IF NOT EXISTS idx_units_parent
    ON units(parent_id);

CREATE INDEX IF NOT EXISTS idx_units_scope_active
    ON units(scope, is_active);

CREATE INDEX IF NOT EXISTS idx_positions_unit
    ON positions(unit_id, display_order);

CREATE INDEX IF NOT EXISTS idx_positions_reports_to
    ON positions(reports_to);

CREATE INDEX IF NOT EXISTS idx_assignments_position_status
    ON assignments(position_id, status);

CREATE INDEX IF NOT EXISTS idx_assignments_user_started
    ON assignments(user_id, started_at_us DESC);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
"#;

/// Indexes expected by vacancy, hierarchy, and history query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_assignments_one_active",
    "idx_units_parent",
    "idx_units_scope_active",
    "idx_positions_unit",
    "idx_positions_reports_to",
    "idx_assignments_position_status",
    "idx_assignments_user_started",
];
