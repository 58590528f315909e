//! Domain error taxonomy for structural and assignment operations.
//!
//! Every precondition failure is a distinct variant carrying the ids
//! involved, so callers can render a specific message without parsing
//! strings. Storage failures (constraint violations, connectivity) surface
//! as [`DomainError::Storage`], distinct from the domain taxonomy, and are
//! never retried here.

use crate::model::AssignmentStatus;
use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    Validation,
    CycleDetected,
    CapacityExceeded,
    CapacityBelowOccupancy,
    DuplicateActiveAssignment,
    NotActive,
    HasChildren,
    HasPositions,
    ActiveAssignmentsExist,
    Storage,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "E1001",
            Self::Validation => "E1002",
            Self::CycleDetected => "E2001",
            Self::CapacityExceeded => "E2002",
            Self::CapacityBelowOccupancy => "E2003",
            Self::DuplicateActiveAssignment => "E2004",
            Self::NotActive => "E2005",
            Self::HasChildren => "E3001",
            Self::HasPositions => "E3002",
            Self::ActiveAssignmentsExist => "E3003",
            Self::Storage => "E5001",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotFound | Self::Validation => None,
            Self::CycleDetected => {
                Some("Pick a parent/superior outside the node's own subtree.")
            }
            Self::CapacityExceeded => {
                Some("End an existing assignment or raise max_holders first.")
            }
            Self::CapacityBelowOccupancy => {
                Some("End enough active assignments before lowering capacity.")
            }
            Self::DuplicateActiveAssignment => {
                Some("End the existing active assignment before re-assigning.")
            }
            Self::NotActive => Some("Only active assignments can be ended or transferred."),
            Self::HasChildren => Some("Move or delete child units first."),
            Self::HasPositions => Some("Move or delete the unit's positions first."),
            Self::ActiveAssignmentsExist => {
                Some("End the position's active assignments before deleting it.")
            }
            Self::Storage => Some("Retry once. If persistent, check the store file and logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which entity a [`DomainError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Unit,
    Position,
    Assignment,
    User,
}

impl Entity {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Position => "position",
            Self::Assignment => "assignment",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the registries and the assignment ledger.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// A referenced unit/position/assignment/user does not exist.
    #[error("{entity} not found: id {id}")]
    NotFound { entity: Entity, id: i64 },

    /// A required field is missing or an enum value is malformed.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The proposed parent/superior link would create a cycle.
    #[error("linking node {node_id} under {proposed_parent} would create a cycle")]
    CycleDetected { node_id: i64, proposed_parent: i64 },

    /// The position is already at capacity.
    #[error("position {position_id} is at capacity ({max_holders} holder(s))")]
    CapacityExceeded { position_id: i64, max_holders: u32 },

    /// A capacity reduction would drop `max_holders` below current occupancy.
    #[error(
        "cannot lower capacity of position {position_id} to {requested}: \
         {occupied} holder(s) currently active"
    )]
    CapacityBelowOccupancy {
        position_id: i64,
        requested: u32,
        occupied: u32,
    },

    /// The (user, position) pair already has an active assignment.
    #[error("user {user_id} already holds an active assignment on position {position_id}")]
    DuplicateActiveAssignment { user_id: i64, position_id: i64 },

    /// The assignment is not active, so it cannot be ended or transferred.
    #[error("assignment {assignment_id} is {status}, not active")]
    NotActive {
        assignment_id: i64,
        status: AssignmentStatus,
    },

    /// The unit still has child units.
    #[error("unit {unit_id} has {child_count} child unit(s)")]
    HasChildren { unit_id: i64, child_count: u32 },

    /// The unit still has positions.
    #[error("unit {unit_id} has {position_count} position(s)")]
    HasPositions { unit_id: i64, position_count: u32 },

    /// The position still has active assignments.
    #[error("position {position_id} has {active_count} active assignment(s)")]
    ActiveAssignmentsExist { position_id: i64, active_count: u32 },

    /// Infrastructure failure from the underlying store.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl DomainError {
    /// The machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Validation { .. } => ErrorCode::Validation,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
            Self::CapacityBelowOccupancy { .. } => ErrorCode::CapacityBelowOccupancy,
            Self::DuplicateActiveAssignment { .. } => ErrorCode::DuplicateActiveAssignment,
            Self::NotActive { .. } => ErrorCode::NotActive,
            Self::HasChildren { .. } => ErrorCode::HasChildren,
            Self::HasPositions { .. } => ErrorCode::HasPositions,
            Self::ActiveAssignmentsExist { .. } => ErrorCode::ActiveAssignmentsExist,
            Self::Storage(_) => ErrorCode::Storage,
        }
    }
}

/// Shorthand for results in registry and ledger code.
pub type DomainResult<T> = Result<T, DomainError>;
