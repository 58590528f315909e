//! Assignment model: the time-bounded occupancy of a position by a person.
//!
//! An assignment is created `active` and leaves that status exactly once,
//! through `ledger::end_assignment` (or the end half of `ledger::transfer`).
//! Once non-active it is immutable except for corrective notes.
//!
//! `on_leave` is a pause, not a terminal status, but it does not count
//! toward occupancy and does not block a fresh assignment for the same
//! (user, position) pair; returning from leave is a fresh `assign`.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How the person holds the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentType {
    Permanent,
    Acting,
    Temporary,
    Concurrent,
}

impl AssignmentType {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Acting => "acting",
            Self::Temporary => "temporary",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentType {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permanent" => Ok(Self::Permanent),
            "acting" => Ok(Self::Acting),
            "temporary" | "temp" => Ok(Self::Temporary),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(crate::error::DomainError::Validation {
                message: format!(
                    "unknown assignment type '{other}': expected one of \
                     permanent, acting, temporary, concurrent"
                ),
            }),
        }
    }
}

/// Lifecycle status of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Completed,
    Terminated,
    OnLeave,
}

impl AssignmentStatus {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
            Self::OnLeave => "on_leave",
        }
    }

    /// Only active assignments count toward a position's occupancy.
    #[must_use]
    pub const fn counts_toward_occupancy(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Validate leaving `active` for `target`.
    ///
    /// Valid transitions:
    /// - `active -> completed`
    /// - `active -> terminated`
    /// - `active -> on_leave`
    ///
    /// Everything else is rejected; non-active assignments never change
    /// status again (returning from leave is a fresh assignment).
    pub const fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        match (self, target) {
            (Self::Active, Self::Completed | Self::Terminated | Self::OnLeave) => Ok(()),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "terminated" => Ok(Self::Terminated),
            "on_leave" | "on-leave" => Ok(Self::OnLeave),
            other => Err(crate::error::DomainError::Validation {
                message: format!(
                    "unknown assignment status '{other}': expected one of \
                     active, completed, terminated, on_leave"
                ),
            }),
        }
    }
}

/// Error returned when a status transition is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: AssignmentStatus,
    pub to: AssignmentStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid assignment transition {} -> {}: only active assignments may change status",
            self.from.as_str(),
            self.to.as_str()
        )
    }
}

impl std::error::Error for InvalidTransition {}

/// Why an assignment left the active status.
///
/// The reason selects the final status: `Transferred` and `Completed` end as
/// `completed`, `Resigned`/`Dismissed`/`Expired` as `terminated`, and
/// `Leave` as `on_leave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Completed,
    Transferred,
    Resigned,
    Dismissed,
    Expired,
    Leave,
}

impl EndReason {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Transferred => "transferred",
            Self::Resigned => "resigned",
            Self::Dismissed => "dismissed",
            Self::Expired => "expired",
            Self::Leave => "leave",
        }
    }

    /// The final status this reason maps to.
    #[must_use]
    pub const fn final_status(self) -> AssignmentStatus {
        match self {
            Self::Completed | Self::Transferred => AssignmentStatus::Completed,
            Self::Resigned | Self::Dismissed | Self::Expired => AssignmentStatus::Terminated,
            Self::Leave => AssignmentStatus::OnLeave,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndReason {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "transferred" => Ok(Self::Transferred),
            "resigned" => Ok(Self::Resigned),
            "dismissed" => Ok(Self::Dismissed),
            "expired" => Ok(Self::Expired),
            "leave" => Ok(Self::Leave),
            other => Err(crate::error::DomainError::Validation {
                message: format!(
                    "unknown end reason '{other}': expected one of \
                     completed, transferred, resigned, dismissed, expired, leave"
                ),
            }),
        }
    }
}

/// A persisted assignment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub position_id: i64,
    /// The occupant; identity is resolved through [`crate::directory`].
    pub user_id: i64,
    pub assignment_type: AssignmentType,
    pub status: AssignmentStatus,
    pub started_at_us: i64,
    /// Set exactly once, when the assignment leaves active.
    pub ended_at_us: Option<i64>,
    /// Planned end date, if any.
    pub expected_end_us: Option<i64>,
    pub termination_reason: Option<EndReason>,
    /// Free-text note; amendable after the assignment ends.
    pub note: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Caller-supplied fields for a new assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAssignment {
    /// Defaults to `Permanent` when absent.
    pub assignment_type: Option<AssignmentType>,
    /// Defaults to now when absent.
    pub started_at_us: Option<i64>,
    pub expected_end_us: Option<i64>,
    pub note: Option<String>,
}
