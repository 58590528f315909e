//! Position model: roles scoped to a unit with their own reporting chain.
//!
//! A position always belongs to exactly one unit (`unit_id`), but its
//! `reports_to` pointer forms a second hierarchy that is independent of the
//! unit tree and may cross unit boundaries. `current_holders` is derived
//! from the assignment ledger and never stored; vacancy is
//! `current_holders < max_holders`.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Functional classification of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    Executive,
    Structural,
    Functional,
    Coordinator,
    Staff,
}

impl PositionType {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::Structural => "structural",
            Self::Functional => "functional",
            Self::Coordinator => "coordinator",
            Self::Staff => "staff",
        }
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionType {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "executive" => Ok(Self::Executive),
            "structural" => Ok(Self::Structural),
            "functional" => Ok(Self::Functional),
            "coordinator" => Ok(Self::Coordinator),
            "staff" => Ok(Self::Staff),
            other => Err(crate::error::DomainError::Validation {
                message: format!(
                    "unknown position type '{other}': expected one of \
                     executive, structural, functional, coordinator, staff"
                ),
            }),
        }
    }
}

/// Seniority band of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionLevel {
    Top,
    Middle,
    Lower,
}

impl PositionLevel {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Middle => "middle",
            Self::Lower => "lower",
        }
    }
}

impl fmt::Display for PositionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionLevel {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "middle" | "mid" => Ok(Self::Middle),
            "lower" => Ok(Self::Lower),
            other => Err(crate::error::DomainError::Validation {
                message: format!(
                    "unknown position level '{other}': expected one of top, middle, lower"
                ),
            }),
        }
    }
}

/// A persisted position row plus its derived holder count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    /// Owning unit; a position always belongs to exactly one unit.
    pub unit_id: i64,
    pub title: String,
    pub position_type: PositionType,
    pub position_level: PositionLevel,
    /// Superior position in the reporting hierarchy; may cross units.
    pub reports_to: Option<i64>,
    /// Capacity: how many people may hold this position at once.
    pub max_holders: u32,
    /// Derived: count of active assignments. Never written directly.
    pub current_holders: u32,
    pub display_order: u32,
    pub is_active: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Position {
    /// A position has vacancy iff its active occupant count is below capacity.
    #[must_use]
    pub const fn is_vacant(&self) -> bool {
        self.current_holders < self.max_holders
    }
}

/// Fields for creating a position under a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePosition {
    pub title: String,
    pub position_type: PositionType,
    pub position_level: PositionLevel,
    pub reports_to: Option<i64>,
    /// Defaults to 1 when absent.
    pub max_holders: Option<u32>,
    pub display_order: Option<u32>,
}

/// Fields that can change on an existing position. `reports_to` uses a
/// double `Option`: `Some(None)` clears the superior link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePosition {
    pub title: Option<String>,
    pub position_type: Option<PositionType>,
    pub position_level: Option<PositionLevel>,
    pub reports_to: Option<Option<i64>>,
    pub max_holders: Option<u32>,
    pub display_order: Option<u32>,
}

impl UpdatePosition {
    /// Returns `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.position_type.is_none()
            && self.position_level.is_none()
            && self.reports_to.is_none()
            && self.max_holders.is_none()
            && self.display_order.is_none()
    }
}
