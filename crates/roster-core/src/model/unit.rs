//! Organizational unit model: the containment tree.
//!
//! Units form a forest via `parent_id`: every unit has at most one parent,
//! root units have none. The `level` field is the depth in the tree
//! (root = 1) and is recomputed by the registry whenever a unit is created
//! or reparented. A validity period (`period_start_us`/`period_end_us`,
//! `is_current`) marks which structure revision is in effect.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The kind of organizational unit, roughly ordered by breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitScope {
    Headquarters,
    Region,
    Campus,
    Department,
    Division,
    Section,
}

impl UnitScope {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Headquarters => "headquarters",
            Self::Region => "region",
            Self::Campus => "campus",
            Self::Department => "department",
            Self::Division => "division",
            Self::Section => "section",
        }
    }

    /// All scopes, used by validation messages and the CLI.
    pub const ALL: [Self; 6] = [
        Self::Headquarters,
        Self::Region,
        Self::Campus,
        Self::Department,
        Self::Division,
        Self::Section,
    ];
}

impl fmt::Display for UnitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitScope {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headquarters" | "hq" => Ok(Self::Headquarters),
            "region" => Ok(Self::Region),
            "campus" => Ok(Self::Campus),
            "department" | "dept" => Ok(Self::Department),
            "division" => Ok(Self::Division),
            "section" => Ok(Self::Section),
            other => Err(crate::error::DomainError::Validation {
                message: format!(
                    "unknown unit scope '{other}': expected one of \
                     headquarters, region, campus, department, division, section"
                ),
            }),
        }
    }
}

/// A persisted organizational unit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: i64,
    pub name: String,
    /// URL-safe unique identifier (e.g. `west-region`).
    pub slug: String,
    /// Parent unit in the containment tree; `None` for roots.
    pub parent_id: Option<i64>,
    pub scope: UnitScope,
    /// Depth in the tree, root = 1. Maintained by the registry.
    pub level: u32,
    /// Ordering among siblings under the same parent.
    pub display_order: u32,
    /// Start of the validity period, microseconds since epoch.
    pub period_start_us: i64,
    /// End of the validity period; `None` while open-ended.
    pub period_end_us: Option<i64>,
    /// Whether this row belongs to the currently effective structure.
    pub is_current: bool,
    pub is_active: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// Fields for creating a unit. `display_order` is auto-assigned within the
/// sibling group when absent; `period_start_us` defaults to now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUnit {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub scope: UnitScope,
    pub display_order: Option<u32>,
    pub period_start_us: Option<i64>,
}

/// Fields that can change on an existing unit. `parent_id` uses a double
/// `Option`: `None` leaves the parent untouched, `Some(None)` moves the
/// unit to the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUnit {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<Option<i64>>,
    pub scope: Option<UnitScope>,
    pub display_order: Option<u32>,
    pub period_end_us: Option<i64>,
    pub is_current: Option<bool>,
}

impl UpdateUnit {
    /// Returns `true` when no field is set (nothing to write).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.parent_id.is_none()
            && self.scope.is_none()
            && self.display_order.is_none()
            && self.period_end_us.is_none()
            && self.is_current.is_none()
    }
}
