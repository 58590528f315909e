//! Typed entities for the three ledger-backed tables.

pub mod assignment;
pub mod position;
pub mod unit;

pub use assignment::{
    Assignment, AssignmentStatus, AssignmentType, CreateAssignment, EndReason, InvalidTransition,
};
pub use position::{CreatePosition, Position, PositionLevel, PositionType, UpdatePosition};
pub use unit::{CreateUnit, OrgUnit, UnitScope, UpdateUnit};
