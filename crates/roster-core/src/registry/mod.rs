//! Structural registries: the unit tree and the position roster.

pub mod position;
pub mod unit;

pub use position::{
    active_holder_count, create_position, delete_position, get_position, list_positions,
    reporting_chain, update_position,
};
pub use unit::{
    HierarchyFilter, UnitNode, create_unit, delete_unit, get_hierarchy, get_unit, update_unit,
};
