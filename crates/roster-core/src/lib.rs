//! roster-core: organizational structure and position assignment engine.
//!
//! The crate owns three entities backed by a single SQLite store:
//!
//! - **Units** form a containment tree (headquarters down to sections),
//!   kept acyclic by [`graph`] validation inside every reparent.
//! - **Positions** are roles within a unit with a capacity
//!   (`max_holders`) and an independent reporting chain (`reports_to`).
//! - **Assignments** are the temporal ledger of who holds which position;
//!   occupancy and vacancy are always derived from it, never stored.
//!
//! # Conventions
//!
//! - **Errors**: domain operations return [`error::DomainResult`];
//!   infrastructure plumbing uses `anyhow::Result` with `.context()`.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Time**: persisted timestamps are `i64` microseconds since the Unix
//!   epoch ([`time::now_us`]).
//! - **Transactions**: every mutation runs its precondition reads and its
//!   write under one transaction on the caller's `&mut Connection`.

pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod events;
pub mod graph;
pub mod ledger;
pub mod model;
pub mod registry;
pub mod time;

pub use error::{DomainError, DomainResult, Entity, ErrorCode};
