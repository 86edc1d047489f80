#![deny(missing_docs)]

//! # fleet-core - Foundational Types for the Fleet Inventory Service
//!
//! Every other crate in the workspace builds on the types defined here.
//! The crate performs no I/O: persistence and HTTP live in `fleet-api`.
//!
//! ## Contents
//!
//! - [`entity`] - the [`Entity`] contract every inventory record implements:
//!   resource name, table name, field catalogue (searchable, filterable,
//!   sortable, unique), references to other resources.
//! - [`entities`] - the concrete records (countries through bus lines) with
//!   their create/update DTOs and field validation.
//! - [`query`] - list parameters, conditions, ordering and the pagination
//!   envelope shared by every `/list` endpoint.
//! - [`seat_layout`] - the seat-diagram grid editor and its hallway rules.
//! - [`error`] - [`DomainError`] and field-level [`FieldError`]s.

pub mod entities;
pub mod entity;
pub mod error;
pub mod query;
pub mod seat_layout;
pub mod validate;

pub use entity::{Entity, FieldKind, FieldSpec, RecordMeta, Reference};
pub use error::{DomainError, FieldError, FieldErrorCode};
pub use query::{
    Condition, ListParams, ListResult, OrderBy, PageDefaults, PageRequest, PaginatedResult,
    PaginationMeta, SortDirection, SortKey,
};
pub use seat_layout::{ColumnSide, LayoutError, Position, SeatLayout, Space};
pub use validate::{Checker, Validate};
