//! Domain model for project rating reconciliation.
//!
//! # Responsibility
//! - Define the rows the reconciliation engine reads and writes.
//! - Keep wiki-facing identifiers (namespace + title) in one shape.
//!
//! # Invariants
//! - A rating is identified by `(project, namespace, article)`.
//! - Moves and logs are append-only facts; nothing in core mutates them.

pub mod audit;
pub mod category;
pub mod kind;
pub mod page_move;
pub mod project;
pub mod rating;
pub mod timestamp;
