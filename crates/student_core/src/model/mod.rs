//! Domain model for student records.
//!
//! # Responsibility
//! - Define the stored record, caller input and caller-facing view shapes.
//!
//! # Invariants
//! - Every student is identified by a stable `StudentId` and a store-assigned
//!   `RollNumber`; neither is ever reused or changed.
//! - Deletion is a hard delete; there are no tombstones.

pub mod student;
