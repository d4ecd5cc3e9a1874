//! Repository layer: the document-store boundary for person data.
//!
//! # Responsibility
//! - Define the store-client contract consumed by the service layer.
//! - Isolate SQLite query details from use-case orchestration.
//!
//! # Invariants
//! - Repository writes enforce `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `InvalidId`) in
//!   addition to store transport errors.

pub mod person_repo;
