//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Repositories never touch the materialized view or observers; that is
//!   store-worker territory.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod character_repo;
