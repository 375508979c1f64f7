//! Domain model for the character catalog.
//!
//! # Responsibility
//! - Define the canonical record shape shared by storage and consumers.
//! - Keep normalization rules (URL scheme stripping) next to the data they
//!   protect.
//!
//! # Invariants
//! - Every record is identified by a stable storage-assigned `CharacterId`.
//! - Records are overwritten or removed wholesale, never patched partially.

pub mod character;
