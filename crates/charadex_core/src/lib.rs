//! Core domain logic for Charadex, a character catalog.
//! This crate is the single source of truth for record semantics.

pub mod db;
pub mod logging;
pub mod media;
pub mod model;
pub mod repo;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use media::{ImageSource, MediaError, MediaResult};
pub use model::character::{Character, CharacterDraft, CharacterFields, CharacterId};
pub use repo::character_repo::{
    CharacterRepository, RepoError, RepoResult, SqliteCharacterRepository,
};
pub use store::{
    CharacterStore, PendingOp, StoreError, StoreResult, StoreView, SubscriptionHandle,
    SubscriptionId,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
