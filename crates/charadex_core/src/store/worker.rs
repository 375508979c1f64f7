//! Store worker: the single writer behind the operation queue.
//!
//! # Responsibility
//! - Own the SQLite connection and the observer registry.
//! - Execute queued operations strictly in arrival order.
//! - Refresh the materialized view and fan out notifications.
//!
//! # Invariants
//! - Within one operation: write → reload view → notify → complete ticket,
//!   strictly in that order.
//! - A failed operation never replaces the view and never notifies.
//! - An update of a missing id performs no image encode, no write and no
//!   notification.
//!
//! # See also
//! - docs/architecture/store.md

use super::pending::CompletionSlot;
use super::subscription::{ObserverFn, ObserverRegistry, SubscriptionId};
use super::{SharedSnapshot, StoreError, StoreResult};
use crate::media::{self, MediaError};
use crate::model::character::{
    strip_url_scheme, Character, CharacterDraft, CharacterFields, CharacterId,
};
use crate::repo::character_repo::{CharacterRepository, SqliteCharacterRepository};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::sync::PoisonError;
use std::time::Instant;

/// One queued store command.
pub(crate) enum Command {
    Insert {
        draft: CharacterDraft,
        done: CompletionSlot<CharacterId>,
    },
    Update {
        id: CharacterId,
        draft: CharacterDraft,
        done: CompletionSlot<()>,
    },
    Delete {
        id: CharacterId,
        done: CompletionSlot<bool>,
    },
    Search {
        name: String,
        done: CompletionSlot<usize>,
    },
    Subscribe {
        id: SubscriptionId,
        observer: ObserverFn,
    },
    Unsubscribe {
        id: SubscriptionId,
    },
    Shutdown,
}

pub(crate) struct Worker {
    conn: Connection,
    commands: std::sync::mpsc::Receiver<Command>,
    snapshot: SharedSnapshot,
    observers: ObserverRegistry,
}

impl Worker {
    pub(crate) fn new(
        conn: Connection,
        commands: std::sync::mpsc::Receiver<Command>,
        snapshot: SharedSnapshot,
    ) -> Self {
        Self {
            conn,
            commands,
            snapshot,
            observers: ObserverRegistry::new(),
        }
    }

    pub(crate) fn run(mut self) {
        info!("event=store_worker module=store status=start");

        loop {
            let command = match self.commands.recv() {
                Ok(command) => command,
                // All senders gone; nothing can be queued anymore.
                Err(_) => break,
            };

            match command {
                Command::Insert { draft, done } => self.handle_insert(draft, done),
                Command::Update { id, draft, done } => self.handle_update(id, draft, done),
                Command::Delete { id, done } => self.handle_delete(id, done),
                Command::Search { name, done } => self.handle_search(&name, done),
                Command::Subscribe { id, observer } => {
                    self.observers.register(id, observer);
                    debug!(
                        "event=observer_subscribe module=store id={id} observers={}",
                        self.observers.len()
                    );
                }
                Command::Unsubscribe { id } => {
                    let removed = self.observers.remove(id);
                    debug!(
                        "event=observer_unsubscribe module=store id={id} removed={removed} observers={}",
                        self.observers.len()
                    );
                }
                Command::Shutdown => break,
            }
        }

        info!("event=store_worker module=store status=stop");
    }

    fn handle_insert(&self, draft: CharacterDraft, done: CompletionSlot<CharacterId>) {
        let started_at = Instant::now();
        match self.insert_and_refresh(draft) {
            Ok(id) => {
                info!(
                    "event=store_insert module=store status=ok id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Ok(id));
            }
            Err(StoreError::Media(err)) => {
                error!(
                    "event=store_insert module=store status=error duration_ms={} error_code=media_encode_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Err(StoreError::Media(err)));
            }
            Err(err) => {
                error!(
                    "event=store_insert module=store status=error duration_ms={} error_code=insert_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Err(err));
            }
        }
    }

    fn insert_and_refresh(&self, draft: CharacterDraft) -> StoreResult<CharacterId> {
        let fields = prepare_fields(draft)?;
        let repo = SqliteCharacterRepository::try_new(&self.conn)?;
        let id = repo.insert_character(&fields)?;
        let characters = repo.list_characters()?;
        self.publish(characters);
        Ok(id)
    }

    fn handle_update(&self, id: CharacterId, draft: CharacterDraft, done: CompletionSlot<()>) {
        let started_at = Instant::now();
        match self.update_and_refresh(id, draft) {
            Ok(()) => {
                info!(
                    "event=store_update module=store status=ok id={id} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Ok(()));
            }
            Err(StoreError::NotFound(missing)) => {
                warn!(
                    "event=store_update module=store status=not_found id={missing} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Err(StoreError::NotFound(missing)));
            }
            Err(StoreError::Media(err)) => {
                error!(
                    "event=store_update module=store status=error id={id} duration_ms={} error_code=media_encode_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Err(StoreError::Media(err)));
            }
            Err(err) => {
                error!(
                    "event=store_update module=store status=error id={id} duration_ms={} error_code=update_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Err(err));
            }
        }
    }

    fn update_and_refresh(&self, id: CharacterId, draft: CharacterDraft) -> StoreResult<()> {
        let repo = SqliteCharacterRepository::try_new(&self.conn)?;
        // Existence first: a missing id must surface as NotFound even when
        // the draft carries an unreadable image source.
        if repo.get_character(id)?.is_none() {
            return Err(StoreError::NotFound(id));
        }
        let fields = prepare_fields(draft)?;
        repo.update_character(id, &fields)?;
        let characters = repo.list_characters()?;
        self.publish(characters);
        Ok(())
    }

    fn handle_delete(&self, id: CharacterId, done: CompletionSlot<bool>) {
        let started_at = Instant::now();
        match self.delete_and_refresh(id) {
            Ok(existed) => {
                info!(
                    "event=store_delete module=store status=ok id={id} existed={existed} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Ok(existed));
            }
            Err(err) => {
                error!(
                    "event=store_delete module=store status=error id={id} duration_ms={} error_code=delete_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Err(err));
            }
        }
    }

    fn delete_and_refresh(&self, id: CharacterId) -> StoreResult<bool> {
        let repo = SqliteCharacterRepository::try_new(&self.conn)?;
        let existed = repo.delete_character(id)?;
        // Absent ids still refresh: the view reflects what storage last
        // reported, and observers hear about the (unchanged) reload.
        let characters = repo.list_characters()?;
        self.publish(characters);
        Ok(existed)
    }

    fn handle_search(&self, name: &str, done: CompletionSlot<usize>) {
        let started_at = Instant::now();
        match self.search_and_refresh(name) {
            Ok(visible) => {
                info!(
                    "event=store_search module=store status=ok visible={visible} filtered={} duration_ms={}",
                    !name.is_empty(),
                    started_at.elapsed().as_millis()
                );
                done.complete(Ok(visible));
            }
            Err(err) => {
                error!(
                    "event=store_search module=store status=error duration_ms={} error_code=search_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                done.complete(Err(err));
            }
        }
    }

    fn search_and_refresh(&self, name: &str) -> StoreResult<usize> {
        let repo = SqliteCharacterRepository::try_new(&self.conn)?;
        let characters = if name.is_empty() {
            repo.list_characters()?
        } else {
            repo.find_by_name(name)?
        };
        let visible = characters.len();
        self.publish(characters);
        Ok(visible)
    }

    /// Replaces the materialized view and fans out notifications.
    ///
    /// The write lock is released before observers run, so callbacks can
    /// read the view freely.
    fn publish(&self, characters: Vec<Character>) {
        let visible = characters.len();
        {
            // Writes are wholesale replacement; a poisoned lock still holds
            // a coherent previous value.
            let mut view = self
                .snapshot
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *view = characters;
        }
        debug!("event=view_refresh module=store visible={visible}");
        self.observers.notify_all();
    }
}

/// Normalizes a caller-supplied draft into storage-ready fields.
///
/// The URL loses its leading scheme and the image source, when present, is
/// read and encoded into a self-contained data URL.
fn prepare_fields(draft: CharacterDraft) -> Result<CharacterFields, MediaError> {
    let image = draft.image.map(media::encode_to_data_url).transpose()?;
    Ok(CharacterFields {
        name: draft.name,
        description: draft.description,
        appearance_date: draft.appearance_date,
        info_url: strip_url_scheme(&draft.info_url),
        image,
        category: draft.category,
    })
}

#[cfg(test)]
mod tests {
    use super::prepare_fields;
    use crate::media::ImageSource;
    use crate::model::character::CharacterDraft;

    fn draft(info_url: &str, image: Option<ImageSource>) -> CharacterDraft {
        CharacterDraft {
            name: "Mario".to_string(),
            description: "Plumber".to_string(),
            appearance_date: "1981".to_string(),
            info_url: info_url.to_string(),
            image,
            category: "Hero".to_string(),
        }
    }

    #[test]
    fn strips_scheme_and_keeps_missing_image() {
        let fields = prepare_fields(draft("https://example.com/mario", None)).unwrap();
        assert_eq!(fields.info_url, "example.com/mario");
        assert_eq!(fields.image, None);
    }

    #[test]
    fn encodes_byte_images_into_data_urls() {
        let fields = prepare_fields(draft(
            "example.com",
            Some(ImageSource::Bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])),
        ))
        .unwrap();
        let image = fields.image.unwrap();
        assert!(image.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn unreadable_image_source_fails_before_any_write() {
        let err = prepare_fields(draft(
            "example.com",
            Some(ImageSource::File("/nonexistent/ghost.png".into())),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("ghost.png"));
    }
}
