//! Record store: queued CRUD, materialized view, observer fan-out.
//!
//! # Responsibility
//! - Own the persistent character collection and its materialized view.
//! - Queue every operation to a single worker for total write order.
//! - Fan out zero-argument change notifications to subscribed observers.
//!
//! # Invariants
//! - One worker thread per store owns the SQLite connection exclusively.
//! - The view is replaced wholesale after successful operations, never
//!   patched incrementally.
//! - Observers run on the worker thread, after the view replacement.
//! - The worker drains its queue and stops when the last handle drops.
//!
//! # See also
//! - docs/architecture/store.md

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::media::MediaError;
use crate::model::character::{Character, CharacterDraft, CharacterId};
use crate::repo::character_repo::{CharacterRepository, RepoError, SqliteCharacterRepository};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Instant;

mod pending;
mod subscription;
mod worker;

pub use pending::PendingOp;
pub use subscription::{SubscriptionHandle, SubscriptionId};

use pending::pending_pair;
use worker::{Command, Worker};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level operation error.
#[derive(Debug)]
pub enum StoreError {
    /// Connection bootstrap or migration failure.
    Db(DbError),
    /// Persistence failure below the store.
    Repo(RepoError),
    /// Target record does not exist (update only; delete reports absence
    /// as `existed = false`).
    NotFound(CharacterId),
    /// Image source could not be read and encoded.
    Media(MediaError),
    /// The worker thread could not be spawned.
    WorkerSpawn(std::io::Error),
    /// The worker is no longer running; the operation outcome is lost.
    WorkerClosed,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "character not found: {id}"),
            Self::Media(err) => write!(f, "{err}"),
            Self::WorkerSpawn(err) => write!(f, "failed to spawn store worker: {err}"),
            Self::WorkerClosed => write!(f, "store worker is no longer running"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Media(err) => Some(err),
            Self::WorkerSpawn(err) => Some(err),
            Self::WorkerClosed => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Repo not-found is flattened to `StoreError::NotFound` so callers match
/// a single variant.
impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<MediaError> for StoreError {
    fn from(value: MediaError) -> Self {
        Self::Media(value)
    }
}

pub(crate) type SharedSnapshot = Arc<RwLock<Vec<Character>>>;

fn read_snapshot(snapshot: &SharedSnapshot) -> Vec<Character> {
    snapshot
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Owned handle to one character record store.
///
/// Cheap to clone; every clone feeds the same worker queue and reads the
/// same materialized view. The worker shuts down when the last handle
/// drops.
#[derive(Clone)]
pub struct CharacterStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    commands: Sender<Command>,
    snapshot: SharedSnapshot,
    next_subscription: AtomicU64,
    worker: Option<JoinHandle<()>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // FIFO: the worker drains operations queued before the shutdown.
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            // An observer holding the last store clone releases us on the
            // worker thread itself; never self-join.
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl CharacterStore {
    /// Opens (or creates) a file-backed store and performs the initial
    /// full load before returning.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path)?;
        Self::start(conn, "file")
    }

    /// Opens an in-memory store, mainly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Self::start(conn, "memory")
    }

    fn start(conn: Connection, mode: &str) -> StoreResult<Self> {
        let started_at = Instant::now();

        let initial = match Self::load_initial(&conn) {
            Ok(initial) => initial,
            Err(err) => {
                error!(
                    "event=store_open module=store status=error mode={mode} duration_ms={} error_code=initial_load_failed error={err}",
                    started_at.elapsed().as_millis()
                );
                return Err(err);
            }
        };
        let visible = initial.len();
        let snapshot: SharedSnapshot = Arc::new(RwLock::new(initial));

        let (commands, queue) = mpsc::channel();
        let worker = Worker::new(conn, queue, Arc::clone(&snapshot));
        let worker = std::thread::Builder::new()
            .name("charadex-store".to_string())
            .spawn(move || worker.run())
            .map_err(StoreError::WorkerSpawn)?;

        info!(
            "event=store_open module=store status=ok mode={mode} visible={visible} duration_ms={}",
            started_at.elapsed().as_millis()
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                commands,
                snapshot,
                next_subscription: AtomicU64::new(0),
                worker: Some(worker),
            }),
        })
    }

    fn load_initial(conn: &Connection) -> StoreResult<Vec<Character>> {
        let repo = SqliteCharacterRepository::try_new(conn)?;
        Ok(repo.list_characters()?)
    }

    /// Queues an insert of a new record.
    ///
    /// # Contract
    /// - Strips a leading URL scheme and encodes the image, if any.
    /// - On success the view holds the full reloaded collection and every
    ///   observer has been notified; the ticket resolves to the new id.
    pub fn insert(&self, draft: CharacterDraft) -> PendingOp<CharacterId> {
        let (done, pending) = pending_pair();
        self.send(Command::Insert { draft, done });
        pending
    }

    /// Queues a full-record update of an existing record.
    ///
    /// # Contract
    /// - Overwrites every field except `id`; a draft without an image
    ///   clears any stored image.
    /// - A missing `id` resolves the ticket to `StoreError::NotFound`
    ///   with no write and no notification.
    pub fn update(&self, id: CharacterId, draft: CharacterDraft) -> PendingOp<()> {
        let (done, pending) = pending_pair();
        self.send(Command::Update { id, draft, done });
        pending
    }

    /// Queues a delete-if-present.
    ///
    /// # Contract
    /// - Absence is not an error; the ticket resolves to whether the
    ///   record existed.
    /// - The view is reloaded and observers notified either way.
    pub fn delete(&self, id: CharacterId) -> PendingOp<bool> {
        let (done, pending) = pending_pair();
        self.send(Command::Delete { id, done });
        pending
    }

    /// Queues a by-name search that replaces the view with its result.
    ///
    /// # Contract
    /// - Exact, case-sensitive match; an empty `name` reloads the full
    ///   collection instead.
    /// - Always notifies, even for an empty result; the ticket resolves
    ///   to the number of visible records.
    pub fn search(&self, name: impl Into<String>) -> PendingOp<usize> {
        let (done, pending) = pending_pair();
        self.send(Command::Search {
            name: name.into(),
            done,
        });
        pending
    }

    /// Registers a change observer, invoked after every successful view
    /// refresh for as long as the returned handle lives.
    ///
    /// # Contract
    /// - Observers run on the worker thread in registration order.
    /// - A callback may queue further store commands, but must not wait
    ///   on their tickets (the worker would be waiting on itself).
    pub fn subscribe(&self, observer: impl Fn() + Send + 'static) -> SubscriptionHandle {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Subscribe {
            id,
            observer: Box::new(observer),
        });
        SubscriptionHandle::new(id, self.inner.commands.clone())
    }

    /// Returns a clone of the current materialized view.
    ///
    /// Synchronous read of last-known state; never triggers a load.
    pub fn view(&self) -> Vec<Character> {
        read_snapshot(&self.inner.snapshot)
    }

    /// Returns a read-only view handle that does not keep the worker
    /// alive, for use inside observer closures.
    pub fn view_handle(&self) -> StoreView {
        StoreView {
            snapshot: Arc::clone(&self.inner.snapshot),
        }
    }

    fn send(&self, command: Command) {
        // A dropped command also drops its completion slot, so any ticket
        // attached to it resolves to WorkerClosed.
        let _ = self.inner.commands.send(command);
    }
}

/// Read-only handle onto the materialized view.
///
/// Unlike a [`CharacterStore`] clone this holds no queue sender, so an
/// observer closure capturing it cannot keep the worker alive.
#[derive(Clone)]
pub struct StoreView {
    snapshot: SharedSnapshot,
}

impl StoreView {
    /// Returns a clone of the current materialized view.
    pub fn characters(&self) -> Vec<Character> {
        read_snapshot(&self.snapshot)
    }

    pub fn len(&self) -> usize {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
