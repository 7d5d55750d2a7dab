//! The store handle.
//!
//! A [`StoreHandle`] is a cheap, cloneable reference to one open store. All
//! clones share the same live connection, observer registry and writer
//! thread. The connection sits behind a swappable slot so that
//! [`StoreHandle::recreate`] can replace the database under every clone.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock, Weak};
use std::thread::{self, ThreadId};

use rusqlite::{Connection, OpenFlags, TransactionBehavior};

use crate::config::{ConfigError, Location, StoreConfig};
use crate::error::{Result, StoreError};
use crate::migration;
use crate::observe::{NotificationToken, ObserverRegistry, RawChange};
use crate::txn::{ReadView, SnapshotRow, Touched, WriteTxn};
use crate::worker::AsyncWriter;

/// Which threads may use a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    /// Any thread.
    #[default]
    Any,
    /// The thread that opens the handle. Resolved to [`Affinity::Thread`] on open.
    CurrentThread,
    /// One specific thread.
    Thread(ThreadId),
}

impl Affinity {
    fn resolve(self) -> Self {
        match self {
            Affinity::CurrentThread => Affinity::Thread(thread::current().id()),
            other => other,
        }
    }
}

struct Live {
    conn: Arc<Mutex<Connection>>,
    generation: u64,
}

struct HandleInner {
    config: StoreConfig,
    path: Option<PathBuf>,
    affinity: Affinity,
    live: RwLock<Live>,
    observers: Arc<ObserverRegistry>,
    writer: AsyncWriter,
}

/// A shared handle to one open store.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<HandleInner>,
}

/// A non-owning reference to a [`StoreHandle`].
#[derive(Clone, Debug)]
pub struct WeakStoreHandle {
    inner: Weak<HandleInner>,
}

impl WeakStoreHandle {
    /// The handle, if any clone of it is still alive.
    pub fn upgrade(&self) -> Option<StoreHandle> {
        self.inner.upgrade().map(|inner| StoreHandle { inner })
    }
}

thread_local! {
    // Handles with a write transaction open on this thread.
    static OPEN_WRITES: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

struct WriteScope {
    key: usize,
}

impl WriteScope {
    fn enter(key: usize) -> Result<Self> {
        OPEN_WRITES.with(|open| {
            let mut open = open.borrow_mut();
            if open.contains(&key) {
                return Err(StoreError::NestedWrite);
            }
            open.push(key);
            Ok(Self { key })
        })
    }

    fn is_open(key: usize) -> bool {
        OPEN_WRITES.with(|open| open.borrow().contains(&key))
    }
}

impl Drop for WriteScope {
    fn drop(&mut self) {
        OPEN_WRITES.with(|open| open.borrow_mut().retain(|k| *k != self.key));
    }
}

enum SharedState {
    Ready(StoreHandle),
    Failed { location: String, reason: String },
}

static SHARED: OnceLock<SharedState> = OnceLock::new();

impl StoreHandle {
    /// Open the store at the default location.
    pub fn open_default() -> Result<Self> {
        Self::open_with(StoreConfig::default(), Affinity::Any)
    }

    /// Open or create the store at `path`.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(StoreConfig::at(path), Affinity::Any)
    }

    /// Open an anonymous in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with(StoreConfig::in_memory(), Affinity::Any)
    }

    /// Open with an explicit configuration and thread affinity.
    pub fn open_with(config: StoreConfig, affinity: Affinity) -> Result<Self> {
        config
            .validate()
            .map_err(|e| StoreError::unavailable(&config.location, e))?;
        let path = config.resolve_path()?;

        if config.recreate_on_open {
            if let Some(path) = &path {
                remove_database_files(path)?;
            }
        }

        let conn = open_connection(&config, path.as_deref())?;
        tracing::info!(location = %config.location, path = ?path, read_only = config.read_only, "store opened");

        Ok(Self {
            inner: Arc::new(HandleInner {
                config,
                path,
                affinity: affinity.resolve(),
                live: RwLock::new(Live {
                    conn: Arc::new(Mutex::new(conn)),
                    generation: 0,
                }),
                observers: Arc::default(),
                writer: AsyncWriter::default(),
            }),
        })
    }

    /// The process-wide default handle, opened from the environment on first use.
    ///
    /// A failure on first use is remembered: every later call returns the
    /// same [`StoreError::StoreUnavailable`] without retrying.
    pub fn shared() -> Result<Self> {
        let state = SHARED.get_or_init(|| {
            let opened = StoreConfig::from_env()
                .map_err(|e| StoreError::unavailable(Location::Default, e))
                .and_then(|config| Self::open_with(config, Affinity::Any));
            match opened {
                Ok(handle) => SharedState::Ready(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "shared store unavailable");
                    match e {
                        StoreError::StoreUnavailable { location, reason } => {
                            SharedState::Failed { location, reason }
                        }
                        other => SharedState::Failed {
                            location: Location::Default.to_string(),
                            reason: other.to_string(),
                        },
                    }
                }
            }
        });
        match state {
            SharedState::Ready(handle) => Ok(handle.clone()),
            SharedState::Failed { location, reason } => Err(StoreError::StoreUnavailable {
                location: location.clone(),
                reason: reason.clone(),
            }),
        }
    }

    pub fn location(&self) -> &Location {
        &self.inner.config.location
    }

    /// The database file, `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn affinity(&self) -> Affinity {
        self.inner.affinity
    }

    pub fn downgrade(&self) -> WeakStoreHandle {
        WeakStoreHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same open store.
    pub fn ptr_eq(&self, other: &StoreHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run a synchronous write transaction.
    ///
    /// Commits when `body` returns `Ok` and rolls back when it returns
    /// `Err`. Observers of the touched types are notified after the commit,
    /// on the calling thread.
    pub fn write<T, E, F>(&self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.check_context()?;
        self.run_write(body)
    }

    /// Queue a write transaction on the handle's writer thread.
    ///
    /// Jobs run in submission order. The outcome, including failure to
    /// begin or commit, is passed to `on_complete` on the writer thread.
    pub fn write_async<T, E, F, C>(&self, body: F, on_complete: C) -> Result<()>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> std::result::Result<T, E> + Send + 'static,
        C: FnOnce(std::result::Result<T, E>) + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + fmt::Display + Send + 'static,
    {
        self.check_context()?;
        let handle = self.clone();
        self.inner.writer.submit(Box::new(move || {
            let result = handle.run_write(body);
            if let Err(e) = &result {
                tracing::warn!(error = %e, "async write failed");
            }
            on_complete(result);
        }))?;
        tracing::debug!(location = %self.location(), "async write scheduled");
        Ok(())
    }

    /// Block until every async write submitted so far has finished.
    ///
    /// Must not be called from inside a tokio runtime; use
    /// [`StoreHandle::settled`] there. Calling it from the writer thread or
    /// inside a write transaction fails with [`StoreError::NestedWrite`].
    pub fn wait_for_async_writes(&self) -> Result<()> {
        self.check_context()?;
        self.check_can_wait()?;
        if let Some(done) = self.inner.writer.barrier() {
            let _ = done.blocking_recv();
        }
        Ok(())
    }

    /// Async form of [`StoreHandle::wait_for_async_writes`].
    pub async fn settled(&self) -> Result<()> {
        self.check_context()?;
        self.check_can_wait()?;
        if let Some(done) = self.inner.writer.barrier() {
            let _ = done.await;
        }
        Ok(())
    }

    /// Run `f` against a read-only view of the current store.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadView<'_>) -> Result<T>,
    {
        self.check_context()?;
        self.check_not_writing()?;
        let (conn, _) = self.live();
        let conn = lock_connection(&conn);
        f(&ReadView::new(&conn))
    }

    /// Observe the objects of one type.
    ///
    /// The callback receives [`RawChange::Initial`] before this returns,
    /// then an update after every commit that changes the type. It runs on
    /// whichever thread committed.
    pub fn observe_type<F>(&self, type_name: &str, callback: F) -> Result<NotificationToken>
    where
        F: FnMut(Result<RawChange>) + Send + 'static,
    {
        self.check_context()?;
        self.check_not_writing()?;
        let load = |name: &str| self.load_snapshot(name);
        Ok(self
            .inner
            .observers
            .register(type_name, Box::new(callback), &load))
    }

    /// Delete every object of every type in one transaction.
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.write(|txn| txn.delete_everything())?;
        tracing::info!(location = %self.location(), removed, "store cleared");
        Ok(removed)
    }

    /// Replace the backing database with a fresh empty one at the same location.
    ///
    /// Every clone of this handle sees the new store. Readers already
    /// holding the old connection finish against it. All observers are
    /// notified.
    pub fn recreate(&self) -> Result<()> {
        self.check_context()?;
        self.check_not_writing()?;
        if self.inner.config.read_only {
            return Err(StoreError::unavailable(
                self.location(),
                ConfigError::ReadOnlyRecreate,
            ));
        }

        {
            let mut live = self
                .inner
                .live
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Wait out any transaction still running on the old connection.
            let old = lock_connection(&live.conn);
            if let Some(path) = &self.inner.path {
                remove_database_files(path)?;
            }
            let conn = match open_connection(&self.inner.config, self.inner.path.as_deref()) {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(
                        location = %self.location(),
                        error = %e,
                        "recreate removed the old database but could not open a new one"
                    );
                    return Err(e);
                }
            };
            drop(old);
            live.conn = Arc::new(Mutex::new(conn));
            live.generation += 1;
        }

        tracing::info!(location = %self.location(), "store recreated");
        self.notify(&Touched::Everything);
        Ok(())
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn check_context(&self) -> Result<()> {
        if let Affinity::Thread(expected) = self.inner.affinity {
            let actual = thread::current().id();
            if actual != expected {
                return Err(StoreError::WrongContext { expected, actual });
            }
        }
        Ok(())
    }

    fn check_not_writing(&self) -> Result<()> {
        if WriteScope::is_open(self.key()) {
            return Err(StoreError::NestedWrite);
        }
        Ok(())
    }

    fn check_can_wait(&self) -> Result<()> {
        self.check_not_writing()?;
        if self.inner.writer.is_writer_thread() {
            return Err(StoreError::NestedWrite);
        }
        Ok(())
    }

    fn live(&self) -> (Arc<Mutex<Connection>>, u64) {
        let live = self
            .inner
            .live
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (Arc::clone(&live.conn), live.generation)
    }

    fn run_write<T, E, F>(&self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let scope = WriteScope::enter(self.key())?;
        let (conn, _) = self.live();

        let (value, touched) = {
            let mut conn = lock_connection(&conn);
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(StoreError::from_write)?;
            let mut txn = WriteTxn::new(tx);
            let value = match body(&mut txn) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(location = %self.location(), "write rolled back");
                    return Err(e);
                }
            };
            let touched = txn.commit()?;
            tracing::debug!(location = %self.location(), touched = ?touched, "write committed");
            (value, touched)
        };

        drop(scope);
        self.notify(&touched);
        Ok(value)
    }

    fn notify(&self, touched: &Touched) {
        let load = |name: &str| self.load_snapshot(name);
        self.inner.observers.notify(touched, &load);
    }

    fn load_snapshot(&self, type_name: &str) -> Result<(u64, Vec<SnapshotRow>)> {
        let (conn, generation) = self.live();
        let conn = lock_connection(&conn);
        let rows = ReadView::new(&conn).snapshot(type_name)?;
        Ok((generation, rows))
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("location", &self.inner.config.location)
            .field("affinity", &self.inner.affinity)
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}

// A panic inside a transaction body poisons the mutex after the
// transaction has already rolled back, so the connection is still usable.
fn lock_connection(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn open_connection(config: &StoreConfig, path: Option<&Path>) -> Result<Connection> {
    let unavailable = |e: &dyn fmt::Display| StoreError::unavailable(&config.location, e);

    let mut conn = match path {
        None => Connection::open_in_memory(),
        Some(path) if config.read_only => Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        ),
        Some(path) => Connection::open(path),
    }
    .map_err(|e| unavailable(&e))?;
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| unavailable(&e))?;

    if config.read_only {
        let version = migration::current_version(&conn).map_err(|e| unavailable(&e))?;
        if version != migration::CURRENT_VERSION {
            return Err(unavailable(&format!(
                "read-only store has schema version {}, expected {}",
                version,
                migration::CURRENT_VERSION
            )));
        }
    } else {
        migration::migrate(&mut conn).map_err(|e| unavailable(&e))?;
    }
    Ok(conn)
}

/// Remove a database file and its sidecars. Missing files are fine.
fn remove_database_files(path: &Path) -> Result<()> {
    let mut targets = vec![path.to_path_buf()];
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        targets.push(PathBuf::from(name));
    }
    for target in targets {
        match std::fs::remove_file(&target) {
            Ok(()) => tracing::debug!(path = %target.display(), "removed database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::unavailable(target.display(), e)),
        }
    }
    Ok(())
}
