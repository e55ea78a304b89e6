//! Engine Module
//!
//! The single entry point that ties addressing, caching and storage together.
//!
//! ## Responsibilities
//! - Hold configuration, read cache and error log behind one lock
//! - Validate the storage root lazily, on the first real operation
//! - Resolve database names to files (creating registered ones on demand)
//! - Dispatch actions and direct get/set
//! - Record every failure and apply the raise/return-`Failed` policy

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::cache::ReadCache;
use crate::config::{Config, Options};
use crate::error::{LineKvError, Result};
use crate::protocol::{is_address_char, qualified, Action, Address, KeyRef, Reply, Window};
use crate::record::Value;
use crate::storage::{Database, Replacement};

/// The storage engine
///
/// ## Concurrency Model
///
/// - **In-process**: every call takes `state` for its whole duration, so
///   calls run one at a time in call order. Config, cache and error log are
///   never observed half-updated.
/// - **Cross-process**: advisory file locks only. Readers share, writers
///   exclude each other. Another process's writes are invisible to this
///   process's read cache until the key is mutated here.
pub struct Engine {
    state: Mutex<EngineState>,
}

/// Initialization lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,

    /// Storage root validated; `path` can no longer change
    Ready { root: PathBuf },
}

/// Append-only log of failure messages, kept for the engine's lifetime
#[derive(Debug, Default)]
struct ErrorLog {
    messages: Vec<String>,
}

impl ErrorLog {
    fn push(&mut self, message: String) {
        self.messages.push(message);
    }

    fn last(&self) -> Option<&String> {
        self.messages.last()
    }

    fn all(&self) -> &[String] {
        &self.messages
    }
}

struct EngineState {
    config: Config,
    lifecycle: Lifecycle,
    cache: ReadCache,
    errors: ErrorLog,
}

impl Engine {
    // =========================================================================
    // Construction & Configuration
    // =========================================================================

    /// Create an engine; the storage root is validated on first use
    pub fn new(config: Config) -> Self {
        Self {
            state: Mutex::new(EngineState {
                config,
                lifecycle: Lifecycle::Uninitialized,
                cache: ReadCache::new(),
                errors: ErrorLog::default(),
            }),
        }
    }

    /// Create an engine and validate the storage root immediately
    pub fn open(config: Config) -> Result<Self> {
        let engine = Self::new(config);
        engine.run(|state| state.ensure_ready().map(|_| ()))?;
        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the given storage root and databases
    pub fn open_path<I, S>(path: &Path, databases: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Config::default();
        config.path = Some(path.to_path_buf());
        config.databases = databases.into_iter().map(Into::into).collect();
        Self::open(config)
    }

    /// Merge recognized options and return the effective configuration
    ///
    /// Once the engine is ready the storage root is fixed; a different
    /// `path` is ignored.
    pub fn configure(&self, options: Options) -> Config {
        let mut state = self.state.lock();
        let ready = matches!(state.lifecycle, Lifecycle::Ready { .. });

        if !options.apply(&mut state.config, !ready) {
            tracing::warn!("Ignoring storage path change: engine is already initialized");
        }

        state.config.clone()
    }

    // =========================================================================
    // Address Interface
    // =========================================================================

    /// Run one addressed operation, returning the failure as `Err`
    ///
    /// Every failure is also appended to the error log.
    pub fn execute(&self, address: &str, arg: Option<Value>) -> Result<Reply> {
        self.run(|state| state.execute(address, arg))
    }

    /// Run one addressed operation under the configured error policy
    ///
    /// With `raise_errors` a failure comes back as `Err`; otherwise it comes
    /// back as `Ok(Reply::Failed)` and the caller consults `error`/`errors`.
    pub fn call(&self, address: &str, arg: Option<Value>) -> Result<Reply> {
        match self.execute(address, arg) {
            Ok(reply) => Ok(reply),
            Err(e) if self.state.lock().config.raise_errors => Err(e),
            Err(_) => Ok(Reply::Failed),
        }
    }

    // =========================================================================
    // Typed Interface
    // =========================================================================

    /// Read a value (served from the read cache when possible)
    pub fn get(&self, database: &str, key: &str) -> Result<Value> {
        self.run(|state| {
            check_key(database, key)?;
            let db = state.database(database)?;
            state.get(&db, key)
        })
    }

    /// Insert under an explicit key; fails if the key exists
    pub fn set(&self, database: &str, key: &str, value: impl Into<Value>) -> Result<String> {
        let value: Value = value.into();
        self.run(|state| {
            check_key(database, key)?;
            let db = state.database(database)?;
            state.insert(&db, Some(key), &value)
        })
    }

    /// Insert under the next auto-increment key; returns that key
    pub fn insert(&self, database: &str, value: impl Into<Value>) -> Result<String> {
        let value: Value = value.into();
        self.run(|state| {
            let db = state.database(database)?;
            state.insert(&db, None, &value)
        })
    }

    /// Replace the value of an existing key
    pub fn update(&self, database: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        let value: Value = value.into();
        self.run(|state| {
            check_key(database, key)?;
            let db = state.database(database)?;
            state.replace(&db, key, Replacement::Update(&value))
        })
    }

    /// Remove an existing key
    pub fn delete(&self, database: &str, key: &str) -> Result<()> {
        self.run(|state| {
            check_key(database, key)?;
            let db = state.database(database)?;
            state.replace(&db, key, Replacement::Delete)
        })
    }

    /// Delete the database file and clear the whole read cache
    pub fn drop_database(&self, database: &str) -> Result<()> {
        self.run(|state| {
            let db = state.database(database)?;
            state.drop_database(&db)
        })
    }

    pub fn count(&self, database: &str) -> Result<u64> {
        self.run(|state| state.database(database)?.count())
    }

    pub fn has_key(&self, database: &str, key: &str) -> Result<bool> {
        self.run(|state| {
            check_key(database, key)?;
            state.database(database)?.contains_key(key)
        })
    }

    pub fn keys(&self, database: &str) -> Result<Vec<String>> {
        self.run(|state| state.database(database)?.keys())
    }

    pub fn max(&self, database: &str) -> Result<i64> {
        self.run(|state| state.database(database)?.max_key())
    }

    pub fn select(&self, database: &str, window: Option<Window>) -> Result<Vec<(String, Value)>> {
        self.run(|state| state.database(database)?.select(window))
    }

    /// Most recently logged failure
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().errors.last().cloned()
    }

    /// Every logged failure, oldest first
    pub fn errors(&self) -> Vec<String> {
        self.state.lock().errors.all().to_vec()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the effective configuration
    pub fn config(&self) -> Config {
        self.state.lock().config.clone()
    }

    /// Whether the storage root has been validated
    pub fn is_ready(&self) -> bool {
        matches!(self.state.lock().lifecycle, Lifecycle::Ready { .. })
    }

    /// Number of entries in the read cache
    pub fn cached_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Whether `database.key` is currently cached
    pub fn is_cached(&self, database: &str, key: &str) -> bool {
        self.state.lock().cache.contains(&qualified(database, key))
    }

    /// Primary file path of a database (once the engine is ready)
    pub fn database_path(&self, database: &str) -> Option<PathBuf> {
        let state = self.state.lock();
        match &state.lifecycle {
            Lifecycle::Ready { root } => Some(state.describe(root, database).path().to_path_buf()),
            Lifecycle::Uninitialized => None,
        }
    }

    /// Lock the state, run `op`, and log its failure if any
    fn run<T>(&self, op: impl FnOnce(&mut EngineState) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock();
        let result = op(&mut state);
        if let Err(e) = &result {
            state.record(e);
        }
        result
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl EngineState {
    fn record(&mut self, error: &LineKvError) {
        let message = error.to_string();
        tracing::warn!("{}", message);
        self.errors.push(message);
    }

    /// Validate the storage root on first use
    fn ensure_ready(&mut self) -> Result<PathBuf> {
        if let Lifecycle::Ready { root } = &self.lifecycle {
            return Ok(root.clone());
        }

        let root = self.config.path.clone().ok_or_else(|| {
            LineKvError::Config("empty database storage path (configure `path` first)".to_string())
        })?;

        if !root.is_dir() {
            return Err(LineKvError::Config(format!(
                "\"{}\" is not a directory",
                root.display()
            )));
        }

        if !is_writable(&root) {
            return Err(LineKvError::Config(format!(
                "\"{}\" is not writable",
                root.display()
            )));
        }

        tracing::info!("Storage root ready at {}", root.display());
        self.lifecycle = Lifecycle::Ready { root: root.clone() };
        Ok(root)
    }

    fn describe(&self, root: &Path, name: &str) -> Database {
        Database::new(root, name, &self.config.ext, self.config.gzip)
    }

    /// Resolve a registered database, creating its file if missing
    fn database(&mut self, name: &str) -> Result<Database> {
        let root = self.ensure_ready()?;

        if name.is_empty() || !name.chars().all(is_database_char) {
            return Err(LineKvError::InvalidAddress(name.to_string()));
        }
        if !self.config.is_registered(name) {
            return Err(LineKvError::DatabaseNotRegistered(name.to_string()));
        }

        let db = self.describe(&root, name);
        db.ensure_exists()?;
        Ok(db)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn execute(&mut self, input: &str, arg: Option<Value>) -> Result<Reply> {
        let address = Address::parse(input)?;

        // The log is readable even before the storage root is valid
        if let Some(action @ (Action::Error | Action::Errors)) = address.action {
            return Ok(self.log_reply(action));
        }

        let db = self.database(&address.database)?;

        if let Some(action) = address.action {
            let key = address.key().unwrap_or_default();
            return self.run_action(&db, action, key, arg);
        }

        match (address.key, arg) {
            (KeyRef::Explicit(key), Some(value)) => {
                self.insert(&db, Some(key.as_str()), &value).map(Reply::Key)
            }
            (KeyRef::Explicit(key), None) => self.get(&db, &key).map(Reply::Value),
            (KeyRef::Auto, Some(value)) => self.insert(&db, None, &value).map(Reply::Key),
            (KeyRef::Auto, None) => {
                let key = db.max_key()?.saturating_add(1).to_string();
                self.get(&db, &key).map(Reply::Value)
            }
            // Only produced together with an action
            (KeyRef::Absent, _) => Err(LineKvError::InvalidAddress(input.to_string())),
        }
    }

    fn run_action(
        &mut self,
        db: &Database,
        action: Action,
        key: &str,
        arg: Option<Value>,
    ) -> Result<Reply> {
        tracing::debug!("Running {} on \"{}\"", action, db.name());

        match action {
            Action::Count => Ok(Reply::Number(i64::try_from(db.count()?).unwrap_or(i64::MAX))),
            Action::Delete => self.replace(db, key, Replacement::Delete).map(|_| Reply::Done),
            Action::Drop => self.drop_database(db).map(|_| Reply::Done),
            Action::Error | Action::Errors => Ok(self.log_reply(action)),
            Action::Key => db.contains_key(key).map(Reply::Bool),
            Action::Keys => db.keys().map(Reply::Keys),
            Action::Max => db.max_key().map(Reply::Number),
            Action::Select => {
                let window = arg.as_ref().map(Window::from_value);
                db.select(window).map(Reply::Records)
            }
            Action::Update => {
                let value = arg.ok_or_else(|| {
                    LineKvError::UnsupportedType(format!(
                        "update of \"{}\" needs a value",
                        db.qualify(key)
                    ))
                })?;
                self.replace(db, key, Replacement::Update(&value)).map(|_| Reply::Done)
            }
        }
    }

    fn log_reply(&self, action: Action) -> Reply {
        match action {
            Action::Errors => Reply::Errors(self.errors.all().to_vec()),
            _ => Reply::LastError(self.errors.last().cloned()),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn get(&mut self, db: &Database, key: &str) -> Result<Value> {
        let cache_key = db.qualify(key);
        if let Some(value) = self.cache.get(&cache_key) {
            tracing::trace!("Cache hit for \"{}\"", cache_key);
            return Ok(value.clone());
        }

        let value = db.get(key)?;
        self.cache.insert(cache_key, value.clone());
        Ok(value)
    }

    fn insert(&mut self, db: &Database, key: Option<&str>, value: &Value) -> Result<String> {
        let key = db.insert(key, value)?;
        self.cache.remove(&db.qualify(&key));
        Ok(key)
    }

    fn replace(&mut self, db: &Database, key: &str, replacement: Replacement<'_>) -> Result<()> {
        // Invalidate before touching the file so no stale value is served
        self.cache.remove(&db.qualify(key));
        db.replace(key, replacement)
    }

    fn drop_database(&mut self, db: &Database) -> Result<()> {
        db.drop_file()?;
        self.cache.clear();
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Database names: the address charset minus both delimiters
fn is_database_char(c: char) -> bool {
    is_key_char(c) && c != '.'
}

/// Keys may contain `.` but never the `:` field separator
fn is_key_char(c: char) -> bool {
    is_address_char(c) && c != ':'
}

fn check_key(database: &str, key: &str) -> Result<()> {
    if key.chars().all(is_key_char) {
        Ok(())
    } else {
        Err(LineKvError::InvalidAddress(qualified(database, key)))
    }
}

/// Probe writability by creating and removing a scratch file
fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".linekv_probe_{}", std::process::id()));
    match OpenOptions::new().write(true).create(true).truncate(true).open(&probe) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&probe) {
                tracing::warn!("Could not remove probe file {}: {}", probe.display(), e);
            }
            true
        }
        Err(_) => false,
    }
}
