use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use fastrace::trace;
use heed::byteorder::BigEndian;
use heed::types::{Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use roster_types::{NewUser, StoreStats, User};
use thiserror::Error;
use tracing::{debug, info};

const USERS_DB: &str = "users";
const META_DB: &str = "meta";
const NEXT_ID_KEY: &str = "next_id";
const FIRST_ID: u64 = 1;

pub const DEFAULT_MAP_SIZE: u64 = 64 * 1024 * 1024; // 64MB

type IdKey = U64<BigEndian>;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("LMDB error: {0}")]
    Lmdb(#[from] heed::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No user ids left to assign")]
    IdsExhausted,
    #[error("User id {0} is already taken")]
    IdTaken(u64),
}

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub map_size: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            map_size: DEFAULT_MAP_SIZE,
        }
    }
}

/// User records in a single LMDB collection, keyed by a generated id.
///
/// Every mutation runs in its own write transaction that covers both the
/// record and the id counter, so a failed commit leaves nothing behind.
/// The handle is cheap to clone; clones share the environment.
#[derive(Clone)]
pub struct RecordStore {
    env: Env,
    users: Database<IdKey, Str>,
    meta: Database<Str, IdKey>,
    path: PathBuf,
    max_bytes: u64,
    last_created: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl RecordStore {
    /// Opens the database at `path`, creating the directory and both
    /// collections on first use. Existing data is left untouched.
    #[trace]
    pub fn open(path: &Path, options: StoreOptions) -> Result<Self, PersistenceError> {
        std::fs::create_dir_all(path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(options.map_size as usize)
                .max_dbs(2)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let users = env.create_database(&mut wtxn, Some(USERS_DB))?;
        let meta = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        info!("Opened record store at {}", path.display());

        Ok(Self {
            env,
            users,
            meta,
            path: path.to_path_buf(),
            max_bytes: options.map_size,
            last_created: Arc::new(Mutex::new(None)),
        })
    }

    #[trace]
    pub fn create(&self, user: NewUser) -> Result<User, PersistenceError> {
        let created_at = self.next_created_at();

        let mut wtxn = self.env.write_txn()?;
        let id = self.next_id(&wtxn)?;
        let following = id.checked_add(1).ok_or(PersistenceError::IdsExhausted)?;
        if self.users.get(&wtxn, &id)?.is_some() {
            return Err(PersistenceError::IdTaken(id));
        }
        let record = User::from_new(id, user, created_at);
        self.put_record(&mut wtxn, &record)?;
        self.meta.put(&mut wtxn, NEXT_ID_KEY, &following)?;
        wtxn.commit()?;

        debug!("Created user {}", id);
        Ok(record)
    }

    /// Replaces the record with `user.id`, inserting it if there is none.
    /// An id at or past the counter moves the counter beyond it; `u64::MAX`
    /// is refused since nothing could follow it.
    #[trace]
    pub fn update(&self, user: &User) -> Result<(), PersistenceError> {
        let mut wtxn = self.env.write_txn()?;
        if user.id >= self.next_id(&wtxn)? {
            let following = user.id.checked_add(1).ok_or(PersistenceError::IdsExhausted)?;
            self.meta.put(&mut wtxn, NEXT_ID_KEY, &following)?;
        }
        self.put_record(&mut wtxn, user)?;
        wtxn.commit()?;

        debug!("Updated user {}", user.id);
        Ok(())
    }

    /// Removes the record if present. Returns whether anything was removed;
    /// deleting an unknown id is not an error.
    #[trace]
    pub fn delete(&self, id: u64) -> Result<bool, PersistenceError> {
        let mut wtxn = self.env.write_txn()?;
        let removed = self.users.delete(&mut wtxn, &id)?;
        wtxn.commit()?;

        debug!("Deleted user {} (present: {})", id, removed);
        Ok(removed)
    }

    #[trace]
    pub fn get(&self, id: u64) -> Result<Option<User>, PersistenceError> {
        let rtxn = self.env.read_txn()?;
        match self.users.get(&rtxn, &id)? {
            Some(value) => Ok(Some(serde_json::from_str(value)?)),
            None => Ok(None),
        }
    }

    /// Every stored record in key order. Callers that care about order must
    /// sort for themselves.
    #[trace]
    pub fn list_all(&self) -> Result<Vec<User>, PersistenceError> {
        let rtxn = self.env.read_txn()?;
        let mut users = Vec::new();
        for entry in self.users.iter(&rtxn)? {
            let (_, value) = entry?;
            users.push(serde_json::from_str(value)?);
        }
        Ok(users)
    }

    pub fn stats(&self) -> Result<StoreStats, PersistenceError> {
        let rtxn = self.env.read_txn()?;
        let records = self.users.len(&rtxn)?;

        let info = self.env.info();
        let current_bytes = info.last_page_number as u64 * 4096;

        Ok(StoreStats {
            path: self.path.display().to_string(),
            records,
            current_bytes,
            max_bytes: self.max_bytes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_id(&self, txn: &RoTxn) -> Result<u64, PersistenceError> {
        Ok(self.meta.get(txn, NEXT_ID_KEY)?.unwrap_or(FIRST_ID))
    }

    fn put_record(&self, wtxn: &mut RwTxn, user: &User) -> Result<(), PersistenceError> {
        let value = serde_json::to_string(user)?;
        self.users.put(wtxn, &user.id, &value)?;
        Ok(())
    }

    // Strictly increasing within this handle, so two records created in the
    // same clock tick still order by creation.
    fn next_created_at(&self) -> DateTime<Utc> {
        let mut last = self
            .last_created
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Utc::now();
        let stamp = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}
