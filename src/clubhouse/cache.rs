//! Stale-while-revalidate cache of tracker responses.
//!
//! Each logical key maps to one JSON file. A persisted record is always
//! served as-is; when it is older than the caller's `max_age` a background
//! thread re-runs the producer and overwrites the file. Only a missing or
//! undecodable record makes the caller wait for the producer.

use crate::clubhouse::Result;
use dashmap::{DashMap, DashSet};
use rapidhash::fast::RandomState;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread::JoinHandle,
    time::{Duration, SystemTime},
};
use tracing::{debug, warn};

const FILE_PREFIX: &str = "clubhouse-";

#[derive(Debug)]
pub struct CacheStore {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    dir: PathBuf,
    cold_locks: DashMap<String, Arc<Mutex<()>>, RandomState>,
    refreshing: DashSet<String, RandomState>,
}

/// A decoded record together with how old it is.
struct CachedRecord<T> {
    value: T,
    age: Duration,
}

impl CacheStore {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            inner: Arc::new(CacheInner {
                dir,
                cold_locks: DashMap::with_hasher(RandomState::new()),
                refreshing: DashSet::with_hasher(RandomState::new()),
            }),
        })
    }

    /// Platform cache directory, or the temp dir when none is known.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join("clubhouse-language-server"))
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.inner.path_for(key)
    }

    /// Return the cached value for `key`, producing it synchronously on a cold
    /// cache and in the background when the record is older than `max_age`.
    pub fn get<T, F>(&self, key: &str, max_age: Duration, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Result<T> + Send + 'static,
    {
        self.get_tracked(key, max_age, producer)
            .map(|(value, _refresh)| value)
    }

    pub(crate) fn get_tracked<T, F>(
        &self,
        key: &str,
        max_age: Duration,
        producer: F,
    ) -> Result<(T, Option<JoinHandle<()>>)>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Result<T> + Send + 'static,
    {
        if let Some(record) = self.inner.read::<T>(key) {
            let refresh = if record.age > max_age {
                self.spawn_refresh(key, producer)
            } else {
                None
            };
            return Ok((record.value, refresh));
        }

        let lock = self
            .inner
            .cold_locks
            .entry(key.to_string())
            .or_default()
            .clone();
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another caller may have filled the record while we waited.
        if let Some(record) = self.inner.read::<T>(key) {
            return Ok((record.value, None));
        }

        debug!(key, "cache miss");
        let value = producer()?;
        self.inner.write(key, &value)?;
        Ok((value, None))
    }

    fn spawn_refresh<T, F>(&self, key: &str, producer: F) -> Option<JoinHandle<()>>
    where
        T: Serialize + Send + 'static,
        F: Fn() -> Result<T> + Send + 'static,
    {
        if !self.inner.refreshing.insert(key.to_string()) {
            debug!(key, "refresh already running");
            return None;
        }

        let inner = Arc::clone(&self.inner);
        let owned_key = key.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("cache-refresh-{key}"))
            .spawn(move || {
                debug!(key = %owned_key, "refreshing stale record");
                let outcome = producer().and_then(|value| inner.write(&owned_key, &value));
                if let Err(err) = outcome {
                    warn!(key = %owned_key, error = %err, "background cache refresh failed");
                }
                inner.refreshing.remove(&owned_key);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(key, error = %err, "could not spawn cache refresh");
                self.inner.refreshing.remove(key);
                None
            }
        }
    }
}

impl CacheInner {
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{key}.json"))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<CachedRecord<T>> {
        let path = self.path_for(key);
        let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok()?;
        let bytes = fs::read(&path).ok()?;
        let value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => {
                debug!(key, error = %err, "discarding undecodable cache record");
                return None;
            }
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        Some(CachedRecord { value, age })
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
