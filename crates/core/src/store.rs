//! JSON file persistence.
//!
//! Each entity kind lives in its own file holding a JSON object that maps the
//! record id to the record. Files are read whole and rewritten whole.

use std::{
    collections::BTreeMap,
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{
    error::Result,
    models::{Client, Rental, User, Vehicle},
};

/// In-memory view of a store file, keyed by record id.
pub type Records<T> = BTreeMap<String, T>;

/// Typed handle to one JSON store file.
#[derive(Debug)]
pub struct JsonStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonStore<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a handle for the file at `path`. Nothing is read until [`JsonStore::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record. A missing file is an empty store.
    pub fn load(&self) -> Result<Records<T>> {
        if !self.path.exists() {
            return Ok(Records::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Records::new());
        }
        let records: Records<T> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        debug!(path = %self.path.display(), records = records.len(), "Store loaded");
        Ok(records)
    }

    /// Replace the file contents with `records`, creating parent directories if needed.
    pub fn save(&self, records: &Records<T>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(records)
            .with_context(|| format!("failed to serialise {}", self.path.display()))?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(path = %self.path.display(), records = records.len(), "Store saved");
        Ok(())
    }
}

/// Next free id for `prefix`, one past the highest numeric suffix in use.
pub fn next_id<T>(prefix: char, records: &Records<T>) -> String {
    let highest = records
        .keys()
        .filter_map(|key| key.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{}", highest + 1)
}

/// File locations of the four stores inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// `users.json`
    pub users: PathBuf,
    /// `clients.json`
    pub clients: PathBuf,
    /// `vehicles.json`
    pub vehicles: PathBuf,
    /// `rentals.json`
    pub rentals: PathBuf,
}

impl StorePaths {
    /// Standard file names under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let root = data_dir.as_ref();
        Self {
            users: root.join("users.json"),
            clients: root.join("clients.json"),
            vehicles: root.join("vehicles.json"),
            rentals: root.join("rentals.json"),
        }
    }

    /// Handle to the user store.
    pub fn users(&self) -> JsonStore<User> {
        JsonStore::new(&self.users)
    }

    /// Handle to the client store.
    pub fn clients(&self) -> JsonStore<Client> {
        JsonStore::new(&self.clients)
    }

    /// Handle to the vehicle store.
    pub fn vehicles(&self) -> JsonStore<Vehicle> {
        JsonStore::new(&self.vehicles)
    }

    /// Handle to the rental store.
    pub fn rentals(&self) -> JsonStore<Rental> {
        JsonStore::new(&self.rentals)
    }
}
