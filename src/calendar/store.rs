use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calendar::error::StoreError;
use crate::calendar::event::CalendarEvent;
use crate::fsutil;

pub const STORE_FILE: &str = "calendar.yaml";

/// The durable set of calendar events, keyed by identity key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarStore {
    #[serde(default)]
    events: BTreeMap<String, CalendarEvent>,
}

impl CalendarStore {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, uid: &str) -> Option<&CalendarEvent> {
        self.events.get(uid)
    }

    /// Events in identity-key order.
    pub fn events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events.values()
    }

    /// Insert or replace the event with the same key.
    pub fn upsert(&mut self, event: CalendarEvent) {
        self.events.insert(event.uid.clone(), event);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&CalendarEvent) -> bool) {
        self.events.retain(|_, e| keep(e));
    }

    pub fn to_yaml(&self) -> Result<String, StoreError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Loads and saves a [`CalendarStore`] in the output folder.
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(dir: &Path) -> Self {
        StoreFile {
            path: dir.join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store; a corrupt one is an error.
    pub fn load(&self) -> Result<CalendarStore, StoreError> {
        if !self.path.exists() {
            log::info!("No calendar store at {}, starting empty", self.path.display());
            return Ok(CalendarStore::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let store: CalendarStore = serde_yaml::from_str(&content)?;
        if let Some((key, event)) = store.events.iter().find(|(k, e)| **k != e.uid) {
            return Err(StoreError::KeyMismatch {
                key: key.clone(),
                uid: event.uid.clone(),
            });
        }
        Ok(store)
    }

    pub fn save(&self, store: &CalendarStore) -> Result<(), StoreError> {
        fsutil::write_atomic(&self.path, store.to_yaml()?.as_bytes())?;
        Ok(())
    }
}
