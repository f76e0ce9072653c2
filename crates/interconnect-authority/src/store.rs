//! Durable authority state
//!
//! Only settled states are written. The pending-transfer marker lives in
//! memory, so a crash mid-transfer recovers the unit as `Active`; a unit is
//! only ever persisted as `Transferred` after the destination acknowledged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use interconnect_core::{AuthorityState, InterconnectError, InterconnectResult, UnitKey};

/// Where authority states survive restarts
pub trait AuthorityStore: Send + Sync {
    fn load(&self) -> InterconnectResult<Vec<(UnitKey, AuthorityState)>>;

    /// Record `state` for `unit`; `None` forgets the unit
    fn save(&self, unit: &UnitKey, state: Option<&AuthorityState>) -> InterconnectResult<()>;
}

/// Volatile store, for tests and single-run deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: Mutex<BTreeMap<UnitKey, AuthorityState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl AuthorityStore for MemoryStore {
    fn load(&self) -> InterconnectResult<Vec<(UnitKey, AuthorityState)>> {
        Ok(self
            .states
            .lock()
            .iter()
            .map(|(unit, state)| (unit.clone(), state.clone()))
            .collect())
    }

    fn save(&self, unit: &UnitKey, state: Option<&AuthorityState>) -> InterconnectResult<()> {
        let mut states = self.states.lock();
        match state {
            Some(state) => states.insert(unit.clone(), state.clone()),
            None => states.remove(unit),
        };
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Record {
    unit: UnitKey,
    #[serde(flatten)]
    state: AuthorityState,
}

/// JSON file rewritten in full on every change (temp file + rename)
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    states: Mutex<BTreeMap<UnitKey, AuthorityState>>,
}

impl JsonFileStore {
    /// Open `path`; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>) -> InterconnectResult<Self> {
        let path = path.as_ref().to_path_buf();
        let states = match fs::read_to_string(&path) {
            Ok(text) => {
                let records: Vec<Record> = serde_json::from_str(&text).map_err(|e| {
                    InterconnectError::Storage(format!("{}: {e}", path.display()))
                })?;
                records.into_iter().map(|r| (r.unit, r.state)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(JsonFileStore {
            path,
            states: Mutex::new(states),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, states: &BTreeMap<UnitKey, AuthorityState>) -> InterconnectResult<()> {
        let records: Vec<Record> = states
            .iter()
            .map(|(unit, state)| Record {
                unit: unit.clone(),
                state: state.clone(),
            })
            .collect();
        let text = serde_json::to_string_pretty(&records)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, text)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl AuthorityStore for JsonFileStore {
    fn load(&self) -> InterconnectResult<Vec<(UnitKey, AuthorityState)>> {
        Ok(self
            .states
            .lock()
            .iter()
            .map(|(unit, state)| (unit.clone(), state.clone()))
            .collect())
    }

    fn save(&self, unit: &UnitKey, state: Option<&AuthorityState>) -> InterconnectResult<()> {
        let mut states = self.states.lock();
        match state {
            Some(state) => states.insert(unit.clone(), state.clone()),
            None => states.remove(unit),
        };
        self.write_file(&states)
    }
}
