//! Authority table: every unit this server knows about
//!
//! Each unit has its own lock, so operations on different units never
//! contend. Locks are held only for synchronous transitions, never across a
//! network round trip. Every settled change is persisted under the unit's
//! lock, then reported to the host after the lock is released.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use interconnect_core::{AuthorityState, InterconnectError, InterconnectResult, UnitKey};

use crate::{AuthorityStore, Host, PendingTransfer, UnitAuthority};

pub struct AuthorityTable {
    units: RwLock<HashMap<UnitKey, Arc<Mutex<UnitAuthority>>>>,
    store: Arc<dyn AuthorityStore>,
    host: Arc<dyn Host>,
}

impl AuthorityTable {
    /// Restore every persisted unit from `store`
    pub fn open(store: Arc<dyn AuthorityStore>, host: Arc<dyn Host>) -> InterconnectResult<Self> {
        let units: HashMap<_, _> = store
            .load()?
            .into_iter()
            .map(|(unit, state)| {
                let record = UnitAuthority::restored(unit.clone(), state);
                (unit, Arc::new(Mutex::new(record)))
            })
            .collect();
        tracing::info!(units = units.len(), "authority table restored");
        Ok(AuthorityTable {
            units: RwLock::new(units),
            store,
            host,
        })
    }

    pub fn state(&self, unit: &UnitKey) -> Option<AuthorityState> {
        let record = self.units.read().get(unit).cloned()?;
        let state = record.lock().state().cloned();
        state
    }

    pub fn pending(&self, unit: &UnitKey) -> Option<PendingTransfer> {
        let record = self.units.read().get(unit).cloned()?;
        let pending = record.lock().pending().cloned();
        pending
    }

    /// Units with an authority state
    pub fn units(&self) -> Vec<UnitKey> {
        let records: Vec<_> = self.units.read().values().cloned().collect();
        records
            .into_iter()
            .filter_map(|record| {
                let record = record.lock();
                record.state().map(|_| record.unit().clone())
            })
            .collect()
    }

    /// Units currently in `state`
    pub fn count_in(&self, state: &AuthorityState) -> usize {
        self.units
            .read()
            .values()
            .filter(|record| record.lock().state() == Some(state))
            .count()
    }

    /// First authority assignment: the unit becomes `Active` here
    pub fn claim(&self, unit: &UnitKey) -> InterconnectResult<()> {
        self.upsert(unit, UnitAuthority::claim)
    }

    /// Run `f` on a known unit
    pub fn update<T>(
        &self,
        unit: &UnitKey,
        f: impl FnOnce(&mut UnitAuthority) -> InterconnectResult<T>,
    ) -> InterconnectResult<T> {
        let record = self
            .units
            .read()
            .get(unit)
            .cloned()
            .ok_or_else(|| InterconnectError::UnitNotFound(unit.clone()))?;
        self.apply(&record, f)
    }

    /// Run `f` on a unit, starting from a vacant record if it is unknown
    pub fn upsert<T>(
        &self,
        unit: &UnitKey,
        f: impl FnOnce(&mut UnitAuthority) -> InterconnectResult<T>,
    ) -> InterconnectResult<T> {
        let existing = self.units.read().get(unit).cloned();
        let record = match existing {
            Some(record) => record,
            None => Arc::clone(
                self.units
                    .write()
                    .entry(unit.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(UnitAuthority::vacant(unit.clone())))),
            ),
        };
        self.apply(&record, f)
    }

    fn apply<T>(
        &self,
        record: &Mutex<UnitAuthority>,
        f: impl FnOnce(&mut UnitAuthority) -> InterconnectResult<T>,
    ) -> InterconnectResult<T> {
        let mut guard = record.lock();
        let result = f(&mut *guard);
        let changes = guard.take_changes();
        if changes.is_empty() {
            return result;
        }

        let unit = guard.unit().clone();
        if let Err(e) = self.store.save(&unit, guard.state()) {
            tracing::error!(%unit, error = %e, "failed to persist authority state");
        }
        drop(guard);

        for change in &changes {
            self.host
                .on_authority_change(&unit, change.old.as_ref(), change.new.as_ref());
        }
        result
    }
}
