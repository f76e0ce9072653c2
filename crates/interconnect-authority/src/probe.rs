//! Liveness probing
//!
//! Each cycle asks the host whether every probed unit's authority is
//! reachable. Failures accumulate toward the threshold; with substrate
//! cached the unit degrades to Ghost instead of going dark. The host call
//! happens outside the unit's lock, and a unit with a live pending
//! transfer is treated as reachable.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

use interconnect_core::{AuthorityState, InterconnectResult, UnitKey};
use interconnect_substrate::SubstrateCache;

use crate::{AuthorityTable, Host};

pub struct LivenessProber {
    table: Arc<AuthorityTable>,
    host: Arc<dyn Host>,
    substrate: Arc<SubstrateCache>,
    threshold: u32,
}

impl LivenessProber {
    pub fn new(
        table: Arc<AuthorityTable>,
        host: Arc<dyn Host>,
        substrate: Arc<SubstrateCache>,
        threshold: u32,
    ) -> Self {
        LivenessProber {
            table,
            host,
            substrate,
            threshold,
        }
    }

    fn substrate_present(&self, unit: &UnitKey) -> bool {
        match self.host.substrate_for(unit) {
            Some(hashes) => hashes.iter().any(|hash| self.substrate.contains(hash)),
            None => !self.substrate.is_empty(),
        }
    }

    /// Probe one unit; returns its state afterwards
    pub async fn probe_unit(&self, unit: &UnitKey) -> InterconnectResult<Option<AuthorityState>> {
        match self.table.state(unit) {
            Some(state) if state.is_probed() => {}
            other => return Ok(other),
        }

        let reachable = self.host.is_reachable(unit).await;
        let substrate_present = !reachable && self.substrate_present(unit);
        let now = Instant::now();

        self.table.update(unit, |record| {
            if reachable {
                record.probe_succeeded();
            } else {
                record.probe_failed(self.threshold, substrate_present, now);
                tracing::debug!(unit = %record.unit(), failures = record.failures(), "probe failed");
            }
            Ok(record.state().cloned())
        })
    }

    /// Probe every unit concurrently
    pub async fn probe_all(self: &Arc<Self>) {
        let mut probes = JoinSet::new();
        for unit in self.table.units() {
            let prober = Arc::clone(self);
            probes.spawn(async move {
                if let Err(e) = prober.probe_unit(&unit).await {
                    tracing::warn!(%unit, error = %e, "probe failed to apply");
                }
            });
        }
        while probes.join_next().await.is_some() {}
    }

    /// Probe on a fixed interval until the handle is aborted
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.probe_all().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::RecordingHost;
    use crate::MemoryStore;
    use std::sync::atomic::Ordering;

    fn setup(substrate: bool) -> (Arc<LivenessProber>, Arc<AuthorityTable>, Arc<RecordingHost>, UnitKey) {
        let host = Arc::new(RecordingHost::default());
        let table = Arc::new(AuthorityTable::open(Arc::new(MemoryStore::new()), host.clone()).unwrap());
        let cache = Arc::new(SubstrateCache::new());
        if substrate {
            cache.put(&AuthorityState::Active, &b"static map"[..]).unwrap();
        }
        let unit = UnitKey::from("zone-1");
        table.claim(&unit).unwrap();
        let prober = Arc::new(LivenessProber::new(Arc::clone(&table), host.clone(), cache, 3));
        (prober, table, host, unit)
    }

    #[tokio::test]
    async fn test_three_failures_to_ghost() {
        let (prober, table, host, unit) = setup(true);
        host.unreachable.store(true, Ordering::SeqCst);

        prober.probe_unit(&unit).await.unwrap();
        prober.probe_unit(&unit).await.unwrap();
        assert_eq!(table.state(&unit), Some(AuthorityState::Active));

        let state = prober.probe_unit(&unit).await.unwrap();
        assert_eq!(state, Some(AuthorityState::Ghost));

        host.unreachable.store(false, Ordering::SeqCst);
        prober.probe_all().await;
        assert_eq!(table.state(&unit), Some(AuthorityState::Active));
    }

    #[tokio::test]
    async fn test_no_substrate_stays_unreachable() {
        let (prober, table, host, unit) = setup(false);
        host.unreachable.store(true, Ordering::SeqCst);
        for _ in 0..5 {
            prober.probe_unit(&unit).await.unwrap();
        }
        assert_eq!(table.state(&unit), Some(AuthorityState::Unreachable));
    }

    #[tokio::test]
    async fn test_transferred_units_are_not_probed() {
        let (prober, table, host, unit) = setup(true);
        let now = Instant::now();
        let correlation = interconnect_core::CorrelationId::generate();
        let zone_b = interconnect_core::ServerRef::new("zone-b");
        table
            .update(&unit, |r| {
                r.begin_transfer(zone_b.clone(), correlation, now + Duration::from_secs(5), now)?;
                r.commit_transfer(correlation, zone_b.clone())
            })
            .unwrap();

        host.unreachable.store(true, Ordering::SeqCst);
        for _ in 0..5 {
            prober.probe_unit(&unit).await.unwrap();
        }
        assert_eq!(table.state(&unit), Some(AuthorityState::Transferred { to: zone_b }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_prober_runs_on_interval() {
        let (prober, table, host, unit) = setup(true);
        host.unreachable.store(true, Ordering::SeqCst);

        let handle = prober.spawn(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(table.state(&unit), Some(AuthorityState::Ghost));
        handle.abort();
    }
}
