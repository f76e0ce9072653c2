//! Interconnect server: every component wired together

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use interconnect_authority::{
    AuthorityStore, AuthorityTable, Border, Host, JsonFileStore, LivenessProber, MemoryStore,
    TransferCoordinator, TransferOutcome,
};
use interconnect_core::{
    AuthorityState, ConnectionState, CorrelationId, Identity, InterconnectError, InterconnectResult, Manifest,
    ServerRef, UnitKey, LOCAL_SCHEME,
};
use interconnect_crypto::{IdentityVerifier, PassportSigner};
use interconnect_policy::PolicyBook;
use interconnect_substrate::{ContentHash, SubstrateCache, SubstrateObject};
use interconnect_transport::LinkDirectory;
use interconnect_wire::{PassportEnvelope, ServerMessage, TransferDirective};

use crate::ServerConfig;

/// One federated server
pub struct Server {
    config: ServerConfig,
    local: ServerRef,
    manifest: Manifest,
    table: Arc<AuthorityTable>,
    substrate: Arc<SubstrateCache>,
    border: Arc<Border>,
    coordinator: TransferCoordinator,
    prober: Arc<LivenessProber>,
    probe_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Open a server, loading its policy book from `config.policy_file` if set
    pub fn open(
        config: ServerConfig,
        host: Arc<dyn Host>,
        links: Arc<LinkDirectory>,
    ) -> InterconnectResult<Self> {
        let book = match &config.policy_file {
            Some(path) => PolicyBook::load(path)?,
            None => PolicyBook::default(),
        };
        Self::open_with(config, book, host, links)
    }

    /// Open a server with an explicit policy book.
    ///
    /// A verifier installed process-wide takes precedence over
    /// `config.registry`.
    pub fn open_with(
        config: ServerConfig,
        book: PolicyBook,
        host: Arc<dyn Host>,
        links: Arc<LinkDirectory>,
    ) -> InterconnectResult<Self> {
        config.validate()?;
        let local = ServerRef::new(config.name.clone());

        let verifier = match IdentityVerifier::global() {
            Some(verifier) => verifier,
            None => Arc::new(IdentityVerifier::from_config(&config.registry)?),
        };

        let store: Arc<dyn AuthorityStore> = match &config.authority_file {
            Some(path) => Arc::new(JsonFileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let substrate = Arc::new(match &config.substrate_dir {
            Some(dir) => SubstrateCache::open(dir)?,
            None => SubstrateCache::new(),
        });

        let identity = Identity::new(LOCAL_SCHEME, config.name.clone())?;
        let mut manifest = Manifest::new(identity, config.name.clone());
        if let Some(policy) = &config.import_policy {
            manifest = manifest.with_import_policy(policy.clone());
        }
        let policy = book.select(Some(&manifest)).clone();

        let table = Arc::new(AuthorityTable::open(store, Arc::clone(&host))?);
        let border = Arc::new(Border::new(
            local.clone(),
            verifier,
            policy,
            Arc::clone(&table),
            Arc::clone(&host),
            config.ledger_capacity,
        ));
        let coordinator = TransferCoordinator::new(
            local.clone(),
            Arc::clone(&table),
            links,
            config.transfer_timeout,
        );
        let prober = Arc::new(LivenessProber::new(
            Arc::clone(&table),
            host,
            Arc::clone(&substrate),
            config.unreachable_threshold,
        ));

        tracing::info!(
            server = %local,
            policy = %border.policy().name,
            units = table.units().len(),
            substrate = substrate.len(),
            "server opened"
        );

        Ok(Server {
            config,
            local,
            manifest,
            table,
            substrate,
            border,
            coordinator,
            prober,
            probe_task: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &ServerRef {
        &self.local
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// First message a connecting client receives
    pub fn greeting<S>(&self) -> ServerMessage<S> {
        ServerMessage::Manifest(self.manifest.clone())
    }

    /// Destination-side handler, registered with other servers' links
    pub fn border(&self) -> Arc<Border> {
        Arc::clone(&self.border)
    }

    pub fn table(&self) -> &Arc<AuthorityTable> {
        &self.table
    }

    pub fn substrate(&self) -> &Arc<SubstrateCache> {
        &self.substrate
    }

    pub fn claim(&self, unit: &UnitKey) -> InterconnectResult<()> {
        self.table.claim(unit)
    }

    pub fn state(&self, unit: &UnitKey) -> Option<AuthorityState> {
        self.table.state(unit)
    }

    /// Status shown to clients attached to `unit`
    pub fn connection_state(&self, unit: &UnitKey) -> ConnectionState {
        match self.table.state(unit) {
            Some(AuthorityState::Active) if self.table.pending(unit).is_some() => {
                ConnectionState::Syncing
            }
            Some(AuthorityState::Active)
            | Some(AuthorityState::Delegated { .. })
            | Some(AuthorityState::DelegatedFrom { .. }) => ConnectionState::Live,
            Some(AuthorityState::Ghost) => ConnectionState::Ghost,
            Some(AuthorityState::Unreachable)
            | Some(AuthorityState::Transferred { .. })
            | None => ConnectionState::Connecting,
        }
    }

    pub async fn transfer(
        &self,
        unit: &UnitKey,
        destination: &ServerRef,
        envelope: PassportEnvelope,
    ) -> InterconnectResult<TransferOutcome> {
        self.coordinator
            .initiate_transfer(unit, destination, envelope)
            .await
    }

    /// Retry a timed-out transfer under its original correlation id
    pub async fn retry_transfer(
        &self,
        unit: &UnitKey,
        destination: &ServerRef,
        envelope: PassportEnvelope,
        correlation: CorrelationId,
    ) -> InterconnectResult<TransferOutcome> {
        self.coordinator
            .initiate_transfer_with(unit, destination, envelope, correlation)
            .await
    }

    pub async fn transfer_passport(
        &self,
        unit: &UnitKey,
        destination: &ServerRef,
        passport: impl Into<Bytes>,
        signer: &(impl PassportSigner + Sync),
    ) -> InterconnectResult<TransferOutcome> {
        self.coordinator
            .transfer_passport(unit, destination, passport, signer)
            .await
    }

    /// Transfer `unit` and tell its client where to go next.
    ///
    /// An accepted transfer yields a reconnect directive carrying the
    /// passport; any other verdict yields an error message.
    pub async fn handoff<S>(
        &self,
        unit: &UnitKey,
        destination: &ServerRef,
        passport: Bytes,
        signer: &(impl PassportSigner + Sync),
    ) -> InterconnectResult<ServerMessage<S>> {
        let outcome = self
            .transfer_passport(unit, destination, passport.clone(), signer)
            .await;
        let message = match outcome {
            Ok(TransferOutcome::Accepted(_)) => ServerMessage::Transfer(TransferDirective {
                destination: destination.as_str().to_string(),
                passport: passport.to_vec(),
            }),
            Ok(TransferOutcome::Rejected(error)) => ServerMessage::Error {
                code: "transfer_rejected".into(),
                message: error.to_string(),
            },
            Ok(TransferOutcome::TimedOut { .. }) => ServerMessage::Error {
                code: "transfer_timed_out".into(),
                message: InterconnectError::TimedOut.to_string(),
            },
            Err(error) if error.is_retryable() => ServerMessage::Error {
                code: "transfer_unavailable".into(),
                message: error.to_string(),
            },
            Err(error) => return Err(error),
        };
        Ok(message)
    }

    pub fn delegate(&self, unit: &UnitKey, to: &ServerRef) -> InterconnectResult<()> {
        self.coordinator.delegate(unit, to)
    }

    pub fn revoke(&self, unit: &UnitKey) -> InterconnectResult<()> {
        self.coordinator.revoke(unit)
    }

    /// Start serving writes for `unit` on behalf of `origin`
    pub fn accept_delegation(&self, unit: &UnitKey, origin: &ServerRef) -> InterconnectResult<()> {
        self.table
            .upsert(unit, |record| record.accept_delegation(origin.clone()))
    }

    /// The origin took its delegation back
    pub fn end_delegation(&self, unit: &UnitKey, by: &ServerRef) -> InterconnectResult<()> {
        self.table.update(unit, |record| record.end_delegation(by))
    }

    /// Substrate reads never depend on authority
    pub fn read_substrate(&self, hash: &ContentHash) -> Option<SubstrateObject> {
        self.substrate.get(hash)
    }

    /// Write substrate on behalf of `unit`; needs write authority for it
    pub fn write_substrate(
        &self,
        unit: &UnitKey,
        bytes: impl Into<Bytes>,
    ) -> InterconnectResult<ContentHash> {
        // The unit lock is held across the put so a concurrent probe cannot
        // ghost the unit between the check and the write.
        self.table.update(unit, |record| {
            let state = record
                .state()
                .ok_or_else(|| InterconnectError::UnitNotFound(unit.clone()))?;
            self.substrate.put(state, bytes)
        })
    }

    /// Run one probe cycle over every unit
    pub async fn probe_now(&self) {
        self.prober.probe_all().await;
    }

    /// Start periodic probing; restarts it if already running
    pub fn spawn_probes(&self) {
        let handle = Arc::clone(&self.prober).spawn(self.config.probe_interval);
        if let Some(previous) = self.probe_task.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop periodic probing
    pub fn shutdown(&self) {
        if let Some(handle) = self.probe_task.lock().take() {
            handle.abort();
            tracing::info!(server = %self.local, "server stopped");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}
