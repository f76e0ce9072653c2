//! Federation harness
//!
//! Builds several [`Server`]s in one process, each reachable from the others
//! through a [`MemoryLink`] that can be partitioned or slowed down.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use interconnect_authority::{interpret_json, Host};
use interconnect_core::{
    AuthorityChange, AuthorityState, Identity, InterconnectResult, ServerRef, UnitKey,
};
use interconnect_policy::{ImportPolicy, PolicyBook};
use interconnect_runtime::{Server, ServerConfig};
use interconnect_substrate::ContentHash;
use interconnect_transport::{LinkDirectory, MemoryLink};

/// A passport admitted at the border
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub unit: UnitKey,
    pub identity: Identity,
    pub value: Value,
}

/// Host for tests: JSON passports, reachability switch, recorded callbacks
#[derive(Default)]
pub struct TestHost {
    unreachable: AtomicBool,
    changes: Mutex<Vec<(UnitKey, AuthorityChange)>>,
    admissions: Mutex<Vec<Admission>>,
    substrate: Mutex<HashMap<UnitKey, Vec<ContentHash>>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Declare which substrate `unit` can ghost from
    pub fn bind_substrate(&self, unit: UnitKey, hashes: Vec<ContentHash>) {
        self.substrate.lock().insert(unit, hashes);
    }

    pub fn admissions(&self) -> Vec<Admission> {
        self.admissions.lock().clone()
    }

    pub fn changes(&self) -> Vec<(UnitKey, AuthorityChange)> {
        self.changes.lock().clone()
    }
}

#[async_trait]
impl Host for TestHost {
    fn interpret(&self, passport: &[u8]) -> InterconnectResult<Value> {
        interpret_json(passport)
    }

    async fn is_reachable(&self, _unit: &UnitKey) -> bool {
        !self.unreachable.load(Ordering::SeqCst)
    }

    fn on_authority_change(
        &self,
        unit: &UnitKey,
        old: Option<&AuthorityState>,
        new: Option<&AuthorityState>,
    ) {
        self.changes
            .lock()
            .push((unit.clone(), AuthorityChange::new(old.cloned(), new.cloned())));
    }

    fn on_admitted(&self, unit: &UnitKey, identity: &Identity, value: &Value) {
        self.admissions.lock().push(Admission {
            unit: unit.clone(),
            identity: identity.clone(),
            value: value.clone(),
        });
    }

    fn substrate_for(&self, unit: &UnitKey) -> Option<Vec<ContentHash>> {
        self.substrate.lock().get(unit).cloned()
    }
}

/// One server in a federation
pub struct Member {
    pub server: Server,
    pub host: Arc<TestHost>,
    /// The link other members use to reach this server
    pub link: Arc<MemoryLink>,
}

/// In-process servers sharing one link directory
pub struct Federation {
    links: Arc<LinkDirectory>,
    members: BTreeMap<String, Member>,
}

impl Federation {
    pub fn builder() -> FederationBuilder {
        FederationBuilder::default()
    }

    /// # Panics
    ///
    /// Panics if no member is called `name`.
    pub fn member(&self, name: &str) -> &Member {
        &self.members[name]
    }

    /// # Panics
    ///
    /// Panics if no member is called `name`.
    pub fn server(&self, name: &str) -> &Server {
        &self.member(name).server
    }

    pub fn links(&self) -> &Arc<LinkDirectory> {
        &self.links
    }

    /// Members holding `Active` or `Ghost` authority for `unit`
    pub fn authorities(&self, unit: &UnitKey) -> Vec<&str> {
        self.members
            .iter()
            .filter(|(_, member)| {
                member
                    .server
                    .state(unit)
                    .map_or(false, |state| state.is_authoritative())
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The single authoritative member for `unit`, if exactly one exists
    pub fn sole_authority(&self, unit: &UnitKey) -> Option<&str> {
        match self.authorities(unit).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Builder for [`Federation`]
pub struct FederationBuilder {
    servers: Vec<(String, PolicyBook)>,
    transfer_timeout: Duration,
    unreachable_threshold: u32,
}

impl Default for FederationBuilder {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        FederationBuilder {
            servers: Vec::new(),
            transfer_timeout: defaults.transfer_timeout,
            unreachable_threshold: defaults.unreachable_threshold,
        }
    }
}

impl FederationBuilder {
    /// Add a server whose border applies `policy`
    pub fn server(mut self, name: impl Into<String>, policy: ImportPolicy) -> Self {
        self.servers.push((name.into(), PolicyBook::new(policy)));
        self
    }

    /// Add a server that admits any verified passport
    pub fn open_server(self, name: impl Into<String>) -> Self {
        self.server(name, ImportPolicy::new("open").accept_any())
    }

    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn unreachable_threshold(mut self, threshold: u32) -> Self {
        self.unreachable_threshold = threshold;
        self
    }

    pub fn build(self) -> InterconnectResult<Federation> {
        let links = Arc::new(LinkDirectory::new());
        let mut members = BTreeMap::new();

        for (name, book) in self.servers {
            let mut config = ServerConfig::named(name.clone());
            config.transfer_timeout = self.transfer_timeout;
            config.unreachable_threshold = self.unreachable_threshold;

            let host = Arc::new(TestHost::new());
            let server = Server::open_with(config, book, host.clone(), Arc::clone(&links))?;
            let link = Arc::new(MemoryLink::new(server.border()));
            links.register(ServerRef::new(name.clone()), link.clone());
            members.insert(name, Member { server, host, link });
        }

        Ok(Federation { links, members })
    }
}
