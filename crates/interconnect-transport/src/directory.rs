//! Server directory: where to deliver transfers

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use interconnect_core::{InterconnectError, InterconnectResult, ServerRef};

use crate::TransferLink;

/// Maps server references to links
#[derive(Default)]
pub struct LinkDirectory {
    links: RwLock<HashMap<ServerRef, Arc<dyn TransferLink>>>,
}

impl LinkDirectory {
    pub fn new() -> Self {
        LinkDirectory::default()
    }

    pub fn register(&self, server: ServerRef, link: Arc<dyn TransferLink>) {
        tracing::debug!(%server, "link registered");
        self.links.write().insert(server, link);
    }

    pub fn remove(&self, server: &ServerRef) -> Option<Arc<dyn TransferLink>> {
        self.links.write().remove(server)
    }

    /// Link to `server`, or `Unreachable` when none is known
    pub fn resolve(&self, server: &ServerRef) -> InterconnectResult<Arc<dyn TransferLink>> {
        self.links
            .read()
            .get(server)
            .cloned()
            .ok_or(InterconnectError::Unreachable)
    }

    pub fn servers(&self) -> Vec<ServerRef> {
        self.links.read().keys().cloned().collect()
    }
}
