//! Graph initialization and reset.

use crate::model::circle::PublicDomain;
use crate::repo::graph_repo::GraphStore;
use crate::service::error::ServiceResult;
use log::{info, warn};

pub struct AdminService<S: GraphStore> {
    store: S,
}

impl<S: GraphStore> AdminService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ensures the PublicDomain marker exists; safe to call on every start.
    pub fn initialize_graph(&self) -> ServiceResult<PublicDomain> {
        let domain = self.store.create_public_domain_once()?;
        info!("event=graph_init module=admin status=ok");
        Ok(domain)
    }

    /// Deletes every node and edge, then re-creates the PublicDomain marker.
    pub fn reset_graph(&self) -> ServiceResult<PublicDomain> {
        warn!("event=graph_reset module=admin status=start");
        self.store.delete_all_nodes_and_relations()?;
        self.initialize_graph()
    }
}
