//! State shared by the dispatcher, the request router and the orchestrator.

use hotload_transport::SessionSlot;

use crate::subscriptions::SubscriptionTable;
use crate::tasks::TaskSet;

/// Cheap to clone; clones share the same underlying state.
#[derive(Clone, Default)]
pub struct ServerContext {
    pub sessions: SessionSlot,
    pub tasks: TaskSet,
    pub subscriptions: SubscriptionTable,
}

impl ServerContext {
    pub fn new() -> Self {
        Self::default()
    }
}
