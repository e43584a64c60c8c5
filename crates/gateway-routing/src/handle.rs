//! Shared handle to the current routing table.

use crate::table::RoutingTable;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;

/// Cloneable pointer to the live [`RoutingTable`].
///
/// Readers take a snapshot per request; a reload builds a new table and swaps it in.
/// In-flight requests keep the snapshot they started with.
#[derive(Debug, Clone)]
pub struct RoutingHandle {
    current: Arc<ArcSwap<RoutingTable>>,
}

impl RoutingHandle {
    /// Create a handle around an initial table
    #[must_use]
    pub fn new(table: RoutingTable) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(table)),
        }
    }

    /// The table as of now
    #[must_use]
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.current.load_full()
    }

    /// Atomically replace the table, returning the previous one
    pub fn replace(&self, table: RoutingTable) -> Arc<RoutingTable> {
        let routes = table.len();
        let previous = self.current.swap(Arc::new(table));
        info!(
            routes,
            previous_routes = previous.len(),
            "Routing table replaced"
        );
        previous
    }
}

impl Default for RoutingHandle {
    fn default() -> Self {
        Self::new(RoutingTable::default())
    }
}

impl From<RoutingTable> for RoutingHandle {
    fn from(table: RoutingTable) -> Self {
        Self::new(table)
    }
}
