//! Pure logic behind the console views: the create-or-update
//! reconciliation flow, period classification, analytics aggregation,
//! bulk-import planning, and navigation guards. Nothing in here touches the
//! DOM or the network.

pub mod analytics;
pub mod cascade;
pub mod excel;
pub mod guard;
pub mod period;
pub mod reconcile;
