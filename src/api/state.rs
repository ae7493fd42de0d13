//! Shared application state

use std::sync::Arc;

use super::auth::JwtAuth;
use crate::log_store::ContributionStore;
use crate::subscriber::ContributionRecorder;

/// Shared application state for HTTP handlers
pub struct AppState {
    /// The contribution log
    pub store: Arc<ContributionStore>,
    /// Domain event hooks writing into the log
    pub recorder: ContributionRecorder,
    /// Token issuing and validation
    pub auth: JwtAuth,
}

impl AppState {
    /// Create a new AppState around an opened store
    pub fn new(store: Arc<ContributionStore>, auth: JwtAuth) -> Self {
        Self {
            recorder: ContributionRecorder::new(store.clone()),
            store,
            auth,
        }
    }
}
