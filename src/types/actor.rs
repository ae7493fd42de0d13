//! Actor context for log writes

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::log_store::{ContributionError, ContributionResult};

/// The user and request origin behind one contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// `None` for anonymous contributions
    pub user_id: Option<i64>,
    pub ip: IpAddr,
}

impl Actor {
    pub fn new(user_id: Option<i64>, ip: IpAddr) -> Self {
        Self { user_id, ip }
    }

    pub fn user(user_id: i64, ip: IpAddr) -> Self {
        Self::new(Some(user_id), ip)
    }

    pub fn anonymous(ip: IpAddr) -> Self {
        Self::new(None, ip)
    }
}

/// Resolves the current actor at write time
///
/// Every write calls `resolve_actor` exactly once, right before the row is
/// stamped. An error here aborts the write and reaches the caller.
pub trait ActorSource {
    fn resolve_actor(&self) -> ContributionResult<Actor>;
}

impl ActorSource for Actor {
    fn resolve_actor(&self) -> ContributionResult<Actor> {
        Ok(self.clone())
    }
}

impl<T: ActorSource + ?Sized> ActorSource for &T {
    fn resolve_actor(&self) -> ContributionResult<Actor> {
        (**self).resolve_actor()
    }
}

/// Actor whose identity could not be established
///
/// Useful for callers that must still go through the write path (and fail)
/// when session context is missing.
#[derive(Debug, Clone)]
pub struct UnresolvedActor(pub String);

impl ActorSource for UnresolvedActor {
    fn resolve_actor(&self) -> ContributionResult<Actor> {
        Err(ContributionError::ActorUnresolved(self.0.clone()))
    }
}
