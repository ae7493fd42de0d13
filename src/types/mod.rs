//! Data types for the contribution log
//!
//! This module contains the log entry, its enums, the actor context and the
//! query filter shared by the store and the HTTP API.

mod actor;
mod contribution;
mod filter;

pub use actor::{Actor, ActorSource, UnresolvedActor};
pub use contribution::{
    ContributionAction, ContributionLogEntry, ContributionType, IpUsage, LinkAction,
    SentenceSnapshot, Visibility,
};
pub use filter::ContributionFilter;
