//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Field names are camel case.

pub mod election;
pub mod id;
pub mod member;
pub mod pending;
pub mod subject;
pub mod vote;
