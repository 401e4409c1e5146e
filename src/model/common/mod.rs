//! Types shared by the database, engine and API layers.

pub mod election;
pub mod member;
pub mod vote;
