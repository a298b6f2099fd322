//! Account aggregate domain model.
//!
//! # Responsibility
//! - Define the in-memory, map-keyed shape callers mutate.
//! - Stay storage agnostic; relational translation lives in `store`.
//!
//! # Invariants
//! - Child entities carry an explicit foreign key to their owner.
//! - Aggregate equality is structural; map iteration order is irrelevant.

pub mod account;
pub mod group;
pub mod nameserver;
pub mod peer;
pub mod policy;
pub mod route;
pub mod setup_key;
pub mod user;
