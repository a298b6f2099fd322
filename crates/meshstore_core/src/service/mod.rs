//! Core use-case services.
//!
//! # Responsibility
//! - Compose store operations into lock-disciplined use cases.
//! - Keep hosts (CLI, servers) decoupled from storage details.

pub mod account_service;
