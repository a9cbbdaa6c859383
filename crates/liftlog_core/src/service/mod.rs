//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into operations spanning many aggregates.
//! - Keep CLI callers decoupled from storage details.

pub mod maintenance;
