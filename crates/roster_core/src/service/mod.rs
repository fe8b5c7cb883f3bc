//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Emit audit entries after each operation resolves.
//!
//! # Invariants
//! - Validation runs before any mutation is attempted.
//! - Audit sink failures never change an operation's result.

pub mod duty_service;
pub mod person_service;
